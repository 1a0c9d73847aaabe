//! Router for the development remote endpoint.
//!
//! SYSTEM CONTEXT
//! ==============
//! Stands in for the production key/value endpoint during local runs and
//! tests: `POST /{map_id}/{site_id}` stores the form field named after the
//! site, `GET` on the same path returns it.

use std::collections::HashMap;

use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::feature::FeatureCollection;
use crate::state::{AppState, SiteKey};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/{map_id}/{site_id}", get(get_collection).post(post_collection))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `POST /:map_id/:site_id`: store the collection posted for the site.
async fn post_collection(
    State(state): State<AppState>,
    Path((map_id, site_id)): Path<(String, String)>,
    Form(fields): Form<HashMap<String, String>>,
) -> StatusCode {
    let Some(raw) = fields.get(&site_id) else {
        warn!(%map_id, %site_id, "post missing site field");
        return StatusCode::BAD_REQUEST;
    };
    let collection = match FeatureCollection::from_json(raw) {
        Ok(collection) => collection,
        Err(e) => {
            warn!(%map_id, %site_id, error = %e, "post body is not a feature collection");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(%map_id, %site_id, count = collection.len(), "collection stored");
    let mut collections = state.collections.write().await;
    collections.insert(SiteKey::new(map_id, site_id), raw.clone());
    StatusCode::OK
}

/// `GET /:map_id/:site_id`: return the last stored collection.
async fn get_collection(
    State(state): State<AppState>,
    Path((map_id, site_id)): Path<(String, String)>,
) -> Response {
    let collections = state.collections.read().await;
    match collections.get(&SiteKey::new(map_id, site_id)) {
        Some(raw) => ([(CONTENT_TYPE, "application/json")], raw.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
