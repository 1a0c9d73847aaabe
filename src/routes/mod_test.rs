use super::*;
use crate::services::test_helpers::spawn_dev_server;

#[tokio::test]
async fn healthz_is_ok() {
    let (base_url, _state) = spawn_dev_server().await;
    let resp = reqwest::get(format!("{base_url}/healthz")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn post_then_get_returns_stored_collection() {
    let (base_url, state) = spawn_dev_server().await;
    let body = r#"{"type":"FeatureCollection","features":[]}"#;

    let resp = reqwest::Client::new()
        .post(format!("{base_url}/polygons/site-1"))
        .form(&[("site-1", body)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(
        state
            .collections
            .read()
            .await
            .contains_key(&SiteKey::new("polygons", "site-1"))
    );

    let fetched = reqwest::get(format!("{base_url}/polygons/site-1")).await.unwrap();
    assert_eq!(fetched.status(), reqwest::StatusCode::OK);
    assert_eq!(fetched.text().await.unwrap(), body);
}

#[tokio::test]
async fn get_unknown_site_is_not_found() {
    let (base_url, _state) = spawn_dev_server().await;
    let resp = reqwest::get(format!("{base_url}/polygons/nobody")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_without_site_field_is_bad_request() {
    let (base_url, _state) = spawn_dev_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base_url}/polygons/site-1"))
        .form(&[("other", "{}")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_with_malformed_json_is_bad_request() {
    let (base_url, _state) = spawn_dev_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base_url}/polygons/site-1"))
        .form(&[("site-1", "{broken")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}
