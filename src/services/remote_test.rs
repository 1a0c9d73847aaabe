use super::*;
use crate::config::RemoteTimeouts;
use crate::services::test_helpers::{sample_feature, spawn_dev_server};

fn remote_for(base_url: &str) -> HttpRemote {
    let config = RemoteConfig::new(base_url, "polygons", RemoteTimeouts::default()).unwrap();
    HttpRemote::new(&config).unwrap()
}

// =============================================================================
// endpoint / parse_fetch_body
// =============================================================================

#[test]
fn endpoint_appends_map_and_site() {
    let remote = remote_for("https://sync.example.test/api");
    let url = remote.endpoint(&SiteId::new("farm-1").unwrap()).unwrap();
    assert_eq!(url.as_str(), "https://sync.example.test/api/polygons/farm-1");
}

#[test]
fn endpoint_percent_encodes_site() {
    let remote = remote_for("https://sync.example.test");
    let url = remote.endpoint(&SiteId::new("north field/2").unwrap()).unwrap();
    assert_eq!(url.as_str(), "https://sync.example.test/polygons/north%20field%2F2");
}

#[test]
fn empty_or_null_fetch_body_is_none() {
    assert!(parse_fetch_body("").unwrap().is_none());
    assert!(parse_fetch_body("  null ").unwrap().is_none());
}

#[test]
fn malformed_fetch_body_is_decode_error() {
    let err = parse_fetch_body("{\"type\":").unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

// =============================================================================
// HttpRemote against the dev endpoint
// =============================================================================

#[tokio::test]
async fn push_then_fetch_round_trips() {
    let (base_url, _state) = spawn_dev_server().await;
    let remote = remote_for(&base_url);
    let site = SiteId::new("site-7").unwrap();
    let collection = FeatureCollection::from_features(vec![sample_feature("a", 100.0), sample_feature("b", 50.0)]);

    remote.push(&site, &collection).await.unwrap();
    let fetched = remote.fetch(&site).await.unwrap().unwrap();

    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched.ids(), collection.ids());
    assert_eq!(fetched.features[0].geometry, collection.features[0].geometry);
}

#[tokio::test]
async fn fetch_unknown_site_is_none() {
    let (base_url, _state) = spawn_dev_server().await;
    let remote = remote_for(&base_url);
    assert!(remote.fetch(&SiteId::new("empty").unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn non_200_status_is_rejected() {
    let (base_url, _state) = spawn_dev_server().await;
    // Unknown route on the dev endpoint answers 404 for POST.
    let remote = remote_for(&format!("{base_url}/nested/too/deep"));
    let err = remote
        .push(&SiteId::new("s").unwrap(), &FeatureCollection::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { status: 404 }));
}

#[tokio::test]
async fn unreachable_endpoint_is_request_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let remote = remote_for(&format!("http://127.0.0.1:{port}"));
    let err = remote
        .push(&SiteId::new("s").unwrap(), &FeatureCollection::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Request(_)));
}
