//! CKAN client tests against a mock action API

use geopublish::adapters::ckan::{CatalogLookup, CatalogTransport, CkanClient};
use geopublish::config::{secret_string, CatalogConfig, RetryConfig};
use geopublish::domain::{CatalogEntry, CatalogTransportError};
use mockito::{Matcher, Server};
use serde_json::json;

const API_KEY: &str = "test-api-key";

fn config(base_url: &str) -> CatalogConfig {
    CatalogConfig {
        base_url: base_url.to_string(),
        api_key: secret_string(API_KEY.to_string()),
        download_base_url: "https://downloads.example.org/opendata".to_string(),
        title_template: None,
        license_id: None,
        group: None,
        owner_org: None,
        maintainer: None,
        maintainer_email: None,
        author: None,
        timeout_seconds: 5,
        tls_verify: true,
        retry: RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        },
    }
}

fn package(name: &str, version: &str) -> serde_json::Value {
    json!({
        "id": format!("pkg-{name}"),
        "name": name,
        "title": "Building Footprints",
        "version": version,
        "notes": null,
        "groups": [{"id": "grp-1", "name": "gilpin-county"}],
        "resources": [{
            "id": "res-1",
            "name": "buildingfootprints - SHP",
            "description": "buildingfootprints - Shapefile",
            "url": "https://downloads.example.org/opendata/buildingfootprints/shape/buildingfootprints.zip",
            "format": "SHP"
        }],
        "metadata_modified": "2025-03-01T12:00:00"
    })
}

fn entry(name: &str, version: &str) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        title: "Building Footprints".to_string(),
        version: Some(version.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_found_sends_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/3/action/package_search")
        .match_header("authorization", API_KEY)
        .match_query(Matcher::UrlEncoded(
            "fq".into(),
            "name:\"buildingfootprints\"".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "result": {"count": 1, "results": [package("buildingfootprints", "3")]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let lookup = client.get("buildingfootprints").await.unwrap();

    mock.assert_async().await;
    let CatalogLookup::Found(entry) = lookup else {
        panic!("expected entry, got {lookup:?}");
    };
    assert_eq!(entry.id.as_deref(), Some("pkg-buildingfootprints"));
    assert_eq!(entry.revision(), Some(3));
    assert_eq!(entry.resources.len(), 1);
    assert!(entry.notes.is_none());
}

#[tokio::test]
async fn test_get_ignores_partial_name_matches() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/3/action/package_search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "result": {"count": 1, "results": [package("buildingfootprints_2019", "1")]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let lookup = client.get("buildingfootprints").await.unwrap();
    assert!(matches!(lookup, CatalogLookup::NotFound));
}

#[tokio::test]
async fn test_get_reports_duplicates_as_ambiguous() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/3/action/package_search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "result": {"count": 2, "results": [
                    package("parcels", "1"),
                    package("parcels", "4")
                ]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let lookup = client.get("parcels").await.unwrap();
    assert!(matches!(lookup, CatalogLookup::Ambiguous(2)));
}

#[tokio::test]
async fn test_create_posts_entry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/3/action/package_create")
        .match_header("authorization", API_KEY)
        .match_body(Matcher::PartialJson(json!({
            "name": "buildingfootprints",
            "version": "1"
        })))
        .with_status(200)
        .with_body(
            json!({"success": true, "result": package("buildingfootprints", "1")}).to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let name = client
        .create(&entry("buildingfootprints", "1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(name, "buildingfootprints");
}

#[tokio::test]
async fn test_update_returns_stored_revision() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/3/action/package_update")
        .match_body(Matcher::PartialJson(json!({"name": "buildingfootprints"})))
        .with_status(200)
        .with_body(
            json!({"success": true, "result": package("buildingfootprints", "2")}).to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let revision = client
        .update("buildingfootprints", &entry("buildingfootprints", "2"))
        .await
        .unwrap();
    assert_eq!(revision, 2);
}

#[tokio::test]
async fn test_validation_error_is_rejected_without_retry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/3/action/package_create")
        .with_status(409)
        .with_body(
            json!({
                "success": false,
                "error": {"__type": "Validation Error", "name": ["That URL is already in use."]}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let err = client
        .create(&entry("buildingfootprints", "1"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, CatalogTransportError::Rejected(ref m) if m.contains("already in use")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/3/action/package_search")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    let err = client.get("parcels").await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, CatalogTransportError::Server { status: 503, .. }));
}

#[tokio::test]
async fn test_resolve_group() {
    let mut server = Server::new_async().await;
    let _found = server
        .mock("GET", "/api/3/action/group_show")
        .match_query(Matcher::UrlEncoded("id".into(), "gilpin-county".into()))
        .with_status(200)
        .with_body(
            json!({"success": true, "result": {"id": "grp-1", "name": "gilpin-county"}})
                .to_string(),
        )
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/api/3/action/group_show")
        .match_query(Matcher::UrlEncoded("id".into(), "nowhere".into()))
        .with_status(404)
        .with_body(
            json!({"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}})
                .to_string(),
        )
        .create_async()
        .await;

    let client = CkanClient::new(&config(&server.url())).unwrap();
    assert_eq!(
        client.resolve_group("gilpin-county").await.unwrap(),
        Some("grp-1".to_string())
    );
    assert_eq!(client.resolve_group("nowhere").await.unwrap(), None);
}
