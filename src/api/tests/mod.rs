use super::*;
use crate::downloader::test_helpers::{ALICE_TOKEN, FakeCatalog, ScriptedResolver};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test PlaylistDownloader instance wrapped in Arc
async fn create_test_downloader(
    catalog: FakeCatalog,
    resolver: ScriptedResolver,
) -> (Arc<PlaylistDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(catalog, Arc::new(resolver)).await;
    (Arc::new(downloader), temp_dir)
}

/// Router over a downloader with the standard fake catalog
async fn test_app(catalog: FakeCatalog) -> (Router, Arc<PlaylistDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(catalog, ScriptedResolver::new()).await;
    let config = downloader.get_config();
    (create_router(downloader.clone(), config), downloader, temp_dir)
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let (downloader, _temp_dir) =
        create_test_downloader(FakeCatalog::standard(), ScriptedResolver::new()).await;

    // Port 0 = OS assigns a free port
    let mut config = (*downloader.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    downloader.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) =
        create_test_downloader(FakeCatalog::standard(), ScriptedResolver::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) =
        create_test_downloader(FakeCatalog::standard(), ScriptedResolver::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[test]
fn test_specific_cors_origins_build() {
    let _layer = build_cors_layer(&["https://app.example.com".to_string()]);
}

#[tokio::test]
async fn test_token_is_checked_before_handlers() {
    let (app, _downloader, _temp) = test_app(FakeCatalog::standard()).await;

    let missing = Request::builder()
        .method("POST")
        .uri("/download/playlist/mix")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(authed("POST", "/download/playlist/mix", "stolen"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "unauthorized");

    // Health stays public
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let (app, _downloader, _temp) = test_app(FakeCatalog::standard()).await;

    let response = app
        .oneshot(authed("POST", "/download/playlist/unknown", ALICE_TOKEN))
        .await
        .unwrap();

    // Authenticated, so the handler ran and reported the missing playlist
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "playlist_not_found"
    );
}
