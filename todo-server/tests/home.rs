use std::path::PathBuf;

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use todo_server::db::sqlite::SqliteStore;
use todo_server::{app, AppState, Config};
use tower::ServiceExt;

async fn get_home(static_dir: PathBuf) -> (StatusCode, Option<String>, String) {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let config = Config {
        static_dir,
        ..Config::default()
    };
    let resp = app(AppState::new(store, config))
        .oneshot(Request::builder().uri("/").body(String::new()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn home_renders_bundled_page() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");
    let (status, content_type, body) = get_home(dir).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert!(body.contains("<title>Todo</title>"));
}

#[tokio::test]
async fn home_missing_template_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let (status, content_type, body) = get_home(dir.path().to_path_buf()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(body, "Error loading template");
}

#[tokio::test]
async fn home_unparsable_template_is_500() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.tpl"), "<p>{% if %}</p>").unwrap();
    let (status, _, body) = get_home(dir.path().to_path_buf()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error loading template");
}

#[tokio::test]
async fn home_render_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.tpl"), "<p>{{ missing_value }}</p>").unwrap();
    let (status, _, body) = get_home(dir.path().to_path_buf()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error rendering template");
}
