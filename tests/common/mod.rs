//! Test helpers for integration tests.
//!
//! Builds the full application router over an in-memory database and a
//! temporary content root.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use tempshare::config::Config;
use tempshare::web::handlers::AppState;
use tempshare::web::{create_health_router, create_router};
use tempshare::{ContentStore, Database};

/// Running test application.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub store: ContentStore,
    pub config: Config,
    /// Keeps the content root alive for the duration of the test.
    pub content_dir: TempDir,
}

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config
}

/// Create a test application with the default configuration.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(create_test_config()).await
}

/// Create a test application with a custom configuration.
pub async fn create_test_app_with(mut config: Config) -> TestApp {
    let content_dir = TempDir::new().expect("Failed to create content root");
    config.storage.content_root = content_dir.path().to_string_lossy().into_owned();

    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let store = ContentStore::new(content_dir.path()).expect("Failed to create content store");

    let app_state = Arc::new(AppState::new(db.clone(), store.clone(), config.clone()));
    let router = create_router(app_state, &config.server.cors_origins).merge(create_health_router());

    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        store,
        config,
        content_dir,
    }
}

/// Deterministic test content of the given length.
pub fn test_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Build a multipart form with one part per `(relative path, bytes)` pair.
pub fn upload_form(files: &[(&str, Vec<u8>)]) -> MultipartForm {
    files
        .iter()
        .fold(MultipartForm::new(), |form, (name, content)| {
            form.add_part("files", Part::bytes(content.clone()).file_name(*name))
        })
}
