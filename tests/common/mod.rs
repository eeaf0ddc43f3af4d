#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mockito::{Matcher, Mock, ServerGuard};
use readmegen::{api, AppState, Config, FrameDecoder, StreamEvent};
use serde_json::{json, Value};

pub mod test_helpers {
    use super::*;

    pub const REPO_URL: &str = "https://github.com/acme/widget";
    pub const REPO_PATH: &str = "/repos/acme/widget";
    pub const GEMINI_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";
    pub const README_TEXT: &str = "# Widget\n\nA tiny widget.";

    /// Configuration pointing both upstream APIs at the mock server
    pub fn create_test_config(server: &ServerGuard) -> Config {
        let mut config = Config::default();
        config.github_api_base = server.url();
        config.gemini_api_base = server.url();
        config.google_api_key = Some("test-key".to_string());
        config
    }

    pub fn create_test_app(config: &Config) -> Router {
        let state = AppState::from_config(config).expect("Failed to build app state");
        api::router(state)
    }

    pub fn setup_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    pub fn encode(text: &str) -> String {
        STANDARD.encode(text)
    }

    pub fn file_item(path: &str, size: u64) -> Value {
        let name = path.rsplit('/').next().unwrap_or(path);
        json!({"type": "file", "name": name, "path": path, "size": size})
    }

    pub fn dir_item(path: &str) -> Value {
        let name = path.rsplit('/').next().unwrap_or(path);
        json!({"type": "dir", "name": name, "path": path, "size": 0})
    }

    pub async fn mock_json(server: &mut ServerGuard, path: &str, status: usize, body: Value) -> Mock {
        server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn mock_repo_info(server: &mut ServerGuard) -> Mock {
        mock_json(
            server,
            REPO_PATH,
            200,
            json!({
                "name": "widget",
                "description": "A tiny widget",
                "language": "Rust",
                "stargazers_count": 5,
                "forks_count": 1,
                "homepage": null,
                "topics": ["cli"],
                "license": {"name": "MIT License"}
            }),
        )
        .await
    }

    pub async fn mock_listing(server: &mut ServerGuard, path: &str, items: Vec<Value>) -> Mock {
        let url = if path.is_empty() {
            format!("{}/contents", REPO_PATH)
        } else {
            format!("{}/contents/{}", REPO_PATH, path)
        };
        mock_json(server, &url, 200, Value::Array(items)).await
    }

    pub async fn mock_file(server: &mut ServerGuard, path: &str, content: &str) -> Mock {
        mock_json(
            server,
            &format!("{}/contents/{}", REPO_PATH, path),
            200,
            json!({"type": "file", "path": path, "content": encode(content), "encoding": "base64"}),
        )
        .await
    }

    pub async fn mock_gemini(server: &mut ServerGuard, text: &str) -> Mock {
        server
            .mock("POST", GEMINI_PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": text}]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    /// Builds a POST with a JSON body and an `x-forwarded-for` client id
    pub fn post_json(uri: &str, body: &str, client: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", client)
            .body(Body::from(body.to_string()))
            .expect("Failed to build request")
    }

    pub fn generate_body(repo_url: &str) -> String {
        json!({ "repoUrl": repo_url }).to_string()
    }

    pub async fn read_body(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec()
    }

    pub async fn read_json(response: Response<Body>) -> Value {
        serde_json::from_slice(&read_body(response).await).expect("Body is not JSON")
    }

    pub async fn read_events(response: Response<Body>) -> Vec<StreamEvent> {
        let body = read_body(response).await;
        let mut decoder = FrameDecoder::new();
        let mut events: Vec<StreamEvent> = decoder
            .push(&body)
            .into_iter()
            .map(|event| event.expect("Invalid frame"))
            .collect();
        if let Some(event) = decoder.finish() {
            events.push(event.expect("Invalid frame"));
        }
        events
    }
}
