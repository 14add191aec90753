//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::adapters::{MemoryStore, ReqwestFetcher};
use api_lib::config::Config;
use api_lib::web::{router, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use site_audit_core::ports::{CompletionService, GenerationError};
use site_audit_core::{FixGenerator, Pipeline};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration with every default and no environment involved.
pub fn test_config() -> Config {
    Config::from_lookup(|_| None).expect("defaults are valid")
}

/// Answers every `- issue:` line of the prompt with a fix, the way a
/// well-behaved model would.
pub struct EchoCompletion;

#[async_trait]
impl CompletionService for EchoCompletion {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, GenerationError> {
        let fixes: Vec<serde_json::Value> = prompt
            .lines()
            .filter_map(|l| l.strip_prefix("- issue: "))
            .map(|name| {
                serde_json::json!({
                    "issue": name,
                    "instructions": format!("Fix {}", name),
                    "fixed_code": "<!-- fixed -->",
                    "impact": "+5 points",
                })
            })
            .collect();
        Ok(format!("```json\n{}\n```", serde_json::json!({ "fixes": fixes })))
    }
}

/// Builds the full router with the real fetcher, an in-memory store and the
/// echoing completion service.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(EchoCompletion))
}

pub fn build_test_app_with(completion: Arc<dyn CompletionService>) -> Router {
    let config = test_config();
    let fetcher = ReqwestFetcher::new(&config.fetch).expect("client builds");
    let state = AppState {
        pipeline: Pipeline::new(Arc::new(fetcher), FixGenerator::new(completion)),
        store: Arc::new(MemoryStore::new()),
        config: Arc::new(config),
    };
    router(Arc::new(state)).expect("router builds")
}

/// A page with a 75-character title and no meta description.
pub fn long_title_page() -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{}</title>\
         <meta name=\"viewport\" content=\"width=device-width\"></head>\
         <body><h1>Welcome</h1><h2>About</h2><p>A short page about nothing much.</p>\
         <a href=\"/contact\">Contact</a></body></html>",
        "T".repeat(75)
    )
}

/// Starts a mock site serving `html` at `/`.
pub async fn serve_page(html: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "public, max-age=600")
                .set_body_raw(html.as_bytes().to_vec(), "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    server
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
