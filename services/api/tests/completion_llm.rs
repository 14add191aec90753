//! The OpenAI-compatible adapter against a mock chat completions endpoint.

use api_lib::adapters::OpenAiCompletionAdapter;
use serde_json::json;
use site_audit_core::ports::{CompletionService, GenerationError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: Option<&str>) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

async fn adapter_for(server: &MockServer) -> OpenAiCompletionAdapter {
    OpenAiCompletionAdapter::from_settings(
        "test-key",
        Some(&format!("{}/v1", server.uri())),
        "test-model".to_string(),
    )
}

#[tokio::test]
async fn returns_the_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "test-model", "n": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(Some("{\"fixes\":[]}"))))
        .expect(1)
        .mount(&server)
        .await;

    let reply = adapter_for(&server)
        .await
        .complete("system rules", "- issue: title too long")
        .await
        .unwrap();

    assert_eq!(reply, "{\"fixes\":[]}");
}

#[tokio::test]
async fn empty_content_is_unparsable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(None)))
        .mount(&server)
        .await;

    let err = adapter_for(&server)
        .await
        .complete("system", "prompt")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Unparsable(_)), "{err:?}");
}
