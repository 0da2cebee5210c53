use super::*;
use crate::config::{Config, EmbeddingConfig, LlmConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(api_base: &str) -> Config {
    Config {
        llm: LlmConfig {
            openai_api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        },
        embedding: EmbeddingConfig {
            api_base: api_base.to_string(),
            batch_size: 16,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn missing_api_key_fails_construction() {
    let config = Config::default();
    let result = OpenAiEmbeddings::new(&config);

    assert!(matches!(result, Err(ReviewerError::Authentication(_))));
}

#[test]
fn blank_api_key_fails_construction() {
    let mut config = Config::default();
    config.llm.openai_api_key = "   ".to_string();

    let result = OpenAiEmbeddings::new(&config);
    assert!(matches!(result, Err(ReviewerError::Authentication(_))));
}

#[test]
fn client_configuration() {
    let config = test_config("https://api.openai.com");
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    assert_eq!(client.model(), "text-embedding-3-small");
    assert_eq!(client.batch_size, 16);
}

#[test]
fn empty_input_makes_no_request() {
    let config = test_config("http://127.0.0.1:1"); // nothing listens here
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let vectors = client.embed(&[]).expect("should embed nothing");
    assert!(vectors.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_texts_in_request_order() {
    let server = MockServer::start().await;

    // Response deliberately out of order; the index field is authoritative
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.4, 0.5, 0.6]},
                {"index": 0, "embedding": [0.1, 0.2, 0.3]},
            ],
            "model": "text-embedding-3-small",
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let texts = vec!["first".to_string(), "second".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("task should not panic")
        .expect("should embed");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
}

#[tokio::test(flavor = "multi_thread")]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2]}],
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let texts = vec!["one".to_string(), "two".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("task should not panic");

    assert!(matches!(result, Err(ReviewerError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_response_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let result = tokio::task::spawn_blocking(move || client.embed_one("query"))
        .await
        .expect("task should not panic");

    assert!(matches!(result, Err(ReviewerError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_a_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let result = tokio::task::spawn_blocking(move || client.embed_one("query"))
        .await
        .expect("task should not panic");

    assert!(matches!(result, Err(ReviewerError::Network(_))));
}
