#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests for the retrieval pipeline: guideline loading, index
// build-or-load, context retrieval, and the reviewer's degradation paths.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use testcase_reviewer::config::{Config, EmbeddingConfig, LlmConfig, RagConfig};
use testcase_reviewer::llm::GenerationClient;
use testcase_reviewer::parser::TestCase;
use testcase_reviewer::rag::GuidelineRetriever;
use testcase_reviewer::reviewer::review_test_cases;

const GUIDELINES: &str = "Always verify error messages are user-friendly.\n\n\
Keep test steps atomic so failures point at one action.\n\n\
Every test case needs an explicit expected result.";

/// Deterministic fake embeddings: identical texts get identical vectors, so
/// an exact-match query always ranks its chunk first.
fn fake_embedding(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    vec![
        bytes.len() as f32,
        text.chars().filter(|c| "aeiou".contains(*c)).count() as f32,
        bytes.iter().map(|&b| f32::from(b)).sum::<f32>() / 100.0,
        f32::from(bytes.first().copied().unwrap_or(0)),
    ]
}

struct EmbeddingResponder;

impl Respond for EmbeddingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body should be JSON");
        let inputs = body["input"].as_array().expect("input should be an array");

        let data: Vec<serde_json::Value> = inputs
            .iter()
            .enumerate()
            .map(|(i, text)| {
                json!({
                    "index": i,
                    "embedding": fake_embedding(text.as_str().unwrap_or_default()),
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

async fn start_embedding_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EmbeddingResponder)
        .mount(&server)
        .await;
    server
}

fn test_setup(embedding_base: &str) -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let guideline_path = temp_dir.path().join("guidelines.md");
    std::fs::write(&guideline_path, GUIDELINES).expect("should write guideline file");

    let config = Config {
        llm: LlmConfig {
            openai_api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        },
        embedding: EmbeddingConfig {
            api_base: embedding_base.to_string(),
            ..EmbeddingConfig::default()
        },
        rag: RagConfig {
            guideline_path,
            chunk_size: 80,
            chunk_overlap: 10,
            retrieval_k: 2,
        },
        base_dir: temp_dir.path().to_path_buf(),
    };
    (config, temp_dir)
}

fn sparse_case() -> TestCase {
    TestCase {
        title: "Login".to_string(),
        steps: "Do it".to_string(),
        ..TestCase::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn first_init_builds_second_init_loads() {
    let server = start_embedding_server().await;
    let (config, _temp_dir) = test_setup(&server.uri());
    let index_dir = config.vector_index_path();
    assert!(!index_dir.exists());

    // Fresh directory: initialization must build and persist the index
    let first = GuidelineRetriever::initialize(&config)
        .await
        .expect("first initialization should build the index");
    assert!(index_dir.exists());
    let chunk_count = first.chunk_count().await.expect("should count chunks");
    assert!(chunk_count > 0);

    let query = "Keep test steps atomic so failures point at one action.";
    let first_context = first
        .retrieve_context(query, 1)
        .await
        .expect("should retrieve context");

    // Populated directory: initialization must load, not rebuild
    let build_requests = server.received_requests().await.expect("requests").len();
    let second = GuidelineRetriever::initialize(&config)
        .await
        .expect("second initialization should load the index");
    let after_load_requests = server.received_requests().await.expect("requests").len();
    assert_eq!(
        build_requests, after_load_requests,
        "loading an existing index must not re-embed chunks"
    );
    assert_eq!(second.chunk_count().await.expect("should count"), chunk_count);

    let second_context = second
        .retrieve_context(query, 1)
        .await
        .expect("should retrieve context");

    assert_eq!(first_context.len(), 1);
    assert_eq!(first_context, second_context);
    assert!(first_context[0].contains("atomic"));
}

#[tokio::test(flavor = "multi_thread")]
async fn retrieve_context_respects_k() {
    let server = start_embedding_server().await;
    let (config, _temp_dir) = test_setup(&server.uri());

    let retriever = GuidelineRetriever::initialize(&config)
        .await
        .expect("should initialize");

    let all = retriever
        .retrieve_context("expected result", 10)
        .await
        .expect("should retrieve");
    let top_two = retriever
        .retrieve_context("expected result", 2)
        .await
        .expect("should retrieve");
    let none = retriever
        .retrieve_context("expected result", 0)
        .await
        .expect("should retrieve");

    assert!(all.len() >= top_two.len());
    assert_eq!(top_two.len(), 2);
    assert!(none.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_guideline_file_is_fatal() {
    let server = start_embedding_server().await;
    let (mut config, _temp_dir) = test_setup(&server.uri());
    config.rag.guideline_path = config.base_dir.join("missing.md");

    let result = GuidelineRetriever::initialize(&config).await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_embedding_credential_is_fatal() {
    let server = start_embedding_server().await;
    let (mut config, _temp_dir) = test_setup(&server.uri());
    config.llm.openai_api_key = String::new();

    let result = GuidelineRetriever::initialize(&config).await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn review_degrades_to_heuristic_without_backend() {
    let server = start_embedding_server().await;
    let (mut config, _temp_dir) = test_setup(&server.uri());
    // Embedding key stays set; the generation provider has no credential
    config.llm.provider = "google".to_string();

    let retriever = GuidelineRetriever::initialize(&config)
        .await
        .expect("should initialize");
    let client = GenerationClient::new(&config).expect("should create client");
    assert!(!client.has_backend());

    let report = review_test_cases(
        &retriever,
        &client,
        &[sparse_case()],
        "- user can log in\n- user can log out",
        "As a user I want to log in",
        config.rag.retrieval_k,
    )
    .await;

    assert!(report.used_fallback);
    assert!(report.review.contains("TC1:"));
    assert_eq!(report.coverage, 50);
    assert_eq!(report.tree.matches("🍃").count(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn review_degrades_to_heuristic_on_backend_outage() {
    let server = start_embedding_server().await;
    let (mut config, _temp_dir) = test_setup(&server.uri());
    // Generation points at a dead endpoint; embeddings still work
    config.llm.openai_api_base = "http://127.0.0.1:1".to_string();
    config.llm.timeout_seconds = 2;

    let retriever = GuidelineRetriever::initialize(&config)
        .await
        .expect("should initialize");
    let client = GenerationClient::new(&config).expect("should create client");
    assert!(client.has_backend());

    let report = review_test_cases(
        &retriever,
        &client,
        &[sparse_case()],
        "- user can log in",
        "",
        config.rag.retrieval_k,
    )
    .await;

    assert!(report.used_fallback);
    assert!(report.review.contains("Expected result is missing"));
}

#[tokio::test(flavor = "multi_thread")]
async fn review_uses_generated_text_when_backend_answers() {
    let server = start_embedding_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "- TC1: add an expected result."}}
            ]
        })))
        .mount(&server)
        .await;

    let (mut config, _temp_dir) = test_setup(&server.uri());
    config.llm.openai_api_base = server.uri();

    let retriever = GuidelineRetriever::initialize(&config)
        .await
        .expect("should initialize");
    let client = GenerationClient::new(&config).expect("should create client");

    let report = review_test_cases(
        &retriever,
        &client,
        &[sparse_case()],
        "- user can log in",
        "",
        config.rag.retrieval_k,
    )
    .await;

    assert!(!report.used_fallback);
    assert_eq!(report.review, "- TC1: add an expected result.");
    assert_eq!(report.coverage, 100);
}
