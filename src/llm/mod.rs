
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{Result, ReviewerError};

/// Explicit result of a generation attempt, so callers never have to infer
/// "no backend" from an empty-string sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The backend produced text (possibly blank, e.g. Ollama's missing
    /// `response` field)
    Generated(String),
    /// No backend is configured with usable credentials; no network call was
    /// made
    NoBackend,
}

/// Backend protocol selected once at construction, so call sites stay
/// backend-agnostic.
#[derive(Debug, Clone)]
enum Backend {
    OpenAi { api_base: Url, api_key: String },
    Google { api_base: Url, api_key: String },
    Ollama { host: Url },
    Disabled,
}

/// Client for the configured generation backend.
///
/// One synchronous attempt per call, no retries, uniform timeout. Every
/// failure mode (network, non-2xx, malformed response) is returned as an
/// error; the reviewer catches all of them and falls back to the heuristic
/// review, so a generation outage is never user-visible.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    backend: Backend,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentPart<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

impl GenerationClient {
    /// Select the backend from configuration. Priority: OpenAI with a key,
    /// Google with a key, Ollama (no credential needed); otherwise disabled.
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let llm = &config.llm;

        let backend = if llm.provider == "openai" && !llm.openai_api_key.trim().is_empty() {
            Backend::OpenAi {
                api_base: parse_base(&llm.openai_api_base)?,
                api_key: llm.openai_api_key.trim().to_string(),
            }
        } else if llm.provider == "google" && !llm.google_api_key.trim().is_empty() {
            Backend::Google {
                api_base: parse_base(&llm.google_api_base)?,
                api_key: llm.google_api_key.trim().to_string(),
            }
        } else if llm.provider == "ollama" {
            Backend::Ollama {
                host: parse_base(&llm.ollama_host)?,
            }
        } else {
            Backend::Disabled
        };

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(llm.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            backend,
            model: llm.model.clone(),
            agent,
        })
    }

    /// Whether a usable backend was selected at construction
    #[inline]
    pub fn has_backend(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    /// Send `prompt` to the configured backend and return the generated text.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<GenerationOutcome> {
        match &self.backend {
            Backend::OpenAi { api_base, api_key } => {
                debug!("Generating via OpenAI chat completions");
                self.generate_openai(api_base, api_key, prompt)
                    .map(GenerationOutcome::Generated)
            }
            Backend::Google { api_base, api_key } => {
                debug!("Generating via Google generateContent");
                self.generate_google(api_base, api_key, prompt)
                    .map(GenerationOutcome::Generated)
            }
            Backend::Ollama { host } => {
                debug!("Generating via local Ollama backend");
                self.generate_ollama(host, prompt)
                    .map(GenerationOutcome::Generated)
            }
            Backend::Disabled => {
                debug!("No generation backend configured");
                Ok(GenerationOutcome::NoBackend)
            }
        }
    }

    fn generate_openai(&self, api_base: &Url, api_key: &str, prompt: &str) -> Result<String> {
        let url = api_base
            .join("/v1/chat/completions")
            .map_err(|e| ReviewerError::Config(format!("Failed to build chat URL: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
        };

        let response: ChatResponse = self.post_json(
            &url,
            &request,
            Some(&format!("Bearer {}", api_key)),
        )?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ReviewerError::Network("Chat completion response had no choices".to_string())
            })
    }

    fn generate_google(&self, api_base: &Url, api_key: &str, prompt: &str) -> Result<String> {
        let mut url = api_base
            .join(&format!("/v1beta/models/{}:generateContent", self.model))
            .map_err(|e| {
                ReviewerError::Config(format!("Failed to build generateContent URL: {}", e))
            })?;
        url.query_pairs_mut().append_pair("key", api_key);

        let request = GenerateContentRequest {
            contents: vec![ContentPart {
                parts: vec![TextPart { text: prompt }],
            }],
        };

        let response: GenerateContentResponse = self.post_json(&url, &request, None)?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| {
                ReviewerError::Network("generateContent response had no candidates".to_string())
            })
    }

    fn generate_ollama(&self, host: &Url, prompt: &str) -> Result<String> {
        let url = host
            .join("/api/generate")
            .map_err(|e| ReviewerError::Config(format!("Failed to build generate URL: {}", e)))?;

        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response: OllamaGenerateResponse = self.post_json(&url, &request, None)?;
        Ok(response.response)
    }

    fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        url: &Url,
        request: &Req,
        authorization: Option<&str>,
    ) -> Result<Resp> {
        let request_json = serde_json::to_string(request).map_err(|e| {
            ReviewerError::Network(format!("Failed to serialize generation request: {}", e))
        })?;

        let mut builder = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(authorization) = authorization {
            builder = builder.header("Authorization", authorization);
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| ReviewerError::Network(format!("Generation request failed: {}", e)))?;

        serde_json::from_str(&response_text).map_err(|e| {
            ReviewerError::Network(format!("Failed to parse generation response: {}", e))
        })
    }
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|_| ReviewerError::Config(format!("Invalid backend URL: {}", url)))
}
