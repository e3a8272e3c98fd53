//! Text-generation providers: one trait, a Gemini and an OpenAI implementation,
//! and a deterministic mock for local runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::GenerateError;

const USER_AGENT: &str = concat!("daily-news-digest/", env!("CARGO_PKG_VERSION"));
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const OPENAI_ENDPOINT: &str = "https://api.openai.com";

/// One completion request. Sampling parameters are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn from_config(prompt: String, cfg: &GenerationConfig) -> Self {
        Self {
            prompt,
            temperature: cfg.temperature,
            top_k: cfg.top_k,
            top_p: cfg.top_p,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

/// Prompt in, text out. Implementations do a single attempt; retries are the
/// scheduler's business.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, req: &GenerationRequest) -> Result<String, GenerateError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerator = Arc<dyn TextGenerator>;

/// Factory: build a generator according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock` or the provider is "mock", returns [`MockProvider`].
/// * Else builds the configured HTTP provider.
pub fn build_generator(cfg: &GenerationConfig) -> anyhow::Result<DynGenerator> {
    let forced_mock = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if forced_mock || cfg.provider == "mock" {
        return Ok(Arc::new(MockProvider::canned()));
    }

    let timeout = Duration::from_secs(cfg.timeout_secs);
    match cfg.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(
            &cfg.api_key,
            &cfg.model,
            cfg.endpoint.as_deref(),
            timeout,
        )?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            &cfg.api_key,
            &cfg.model,
            cfg.endpoint.as_deref(),
            timeout,
        )?)),
        other => anyhow::bail!("Unsupported provider: {other}"),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, GenerateError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()?)
}

/// Non-success status -> `Upstream` with the raw body attached.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GenerateError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GenerateError::Upstream {
        status: status.as_u16(),
        body,
    })
}

fn non_empty(text: String) -> Result<String, GenerateError> {
    if text.trim().is_empty() {
        Err(GenerateError::EmptyResponse)
    } else {
        Ok(text)
    }
}

// ------------------------------------------------------------
// Gemini (generateContent)
// ------------------------------------------------------------

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: &str,
        model: &str,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let base = endpoint.unwrap_or(GEMINI_ENDPOINT).trim_end_matches('/');
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            url: format!("{base}/v1beta/models/{model}:generateContent"),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiReq<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenConfig,
}
#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}
#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}
#[derive(Deserialize, Default)]
struct GeminiResp {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}
#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiRespContent>,
}
#[derive(Deserialize)]
struct GeminiRespContent {
    #[serde(default)]
    parts: Vec<GeminiRespPart>,
}
#[derive(Deserialize)]
struct GeminiRespPart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn complete(&self, req: &GenerationRequest) -> Result<String, GenerateError> {
        let body = GeminiReq {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: &req.prompt }],
            }],
            generation_config: GeminiGenConfig {
                temperature: req.temperature,
                top_k: req.top_k,
                top_p: req.top_p,
                max_output_tokens: req.max_output_tokens,
            },
        };
        debug!(target: "producer", url = %self.url, prompt_len = req.prompt.len(), "gemini request");

        let resp = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        // An envelope we cannot read carries no usable text either.
        let parsed: GeminiResp = resp.json().await.unwrap_or_default();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        non_empty(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions)
// ------------------------------------------------------------

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        model: &str,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let base = endpoint.unwrap_or(OPENAI_ENDPOINT).trim_end_matches('/');
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            url: format!("{base}/v1/chat/completions"),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn complete(&self, req: &GenerationRequest) -> Result<String, GenerateError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            top_p: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize, Default)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &req.prompt,
            }],
            temperature: req.temperature,
            top_p: req.top_p,
            max_tokens: req.max_output_tokens,
        };
        debug!(target: "producer", url = %self.url, model = %self.model, "openai request");

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let parsed: Resp = resp.json().await.unwrap_or_default();
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        non_empty(text)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

const CANNED_RESPONSE: &str = r#"```json
{"stories":[
{"headline":"Global leaders meet on climate finance","summary":"Negotiators agreed on a draft framework for funding adaptation in vulnerable countries.","category":"World","region":"Global","urgency":"high"},
{"headline":"Chipmakers report record quarterly demand","summary":"Strong orders for AI accelerators lifted revenue forecasts across the sector.","category":"Technology","region":"Asia","urgency":"medium"},
{"headline":"Central bank holds rates steady","summary":"Policymakers kept borrowing costs unchanged and signalled patience on future cuts.","category":"Business","region":"US","urgency":"high"},
{"headline":"New vaccine trial shows promising results","summary":"Early data suggests strong protection with few side effects in adult volunteers.","category":"Health","region":"Europe","urgency":"medium"},
{"headline":"Ceasefire talks resume","summary":"Mediators returned to the table after a week of renewed clashes along the border.","category":"Politics","region":"Middle East","urgency":"breaking"}
]}
```"#;

/// Returns a fixed text; used for local runs and tests.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }

    /// Five well-formed stories wrapped in a code fence, as models like to answer.
    pub fn canned() -> Self {
        Self::new(CANNED_RESPONSE)
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn complete(&self, _req: &GenerationRequest) -> Result<String, GenerateError> {
        non_empty(self.fixed.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
