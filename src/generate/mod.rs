// src/generate/mod.rs
//! Fresh digest generation: prompt -> provider -> two-stage parse -> schema check -> merge.

pub mod extract;
pub mod prompt;
pub mod provider;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::{DigestConfig, GenerationConfig, ValidationMode};
use crate::digest::{stamp, Digest};
use crate::error::GenerateError;

pub use extract::{extract_braced, parse_payload, parse_strict};
pub use prompt::render_prompt;
pub use provider::{
    build_generator, DynGenerator, GeminiProvider, GenerationRequest, MockProvider,
    OpenAiProvider, TextGenerator,
};

/// What the prompt is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    /// YYYY-MM-DD
    pub date: String,
}

impl PromptContext {
    pub fn new(date: impl Into<String>) -> Self {
        Self { date: date.into() }
    }

    /// Context for the UTC calendar day of `now`.
    pub fn for_day(now: DateTime<Utc>) -> Self {
        Self::new(now.date_naive().format("%Y-%m-%d").to_string())
    }
}

/// Provenance fields stamped into every fresh digest unless the model supplied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub version: String,
    pub source: String,
}

impl Provenance {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        Self {
            version: cfg.version.clone(),
            source: cfg.source.clone(),
        }
    }
}

/// Strict `YYYY-MM-DD` that is also a real calendar day.
pub fn is_valid_date(s: &str) -> bool {
    static RE_DATE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_DATE.get_or_init(|| {
        regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date regex")
    });
    re.is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Ask the provider for `cfg.story_count` stories about `ctx.date` and turn the answer
/// into a [`Digest`] stamped at `now`.
///
/// A digest with zero stories is returned as-is; deciding that it is not publishable
/// is up to the caller.
pub async fn generate(
    generator: &dyn TextGenerator,
    cfg: &GenerationConfig,
    provenance: &Provenance,
    ctx: &PromptContext,
    now: DateTime<Utc>,
) -> Result<Digest, GenerateError> {
    if !is_valid_date(&ctx.date) {
        return Err(GenerateError::InvalidDate(ctx.date.clone()));
    }

    let prompt = render_prompt(cfg.prompt_template.as_deref(), &ctx.date, cfg.story_count);
    let req = GenerationRequest::from_config(prompt, cfg);
    let text = generator.complete(&req).await?;

    let payload = parse_payload(&text)?;
    let parsed = validate_structure(payload)?;
    let digest = merge(parsed, provenance, ctx, now)?;
    check_stories(&digest, cfg)?;

    info!(
        target: "producer",
        provider = generator.name(),
        date = %digest.date,
        stories = digest.stories.len(),
        "digest generated"
    );
    Ok(digest)
}

/// The payload must be an object exposing a `stories` array.
pub fn validate_structure(payload: Value) -> Result<Map<String, Value>, GenerateError> {
    let obj = match payload {
        Value::Object(obj) => obj,
        other => {
            return Err(GenerateError::InvalidSchema(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };
    match obj.get("stories") {
        Some(Value::Array(_)) => Ok(obj),
        Some(other) => Err(GenerateError::InvalidSchema(format!(
            "`stories` must be an array, got {}",
            json_kind(other)
        ))),
        None => Err(GenerateError::InvalidSchema(
            "missing `stories` field".to_string(),
        )),
    }
}

/// Producer stamps first, parsed keys on top. `fallback` is never taken from the model,
/// and a `null` key counts as absent.
pub fn merge(
    parsed: Map<String, Value>,
    provenance: &Provenance,
    ctx: &PromptContext,
    now: DateTime<Utc>,
) -> Result<Digest, GenerateError> {
    let mut out = Map::new();
    out.insert("date".into(), Value::String(ctx.date.clone()));
    out.insert("updatedAt".into(), Value::String(stamp(now)));
    out.insert("version".into(), Value::String(provenance.version.clone()));
    out.insert("source".into(), Value::String(provenance.source.clone()));
    for (k, v) in parsed {
        if k == "fallback" || v.is_null() {
            continue;
        }
        out.insert(k, v);
    }
    serde_json::from_value(Value::Object(out))
        .map_err(|e| GenerateError::InvalidSchema(e.to_string()))
}

fn check_stories(digest: &Digest, cfg: &GenerationConfig) -> Result<(), GenerateError> {
    let count = digest.stories.len();
    let issues = digest.vocabulary_issues();

    match cfg.validation {
        ValidationMode::Strict => {
            if count != cfg.story_count {
                return Err(GenerateError::InvalidSchema(format!(
                    "expected {} stories, got {count}",
                    cfg.story_count
                )));
            }
            if !issues.is_empty() {
                return Err(GenerateError::InvalidSchema(issues.join("; ")));
            }
        }
        ValidationMode::Lenient => {
            if count != cfg.story_count {
                warn!(target: "producer", expected = cfg.story_count, got = count, "story count mismatch");
            }
            if !issues.is_empty() {
                warn!(target: "producer", issues = ?issues, "stories outside vocabulary kept as-is");
            }
        }
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
