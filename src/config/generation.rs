// src/config/generation.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_GENERATION_CONFIG_PATH: &str = "config/generation.json";
pub const ENV_GENERATION_CONFIG_PATH: &str = "GENERATION_CONFIG_PATH";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_story_count() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// How hard to check the model's story fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Out-of-vocabulary values and count mismatches pass through (logged only).
    #[default]
    Lenient,
    /// Unknown vocabulary values or a wrong story count reject the response.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// "gemini" | "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Base URL override (tests, proxies). Provider default when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_story_count")]
    pub story_count: usize,
    #[serde(default)]
    pub validation: ValidationMode,
    /// Custom prompt with `{date}` and `{count}` placeholders.
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            endpoint: None,
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            story_count: default_story_count(),
            validation: ValidationMode::default(),
            prompt_template: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading generation config from {}", path.display()))?;
        let cfg: GenerationConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing generation config {}", path.display()))?;
        cfg.finalize()
    }

    /// Load using env var + fallbacks:
    /// 1) $GENERATION_CONFIG_PATH
    /// 2) config/generation.json
    /// 3) built-in defaults (key still resolved from env)
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_GENERATION_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        let p = Path::new(DEFAULT_GENERATION_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(p);
        }
        GenerationConfig::default().finalize()
    }

    /// Normalize provider, resolve the API key and sanitize sampling parameters.
    pub fn finalize(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "gemini" => env::var("GEMINI_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GEMINI_KEY env var"))?,
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                "mock" => String::new(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            self.top_p = default_top_p();
        }
        if self.max_output_tokens == 0 {
            self.max_output_tokens = default_max_output_tokens();
        }
        self.story_count = self.story_count.max(1);

        Ok(self)
    }
}
