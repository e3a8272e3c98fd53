// src/generate/prompt.rs
//! Deterministic prompt for the daily digest. Same date + count -> same prompt.

use crate::digest::{vocabulary_list, Category, Region, Urgency};

/// Default template. `{date}`, `{count}`, `{categories}`, `{regions}` and
/// `{urgencies}` are substituted by [`render_prompt`].
pub const DEFAULT_TEMPLATE: &str = r#"You are a news editor. Give a concise, factual, reliable summary of the {count} MOST important global news stories for {date}.

Return EXACTLY {count} stories as raw JSON with this shape and nothing else:
{"stories":[{"headline":"...","summary":"...","category":"...","region":"...","urgency":"..."}]}

Rules:
- headline: at most 80 characters
- summary: 1-2 sentences, at most 150 characters
- category: one of {categories}
- region: one of {regions}
- urgency: one of {urgencies}
- Keep it globally relevant and neutral in tone.
- Do NOT wrap the JSON in markdown, code fences or commentary."#;

pub fn render_prompt(template: Option<&str>, date: &str, count: usize) -> String {
    template
        .unwrap_or(DEFAULT_TEMPLATE)
        .replace("{date}", date)
        .replace("{count}", &count.to_string())
        .replace("{categories}", &vocabulary_list(Category::ALL))
        .replace("{regions}", &vocabulary_list(Region::ALL))
        .replace("{urgencies}", &vocabulary_list(Urgency::ALL))
}
