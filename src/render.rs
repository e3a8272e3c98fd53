// src/render.rs
//! HTML rendering for the popup.
//!
//! Every piece of digest text is untrusted model output and goes through
//! `html_escape` before it touches the markup. Vocabulary fields only ever reach
//! class names through the closed enums, so unknown values cannot inject classes.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::digest::{parse_timestamp, scalar_text, Digest, Story};

/// "Monday, October 19, 2026". Unparseable dates come back unchanged.
pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(d) => d.format("%A, %B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// "Just now", "5m ago", "3h ago", "2d ago". Computed against `now` on every render.
pub fn format_relative(updated_at: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_timestamp(updated_at) else {
        return "unknown".to_string();
    };
    let diff = now.signed_duration_since(ts);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{days}d ago")
    }
}

/// Header plus one card per story.
pub fn render_digest(digest: &Digest, now: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(512 + digest.stories.len() * 512);

    let _ = write!(
        out,
        "<header class=\"digest-header\">\n  <div class=\"date-display\">{}</div>\n  <div class=\"update-time\">Updated: {}</div>\n</header>\n",
        encode_text(&format_date(&digest.date)),
        encode_text(&format_relative(&digest.updated_at, now)),
    );

    out.push_str("<div class=\"news-container\">\n");
    if digest.stories.is_empty() {
        out.push_str("  <p class=\"empty\">No stories today.</p>\n");
    }
    for (index, story) in digest.stories.iter().enumerate() {
        render_story(&mut out, index, story);
    }
    out.push_str("</div>\n");
    out
}

fn render_story(out: &mut String, index: usize, story: &Story) {
    let category_class = story
        .category_kind()
        .map(|c| c.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    let urgency_class = story.urgency_kind().map(|u| u.as_str()).unwrap_or("none");

    // Known values render canonically, other scalars as escaped text, the rest as empty.
    let category_text = story
        .category_kind()
        .map(|c| c.as_str().to_string())
        .or_else(|| story.category.as_ref().and_then(scalar_text))
        .unwrap_or_default();
    let region_text = story
        .region_kind()
        .map(|r| r.as_str().to_string())
        .or_else(|| story.region.as_ref().and_then(scalar_text))
        .unwrap_or_default();
    let urgency_title = story
        .urgency
        .as_ref()
        .and_then(scalar_text)
        .unwrap_or_default();

    let _ = write!(
        out,
        concat!(
            "  <div class=\"news-card\" data-index=\"{index}\">\n",
            "    <div class=\"news-header\">\n",
            "      <span class=\"category-badge category-{category_class}\">{category}</span>\n",
            "      <span class=\"region-tag\">{region}</span>\n",
            "      <span class=\"urgency-indicator urgency-{urgency_class}\" title=\"{urgency_title}\"></span>\n",
            "    </div>\n",
            "    <h3 class=\"news-headline\">{headline}</h3>\n",
            "    <p class=\"news-summary\">{summary}</p>\n",
            "  </div>\n",
        ),
        index = index,
        category_class = category_class,
        category = encode_text(&category_text),
        region = encode_text(&region_text),
        urgency_class = urgency_class,
        urgency_title = encode_double_quoted_attribute(&urgency_title),
        headline = encode_text(&story.headline),
        summary = encode_text(&story.summary),
    );
}

/// The one error view: a message and a retry control.
pub fn render_error() -> String {
    concat!(
        "<div class=\"error\">\n",
        "  <p>Unable to load news. Please check your connection and try again.</p>\n",
        "  <button id=\"retryBtn\" class=\"retry-btn\">Retry</button>\n",
        "</div>\n",
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn date_is_human_formatted() {
        assert_eq!(format_date("2026-10-19"), "Monday, October 19, 2026");
        assert_eq!(format_date("2026-03-05"), "Thursday, March 5, 2026");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn relative_time_buckets() {
        assert_eq!(format_relative("2026-10-19T11:59:30.000Z", now()), "Just now");
        assert_eq!(format_relative("2026-10-19T11:55:00Z", now()), "5m ago");
        assert_eq!(format_relative("2026-10-19T09:00:00Z", now()), "3h ago");
        assert_eq!(format_relative("2026-10-17T09:00:00Z", now()), "2d ago");
        assert_eq!(format_relative("2026-10-19T13:00:00Z", now()), "Just now");
        assert_eq!(format_relative("not a time", now()), "unknown");
    }

    #[test]
    fn missing_vocabulary_degrades_to_neutral_classes() {
        let d = Digest {
            date: "2026-10-19".into(),
            updated_at: "2026-10-19T09:00:00Z".into(),
            stories: vec![Story {
                headline: "Plain".into(),
                summary: "Text".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let html = render_digest(&d, now());
        assert!(html.contains("category-badge category-unknown\"></span>"));
        assert!(html.contains("urgency-indicator urgency-none"));
        assert!(html.contains("<span class=\"region-tag\"></span>"));
        assert!(html.contains("Updated: 3h ago"));
        assert!(html.contains("Monday, October 19, 2026"));
    }

    #[test]
    fn unknown_category_is_text_not_class() {
        let d = Digest {
            stories: vec![Story {
                category: Some("x\" onclick=\"alert(1)".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let html = render_digest(&d, now());
        // The raw value stays inside the badge's text node; the class is neutral.
        assert!(html.contains(
            "<span class=\"category-badge category-unknown\">x\" onclick=\"alert(1)</span>"
        ));
    }

    #[test]
    fn non_string_vocabulary_renders_as_text_or_empty() {
        let d = Digest {
            stories: vec![Story {
                category: Some(serde_json::json!(7)),
                region: Some(serde_json::json!({"name": "<Asia>"})),
                urgency: Some(serde_json::json!(true)),
                ..Default::default()
            }],
            ..Default::default()
        };
        let html = render_digest(&d, now());
        assert!(html.contains("category-badge category-unknown\">7</span>"));
        assert!(html.contains("<span class=\"region-tag\"></span>"));
        assert!(html.contains("urgency-indicator urgency-none\" title=\"true\""));
        assert!(!html.contains("<Asia>"));
    }

    #[test]
    fn empty_story_list_renders_empty_state() {
        let html = render_digest(&Digest::default(), now());
        assert!(html.contains("No stories today."));
        assert!(!html.contains("news-card"));
    }
}
