// src/digest.rs
//! News digest document: the JSON contract shared by the producer, the artifact
//! server and the popup.
//!
//! Parsing is soft. Story vocabulary fields are kept as raw JSON values so that
//! out-of-vocabulary or wrongly typed values survive a round trip untouched. Text
//! fields accept `null` (read as empty) and scalars (read as their text form). The
//! typed enums below are used by strict validation and by the renderer.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    /// Calendar date the stories pertain to (YYYY-MM-DD).
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: String,
    /// RFC 3339 timestamp of the last write (fresh or fallback).
    #[serde(default, deserialize_with = "lenient::text")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient::stories")]
    pub stories: Vec<Story>,
    /// Only serialized when true. Anything but a JSON `true` reads as false.
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub fallback: bool,
    /// Any other top-level keys the provider returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Story {
    #[serde(default, deserialize_with = "lenient::text")]
    pub headline: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{scalar_text, Story};

    /// Strings as-is, `null` as empty, other scalars as their text, containers as compact JSON.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => scalar_text(&other).unwrap_or_else(|| other.to_string()),
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
    }

    pub fn stories<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Story>, D::Error> {
        Ok(Option::<Vec<Story>>::deserialize(d)?.unwrap_or_default())
    }
}

/// Display form of a loosely typed field: strings, numbers and booleans have one;
/// `null`, arrays and objects do not.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Format a timestamp the way the artifact stores it (millisecond precision, `Z` suffix).
pub fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl Digest {
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    /// Next `updatedAt` for a write at `now`: never earlier than what is already stored.
    pub fn next_timestamp(previous: Option<&Digest>, now: DateTime<Utc>) -> DateTime<Utc> {
        match previous.and_then(Digest::updated_at_utc) {
            Some(prev) if prev > now => prev,
            _ => now,
        }
    }

    /// Republish this digest as a fallback: same content, bumped timestamp, `fallback: true`.
    pub fn carried_forward(&self, now: DateTime<Utc>) -> Digest {
        let mut out = self.clone();
        out.updated_at = stamp(Digest::next_timestamp(Some(self), now));
        out.fallback = true;
        out
    }

    /// Human-readable list of story fields outside the closed vocabularies.
    pub fn vocabulary_issues(&self) -> Vec<String> {
        self.stories
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                s.vocabulary_issues()
                    .into_iter()
                    .map(move |issue| format!("stories[{i}]: {issue}"))
            })
            .collect()
    }
}

impl Story {
    /// `category` when it is a JSON string.
    pub fn category_str(&self) -> Option<&str> {
        self.category.as_ref().and_then(Value::as_str)
    }

    pub fn region_str(&self) -> Option<&str> {
        self.region.as_ref().and_then(Value::as_str)
    }

    pub fn urgency_str(&self) -> Option<&str> {
        self.urgency.as_ref().and_then(Value::as_str)
    }

    pub fn category_kind(&self) -> Option<Category> {
        self.category_str().and_then(|s| s.parse().ok())
    }

    pub fn region_kind(&self) -> Option<Region> {
        self.region_str().and_then(|s| s.parse().ok())
    }

    pub fn urgency_kind(&self) -> Option<Urgency> {
        self.urgency_str().and_then(|s| s.parse().ok())
    }

    fn vocabulary_issues(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.category_kind().is_none() {
            out.push(format!("category {} not in vocabulary", shown(&self.category)));
        }
        if self.region_kind().is_none() {
            out.push(format!("region {} not in vocabulary", shown(&self.region)));
        }
        if self.urgency_kind().is_none() {
            out.push(format!("urgency {} not in vocabulary", shown(&self.urgency)));
        }
        out
    }
}

fn shown(v: &Option<Value>) -> String {
    v.as_ref().map_or_else(|| "missing".to_string(), Value::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownValue {}

/// Closed vocabulary enum with case-insensitive parsing and a canonical spelling.
macro_rules! vocabulary {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let t = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(t))
                    .ok_or_else(|| UnknownValue(t.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary!(Category {
    Politics => "Politics",
    Technology => "Technology",
    Business => "Business",
    Science => "Science",
    Health => "Health",
    World => "World",
});

vocabulary!(Region {
    Global => "Global",
    Us => "US",
    Europe => "Europe",
    Asia => "Asia",
    Africa => "Africa",
    Americas => "Americas",
    MiddleEast => "Middle East",
});

vocabulary!(Urgency {
    Breaking => "breaking",
    High => "high",
    Medium => "medium",
});

/// Joined list used inside the prompt, e.g. `Politics|Technology|...`.
pub fn vocabulary_list<T: fmt::Display>(all: &[T]) -> String {
    all.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("|")
}
