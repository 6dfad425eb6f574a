//! Result items carried through the continuation cache.
//!
//! Upstream producers (search clients, extraction passes, database queries)
//! hand the cache a finished, ordered list of items. The cache never looks
//! inside an item except to validate it once, at the `start` boundary, via
//! [`PageItem::validate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Why an item was rejected at the `start` boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemError {
    /// Item content is empty or whitespace-only.
    #[error("item content is empty")]
    EmptyContent,

    /// Score is NaN or infinite.
    #[error("score {0} is not a finite number")]
    NonFiniteScore(f32),

    /// Metadata URL could not be parsed or is not http(s).
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A tag is empty or whitespace-only.
    #[error("tag at position {0} is empty")]
    EmptyTag(usize),
}

/// Anything that can be stored in a session's result set.
///
/// The default implementation accepts every value, which is what opaque
/// payloads want. Typed records override [`validate`](PageItem::validate).
pub trait PageItem: Clone + Send + Sync + 'static {
    /// Check the item before it is admitted into a result set.
    fn validate(&self) -> Result<(), ItemError> {
        Ok(())
    }
}

macro_rules! opaque_page_item {
    ($($ty:ty),* $(,)?) => {
        $(impl PageItem for $ty {})*
    };
}

opaque_page_item!(
    i32,
    i64,
    u32,
    u64,
    usize,
    String,
    serde_json::Value,
);

// ─────────────────────────────────────────────────────────────────────────────
// Result Item
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of result kinds a producer may emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// A hit from a web or index search.
    SearchHit,
    /// A whole or partial document.
    Document,
    /// A row from a structured query.
    Record,
    /// Output of an LLM extraction pass.
    Extraction,
    /// Free text with no further structure.
    #[default]
    Text,
}

impl ResultKind {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchHit => "search_hit",
            Self::Document => "document",
            Self::Record => "record",
            Self::Extraction => "extraction",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed metadata attached to a result item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

/// A single result produced by an upstream computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

impl ResultItem {
    /// Create an item of the given kind.
    pub fn new(kind: ResultKind, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            title: None,
            content: content.into(),
            source: None,
            score: None,
            metadata: ItemMetadata::default(),
        }
    }

    /// Create a plain text item.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ResultKind::Text, content)
    }

    /// Create a search hit pointing at `url`.
    pub fn search_hit(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let mut item = Self::new(ResultKind::SearchHit, snippet);
        item.title = Some(title.into());
        item.metadata.url = Some(url.into());
        item
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }
}

impl PageItem for ResultItem {
    fn validate(&self) -> Result<(), ItemError> {
        if self.content.trim().is_empty() {
            return Err(ItemError::EmptyContent);
        }

        if let Some(score) = self.score
            && !score.is_finite()
        {
            return Err(ItemError::NonFiniteScore(score));
        }

        if let Some(ref raw) = self.metadata.url {
            let parsed = url::Url::parse(raw).map_err(|e| ItemError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ItemError::InvalidUrl {
                    url: raw.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        if let Some(pos) = self.metadata.tags.iter().position(|t| t.trim().is_empty()) {
            return Err(ItemError::EmptyTag(pos));
        }

        Ok(())
    }
}
