//! Source fetcher capability and per-source outcome types.
//!
//! The engine fans out one fetch per planned source and collects every
//! outcome, success or failure, into a [`SourceOutcomes`] map. A failed
//! fetch is data, not a pipeline error.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::stages::Plan;

use super::SourceKind;

/// Opaque payload returned by a successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    /// Which source produced this payload.
    pub source: SourceKind,
    /// The query that was issued.
    pub query: String,
    /// Result items, shape defined by the backing fetcher.
    pub items: Vec<serde_json::Value>,
    /// Optional free-form annotation from the fetcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SourceData {
    /// Creates an empty payload for the given source and query.
    pub fn empty(source: SourceKind, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
            items: Vec::new(),
            note: None,
        }
    }

    /// Attaches an annotation to the payload.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Number of result items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Outcome of a single source fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceResult {
    /// The fetch returned data.
    Success { data: SourceData },
    /// The fetch failed; the error message is retained as data.
    Failed { error: String },
}

impl SourceResult {
    /// Returns whether the fetch succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, SourceResult::Success { .. })
    }

    /// Returns the payload for a successful fetch.
    pub fn data(&self) -> Option<&SourceData> {
        match self {
            SourceResult::Success { data } => Some(data),
            SourceResult::Failed { .. } => None,
        }
    }

    /// Returns the error message for a failed fetch.
    pub fn error(&self) -> Option<&str> {
        match self {
            SourceResult::Success { .. } => None,
            SourceResult::Failed { error } => Some(error),
        }
    }
}

/// Per-source outcomes of one execute stage, keyed by source.
pub type SourceOutcomes = HashMap<SourceKind, SourceResult>;

/// Capability for fetching data from one research source.
///
/// Implementations must return a descriptive error for sources they cannot
/// serve rather than fabricating an empty success.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches data for `source` according to `plan`.
    async fn fetch(&self, source: SourceKind, plan: &Plan) -> Result<SourceData, FetchError>;
}

/// Placeholder fetcher with no real backends.
///
/// Returns empty result sets for web search, GitHub and arXiv, annotated
/// with the integration that would back them. Twitter has no stub backend
/// and fails, which keeps the unsupported-source path exercised end to end.
#[derive(Debug, Default)]
pub struct StubSourceFetcher;

impl StubSourceFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceFetcher for StubSourceFetcher {
    async fn fetch(&self, source: SourceKind, plan: &Plan) -> Result<SourceData, FetchError> {
        let note = match source {
            SourceKind::WebSearch => "web search backend not wired up yet",
            SourceKind::Github => "github search backend not wired up yet",
            SourceKind::Arxiv => "arxiv search backend not wired up yet",
            SourceKind::Twitter => {
                return Err(FetchError::UnsupportedSource(SourceKind::Twitter));
            }
        };

        Ok(SourceData::empty(source, plan.topic.clone()).with_note(note))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Depth;

    fn test_plan() -> Plan {
        Plan::new("rust async runtimes", Depth::Quick)
    }

    #[tokio::test]
    async fn test_stub_fetcher_returns_empty_data() {
        let fetcher = StubSourceFetcher::new();
        let data = fetcher
            .fetch(SourceKind::WebSearch, &test_plan())
            .await
            .expect("web_search should be stubbed");

        assert_eq!(data.source, SourceKind::WebSearch);
        assert_eq!(data.query, "rust async runtimes");
        assert_eq!(data.item_count(), 0);
        assert!(data.note.is_some());
    }

    #[tokio::test]
    async fn test_stub_fetcher_unsupported_source() {
        let fetcher = StubSourceFetcher::new();
        let err = fetcher
            .fetch(SourceKind::Twitter, &test_plan())
            .await
            .expect_err("twitter has no stub backend");

        assert!(matches!(
            err,
            FetchError::UnsupportedSource(SourceKind::Twitter)
        ));
        assert!(err.to_string().contains("twitter"));
    }

    #[test]
    fn test_source_result_accessors() {
        let ok = SourceResult::Success {
            data: SourceData::empty(SourceKind::Github, "q"),
        };
        assert!(ok.is_success());
        assert!(ok.data().is_some());
        assert!(ok.error().is_none());

        let failed = SourceResult::Failed {
            error: "rate limited".to_string(),
        };
        assert!(!failed.is_success());
        assert!(failed.data().is_none());
        assert_eq!(failed.error(), Some("rate limited"));
    }

    #[test]
    fn test_source_result_serde_shape() {
        let failed = SourceResult::Failed {
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");

        let ok = SourceResult::Success {
            data: SourceData::empty(SourceKind::Arxiv, "q"),
        };
        let json = serde_json::to_value(&ok).expect("serialize");
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["source"], "arxiv");
    }
}
