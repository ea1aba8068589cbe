//! Synthesis capability: topic + verified bundle in, report out.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StageError;

use super::VerifiedBundle;

/// The final research artifact: an opaque markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(String);

impl Report {
    /// Wraps rendered report text.
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// The report text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the report, returning the text.
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capability that renders a [`Report`] from verified material.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, topic: &str, verified: &VerifiedBundle)
        -> Result<Report, StageError>;
}

/// Markdown renderer used until an AI-backed synthesizer lands.
///
/// Lists each source's outcome and leaves the summary as a placeholder.
/// Sources are rendered in name order so the output is deterministic.
#[derive(Debug, Default)]
pub struct MarkdownSynthesizer;

impl MarkdownSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Synthesizer for MarkdownSynthesizer {
    async fn synthesize(
        &self,
        topic: &str,
        verified: &VerifiedBundle,
    ) -> Result<Report, StageError> {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");

        let mut report = format!("# Research Report: {topic}\n\n");
        report.push_str(&format!("*Generated: {timestamp} UTC*\n\n"));
        report.push_str(&format!(
            "*Confidence: {:.2}*\n\n## Sources\n\n",
            verified.confidence
        ));

        let mut sources: Vec<_> = verified.outcomes.iter().collect();
        sources.sort_by_key(|(kind, _)| kind.as_str());

        for (kind, result) in sources {
            report.push_str(&format!("### {kind}\n"));
            match result.data() {
                Some(data) => {
                    report.push_str("- status: success\n");
                    report.push_str(&format!("- items: {}\n", data.item_count()));
                    if let Some(note) = &data.note {
                        report.push_str(&format!("- note: {note}\n"));
                    }
                }
                None => {
                    let error = result.error().unwrap_or("unknown error");
                    report.push_str(&format!("- status: failed\n- error: {error}\n"));
                }
            }
            report.push('\n');
        }

        report.push_str("## Summary\n\n");
        report.push_str("Synthesis backend not wired up yet; source material is listed above.\n");

        Ok(Report::new(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceData, SourceKind, SourceOutcomes, SourceResult};

    fn sample_bundle() -> VerifiedBundle {
        let mut outcomes = SourceOutcomes::new();
        outcomes.insert(
            SourceKind::WebSearch,
            SourceResult::Success {
                data: SourceData::empty(SourceKind::WebSearch, "q").with_note("stubbed"),
            },
        );
        outcomes.insert(
            SourceKind::Github,
            SourceResult::Failed {
                error: "rate limited".to_string(),
            },
        );
        VerifiedBundle::new(outcomes, 0.8)
    }

    #[tokio::test]
    async fn test_markdown_synthesizer_renders_sections() {
        let synthesizer = MarkdownSynthesizer::new();
        let report = synthesizer
            .synthesize("rust orchestrators", &sample_bundle())
            .await
            .expect("synthesis should succeed");

        let text = report.as_str();
        assert!(text.starts_with("# Research Report: rust orchestrators"));
        assert!(text.contains("### web_search"));
        assert!(text.contains("- status: success"));
        assert!(text.contains("### github"));
        assert!(text.contains("- error: rate limited"));
        assert!(text.contains("## Summary"));
    }

    #[tokio::test]
    async fn test_markdown_synthesizer_orders_sources_by_name() {
        let synthesizer = MarkdownSynthesizer::new();
        let report = synthesizer
            .synthesize("x", &sample_bundle())
            .await
            .expect("synthesis should succeed");

        let text = report.as_str();
        let github_at = text.find("### github").expect("github section");
        let web_at = text.find("### web_search").expect("web_search section");
        assert!(github_at < web_at);
    }

    #[test]
    fn test_report_accessors() {
        let report = Report::new("body");
        assert_eq!(report.as_str(), "body");
        assert!(!report.is_empty());
        assert_eq!(report.into_inner(), "body");
    }
}
