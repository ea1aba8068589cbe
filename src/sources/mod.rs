//! Research sources and depth-based source selection.
//!
//! A source is an external data provider queried during the execute stage.
//! Which sources participate in a run is a pure function of the requested
//! research depth, kept as an explicit lookup so it can be tested in
//! isolation.

mod fetcher;

pub use fetcher::{SourceData, SourceFetcher, SourceOutcomes, SourceResult, StubSourceFetcher};

use std::fmt;

use serde::{Deserialize, Serialize};

/// External data providers the execute stage can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WebSearch,
    Github,
    Twitter,
    Arxiv,
}

impl SourceKind {
    /// Stable string identifier, used in logs, reports and config.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::WebSearch => "web_search",
            SourceKind::Github => "github",
            SourceKind::Twitter => "twitter",
            SourceKind::Arxiv => "arxiv",
        }
    }

    /// Parses a source identifier, returning `None` for unknown names.
    pub fn parse(value: &str) -> Option<SourceKind> {
        match value {
            "web_search" => Some(SourceKind::WebSearch),
            "github" => Some(SourceKind::Github),
            "twitter" => Some(SourceKind::Twitter),
            "arxiv" => Some(SourceKind::Arxiv),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How thorough a research run should be.
///
/// Depth controls which sources the planner selects; see
/// [`sources_for_depth`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Quick,
    #[default]
    Medium,
    Comprehensive,
}

impl Depth {
    /// Stable string identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Depth::Quick => "quick",
            Depth::Medium => "medium",
            Depth::Comprehensive => "comprehensive",
        }
    }

    /// Parses a depth string, mapping any unrecognized value to `Quick`.
    ///
    /// Unknown depths are accepted rather than rejected; they participate
    /// with the narrowest source selection.
    pub fn parse_lenient(value: &str) -> Depth {
        match value.trim().to_lowercase().as_str() {
            "medium" => Depth::Medium,
            "comprehensive" => Depth::Comprehensive,
            _ => Depth::Quick,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the sources that participate in a run of the given depth,
/// in dispatch order.
pub fn sources_for_depth(depth: Depth) -> Vec<SourceKind> {
    match depth {
        Depth::Quick => vec![SourceKind::WebSearch],
        Depth::Medium => vec![SourceKind::WebSearch, SourceKind::Github],
        Depth::Comprehensive => vec![
            SourceKind::WebSearch,
            SourceKind::Github,
            SourceKind::Arxiv,
        ],
    }
}
