//! Planning capability: topic + depth in, research plan out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::sources::{sources_for_depth, Depth, SourceKind};

/// A research plan produced by the plan stage.
///
/// Ephemeral: the engine consumes it during the run and retains a copy in
/// the task's results bag only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// The research topic, verbatim.
    pub topic: String,
    /// Requested depth.
    pub depth: Depth,
    /// Sub-questions to investigate, in order.
    pub sub_questions: Vec<String>,
    /// Sources to fan out to during the execute stage, in dispatch order.
    pub sources: Vec<SourceKind>,
}

impl Plan {
    /// Creates a plan for the given topic with the depth-selected sources
    /// and no sub-questions.
    pub fn new(topic: impl Into<String>, depth: Depth) -> Self {
        Self {
            topic: topic.into(),
            depth,
            sub_questions: Vec::new(),
            sources: sources_for_depth(depth),
        }
    }

    /// Sets the sub-questions.
    pub fn with_sub_questions(mut self, sub_questions: Vec<String>) -> Self {
        self.sub_questions = sub_questions;
        self
    }

    /// Overrides the selected sources.
    pub fn with_sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.sources = sources;
        self
    }
}

/// Capability that turns a topic and depth into a [`Plan`].
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, topic: &str, depth: Depth) -> Result<Plan, StageError>;
}

/// Template-based planner used until an AI-backed planner lands.
///
/// Expands the topic into four fixed sub-questions and selects sources
/// purely from the requested depth.
#[derive(Debug, Default)]
pub struct HeuristicPlanner;

impl HeuristicPlanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Planner for HeuristicPlanner {
    async fn plan(&self, topic: &str, depth: Depth) -> Result<Plan, StageError> {
        let sub_questions = vec![
            format!("What is {topic}?"),
            format!("Key components of {topic}"),
            format!("Recent developments in {topic}"),
            format!("Compare {topic} with alternatives"),
        ];

        Ok(Plan::new(topic, depth).with_sub_questions(sub_questions))
    }
}
