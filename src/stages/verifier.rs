//! Verification capability: source outcomes in, verified bundle out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::sources::SourceOutcomes;

/// Source outcomes annotated with a verification pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedBundle {
    /// The per-source outcomes that were verified.
    pub outcomes: SourceOutcomes,
    /// When the verification pass ran.
    pub verified_at: DateTime<Utc>,
    /// Overall confidence in the collected material, in [0, 1].
    pub confidence: f64,
}

impl VerifiedBundle {
    /// Creates a bundle stamped with the current time.
    ///
    /// The confidence score is clamped into [0, 1].
    pub fn new(outcomes: SourceOutcomes, confidence: f64) -> Self {
        Self {
            outcomes,
            verified_at: Utc::now(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Number of sources that fetched successfully.
    pub fn successful_sources(&self) -> usize {
        self.outcomes.values().filter(|r| r.is_success()).count()
    }

    /// Number of sources that failed to fetch.
    pub fn failed_sources(&self) -> usize {
        self.outcomes.len() - self.successful_sources()
    }
}

/// Capability that cross-checks collected source outcomes.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, outcomes: &SourceOutcomes) -> Result<VerifiedBundle, StageError>;
}

/// Verifier that passes outcomes through with a fixed confidence.
///
/// Real fact-checking is an external concern; this placeholder only stamps
/// the bundle so downstream stages see the full shape.
#[derive(Debug)]
pub struct PassThroughVerifier {
    confidence: f64,
}

impl Default for PassThroughVerifier {
    fn default() -> Self {
        Self { confidence: 0.8 }
    }
}

impl PassThroughVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the confidence the verifier assigns to every bundle.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

#[async_trait]
impl Verifier for PassThroughVerifier {
    async fn verify(&self, outcomes: &SourceOutcomes) -> Result<VerifiedBundle, StageError> {
        Ok(VerifiedBundle::new(outcomes.clone(), self.confidence))
    }
}
