//! Stage collaborator capabilities.
//!
//! The pipeline engine drives three sequential collaborators around the
//! execute fan-out: a planner that turns a topic into a [`Plan`], a
//! verifier that wraps the collected source outcomes into a
//! [`VerifiedBundle`], and a synthesizer that renders the final
//! [`Report`]. Each is a narrow async trait so the placeholder
//! implementations shipped here can be swapped for real ones without
//! touching the engine.

mod planner;
mod synthesizer;
mod verifier;

pub use planner::{HeuristicPlanner, Plan, Planner};
pub use synthesizer::{MarkdownSynthesizer, Report, Synthesizer};
pub use verifier::{PassThroughVerifier, VerifiedBundle, Verifier};
