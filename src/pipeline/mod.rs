//! Pipeline execution for research tasks.
//!
//! The engine drives one task at a time through the fixed stage sequence
//! (plan, execute, verify, synthesize), updating the task's registry entry
//! as it goes and guaranteeing a terminal status even when a stage or an
//! unexpected fault fails the run.
//!
//! # Pipeline Flow
//!
//! 1. **Plan**: the planner turns topic + depth into a [`crate::stages::Plan`]
//! 2. **Execute**: one fetch per planned source, dispatched concurrently;
//!    every fetch settles into a per-source outcome before the stage ends
//! 3. **Verify**: the verifier wraps the outcomes into a bundle
//! 4. **Synthesize**: the synthesizer renders the report
//! 5. The task is marked completed and the report is handed to the sink
//!
//! A plan/verify/synthesize failure ends the run with the task `failed`;
//! a source fetch failure is recorded as data and never aborts its
//! siblings.

mod engine;

pub use engine::{PipelineEngine, PipelineError};
