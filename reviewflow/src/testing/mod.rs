//! Testing utilities for reviewflow workflows.
//!
//! This module provides:
//! - Scripted, failing and slow generation ports
//! - A feedback port that answers from a script
//! - A harness wiring a runner to in-memory collaborators

mod fixtures;
mod mocks;

pub use fixtures::{fast_config, TestHarness};
pub use mocks::{
    FailingGenerationPort, GenerationCall, ScriptedFeedbackPort, ScriptedGenerationPort,
    SlowGenerationPort,
};
