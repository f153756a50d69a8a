//! Capability interfaces the runner depends on.

mod feedback;
mod generation;

pub use feedback::{accept_value, HumanFeedbackPort, InMemoryFeedbackPort, ANSWERED_HISTORY};
pub use generation::GenerationPort;
