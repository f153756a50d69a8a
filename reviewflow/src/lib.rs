//! # Reviewflow
//!
//! A workflow engine that drafts a textual artifact, suspends for human
//! feedback, revises until the feedback accepts the artifact and finalizes
//! it with a review.
//!
//! Reviewflow provides:
//!
//! - **A pure transition engine**: five stages, one event-driven transition function
//! - **Human-in-the-loop suspension**: instances persist while waiting and resume by request id
//! - **Pluggable collaborators**: generation and feedback ports, instance stores
//! - **Bounded retries and timeouts** around every generation call
//! - **Lifecycle events and tracing** for observability
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reviewflow::prelude::*;
//!
//! let runner = WorkflowRunner::new(generation, feedback, store, RunnerConfig::from_env());
//!
//! let outcome = runner
//!     .start("a story about a lighthouse", Properties::new().with_story_word_count(50))
//!     .await?;
//!
//! // Later, when a human has answered:
//! let request = outcome.request().unwrap();
//! let outcome = runner.resume(request.id, "too short").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod observability;
pub mod ports;
pub mod runner;
pub mod store;
pub mod testing;
pub mod utils;
pub mod workflows;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{EngineLimits, RetryConfig, RunnerConfig};
    pub use crate::core::{
        Artifact, AssessmentOutcome, FeedbackRequest, FeedbackShape, FeedbackValue,
        GenerationParams, HumanFeedback, Properties, WorkflowInput, WorkflowResult,
    };
    pub use crate::engine::{Event, Stage, StageKind, Transition, TransitionEngine};
    pub use crate::errors::{
        FeedbackError, GenerationError, StoreError, TransitionError, WorkflowError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::ports::{GenerationPort, HumanFeedbackPort, InMemoryFeedbackPort};
    pub use crate::runner::{InstanceStatus, RunOutcome, WorkflowInstance, WorkflowRunner};
    #[cfg(feature = "file-store")]
    pub use crate::store::FileWorkflowStore;
    pub use crate::store::{InMemoryWorkflowStore, WorkflowStore};
    pub use crate::utils::{InstanceId, RequestId, Timestamp};
}
