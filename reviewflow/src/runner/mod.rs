//! Workflow execution: instances, retry and the runner.
//!
//! The [`WorkflowRunner`] is the single-writer driver of every instance. It
//! calls the generation port while a stage requires it, feeds the results
//! into the transition engine, checkpoints each transition to the store and
//! returns control to the caller when the instance suspends for feedback.

pub(crate) mod instance;
mod retry;
mod workflow_runner;

mod integration_tests;

pub use instance::{InstanceStatus, WorkflowInstance};
pub use retry::{
    with_retry, with_retry_notify, BackoffStrategy, JitterStrategy, RetryConfig, RetryExhausted,
};
pub use workflow_runner::{RunOutcome, WorkflowRunner};
