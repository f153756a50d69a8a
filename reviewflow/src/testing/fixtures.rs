//! Test fixtures wiring a runner to in-memory collaborators.

use std::sync::Arc;

use crate::config::{JitterStrategy, RetryConfig, RunnerConfig};
use crate::events::CollectingEventSink;
use crate::ports::{GenerationPort, HumanFeedbackPort, InMemoryFeedbackPort};
use crate::runner::WorkflowRunner;
use crate::store::InMemoryWorkflowStore;

/// Configuration with millisecond backoff and no jitter.
#[must_use]
pub fn fast_config() -> RunnerConfig {
    RunnerConfig::default()
        .with_retry(
            RetryConfig::new()
                .with_base_delay_ms(1)
                .with_max_delay_ms(5)
                .with_jitter(JitterStrategy::None),
        )
        .with_generation_timeout_ms(2_000)
}

/// A runner plus handles on every collaborator it was built with.
pub struct TestHarness<G, F = InMemoryFeedbackPort> {
    /// Generation double.
    pub generation: Arc<G>,
    /// Feedback port.
    pub feedback: Arc<F>,
    /// Instance store.
    pub store: Arc<InMemoryWorkflowStore>,
    /// Collected lifecycle events.
    pub events: Arc<CollectingEventSink>,
    /// The runner under test.
    pub runner: WorkflowRunner,
}

impl<G: GenerationPort + 'static> TestHarness<G> {
    /// Builds a harness with an [`InMemoryFeedbackPort`] and [`fast_config`].
    #[must_use]
    pub fn new(generation: G) -> Self {
        Self::with_parts(generation, InMemoryFeedbackPort::new(), fast_config())
    }

    /// Builds a harness with a custom configuration.
    #[must_use]
    pub fn with_config(generation: G, config: RunnerConfig) -> Self {
        Self::with_parts(generation, InMemoryFeedbackPort::new(), config)
    }
}

impl<G, F> TestHarness<G, F>
where
    G: GenerationPort + 'static,
    F: HumanFeedbackPort + 'static,
{
    /// Builds a harness from explicit parts.
    #[must_use]
    pub fn with_parts(generation: G, feedback: F, config: RunnerConfig) -> Self {
        let generation = Arc::new(generation);
        let feedback = Arc::new(feedback);
        let store = Arc::new(InMemoryWorkflowStore::new());
        let events = Arc::new(CollectingEventSink::new());

        let runner = WorkflowRunner::new(
            Arc::clone(&generation) as Arc<dyn GenerationPort>,
            Arc::clone(&feedback) as Arc<dyn HumanFeedbackPort>,
            Arc::clone(&store) as Arc<dyn crate::store::WorkflowStore>,
            config,
        )
        .with_event_sink(Arc::clone(&events) as Arc<dyn crate::events::EventSink>);

        Self {
            generation,
            feedback,
            store,
            events,
            runner,
        }
    }
}

impl<G, F> std::fmt::Debug for TestHarness<G, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHarness")
            .field("runner", &self.runner)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}
