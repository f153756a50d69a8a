//! Drives workflow instances through the transition engine.

use dashmap::DashMap;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn, Instrument};

use super::instance::{InstanceStatus, WorkflowInstance};
use super::retry::{with_retry_notify, RetryExhausted};
use crate::cancellation::CancellationToken;
use crate::config::RunnerConfig;
use crate::core::{
    AssessmentOutcome, FeedbackRequest, FeedbackValue, Properties, WorkflowInput, WorkflowResult,
};
use crate::engine::{
    AwaitingFeedbackContext, Event, FailureReason, Stage, StageKind, Transition, TransitionEngine,
};
use crate::errors::{FeedbackError, GenerationError, WorkflowError};
use crate::events::{
    EventSink, NoOpEventSink, WorkflowEvent, GENERATION_RETRY, WORKFLOW_CANCELLED,
    WORKFLOW_COMPLETED, WORKFLOW_FAILED, WORKFLOW_RESUMED, WORKFLOW_STAGE_ENTERED,
    WORKFLOW_STARTED, WORKFLOW_SUSPENDED,
};
use crate::observability::workflow_span;
use crate::ports::{GenerationPort, HumanFeedbackPort};
use crate::store::WorkflowStore;
use crate::utils::{now_utc, InstanceId, RequestId, Timestamp};

/// What a `start` or `resume` call left the instance in.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Waiting for the answer to `request`.
    Suspended {
        /// The suspended instance.
        instance_id: InstanceId,
        /// The pending request.
        request: FeedbackRequest,
    },
    /// Finished with a result.
    Completed(Box<WorkflowResult>),
}

impl RunOutcome {
    /// Returns the instance id.
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        match self {
            Self::Suspended { instance_id, .. } => *instance_id,
            Self::Completed(result) => result.instance_id,
        }
    }

    /// Returns the pending request, if suspended.
    #[must_use]
    pub const fn request(&self) -> Option<&FeedbackRequest> {
        match self {
            Self::Suspended { request, .. } => Some(request),
            Self::Completed(_) => None,
        }
    }

    /// Returns the result, if completed.
    #[must_use]
    pub fn result(&self) -> Option<&WorkflowResult> {
        match self {
            Self::Suspended { .. } => None,
            Self::Completed(result) => Some(result),
        }
    }
}

/// What the current stage asks the runner to do next.
enum Next {
    Apply(Event),
    Suspend(FeedbackRequest),
}

/// Why driving stopped before the engine produced a transition.
enum Halt {
    Exhausted(RetryExhausted<GenerationError>),
    Interrupted,
    Rejected(RequestId, FeedbackError),
    RequestFailed(FeedbackError),
}

/// The effect of a committed transition.
enum Committed {
    Advanced,
    Completed(Box<WorkflowResult>),
    Failed(FailureReason),
}

type LockTable = DashMap<InstanceId, Arc<Mutex<()>>>;

/// Exclusive access to one instance.
///
/// Dropping the guard releases the lock and removes the table entry when
/// no other caller holds or waits on it.
struct InstanceGuard<'a> {
    locks: &'a LockTable,
    instance_id: InstanceId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InstanceGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.instance_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Runs workflow instances against injected ports and a store.
///
/// Transitions of one instance are serialized by a per-instance lock and
/// checkpointed to the store before the next event is accepted. Separate
/// instances share only the ports.
pub struct WorkflowRunner {
    generation: Arc<dyn GenerationPort>,
    feedback: Arc<dyn HumanFeedbackPort>,
    store: Arc<dyn WorkflowStore>,
    engine: TransitionEngine,
    config: RunnerConfig,
    event_sink: Arc<dyn EventSink>,
    locks: LockTable,
    tokens: DashMap<InstanceId, Arc<CancellationToken>>,
}

impl WorkflowRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        generation: Arc<dyn GenerationPort>,
        feedback: Arc<dyn HumanFeedbackPort>,
        store: Arc<dyn WorkflowStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            generation,
            feedback,
            store,
            engine: TransitionEngine::new(config.limits.clone()),
            config,
            event_sink: Arc::new(NoOpEventSink),
            locks: DashMap::new(),
            tokens: DashMap::new(),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the transition engine.
    #[must_use]
    pub const fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Starts a new instance and drives it to its first suspension.
    pub async fn start(
        &self,
        input: impl Into<WorkflowInput>,
        properties: Properties,
    ) -> Result<RunOutcome, WorkflowError> {
        let instance_id = InstanceId::new();
        let input = input.into();
        self.start_instance(instance_id, input, properties)
            .instrument(workflow_span("start", instance_id))
            .await
    }

    async fn start_instance(
        &self,
        instance_id: InstanceId,
        input: WorkflowInput,
        properties: Properties,
    ) -> Result<RunOutcome, WorkflowError> {
        let event = Event::StartRequested {
            instance_id,
            input,
            properties,
        };
        let stage = self.engine.start(event.clone())?;
        let mut instance = WorkflowInstance::new(stage, event);

        // Cancellable from the first checkpoint on.
        let token = self.register(instance_id);
        let _guard = self.lock_instance(instance_id).await;
        if let Err(err) = self.persist(&mut instance).await {
            self.tokens.remove(&instance_id);
            return Err(err);
        }

        info!(stage = %instance.stage.kind(), "Workflow started");
        self.emit(
            WORKFLOW_STARTED,
            instance_id,
            json!({
                "input": instance.stage.workflow().input.content,
                "stage": instance.stage.kind(),
            }),
        );

        let outcome = self.drive_until_blocked(&mut instance, &token).await;
        self.tokens.remove(&instance_id);
        outcome
    }

    /// Resumes the instance suspended on `request_id` with `value`.
    ///
    /// A malformed value leaves the instance suspended. A request past its
    /// deadline abandons the instance. A request that is not pending,
    /// including one already answered, is rejected without side effects.
    pub async fn resume(
        &self,
        request_id: RequestId,
        value: impl Into<FeedbackValue>,
    ) -> Result<RunOutcome, WorkflowError> {
        let value = value.into();
        let Some(instance_id) = self.store.find_by_request(request_id).await? else {
            warn!(%request_id, "Resume for unknown request");
            return Err(WorkflowError::UnknownRequest { request_id });
        };

        self.resume_instance(instance_id, request_id, value)
            .instrument(workflow_span("resume", instance_id))
            .await
    }

    async fn resume_instance(
        &self,
        instance_id: InstanceId,
        request_id: RequestId,
        value: FeedbackValue,
    ) -> Result<RunOutcome, WorkflowError> {
        let _guard = self.lock_instance(instance_id).await;
        let mut instance = self.load(instance_id).await?;

        // Re-check under the lock: a concurrent resume may have won.
        let request = match instance.stage.pending_request() {
            Some(request)
                if request.id == request_id && instance.pending_request() == Some(request_id) =>
            {
                request.clone()
            }
            _ => {
                warn!(%request_id, status = %instance.status, "Request is no longer pending");
                return Err(WorkflowError::UnknownRequest { request_id });
            }
        };

        if request.is_expired_at(now_utc()) {
            return Err(self.abandon(&mut instance, request_id).await);
        }

        let feedback = match self.feedback.resume(&request, value).await {
            Ok(feedback) => feedback,
            Err(err) => return Err(self.reject(&mut instance, request_id, err).await),
        };

        info!(%request_id, "Workflow resumed");
        self.emit(WORKFLOW_RESUMED, instance_id, json!({ "request_id": request_id }));

        let token = self.register(instance_id);
        let outcome = match self.commit(&mut instance, Event::feedback_received(feedback)).await {
            Ok(Committed::Advanced) => self.drive_until_blocked(&mut instance, &token).await,
            Ok(Committed::Completed(result)) => Ok(RunOutcome::Completed(result)),
            Ok(Committed::Failed(reason)) => Err(self.failure_error(instance_id, &reason)),
            Err(err) => Err(err),
        };
        self.tokens.remove(&instance_id);
        outcome
    }

    /// Cancels an instance.
    ///
    /// An instance being driven is interrupted at its next await point; a
    /// suspended one has its pending request released at the feedback
    /// port. The generation port is not called.
    pub async fn cancel(&self, instance_id: InstanceId, reason: impl Into<String>) -> Result<(), WorkflowError> {
        let reason = reason.into();
        let running = self.tokens.get(&instance_id).map(|t| Arc::clone(t.value()));
        if let Some(token) = running {
            token.cancel(reason.clone());
        }

        self.cancel_instance(instance_id, reason)
            .instrument(workflow_span("cancel", instance_id))
            .await
    }

    async fn cancel_instance(&self, instance_id: InstanceId, reason: String) -> Result<(), WorkflowError> {
        let _guard = self.lock_instance(instance_id).await;
        let mut instance = self.load(instance_id).await?;

        match instance.status {
            InstanceStatus::Cancelled => return Ok(()),
            status if status.is_terminal() => {
                return Err(WorkflowError::InstanceClosed {
                    instance_id,
                    status: status.to_string(),
                });
            }
            _ => {}
        }

        if let Some(request_id) = instance.pending_request() {
            let released = self.feedback.cancel(request_id).await;
            debug!(%request_id, released, "Released pending feedback request");
        }

        self.commit(&mut instance, Event::Cancelled { reason }).await?;
        Ok(())
    }

    /// Returns the finalized result of a completed instance.
    pub async fn result(&self, instance_id: InstanceId) -> Result<WorkflowResult, WorkflowError> {
        let instance = self.load(instance_id).await?;
        match (instance.status, instance.result) {
            (InstanceStatus::Completed, Some(result)) => Ok(result),
            (status, _) => Err(WorkflowError::NotFinished {
                instance_id,
                status: status.to_string(),
            }),
        }
    }

    /// Returns the persisted instance.
    pub async fn instance(&self, instance_id: InstanceId) -> Result<WorkflowInstance, WorkflowError> {
        self.load(instance_id).await
    }

    /// Abandons every suspended instance whose request deadline has passed.
    ///
    /// Returns the abandoned instance ids.
    pub async fn expire_overdue(&self) -> Result<Vec<InstanceId>, WorkflowError> {
        let now = now_utc();
        let mut expired = Vec::new();

        for candidate in self.store.list().await? {
            if !Self::is_overdue(&candidate, now) {
                continue;
            }

            let _guard = self.lock_instance(candidate.id).await;
            let mut instance = self.load(candidate.id).await?;
            if !Self::is_overdue(&instance, now) {
                continue;
            }
            if let Some(request_id) = instance.pending_request() {
                match self.abandon(&mut instance, request_id).await {
                    WorkflowError::FeedbackTimeout { instance_id, .. } => expired.push(instance_id),
                    other => return Err(other),
                }
            }
        }

        Ok(expired)
    }

    /// Removes a finished instance from the store and returns it.
    pub async fn archive(&self, instance_id: InstanceId) -> Result<WorkflowInstance, WorkflowError> {
        let _guard = self.lock_instance(instance_id).await;
        let instance = self.load(instance_id).await?;
        if !instance.is_terminal() {
            return Err(WorkflowError::NotFinished {
                instance_id,
                status: instance.status.to_string(),
            });
        }

        self.store.remove(instance_id).await?;
        info!(%instance_id, status = %instance.status, "Workflow archived");
        Ok(instance)
    }

    fn is_overdue(instance: &WorkflowInstance, now: Timestamp) -> bool {
        instance.pending_request().is_some()
            && instance
                .stage
                .pending_request()
                .is_some_and(|request| request.is_expired_at(now))
    }

    fn register(&self, instance_id: InstanceId) -> Arc<CancellationToken> {
        let token = Arc::new(CancellationToken::new());
        self.tokens.insert(instance_id, Arc::clone(&token));
        token
    }

    async fn drive_until_blocked(
        &self,
        instance: &mut WorkflowInstance,
        token: &CancellationToken,
    ) -> Result<RunOutcome, WorkflowError> {
        loop {
            if token.is_cancelled() {
                return Err(self.halt(instance, Halt::Interrupted, token).await);
            }

            let stage = instance.stage.clone();
            let event = match self.next_step(&stage, token).await {
                Ok(Next::Apply(event)) => event,
                Ok(Next::Suspend(request)) => {
                    return Ok(RunOutcome::Suspended {
                        instance_id: instance.id,
                        request,
                    });
                }
                Err(halt) => return Err(self.halt(instance, halt, token).await),
            };

            match self.commit(instance, event).await? {
                Committed::Advanced => {}
                Committed::Completed(result) => return Ok(RunOutcome::Completed(result)),
                Committed::Failed(reason) => return Err(self.failure_error(instance.id, &reason)),
            }
        }
    }

    async fn next_step(&self, stage: &Stage, token: &CancellationToken) -> Result<Next, Halt> {
        let instance_id = stage.instance_id();
        match stage {
            Stage::Drafting(ctx) => {
                let workflow = &ctx.workflow;
                let artifact = self
                    .generate("create_artifact", instance_id, token, || {
                        self.generation
                            .create_artifact(&workflow.input, &workflow.properties.draft)
                    })
                    .await?;
                Ok(Next::Apply(Event::artifact_produced(artifact)))
            }

            Stage::AwaitingFeedback(ctx) => match &ctx.pending_request {
                None => self.request_feedback(ctx).await,
                Some(request) => match self.feedback.poll_response(request.id).await {
                    None => Ok(Next::Suspend(request.clone())),
                    Some(value) => {
                        let feedback = self
                            .feedback
                            .resume(request, value)
                            .await
                            .map_err(|err| Halt::Rejected(request.id, err))?;
                        info!(request_id = %request.id, "Feedback answered without suspending");
                        self.emit(WORKFLOW_RESUMED, instance_id, json!({ "request_id": request.id }));
                        Ok(Next::Apply(Event::feedback_received(feedback)))
                    }
                },
            },

            Stage::Assessing(ctx) => {
                let outcome = if let FeedbackValue::Decision { accept, .. } = &ctx.feedback.value {
                    AssessmentOutcome::from(*accept)
                } else {
                    self.generate("assess_feedback", instance_id, token, || {
                        self.generation
                            .assess_feedback(&ctx.artifact, &ctx.feedback, &ctx.workflow.input)
                    })
                    .await?
                };
                if let AssessmentOutcome::Unparsable { raw } = &outcome {
                    warn!(
                        raw = %raw,
                        policy = ?self.engine.limits().ambiguous_assessment,
                        "Assessment could not be parsed"
                    );
                }
                Ok(Next::Apply(Event::assessment_made(outcome)))
            }

            Stage::Revising(ctx) => {
                let comments = ctx.feedback.comments();
                let mut revised = self
                    .generate("revise_artifact", instance_id, token, || {
                        self.generation.revise_artifact(
                            &ctx.workflow.input,
                            &ctx.artifact,
                            &comments,
                            &ctx.workflow.properties.draft,
                        )
                    })
                    .await?;
                if revised.revision <= ctx.artifact.revision {
                    revised.revision = ctx.artifact.revision + 1;
                }
                Ok(Next::Apply(Event::artifact_produced(revised)))
            }

            Stage::Done(ctx) => {
                let review = self
                    .generate("review_artifact", instance_id, token, || {
                        self.generation.review_artifact(
                            &ctx.artifact,
                            &ctx.workflow.input,
                            &ctx.workflow.properties.review,
                        )
                    })
                    .await?;
                Ok(Next::Apply(Event::ReviewProduced {
                    review,
                    completed_at: now_utc(),
                }))
            }
        }
    }

    async fn request_feedback(&self, ctx: &AwaitingFeedbackContext) -> Result<Next, Halt> {
        let prompt = format!("Please provide feedback on the story\n{}\n", ctx.artifact.content);
        let mut request = self
            .feedback
            .request_feedback(
                ctx.workflow.instance_id,
                &prompt,
                ctx.workflow.properties.feedback_shape.clone(),
            )
            .await
            .map_err(Halt::RequestFailed)?;

        if request.deadline.is_none() {
            if let Some(timeout) = self.config.feedback_timeout() {
                request = request.with_timeout(timeout);
            }
        }
        Ok(Next::Apply(Event::FeedbackRequested { request }))
    }

    /// Calls the generation port under the timeout and retry policy.
    ///
    /// Cancellation of `token` interrupts the call, including a backoff
    /// sleep.
    async fn generate<T, F, Fut>(
        &self,
        operation: &'static str,
        instance_id: InstanceId,
        token: &CancellationToken,
        mut call: F,
    ) -> Result<T, Halt>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let timeout = self.config.generation_timeout();
        let timeout_ms = self.config.generation_timeout_ms;

        let attempt = || {
            let pending = call();
            async move {
                match tokio::time::timeout(timeout, pending).await {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::timeout(timeout_ms)),
                }
            }
        };

        let on_retry = |attempt: usize, err: &GenerationError, delay: std::time::Duration| {
            warn!(operation, attempt, error = %err, "Generation failed, retrying");
            self.emit(
                GENERATION_RETRY,
                instance_id,
                json!({
                    "operation": operation,
                    "attempt": attempt,
                    "error": err,
                    "delay_ms": u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                }),
            );
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Err(Halt::Interrupted),
            result = with_retry_notify(&self.config.retry, operation, attempt, on_retry) => {
                result.map_err(Halt::Exhausted)
            }
        }
    }

    /// Records why driving stopped and returns the caller-facing error.
    async fn halt(&self, instance: &mut WorkflowInstance, halt: Halt, token: &CancellationToken) -> WorkflowError {
        let instance_id = instance.id;
        match halt {
            Halt::Exhausted(exhausted) => {
                error!(
                    stage = %instance.stage.kind(),
                    attempts = exhausted.attempts,
                    error = %exhausted.last,
                    "Generation failed after retries"
                );
                let event = Event::GenerationFailed {
                    error: exhausted.last.clone(),
                };
                if let Err(err) = self.commit(instance, event).await {
                    return err;
                }
                WorkflowError::GenerationExhausted {
                    instance_id,
                    attempts: exhausted.attempts,
                    last: exhausted.last,
                }
            }
            Halt::Interrupted => {
                let reason = token.reason().unwrap_or_else(|| "cancelled".to_string());
                if let Some(request) = instance.stage.pending_request() {
                    let released = self.feedback.cancel(request.id).await;
                    debug!(request_id = %request.id, released, "Released pending feedback request");
                }
                if let Err(err) = self.commit(instance, Event::Cancelled { reason: reason.clone() }).await {
                    return err;
                }
                WorkflowError::Cancelled { instance_id, reason }
            }
            Halt::Rejected(request_id, err) => self.reject(instance, request_id, err).await,
            Halt::RequestFailed(err) => {
                error!(error = %err, "Feedback request could not be emitted");
                instance.status = InstanceStatus::Failed;
                instance.last_error = Some(err.to_string());
                if let Err(store_err) = self.persist(instance).await {
                    return store_err;
                }
                self.emit(WORKFLOW_FAILED, instance_id, json!({ "error": err.to_string() }));
                WorkflowError::Feedback(err)
            }
        }
    }

    /// Maps a feedback port rejection onto the instance.
    async fn reject(&self, instance: &mut WorkflowInstance, request_id: RequestId, err: FeedbackError) -> WorkflowError {
        match err {
            FeedbackError::Malformed { reason } => {
                warn!(%request_id, reason = %reason, "Rejected malformed feedback");
                WorkflowError::FeedbackMalformed { request_id, reason }
            }
            FeedbackError::Timeout { request_id } => self.abandon(instance, request_id).await,
            FeedbackError::UnknownRequest { request_id } => WorkflowError::UnknownRequest { request_id },
        }
    }

    /// Marks a suspended instance abandoned after its request expired.
    async fn abandon(&self, instance: &mut WorkflowInstance, request_id: RequestId) -> WorkflowError {
        let instance_id = instance.id;
        warn!(%instance_id, %request_id, "Feedback request expired, abandoning instance");

        instance.status = InstanceStatus::Abandoned;
        instance.last_error = Some(format!("feedback request {request_id} timed out"));
        if let Err(err) = self.persist(instance).await {
            return err;
        }
        self.feedback.cancel(request_id).await;
        self.emit(
            WORKFLOW_FAILED,
            instance_id,
            json!({ "reason": "feedback_timeout", "request_id": request_id }),
        );

        WorkflowError::FeedbackTimeout {
            instance_id,
            request_id,
        }
    }

    /// Applies `event`, updates the instance and checkpoints it.
    async fn commit(&self, instance: &mut WorkflowInstance, event: Event) -> Result<Committed, WorkflowError> {
        let event_name = event.name();
        let previous = instance.stage.kind();

        let committed = match self.engine.apply(&instance.stage, event.clone())? {
            Transition::Advance(next) => {
                instance.history.record(event, next.kind());
                instance.status = next.pending_request().map_or(InstanceStatus::Running, |request| {
                    InstanceStatus::Suspended {
                        request_id: request.id,
                    }
                });
                instance.stage = next;
                Committed::Advanced
            }
            Transition::Complete(result) => {
                instance.history.record(event, previous);
                instance.status = InstanceStatus::Completed;
                instance.result = Some(result.as_ref().clone());
                Committed::Completed(result)
            }
            Transition::Fail(reason) => {
                instance.history.record(event, previous);
                instance.status = match reason {
                    FailureReason::Cancelled { .. } => InstanceStatus::Cancelled,
                    _ => InstanceStatus::Failed,
                };
                instance.last_error = Some(self.failure_error(instance.id, &reason).to_string());
                instance.failure = Some(reason.clone());
                Committed::Failed(reason)
            }
        };

        self.persist(instance).await?;
        debug!(
            event = event_name,
            from = %previous,
            to = %instance.stage.kind(),
            status = %instance.status,
            version = instance.version,
            "Transition committed"
        );
        self.announce(instance, previous, &committed);
        Ok(committed)
    }

    fn announce(&self, instance: &WorkflowInstance, previous: StageKind, committed: &Committed) {
        let instance_id = instance.id;
        match committed {
            Committed::Advanced => {
                let current = instance.stage.kind();
                if current != previous {
                    self.emit(
                        WORKFLOW_STAGE_ENTERED,
                        instance_id,
                        json!({ "from": previous, "to": current, "cycle": instance.stage.cycle() }),
                    );
                }
                if let Some(request) = instance.stage.pending_request() {
                    if instance.pending_request() == Some(request.id) && current == previous {
                        info!(request_id = %request.id, "Workflow suspended awaiting feedback");
                        self.emit(
                            WORKFLOW_SUSPENDED,
                            instance_id,
                            json!({ "request_id": request.id, "deadline": request.deadline }),
                        );
                    }
                }
            }
            Committed::Completed(result) => {
                info!(cycles = result.cycles, "Workflow completed");
                self.emit(
                    WORKFLOW_COMPLETED,
                    instance_id,
                    json!({ "cycles": result.cycles, "revision": result.artifact.revision }),
                );
            }
            Committed::Failed(FailureReason::Cancelled { reason }) => {
                info!(reason = %reason, "Workflow cancelled");
                self.emit(WORKFLOW_CANCELLED, instance_id, json!({ "reason": reason }));
            }
            Committed::Failed(reason) => {
                warn!(reason = ?reason, stage = %instance.stage.kind(), "Workflow failed");
                self.emit(WORKFLOW_FAILED, instance_id, json!({ "failure": reason }));
            }
        }
    }

    fn failure_error(&self, instance_id: InstanceId, reason: &FailureReason) -> WorkflowError {
        match reason {
            FailureReason::Generation { error } => WorkflowError::GenerationExhausted {
                instance_id,
                attempts: self.config.retry.max_attempts,
                last: error.clone(),
            },
            FailureReason::RevisionLimitExceeded { cycles } => WorkflowError::RevisionLimitExceeded {
                instance_id,
                cycles: *cycles,
            },
            FailureReason::AmbiguousAssessment { raw } => WorkflowError::AmbiguousAssessment {
                instance_id,
                raw: raw.clone(),
            },
            FailureReason::Cancelled { reason } => WorkflowError::Cancelled {
                instance_id,
                reason: reason.clone(),
            },
        }
    }

    async fn persist(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        instance.updated_at = now_utc();
        instance.version = self.store.save(instance).await?;
        Ok(())
    }

    async fn load(&self, instance_id: InstanceId) -> Result<WorkflowInstance, WorkflowError> {
        self.store
            .load(instance_id)
            .await?
            .ok_or(WorkflowError::UnknownInstance { instance_id })
    }

    async fn lock_instance(&self, instance_id: InstanceId) -> InstanceGuard<'_> {
        let lock = Arc::clone(self.locks.entry(instance_id).or_default().value());
        InstanceGuard {
            locks: &self.locks,
            instance_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of instances with a live lock entry.
    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    fn emit(&self, event_type: &str, instance_id: InstanceId, data: serde_json::Value) {
        self.event_sink
            .try_emit(WorkflowEvent::new(event_type, instance_id, data));
    }
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("config", &self.config)
            .field("active_instances", &self.tokens.len())
            .finish_non_exhaustive()
    }
}
