//! Test doubles for the generation and feedback ports.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::{
    Artifact, AssessmentOutcome, FeedbackRequest, FeedbackShape, FeedbackValue, GenerationParams,
    HumanFeedback, WorkflowInput,
};
use crate::errors::{FeedbackError, GenerationError};
use crate::ports::{GenerationPort, HumanFeedbackPort, InMemoryFeedbackPort};
use crate::utils::{InstanceId, RequestId};

/// One recorded call into a generation double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCall {
    /// Port operation, e.g. `create_artifact`.
    pub operation: &'static str,
    /// Content of the input the call was made for.
    pub input: String,
    /// Feedback text passed to `revise_artifact`.
    pub feedback: Option<String>,
}

/// A generation port returning queued outputs.
///
/// Drafts and revisions pop from one queue; when it runs dry the port
/// writes a numbered placeholder. Assessments pop from their own queue and
/// fall back to parsing the feedback text.
#[derive(Debug)]
pub struct ScriptedGenerationPort {
    drafts: Mutex<VecDeque<String>>,
    assessments: Mutex<VecDeque<AssessmentOutcome>>,
    review: String,
    calls: Mutex<Vec<GenerationCall>>,
}

impl Default for ScriptedGenerationPort {
    fn default() -> Self {
        Self {
            drafts: Mutex::new(VecDeque::new()),
            assessments: Mutex::new(VecDeque::new()),
            review: "A fine story.".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedGenerationPort {
    /// Creates a port with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues draft and revision texts in order.
    #[must_use]
    pub fn with_drafts<I, S>(self, drafts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drafts.lock().extend(drafts.into_iter().map(Into::into));
        self
    }

    /// Queues assessment outcomes in order.
    #[must_use]
    pub fn with_assessments(self, outcomes: impl IntoIterator<Item = AssessmentOutcome>) -> Self {
        self.assessments.lock().extend(outcomes);
        self
    }

    /// Sets the review text.
    #[must_use]
    pub fn with_review(mut self, review: impl Into<String>) -> Self {
        self.review = review.into();
        self
    }

    /// Returns every recorded call.
    #[must_use]
    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls to `operation`.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.operation == operation).count()
    }

    /// Returns the number of calls to any operation.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, operation: &'static str, input: &WorkflowInput, feedback: Option<&str>) {
        self.calls.lock().push(GenerationCall {
            operation,
            input: input.content.clone(),
            feedback: feedback.map(ToString::to_string),
        });
    }

    fn next_text(&self) -> String {
        let produced = self.call_count("create_artifact") + self.call_count("revise_artifact");
        self.drafts
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("Draft number {produced}."))
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerationPort {
    async fn create_artifact(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        self.record("create_artifact", input, None);
        Ok(Artifact::new(self.next_text(), params.clone()))
    }

    async fn revise_artifact(
        &self,
        input: &WorkflowInput,
        previous: &Artifact,
        feedback: &str,
        _params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        self.record("revise_artifact", input, Some(feedback));
        Ok(Artifact::revision_of(previous, self.next_text()))
    }

    async fn review_artifact(
        &self,
        _artifact: &Artifact,
        input: &WorkflowInput,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.record("review_artifact", input, None);
        Ok(self.review.clone())
    }

    async fn assess_feedback(
        &self,
        _artifact: &Artifact,
        feedback: &HumanFeedback,
        input: &WorkflowInput,
    ) -> Result<AssessmentOutcome, GenerationError> {
        self.record("assess_feedback", input, None);
        let scripted = self.assessments.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| AssessmentOutcome::from_model_output(&feedback.comments())))
    }

    async fn brainstorm(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<GenerationParams, GenerationError> {
        self.record("brainstorm", input, None);
        let topic = input.content.split_whitespace().take(4).collect::<Vec<_>>().join(" ");
        Ok(params.clone().with_topic(topic).with_style("playful"))
    }
}

/// A generation port that fails its first `failures` calls.
///
/// After the failures it delegates to a [`ScriptedGenerationPort`].
#[derive(Debug)]
pub struct FailingGenerationPort {
    error: GenerationError,
    failures: usize,
    attempts: AtomicUsize,
    inner: ScriptedGenerationPort,
}

impl FailingGenerationPort {
    /// Fails every call with `error`.
    #[must_use]
    pub fn always(error: GenerationError) -> Self {
        Self::times(usize::MAX, error)
    }

    /// Fails the first `failures` calls with `error`.
    #[must_use]
    pub fn times(failures: usize, error: GenerationError) -> Self {
        Self {
            error,
            failures,
            attempts: AtomicUsize::new(0),
            inner: ScriptedGenerationPort::new(),
        }
    }

    /// Returns the number of calls made, failed or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns the delegate answering after the failures.
    #[must_use]
    pub const fn inner(&self) -> &ScriptedGenerationPort {
        &self.inner
    }

    fn attempt(&self) -> Result<(), GenerationError> {
        let made = self.attempts.fetch_add(1, Ordering::SeqCst);
        if made < self.failures {
            Err(self.error.clone())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GenerationPort for FailingGenerationPort {
    async fn create_artifact(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        self.attempt()?;
        self.inner.create_artifact(input, params).await
    }

    async fn revise_artifact(
        &self,
        input: &WorkflowInput,
        previous: &Artifact,
        feedback: &str,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        self.attempt()?;
        self.inner.revise_artifact(input, previous, feedback, params).await
    }

    async fn review_artifact(
        &self,
        artifact: &Artifact,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.attempt()?;
        self.inner.review_artifact(artifact, input, params).await
    }
}

/// A generation port that sleeps before answering every call.
#[derive(Debug)]
pub struct SlowGenerationPort {
    delay: Duration,
    inner: ScriptedGenerationPort,
}

impl SlowGenerationPort {
    /// Creates a port delaying each call by `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: ScriptedGenerationPort::new(),
        }
    }

    /// Creates a port delaying each call by `ms` milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns the delegate.
    #[must_use]
    pub const fn inner(&self) -> &ScriptedGenerationPort {
        &self.inner
    }
}

#[async_trait]
impl GenerationPort for SlowGenerationPort {
    async fn create_artifact(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_artifact(input, params).await
    }

    async fn revise_artifact(
        &self,
        input: &WorkflowInput,
        previous: &Artifact,
        feedback: &str,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.revise_artifact(input, previous, feedback, params).await
    }

    async fn review_artifact(
        &self,
        artifact: &Artifact,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.review_artifact(artifact, input, params).await
    }
}

/// A feedback port that answers requests from a script.
///
/// Each emitted request is answered with the next queued value, so the
/// runner continues without suspending. Once the queue is empty requests
/// stay pending like the in-memory port.
#[derive(Debug, Default)]
pub struct ScriptedFeedbackPort {
    inner: InMemoryFeedbackPort,
    answers: Mutex<VecDeque<FeedbackValue>>,
    requests: Mutex<Vec<FeedbackRequest>>,
}

impl ScriptedFeedbackPort {
    /// Creates a port answering with `answers` in order.
    #[must_use]
    pub fn new<I, V>(answers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FeedbackValue>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Returns every request emitted so far.
    #[must_use]
    pub fn requests(&self) -> Vec<FeedbackRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of answers not yet used.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }
}

#[async_trait]
impl HumanFeedbackPort for ScriptedFeedbackPort {
    async fn request_feedback(
        &self,
        instance_id: InstanceId,
        prompt: &str,
        expected_shape: FeedbackShape,
    ) -> Result<FeedbackRequest, FeedbackError> {
        let request = self.inner.request_feedback(instance_id, prompt, expected_shape).await?;
        self.requests.lock().push(request.clone());
        Ok(request)
    }

    async fn resume(
        &self,
        request: &FeedbackRequest,
        value: FeedbackValue,
    ) -> Result<HumanFeedback, FeedbackError> {
        self.inner.resume(request, value).await
    }

    async fn poll_response(&self, request_id: RequestId) -> Option<FeedbackValue> {
        self.inner.get(request_id)?;
        self.answers.lock().pop_front()
    }

    async fn cancel(&self, request_id: RequestId) -> bool {
        self.inner.cancel(request_id).await
    }
}
