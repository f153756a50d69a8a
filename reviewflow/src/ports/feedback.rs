//! The human-in-the-loop boundary.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::core::{FeedbackRequest, FeedbackShape, FeedbackValue, HumanFeedback};
use crate::errors::FeedbackError;
use crate::utils::{now_utc, InstanceId, RequestId};

/// Emits feedback requests and accepts the values that answer them.
///
/// `request_feedback` never blocks waiting for a human: it emits the
/// request and returns, and the runner suspends. The answer arrives later
/// through the runner's resume entry point, which calls
/// [`HumanFeedbackPort::resume`] with the persisted request.
#[async_trait]
pub trait HumanFeedbackPort: Send + Sync {
    /// Emits a request for feedback on behalf of `instance_id`.
    async fn request_feedback(
        &self,
        instance_id: InstanceId,
        prompt: &str,
        expected_shape: FeedbackShape,
    ) -> Result<FeedbackRequest, FeedbackError>;

    /// Turns `value` into the feedback answering `request`.
    ///
    /// The default checks the deadline and the expected shape.
    async fn resume(
        &self,
        request: &FeedbackRequest,
        value: FeedbackValue,
    ) -> Result<HumanFeedback, FeedbackError> {
        accept_value(request, value)
    }

    /// Returns an answer that is already available for `request_id`.
    ///
    /// Ports backed by a synchronous channel (a scripted test double, an
    /// interactive console) answer here and the runner continues without
    /// suspending. The default has nothing ready.
    async fn poll_response(&self, request_id: RequestId) -> Option<FeedbackValue> {
        let _ = request_id;
        None
    }

    /// Releases a pending request. Returns true if it was pending.
    async fn cancel(&self, request_id: RequestId) -> bool;
}

/// Validates `value` against `request` and wraps it as [`HumanFeedback`].
pub fn accept_value(request: &FeedbackRequest, value: FeedbackValue) -> Result<HumanFeedback, FeedbackError> {
    if request.is_expired_at(now_utc()) {
        return Err(FeedbackError::Timeout {
            request_id: request.id,
        });
    }
    request.expected_shape.validate(&value)?;
    Ok(HumanFeedback::new(request.id, value))
}

/// A pending request held by [`InMemoryFeedbackPort`].
#[derive(Debug, Clone)]
struct PendingRequest {
    request: FeedbackRequest,
    ready: Option<FeedbackValue>,
}

/// How many answered request ids [`InMemoryFeedbackPort`] remembers.
pub const ANSWERED_HISTORY: usize = 1024;

/// Recently answered request ids, oldest evicted first.
#[derive(Debug, Default)]
struct AnsweredLog {
    ids: HashSet<RequestId>,
    order: VecDeque<RequestId>,
}

impl AnsweredLog {
    fn contains(&self, request_id: &RequestId) -> bool {
        self.ids.contains(request_id)
    }

    fn insert(&mut self, request_id: RequestId) {
        if !self.ids.insert(request_id) {
            return;
        }
        self.order.push_back(request_id);
        while self.order.len() > ANSWERED_HISTORY {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Reference feedback port keeping pending requests in memory.
///
/// Requests optionally carry a deadline derived from the configured
/// timeout. Answers can be staged with [`InMemoryFeedbackPort::respond`]
/// and are then picked up by the runner through `poll_response`. A
/// second answer to a recently answered request is rejected; the last
/// [`ANSWERED_HISTORY`] answers are remembered.
#[derive(Default)]
pub struct InMemoryFeedbackPort {
    timeout: Option<Duration>,
    requests: RwLock<HashMap<RequestId, PendingRequest>>,
    answered: RwLock<AnsweredLog>,
}

impl InMemoryFeedbackPort {
    /// Creates a port without a response deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline applied to every new request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stages an answer for a pending request.
    ///
    /// Returns false if the request is not pending.
    pub fn respond(&self, request_id: RequestId, value: impl Into<FeedbackValue>) -> bool {
        match self.requests.write().get_mut(&request_id) {
            Some(pending) => {
                pending.ready = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Returns the pending request with this id.
    #[must_use]
    pub fn get(&self, request_id: RequestId) -> Option<FeedbackRequest> {
        self.requests.read().get(&request_id).map(|p| p.request.clone())
    }

    /// Returns the number of pending requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Lists pending requests, oldest first.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<FeedbackRequest> {
        let mut pending: Vec<_> = self.requests.read().values().map(|p| p.request.clone()).collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }

    /// Lists pending requests whose deadline has passed.
    #[must_use]
    pub fn expired_requests(&self) -> Vec<RequestId> {
        let now = now_utc();
        self.requests
            .read()
            .values()
            .filter(|p| p.request.is_expired_at(now))
            .map(|p| p.request.id)
            .collect()
    }
}

#[async_trait]
impl HumanFeedbackPort for InMemoryFeedbackPort {
    async fn request_feedback(
        &self,
        instance_id: InstanceId,
        prompt: &str,
        expected_shape: FeedbackShape,
    ) -> Result<FeedbackRequest, FeedbackError> {
        let mut request = FeedbackRequest::new(instance_id, prompt, expected_shape);
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        tracing::debug!(request_id = %request.id, instance_id = %instance_id, "Feedback requested");
        self.requests.write().insert(
            request.id,
            PendingRequest {
                request: request.clone(),
                ready: None,
            },
        );
        Ok(request)
    }

    async fn resume(
        &self,
        request: &FeedbackRequest,
        value: FeedbackValue,
    ) -> Result<HumanFeedback, FeedbackError> {
        if self.answered.read().contains(&request.id) {
            return Err(FeedbackError::UnknownRequest {
                request_id: request.id,
            });
        }

        let feedback = accept_value(request, value)?;
        self.requests.write().remove(&request.id);
        self.answered.write().insert(request.id);
        tracing::debug!(request_id = %request.id, "Feedback accepted");
        Ok(feedback)
    }

    async fn poll_response(&self, request_id: RequestId) -> Option<FeedbackValue> {
        self.requests
            .write()
            .get_mut(&request_id)
            .and_then(|pending| pending.ready.take())
    }

    async fn cancel(&self, request_id: RequestId) -> bool {
        self.requests.write().remove(&request_id).is_some()
    }
}

impl std::fmt::Debug for InMemoryFeedbackPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFeedbackPort")
            .field("timeout", &self.timeout)
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_is_pending_until_resumed() {
        let port = InMemoryFeedbackPort::new();
        let request = port
            .request_feedback(InstanceId::new(), "Please review", FeedbackShape::FreeText)
            .await
            .unwrap();

        assert_eq!(port.pending_count(), 1);
        assert_eq!(port.get(request.id).unwrap().prompt, "Please review");
        assert!(request.deadline.is_none());

        let feedback = port.resume(&request, "too short".into()).await.unwrap();
        assert_eq!(feedback.request_id, request.id);
        assert_eq!(feedback.comments(), "too short");
        assert_eq!(port.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_second_resume_is_unknown() {
        let port = InMemoryFeedbackPort::new();
        let request = port
            .request_feedback(InstanceId::new(), "Review", FeedbackShape::FreeText)
            .await
            .unwrap();

        port.resume(&request, "fine".into()).await.unwrap();
        let err = port.resume(&request, "fine".into()).await.unwrap_err();
        assert_eq!(
            err,
            FeedbackError::UnknownRequest {
                request_id: request.id
            }
        );
    }

    #[tokio::test]
    async fn test_answered_history_is_bounded() {
        let port = InMemoryFeedbackPort::new();
        let instance_id = InstanceId::new();

        let first = port
            .request_feedback(instance_id, "Review", FeedbackShape::FreeText)
            .await
            .unwrap();
        port.resume(&first, "ok".into()).await.unwrap();

        for _ in 0..ANSWERED_HISTORY {
            let request = port
                .request_feedback(instance_id, "Review", FeedbackShape::FreeText)
                .await
                .unwrap();
            port.resume(&request, "ok".into()).await.unwrap();
        }

        assert_eq!(port.answered.read().len(), ANSWERED_HISTORY);
        assert!(!port.answered.read().contains(&first.id));
        assert_eq!(port.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_value_keeps_request_pending() {
        let port = InMemoryFeedbackPort::new();
        let request = port
            .request_feedback(InstanceId::new(), "Accept?", FeedbackShape::Decision)
            .await
            .unwrap();

        let err = port.resume(&request, "maybe".into()).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Malformed { .. }));
        assert_eq!(port.pending_count(), 1);

        let ok = port
            .resume(
                &request,
                FeedbackValue::Decision {
                    accept: true,
                    comments: None,
                },
            )
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_expired_request_times_out() {
        let port = InMemoryFeedbackPort::new().with_timeout(Duration::from_millis(10));
        let request = port
            .request_feedback(InstanceId::new(), "Review", FeedbackShape::FreeText)
            .await
            .unwrap();
        assert!(request.deadline.is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(port.expired_requests(), vec![request.id]);
        let err = port.resume(&request, "late".into()).await.unwrap_err();
        assert_eq!(
            err,
            FeedbackError::Timeout {
                request_id: request.id
            }
        );
    }

    #[tokio::test]
    async fn test_staged_response_is_polled_once() {
        let port = InMemoryFeedbackPort::new();
        let request = port
            .request_feedback(InstanceId::new(), "Review", FeedbackShape::FreeText)
            .await
            .unwrap();

        assert!(port.poll_response(request.id).await.is_none());
        assert!(port.respond(request.id, "great"));
        assert_eq!(
            port.poll_response(request.id).await,
            Some(FeedbackValue::text("great"))
        );
        assert!(port.poll_response(request.id).await.is_none());
        assert!(!port.respond(RequestId::new(), "stray"));
    }

    #[tokio::test]
    async fn test_cancel_releases_request() {
        let port = InMemoryFeedbackPort::new();
        let request = port
            .request_feedback(InstanceId::new(), "Review", FeedbackShape::FreeText)
            .await
            .unwrap();

        assert!(port.cancel(request.id).await);
        assert!(!port.cancel(request.id).await);
        assert_eq!(port.pending_count(), 0);
    }
}
