//! Feedback requests and the human responses that answer them.

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::FeedbackError;
use crate::utils::{now_utc, InstanceId, RequestId, Timestamp};

/// The shape a feedback value must have to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackShape {
    /// Non-blank free-form text.
    #[default]
    FreeText,
    /// An explicit accept/revise decision.
    Decision,
    /// A JSON object with the listed fields present.
    Structured {
        /// Fields that must be present.
        required_fields: Vec<String>,
    },
}

impl FeedbackShape {
    /// Checks that `value` satisfies this shape.
    pub fn validate(&self, value: &FeedbackValue) -> Result<(), FeedbackError> {
        match (self, value) {
            (Self::FreeText, FeedbackValue::Text(text)) => {
                if text.trim().is_empty() {
                    Err(FeedbackError::malformed("feedback text is blank"))
                } else {
                    Ok(())
                }
            }
            (Self::Decision, FeedbackValue::Decision { .. }) => Ok(()),
            (Self::Structured { required_fields }, FeedbackValue::Structured(json)) => {
                let Some(object) = json.as_object() else {
                    return Err(FeedbackError::malformed("structured feedback must be a JSON object"));
                };
                let missing: Vec<&str> = required_fields
                    .iter()
                    .filter(|f| !object.contains_key(f.as_str()))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(FeedbackError::malformed(format!(
                        "missing required fields: {}",
                        missing.join(", ")
                    )))
                }
            }
            (shape, value) => Err(FeedbackError::malformed(format!(
                "expected {} feedback, got {}",
                shape.label(),
                value.label()
            ))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::FreeText => "free text",
            Self::Decision => "decision",
            Self::Structured { .. } => "structured",
        }
    }
}

/// A value supplied by a human to resume a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackValue {
    /// Free-form comments.
    Text(String),
    /// An explicit decision with optional comments.
    Decision {
        /// Whether the artifact is acceptable.
        accept: bool,
        /// Optional comments.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comments: Option<String>,
    },
    /// Arbitrary structured content.
    Structured(serde_json::Value),
}

impl FeedbackValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(comments: impl Into<String>) -> Self {
        Self::Text(comments.into())
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "free text",
            Self::Decision { .. } => "decision",
            Self::Structured(_) => "structured",
        }
    }
}

impl From<&str> for FeedbackValue {
    fn from(comments: &str) -> Self {
        Self::text(comments)
    }
}

/// A pending request for human input, emitted when a workflow suspends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Correlates the request with its response.
    pub id: RequestId,
    /// The suspended instance.
    pub instance_id: InstanceId,
    /// What the human is asked.
    pub prompt: String,
    /// The shape the response must have.
    pub expected_shape: FeedbackShape,
    /// When the request was emitted.
    pub created_at: Timestamp,
    /// When the request expires, if the port enforces a bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Timestamp>,
}

impl FeedbackRequest {
    /// Creates a request without a deadline.
    #[must_use]
    pub fn new(instance_id: InstanceId, prompt: impl Into<String>, expected_shape: FeedbackShape) -> Self {
        Self {
            id: RequestId::new(),
            instance_id,
            prompt: prompt.into(),
            expected_shape,
            created_at: now_utc(),
            deadline: None,
        }
    }

    /// Sets the deadline relative to creation time.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let delta = ChronoDuration::from_std(timeout).unwrap_or_else(|_| ChronoDuration::weeks(52 * 100));
        self.deadline = self.created_at.checked_add_signed(delta);
        self
    }

    /// Returns true if the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// The human response that resumes a suspended workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanFeedback {
    /// The request this answers.
    pub request_id: RequestId,
    /// The supplied value.
    pub value: FeedbackValue,
    /// When the value was received (ISO 8601).
    pub received_at: String,
}

impl HumanFeedback {
    /// Creates feedback answering `request_id`.
    #[must_use]
    pub fn new(request_id: RequestId, value: FeedbackValue) -> Self {
        Self {
            request_id,
            value,
            received_at: crate::utils::iso_timestamp(),
        }
    }

    /// Renders the feedback as comment text for prompts.
    #[must_use]
    pub fn comments(&self) -> String {
        match &self.value {
            FeedbackValue::Text(text) => text.clone(),
            FeedbackValue::Decision { accept, comments } => comments
                .clone()
                .unwrap_or_else(|| if *accept { "accept" } else { "revise" }.to_string()),
            FeedbackValue::Structured(json) => json
                .get("comments")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| json.to_string(), str::to_string),
        }
    }
}
