//! Workflow input and properties.

use serde::{Deserialize, Serialize};

use super::{FeedbackShape, GenerationParams};

/// The free-form input that starts a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// The user's text.
    pub content: String,
    /// When the input was received (ISO 8601).
    pub received_at: String,
}

impl WorkflowInput {
    /// Creates an input stamped with the current time.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            received_at: crate::utils::iso_timestamp(),
        }
    }
}

impl From<&str> for WorkflowInput {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for WorkflowInput {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Per-workflow properties: what to generate and how to review it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// Parameters for drafting and revising.
    #[serde(default = "default_draft")]
    pub draft: GenerationParams,
    /// Parameters for the final review.
    #[serde(default)]
    pub review: GenerationParams,
    /// Shape the human feedback must have.
    #[serde(default)]
    pub feedback_shape: FeedbackShape,
}

fn default_draft() -> GenerationParams {
    GenerationParams::default().with_temperature(0.7)
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            draft: default_draft(),
            review: GenerationParams::default(),
            feedback_shape: FeedbackShape::default(),
        }
    }
}

/// Shorthand accepted on deserialization alongside the full form.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertiesShorthand {
    story_word_count: Option<u32>,
    review_word_count: Option<u32>,
}

impl Properties {
    /// Creates default properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target length of the drafted artifact.
    #[must_use]
    pub const fn with_story_word_count(mut self, words: u32) -> Self {
        self.draft.target_word_count = words;
        self
    }

    /// Sets the target length of the review.
    #[must_use]
    pub const fn with_review_word_count(mut self, words: u32) -> Self {
        self.review.target_word_count = words;
        self
    }

    /// Replaces the drafting parameters.
    #[must_use]
    pub fn with_draft(mut self, draft: GenerationParams) -> Self {
        self.draft = draft;
        self
    }

    /// Replaces the review parameters.
    #[must_use]
    pub fn with_review(mut self, review: GenerationParams) -> Self {
        self.review = review;
        self
    }

    /// Sets the shape the human feedback must have.
    #[must_use]
    pub fn with_feedback_shape(mut self, shape: FeedbackShape) -> Self {
        self.feedback_shape = shape;
        self
    }

    /// Parses properties from JSON.
    ///
    /// Accepts both the full `{"draft": {...}, "review": {...}}` form and the
    /// `{"storyWordCount": 50, "reviewWordCount": 80}` shorthand.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let is_shorthand = value
            .as_object()
            .is_some_and(|o| o.contains_key("storyWordCount") || o.contains_key("reviewWordCount"));

        if !is_shorthand {
            return serde_json::from_value(value.clone());
        }

        let short: PropertiesShorthand = serde_json::from_value(value.clone())?;
        let mut props = Self::default();
        if let Some(words) = short.story_word_count {
            props = props.with_story_word_count(words);
        }
        if let Some(words) = short.review_word_count {
            props = props.with_review_word_count(words);
        }
        Ok(props)
    }

    /// Reads `STORY_WORD_COUNT` and `REVIEW_WORD_COUNT`, falling back to 100.
    #[must_use]
    pub fn from_env() -> Self {
        let mut props = Self::default();
        if let Some(words) = crate::config::env_parse::<u32>("STORY_WORD_COUNT") {
            props = props.with_story_word_count(words);
        }
        if let Some(words) = crate::config::env_parse::<u32>("REVIEW_WORD_COUNT") {
            props = props.with_review_word_count(words);
        }
        props
    }
}
