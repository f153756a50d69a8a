//! Generated artifacts and the parameters they were generated with.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Parameters passed through to the generation port.
///
/// The engine never interprets these beyond carrying them; prompt
/// construction and model selection belong to the port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Target length in words.
    pub target_word_count: u32,
    /// Hard cap on length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<u32>,
    /// Topic hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Style hint (e.g. "pun", "observational").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Sampling temperature requested from the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Opaque persona/role description handed to the port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<serde_json::Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            target_word_count: 100,
            max_chars: None,
            topic: None,
            style: None,
            temperature: None,
            persona: None,
        }
    }
}

impl GenerationParams {
    /// Creates params targeting the given word count.
    #[must_use]
    pub fn with_word_count(target_word_count: u32) -> Self {
        Self {
            target_word_count,
            ..Self::default()
        }
    }

    /// Sets the character cap.
    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: u32) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    /// Sets the topic hint.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sets the style hint.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the persona.
    #[must_use]
    pub fn with_persona(mut self, persona: serde_json::Value) -> Self {
        self.persona = Some(persona);
        self
    }
}

/// A generated piece of content.
///
/// Artifacts are immutable: a revision produces a new artifact with a
/// higher `revision` number and leaves the previous one untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique artifact id.
    pub id: String,
    /// The generated content.
    pub content: String,
    /// Parameters the artifact was generated with.
    pub params: GenerationParams,
    /// 1 for the first draft, incremented per revision.
    pub revision: u32,
    /// When the artifact was produced (ISO 8601).
    pub created_at: String,
}

impl Artifact {
    /// Creates a first-draft artifact.
    #[must_use]
    pub fn new(content: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            id: crate::utils::generate_uuid().to_string(),
            content: content.into(),
            params,
            revision: 1,
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Creates the successor of `previous` with new content.
    #[must_use]
    pub fn revision_of(previous: &Self, content: impl Into<String>) -> Self {
        Self {
            revision: previous.revision + 1,
            ..Self::new(content, previous.params.clone())
        }
    }

    /// Returns a SHA-256 hex digest of the content.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the number of whitespace separated words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}
