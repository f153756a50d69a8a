//! Interpreting a model's assessment of human feedback.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The verdict derived from an artifact plus the human feedback on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    /// The assessment parsed into a decision.
    Decided {
        /// True if the artifact is acceptable as is.
        accept: bool,
    },
    /// The assessment could not be interpreted.
    Unparsable {
        /// The raw assessment text.
        raw: String,
    },
}

#[allow(clippy::expect_used)]
fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"(?s)\{.*\}")
}

fn negated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"(?i)\bnot\s+(?:acceptable|accepted|approved|accept)\b")
}

fn positive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"(?i)\b(?:accept|acceptable|accepted|approve|approved|yes|true)\b")
}

fn negative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"(?i)\b(?:revise|reject|rejected|unacceptable|no|false)\b")
}

impl AssessmentOutcome {
    /// An accepting decision.
    #[must_use]
    pub const fn accept() -> Self {
        Self::Decided { accept: true }
    }

    /// A revising decision.
    #[must_use]
    pub const fn revise() -> Self {
        Self::Decided { accept: false }
    }

    /// Interprets raw model output.
    ///
    /// If the text contains a JSON object, its boolean `acceptable` (or
    /// `accept`) field decides and a missing or non-boolean field is
    /// unparsable. Otherwise the text decides only when it mentions one
    /// polarity of keywords and not the other.
    #[must_use]
    pub fn from_model_output(raw: &str) -> Self {
        if let Some(object) = Self::json_object(raw) {
            return object
                .get("acceptable")
                .or_else(|| object.get("accept"))
                .and_then(serde_json::Value::as_bool)
                .map_or_else(
                    || Self::Unparsable {
                        raw: raw.to_string(),
                    },
                    |accept| Self::Decided { accept },
                );
        }

        let text = negated_pattern().replace_all(raw, " revise ");
        let positive = positive_pattern().is_match(&text);
        let negative = negative_pattern().is_match(&text);

        match (positive, negative) {
            (true, false) => Self::accept(),
            (false, true) => Self::revise(),
            _ => Self::Unparsable {
                raw: raw.to_string(),
            },
        }
    }

    fn json_object(raw: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        let candidate = json_object_pattern().find(raw)?.as_str();
        match serde_json::from_str(candidate).ok()? {
            serde_json::Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the decision, if one was made.
    #[must_use]
    pub const fn decision(&self) -> Option<bool> {
        match self {
            Self::Decided { accept } => Some(*accept),
            Self::Unparsable { .. } => None,
        }
    }
}

impl From<bool> for AssessmentOutcome {
    fn from(accept: bool) -> Self {
        Self::Decided { accept }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object() {
        assert_eq!(
            AssessmentOutcome::from_model_output(r#"{"acceptable": true}"#),
            AssessmentOutcome::accept()
        );
        assert_eq!(
            AssessmentOutcome::from_model_output("```json\n{\"acceptable\": false}\n```"),
            AssessmentOutcome::revise()
        );
        assert_eq!(
            AssessmentOutcome::from_model_output(r#"Sure: {"accept": true, "why": "fine"}"#),
            AssessmentOutcome::accept()
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            AssessmentOutcome::from_model_output("The story is acceptable."),
            AssessmentOutcome::accept()
        );
        assert_eq!(
            AssessmentOutcome::from_model_output("Unacceptable, please revise."),
            AssessmentOutcome::revise()
        );
        assert_eq!(
            AssessmentOutcome::from_model_output("This is not acceptable"),
            AssessmentOutcome::revise()
        );
    }

    #[test]
    fn test_ambiguous_is_unparsable() {
        let outcome = AssessmentOutcome::from_model_output("yes and no");
        assert_eq!(
            outcome,
            AssessmentOutcome::Unparsable {
                raw: "yes and no".to_string()
            }
        );
        assert_eq!(outcome.decision(), None);

        assert!(matches!(
            AssessmentOutcome::from_model_output("I liked the lighthouse."),
            AssessmentOutcome::Unparsable { .. }
        ));
    }

    #[test]
    fn test_json_without_boolean_is_unparsable() {
        assert!(matches!(
            AssessmentOutcome::from_model_output(r#"{"acceptable": "maybe"}"#),
            AssessmentOutcome::Unparsable { .. }
        ));
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(AssessmentOutcome::from(true).decision(), Some(true));
        assert_eq!(AssessmentOutcome::from(false).decision(), Some(false));
    }
}
