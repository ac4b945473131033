use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::AssessmentId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment title cannot be empty")]
    EmptyTitle,

    #[error("assessment category cannot be empty")]
    EmptyCategory,

    #[error("assessment duration must be > 0 seconds")]
    InvalidDuration,

    #[error("assessment must contain at least one question")]
    NoQuestions,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct option {index} is out of range for {count} options")]
    CorrectOptionOutOfRange { index: usize, count: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question. The option index is the selection key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionFields")]
pub struct Question {
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
    explanation: String,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` if the prompt or any option is empty, there are
    /// fewer than two options, or `correct_option` does not index into `options`.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, AssessmentError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(AssessmentError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(AssessmentError::TooFewOptions {
                count: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(AssessmentError::EmptyOption { index });
        }
        if correct_option >= options.len() {
            return Err(AssessmentError::CorrectOptionOutOfRange {
                index: correct_option,
                count: options.len(),
            });
        }

        Ok(Self {
            prompt,
            options,
            correct_option,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Returns true if `option` is a selectable index for this question.
    #[must_use]
    pub fn accepts(&self, option: usize) -> bool {
        option < self.options.len()
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Immutable description of a timed assessment, loaded once at startup.
///
/// Question order is significant: it drives presentation and answer indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DefinitionFields")]
pub struct AssessmentDefinition {
    id: AssessmentId,
    title: String,
    description: String,
    category: String,
    duration_secs: u32,
    questions: Vec<Question>,
}

impl AssessmentDefinition {
    /// Creates a validated definition.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` if the title or category is blank, the duration
    /// is zero, or there are no questions.
    pub fn new(
        id: AssessmentId,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        duration_secs: u32,
        questions: Vec<Question>,
    ) -> Result<Self, AssessmentError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AssessmentError::EmptyTitle);
        }
        let category = category.into();
        if category.trim().is_empty() {
            return Err(AssessmentError::EmptyCategory);
        }
        if duration_secs == 0 {
            return Err(AssessmentError::InvalidDuration);
        }
        if questions.is_empty() {
            return Err(AssessmentError::NoQuestions);
        }

        Ok(Self {
            id,
            title,
            description: description.into(),
            category: category.trim().to_owned(),
            duration_secs,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &AssessmentId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Index of the final question.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }
}

//
// ─── SERDE ─────────────────────────────────────────────────────────────────────
//

// Deserialized payloads go through the same checks as the constructors.

#[derive(Deserialize)]
struct QuestionFields {
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<QuestionFields> for Question {
    type Error = AssessmentError;

    fn try_from(raw: QuestionFields) -> Result<Self, Self::Error> {
        Question::new(raw.prompt, raw.options, raw.correct_option, raw.explanation)
    }
}

#[derive(Deserialize)]
struct DefinitionFields {
    id: AssessmentId,
    title: String,
    #[serde(default)]
    description: String,
    category: String,
    duration_secs: u32,
    questions: Vec<Question>,
}

impl TryFrom<DefinitionFields> for AssessmentDefinition {
    type Error = AssessmentError;

    fn try_from(raw: DefinitionFields) -> Result<Self, Self::Error> {
        AssessmentDefinition::new(
            raw.id,
            raw.title,
            raw.description,
            raw.category,
            raw.duration_secs,
            raw.questions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn question_validates_options_and_key() {
        assert_eq!(
            Question::new("Q", opts(&["only"]), 0, ""),
            Err(AssessmentError::TooFewOptions { count: 1 })
        );
        assert_eq!(
            Question::new("Q", opts(&["a", " "]), 0, ""),
            Err(AssessmentError::EmptyOption { index: 1 })
        );
        assert_eq!(
            Question::new("Q", opts(&["a", "b"]), 2, ""),
            Err(AssessmentError::CorrectOptionOutOfRange { index: 2, count: 2 })
        );

        let q = Question::new("Q", opts(&["a", "b", "c"]), 2, "because").unwrap();
        assert!(q.accepts(2));
        assert!(!q.accepts(3));
        assert_eq!(q.correct_option(), 2);
    }

    #[test]
    fn definition_rejects_zero_duration_and_empty_questions() {
        let id = AssessmentId::new("x").unwrap();
        let q = Question::new("Q", opts(&["a", "b"]), 0, "").unwrap();

        assert_eq!(
            AssessmentDefinition::new(id.clone(), "T", "", "Cat", 0, vec![q.clone()]),
            Err(AssessmentError::InvalidDuration)
        );
        assert_eq!(
            AssessmentDefinition::new(id.clone(), "T", "", "Cat", 10, Vec::new()),
            Err(AssessmentError::NoQuestions)
        );
        assert_eq!(
            AssessmentDefinition::new(id.clone(), "T", "", "  ", 10, vec![q.clone()]),
            Err(AssessmentError::EmptyCategory)
        );

        let def = AssessmentDefinition::new(id, "T", "", " Cat ", 10, vec![q.clone(), q]).unwrap();
        assert_eq!(def.category(), "Cat");
        assert_eq!(def.last_index(), 1);
    }

    #[test]
    fn deserializing_a_definition_applies_validation() {
        let zero_duration = r#"{
            "id": "bad", "title": "T", "category": "Cat", "duration_secs": 0,
            "questions": [{"prompt": "Q", "options": ["a", "b"], "correct_option": 0}]
        }"#;
        let err = serde_json::from_str::<AssessmentDefinition>(zero_duration).unwrap_err();
        assert!(err.to_string().contains("duration"), "{err}");

        let bad_question = r#"{
            "id": "bad", "title": "T", "category": "Cat", "duration_secs": 60,
            "questions": [{"prompt": "Q", "options": ["a"], "correct_option": 7}]
        }"#;
        let err = serde_json::from_str::<AssessmentDefinition>(bad_question).unwrap_err();
        assert!(err.to_string().contains("at least 2 options"), "{err}");

        assert!(
            serde_json::from_str::<Question>(
                r#"{"prompt": "Q", "options": ["a", "b"], "correct_option": 2}"#
            )
            .is_err()
        );
    }

    #[test]
    fn serialized_definition_reads_back() {
        let q = Question::new("Q", opts(&["a", "b"]), 1, "why").unwrap();
        let def = AssessmentDefinition::new(AssessmentId::new("ok").unwrap(), "T", "d", "Cat", 30, vec![q])
            .unwrap();

        let json = serde_json::to_string(&def).unwrap();
        let back: AssessmentDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
