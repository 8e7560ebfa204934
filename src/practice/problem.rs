use serde::{Deserialize, Serialize};

use crate::practice::topic::Topic;

/// Expected answer of a problem. Numbers and text are kept apart so that
/// `"12"` and `12` compare equal only through normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{n}"),
            Answer::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Answer {
    fn from(value: i64) -> Self {
        Answer::Number(value)
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProblemKind {
    Calculation,
    MultipleChoice,
    TextProblem,
}

/// A generated problem. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathProblem {
    pub id: String,
    pub topic: Topic,
    pub question: String,
    pub correct_answer: Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Answer>>,
    pub difficulty: u8,
    #[serde(rename = "type")]
    pub kind: ProblemKind,
}

impl MathProblem {
    pub fn new(
        topic: Topic,
        difficulty: u8,
        kind: ProblemKind,
        question: impl Into<String>,
        correct_answer: impl Into<Answer>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic,
            question: question.into(),
            correct_answer: correct_answer.into(),
            options: None,
            difficulty,
            kind,
        }
    }

    pub fn with_options(mut self, options: Vec<Answer>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn option(&self, index: usize) -> Option<&Answer> {
        self.options.as_ref().and_then(|options| options.get(index))
    }
}
