//! Questionnaire answers and their normalization into a single text blob

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One question/answer pair from the questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPair {
    pub question: String,
    pub answer: Value,
}

/// Input payload: ordered pairs, or any other JSON value treated as opaque text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerSet {
    Pairs(Vec<AnswerPair>),
    Raw(Value),
}

impl Default for AnswerSet {
    fn default() -> Self {
        AnswerSet::Raw(Value::Object(Default::default()))
    }
}

impl AnswerSet {
    pub fn pairs<Q, A>(pairs: impl IntoIterator<Item = (Q, A)>) -> Self
    where
        Q: Into<String>,
        A: Into<String>,
    {
        AnswerSet::Pairs(
            pairs
                .into_iter()
                .map(|(q, a)| AnswerPair {
                    question: q.into(),
                    answer: Value::String(a.into()),
                })
                .collect(),
        )
    }

    pub fn text(text: impl Into<String>) -> Self {
        AnswerSet::Raw(Value::String(text.into()))
    }

    /// Flatten everything into one lowercase string. This is the only signal
    /// the scorer looks at.
    pub fn normalize(&self) -> String {
        let blob = match self {
            AnswerSet::Pairs(pairs) => pairs
                .iter()
                .map(|p| format!("{} {}", p.question, value_text(&p.answer)))
                .collect::<Vec<_>>()
                .join("\n"),
            AnswerSet::Raw(value) => value_text(value),
        };
        blob.to_lowercase()
    }

    /// True when there is no text at all to extract signal from
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerSet::Pairs(pairs) => pairs.is_empty(),
            AnswerSet::Raw(Value::Null) => true,
            AnswerSet::Raw(Value::String(s)) => s.trim().is_empty(),
            AnswerSet::Raw(Value::Object(map)) => map.is_empty(),
            AnswerSet::Raw(Value::Array(items)) => items.is_empty(),
            AnswerSet::Raw(_) => false,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
