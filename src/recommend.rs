//! Recommendation strategies
//!
//! [`ScorerRecommender`] is the pure offline path. [`EnrichedRecommender`]
//! decorates it: one LLM attempt whose reply must validate completely, and
//! the scorer's answer otherwise. The two paths never mix within a request.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::answers::AnswerSet;
use crate::clients::{ChatMessage, ChatModel, LlmError};
use crate::images::{image_ref, image_slug};
use crate::scoring::{PICK_COUNT, Pick, Scorer, reason_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Scorer,
    Llm,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Scorer => "scorer",
            Source::Llm => "llm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub picks: Vec<Pick>,
    pub source: Source,
}

#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, answers: &AnswerSet) -> Recommendation;
}

#[derive(Debug, Clone)]
pub struct ScorerRecommender {
    scorer: Arc<Scorer>,
}

impl ScorerRecommender {
    pub fn new(scorer: Arc<Scorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn recommend_now(&self, answers: &AnswerSet) -> Recommendation {
        Recommendation {
            picks: self.scorer.recommend(answers),
            source: Source::Scorer,
        }
    }
}

#[async_trait]
impl Recommender for ScorerRecommender {
    async fn recommend(&self, answers: &AnswerSet) -> Recommendation {
        self.recommend_now(answers)
    }
}

const SYSTEM_PROMPT: &str = "You are a car-buying assistant. Pick the best cars for the user \
from the catalog provided. Respond with JSON only, in the form \
{\"picks\": [{\"brand\": \"...\", \"model\": \"...\", \"reason\": \"...\"}]} \
with at most 3 picks, best first. Keep each reason to one short sentence.";

pub struct EnrichedRecommender {
    model: Arc<dyn ChatModel>,
    fallback: ScorerRecommender,
}

impl EnrichedRecommender {
    pub fn new(model: Arc<dyn ChatModel>, fallback: ScorerRecommender) -> Self {
        Self { model, fallback }
    }

    fn prompt(&self, answers: &AnswerSet) -> Vec<ChatMessage> {
        let catalog: Vec<String> = self
            .fallback
            .scorer()
            .catalog()
            .items()
            .iter()
            .map(|item| {
                let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
                format!(
                    "- {} {} ({:?}, {:?}, {} budget, {}; {})",
                    item.brand,
                    item.model,
                    item.body_type,
                    item.fuel_type,
                    item.budget_tier,
                    item.origin,
                    tags.join(", ")
                )
            })
            .collect();
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Catalog:\n{}\n\nUser answers:\n{}",
                catalog.join("\n"),
                answers.normalize()
            )),
        ]
    }

    async fn try_llm(&self, answers: &AnswerSet) -> Result<Vec<Pick>, LlmError> {
        let reply = self.model.complete(&self.prompt(answers), true).await?;
        let parsed = parse_llm_picks(&reply)?;
        let scorer = self.fallback.scorer();
        Ok(parsed
            .into_iter()
            .map(|p| {
                let reason = match p.reason {
                    Some(r) => r,
                    None => {
                        let item = scorer.find(&p.brand, &p.model);
                        reason_for(item.map(|i| i.body_type), item.map(|i| i.fuel_type))
                            .to_string()
                    }
                };
                Pick {
                    image: image_ref(scorer.image_base_url(), &p.brand, &p.model),
                    brand: p.brand,
                    model: p.model,
                    reason,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Recommender for EnrichedRecommender {
    async fn recommend(&self, answers: &AnswerSet) -> Recommendation {
        match self.try_llm(answers).await {
            Ok(picks) => {
                info!(
                    model = self.model.model_name(),
                    picks = picks.len(),
                    "llm recommendation accepted"
                );
                Recommendation {
                    picks,
                    source: Source::Llm,
                }
            }
            Err(e) => {
                warn!(error = %e, "llm recommendation discarded, using scorer");
                self.fallback.recommend_now(answers)
            }
        }
    }
}

/// A validated pick from an LLM reply, before image/reason assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmPick {
    pub brand: String,
    pub model: String,
    pub reason: Option<String>,
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn non_empty_str(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validate an LLM reply: a JSON array (bare, fenced, or under
/// `picks`/`cars`/`recommendations`) of 1 to 3 objects with unique
/// non-empty `brand` and `model`.
pub fn parse_llm_picks(reply: &str) -> Result<Vec<LlmPick>, LlmError> {
    let text = strip_code_fence(reply);
    if text.is_empty() {
        return Err(LlmError::Empty);
    }
    let value: Value =
        serde_json::from_str(text).map_err(|e| LlmError::ParseError(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => ["picks", "cars", "recommendations"]
            .iter()
            .find_map(|key| match obj.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| LlmError::ParseError("no picks array in reply".to_string()))?,
        _ => return Err(LlmError::ParseError("reply is not an array".to_string())),
    };

    if items.is_empty() || items.len() > PICK_COUNT {
        return Err(LlmError::ParseError(format!(
            "expected 1-{} picks, got {}",
            PICK_COUNT,
            items.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut picks = Vec::with_capacity(items.len());
    for item in items {
        let obj = item
            .as_object()
            .ok_or_else(|| LlmError::ParseError("pick is not an object".to_string()))?;
        let (Some(brand), Some(model)) =
            (non_empty_str(obj, "brand"), non_empty_str(obj, "model"))
        else {
            return Err(LlmError::ParseError(
                "pick missing brand or model".to_string(),
            ));
        };
        let slug = image_slug(&brand, &model);
        if slug.is_empty() {
            return Err(LlmError::ParseError(format!(
                "pick {brand:?} {model:?} has no usable name"
            )));
        }
        if !seen.insert(slug) {
            return Err(LlmError::ParseError(format!(
                "duplicate pick {brand} {model}"
            )));
        }
        picks.push(LlmPick {
            brand,
            model,
            reason: non_empty_str(obj, "reason"),
        });
    }
    Ok(picks)
}
