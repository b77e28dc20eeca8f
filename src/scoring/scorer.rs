use super::budget::infer_budget_tier;
use super::signals::{KeywordDetector, SignalDetector, Wants};
use super::weights::ScoreWeights;
use crate::answers::AnswerSet;
use crate::catalog::{BodyType, BudgetTier, Catalog, CatalogItem, FuelType};
use crate::images::image_ref;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Number of picks every recommendation contains
pub const PICK_COUNT: usize = 3;
/// A filter is only applied if it leaves at least this many candidates
pub const MIN_POOL: usize = 3;

pub const DEFAULT_IMAGE_BASE: &str = "/image";

const REASON_SUV: &str =
    "Spacious and comfortable, with room for the family, luggage and long road trips.";
const REASON_ELECTRIC: &str =
    "Efficient electric drive with low running costs and a quiet, smooth ride.";
const REASON_BALANCED: &str =
    "A balanced daily driver with a good mix of comfort, economy and reliability.";

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub brand: String,
    pub model: String,
    pub reason: String,
    pub image: String,
}

/// Templated justification keyed by body type first, then fuel type
pub fn reason_for(body: Option<BodyType>, fuel: Option<FuelType>) -> &'static str {
    if body == Some(BodyType::Suv) {
        REASON_SUV
    } else if fuel == Some(FuelType::Electric) {
        REASON_ELECTRIC
    } else {
        REASON_BALANCED
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    /// Index into the catalog
    pub index: usize,
    pub score: i32,
}

/// Intermediate results of one scoring pass
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub wants: Wants,
    pub budget_tier: BudgetTier,
    /// Candidates after filtering, ranked by descending score
    pub ranked: Vec<ScoredItem>,
    pub picks: Vec<Pick>,
}

/// Deterministic heuristic recommender over an injected catalog
#[derive(Clone)]
pub struct Scorer {
    catalog: Arc<Catalog>,
    weights: ScoreWeights,
    detector: Arc<dyn SignalDetector>,
    image_base_url: String,
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("catalog_len", &self.catalog.len())
            .field("weights", &self.weights)
            .field("image_base_url", &self.image_base_url)
            .finish()
    }
}

impl Scorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            weights: ScoreWeights::default(),
            detector: Arc::new(KeywordDetector),
            image_base_url: DEFAULT_IMAGE_BASE.to_string(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_detector(mut self, detector: impl SignalDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn with_image_base_url(mut self, base: impl Into<String>) -> Self {
        self.image_base_url = base.into();
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    /// Map answers to exactly [`PICK_COUNT`] picks. Never fails.
    pub fn recommend(&self, answers: &AnswerSet) -> Vec<Pick> {
        self.analyze(answers).picks
    }

    pub fn analyze(&self, answers: &AnswerSet) -> Analysis {
        if answers.is_blank() {
            debug!("no answers given, ranking on budget default only");
        }
        let text = answers.normalize();
        let wants = self.detector.detect(&text);
        let budget_tier = infer_budget_tier(&text);

        let pool = self.filter_pool(&wants);
        let mut ranked: Vec<ScoredItem> = pool
            .into_iter()
            .map(|index| ScoredItem {
                index,
                score: self.score_item(&self.catalog.items()[index], &wants, budget_tier),
            })
            .collect();
        // sort_by is stable: equal scores keep catalog order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        let chosen = self.select(&ranked);
        let picks = chosen
            .into_iter()
            .map(|index| self.pick_for(&self.catalog.items()[index]))
            .collect();

        debug!(
            wants = ?wants,
            budget = %budget_tier,
            candidates = ranked.len(),
            "scored answers"
        );

        Analysis {
            wants,
            budget_tier,
            ranked,
            picks,
        }
    }

    /// Sum of weights for every matched dimension
    pub fn score_item(&self, item: &CatalogItem, wants: &Wants, tier: BudgetTier) -> i32 {
        let mut score: i32 = wants
            .iter()
            .filter(|want| want.matches(item))
            .map(|want| self.weights.weight(want))
            .sum();
        if item.budget_tier == tier {
            score += self.weights.budget;
        }
        score
    }

    /// Origin, then fuel, then body. Each filter is advisory: skipped when it
    /// would leave fewer than [`MIN_POOL`] candidates.
    fn filter_pool(&self, wants: &Wants) -> Vec<usize> {
        let items = self.catalog.items();
        let mut pool: Vec<usize> = (0..items.len()).collect();

        let origins = wants.origins();
        if !origins.is_empty() {
            pool = narrow(pool, "origin", |i| {
                origins.iter().any(|o| items[i].origin.eq_ignore_ascii_case(o))
            });
        }
        let fuels = wants.fuels();
        if !fuels.is_empty() {
            pool = narrow(pool, "fuel", |i| fuels.contains(&items[i].fuel_type));
        }
        let bodies = wants.bodies();
        if !bodies.is_empty() {
            pool = narrow(pool, "body", |i| bodies.contains(&items[i].body_type));
        }
        pool
    }

    /// First unique picks from the ranking, padded from the raw catalog
    fn select(&self, ranked: &[ScoredItem]) -> Vec<usize> {
        let items = self.catalog.items();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut chosen = Vec::with_capacity(PICK_COUNT);

        for scored in ranked {
            if chosen.len() == PICK_COUNT {
                break;
            }
            if seen.insert(items[scored.index].key()) {
                chosen.push(scored.index);
            }
        }

        // One pass preferring unseen entries, then plain cycling
        let len = items.len();
        let mut i = 0;
        while chosen.len() < PICK_COUNT {
            let index = i % len;
            if i >= len || seen.insert(items[index].key()) {
                chosen.push(index);
            }
            i += 1;
        }
        chosen
    }

    pub fn pick_for(&self, item: &CatalogItem) -> Pick {
        Pick {
            brand: item.brand.clone(),
            model: item.model.clone(),
            reason: reason_for(Some(item.body_type), Some(item.fuel_type)).to_string(),
            image: image_ref(&self.image_base_url, &item.brand, &item.model),
        }
    }

    /// Catalog entry with this brand and model, ignoring case
    pub fn find(&self, brand: &str, model: &str) -> Option<&CatalogItem> {
        self.catalog.items().iter().find(|item| {
            item.brand.eq_ignore_ascii_case(brand.trim())
                && item.model.eq_ignore_ascii_case(model.trim())
        })
    }
}

fn narrow(pool: Vec<usize>, label: &str, keep: impl Fn(usize) -> bool) -> Vec<usize> {
    let filtered: Vec<usize> = pool.iter().copied().filter(|&i| keep(i)).collect();
    if filtered.len() >= MIN_POOL {
        filtered
    } else {
        debug!(filter = label, matched = filtered.len(), "filter skipped");
        pool
    }
}
