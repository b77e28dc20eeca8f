//! Want-flag detection from free text
//!
//! Heuristic keyword matching, not NLP. Everything downstream only sees the
//! resulting [`Wants`] set, so the detector can be swapped without touching
//! ranking, padding or dedup.

use crate::catalog::{BodyType, CatalogItem, FuelType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A detected user preference in one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Want {
    Electric,
    Hybrid,
    Gas,
    Suv,
    Truck,
    Hatch,
    Sedan,
    Sport,
    City,
    China,
    Japan,
    Korea,
    Germany,
}

impl Want {
    pub fn fuel(self) -> Option<FuelType> {
        match self {
            Want::Electric => Some(FuelType::Electric),
            Want::Hybrid => Some(FuelType::Hybrid),
            Want::Gas => Some(FuelType::Gas),
            _ => None,
        }
    }

    pub fn body(self) -> Option<BodyType> {
        match self {
            Want::Suv => Some(BodyType::Suv),
            Want::Truck => Some(BodyType::Truck),
            Want::Hatch => Some(BodyType::Hatch),
            Want::Sedan => Some(BodyType::Sedan),
            _ => None,
        }
    }

    /// Catalog tag this want is matched against, for driving-style wants
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Want::Sport => Some("sport"),
            Want::City => Some("city"),
            _ => None,
        }
    }

    /// Catalog origin region this want is matched against
    pub fn origin(self) -> Option<&'static str> {
        match self {
            Want::China => Some("china"),
            Want::Japan => Some("japan"),
            Want::Korea => Some("korea"),
            Want::Germany => Some("germany"),
            _ => None,
        }
    }

    /// Whether a catalog item satisfies this want
    pub fn matches(self, item: &CatalogItem) -> bool {
        if let Some(fuel) = self.fuel() {
            return item.fuel_type == fuel;
        }
        if let Some(body) = self.body() {
            return item.body_type == body;
        }
        if let Some(tag) = self.tag() {
            return item.has_tag(tag);
        }
        if let Some(origin) = self.origin() {
            return item.origin.eq_ignore_ascii_case(origin);
        }
        false
    }
}

/// Set of detected wants; flags are independent and may co-occur
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Wants(BTreeSet<Want>);

impl Wants {
    pub fn contains(&self, want: Want) -> bool {
        self.0.contains(&want)
    }

    pub fn insert(&mut self, want: Want) {
        self.0.insert(want);
    }

    pub fn iter(&self) -> impl Iterator<Item = Want> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fuels(&self) -> BTreeSet<FuelType> {
        self.iter().filter_map(Want::fuel).collect()
    }

    pub fn bodies(&self) -> BTreeSet<BodyType> {
        self.iter().filter_map(Want::body).collect()
    }

    pub fn origins(&self) -> BTreeSet<&'static str> {
        self.iter().filter_map(Want::origin).collect()
    }
}

impl FromIterator<Want> for Wants {
    fn from_iter<I: IntoIterator<Item = Want>>(iter: I) -> Self {
        Wants(iter.into_iter().collect())
    }
}

/// Narrow seam between text and preferences
pub trait SignalDetector: Send + Sync {
    /// `text` is already normalized to lowercase
    fn detect(&self, text: &str) -> Wants;
}

static PATTERNS: Lazy<Vec<(Want, Regex)>> = Lazy::new(|| {
    let table: [(Want, &str); 13] = [
        (Want::Electric, r"electric|\bevs?\b|\bbev\b|battery|charging|zero[- ]emission"),
        (Want::Hybrid, r"hybrid|\bphev\b|plug-?in"),
        (Want::Gas, r"\bgas\b|gasoline|petrol|combustion|diesel|flex"),
        (Want::Suv, r"\bsuvs?\b|crossover|family|space|spacious|kids|children|road ?trips?"),
        (Want::Truck, r"\btrucks?\b|pick-?up|towing|\btow\b|haul|cargo bed|offroad|off-road"),
        (Want::Hatch, r"hatch|compact|small car|easy to park"),
        (Want::Sedan, r"\bsedans?\b|saloon|\btrunk\b|executive"),
        (Want::Sport, r"sport|\bfast\b|speed|fun to drive|horsepower|\bpower"),
        (Want::City, r"\bcity\b|urban|commut|downtown|traffic|parking"),
        (Want::China, r"china|chinese|\bbyd\b"),
        (Want::Japan, r"japan|japanese|toyota|honda|mazda"),
        (Want::Korea, r"korea|korean|hyundai|\bkia\b"),
        (Want::Germany, r"german|\bbmw\b|mercedes|audi|volkswagen|\bvw\b"),
    ];
    table
        .into_iter()
        .map(|(want, pattern)| (want, Regex::new(pattern).expect("want pattern should compile")))
        .collect()
});

/// Default regex-per-category detector
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordDetector;

impl SignalDetector for KeywordDetector {
    fn detect(&self, text: &str) -> Wants {
        PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(want, _)| *want)
            .collect()
    }
}
