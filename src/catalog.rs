//! Candidate catalog for recommendations
//!
//! The catalog is an immutable, insertion-ordered list built once at startup
//! and shared behind an `Arc`. Order matters: ties in scoring keep catalog
//! order, and padding cycles through it by index.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Sedan,
    Hatch,
    Suv,
    Truck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Gas,
    Hybrid,
    Electric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Low,
    Mid,
    High,
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BudgetTier::Low => "low",
            BudgetTier::Mid => "mid",
            BudgetTier::High => "high",
        };
        f.write_str(s)
    }
}

/// A static reference entry in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub brand: String,
    pub model: String,
    pub body_type: BodyType,
    pub fuel_type: FuelType,
    pub budget_tier: BudgetTier,
    #[serde(rename = "originRegion")]
    pub origin: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl CatalogItem {
    pub fn new(
        brand: &str,
        model: &str,
        body_type: BodyType,
        fuel_type: FuelType,
        budget_tier: BudgetTier,
        origin: &str,
        tags: &[&str],
    ) -> Self {
        Self {
            brand: brand.to_string(),
            model: model.to_string(),
            body_type,
            fuel_type,
            budget_tier,
            origin: origin.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Identity used for duplicate suppression
    pub fn key(&self) -> (&str, &str) {
        (self.brand.as_str(), self.model.as_str())
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<CatalogItem>,
}

/// Immutable, non-empty list of candidate items
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
        if items.is_empty() {
            anyhow::bail!("catalog must contain at least one item");
        }
        Ok(Self { items })
    }

    /// Load a catalog from a TOML file with an `[[items]]` array
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.items)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }
}

type Row<'a> = (
    &'a str,
    &'a str,
    BodyType,
    FuelType,
    BudgetTier,
    &'a str,
    &'a [&'a str],
);

impl Default for Catalog {
    fn default() -> Self {
        use BodyType::*;
        use BudgetTier::*;
        use FuelType::*;

        let rows: [Row<'static>; 18] = [
            ("Toyota", "Corolla", Sedan, Hybrid, Low, "japan", &["city", "commute", "reliable"]),
            ("Toyota", "RAV4", Suv, Hybrid, Mid, "japan", &["family", "space", "reliable"]),
            ("Honda", "Civic", Sedan, Gas, Low, "japan", &["city", "sport"]),
            ("Honda", "CR-V", Suv, Gas, Mid, "japan", &["family", "space"]),
            ("Mazda", "3 Hatchback", Hatch, Gas, Low, "japan", &["city", "sport"]),
            ("Volkswagen", "Golf", Hatch, Gas, Low, "germany", &["city", "sport"]),
            ("BMW", "3 Series", Sedan, Gas, High, "germany", &["sport", "luxury"]),
            ("BMW", "iX", Suv, Electric, High, "germany", &["family", "luxury"]),
            ("Mercedes-Benz", "GLC", Suv, Hybrid, High, "germany", &["family", "luxury"]),
            ("Audi", "Q4 e-tron", Suv, Electric, High, "germany", &["family"]),
            ("Hyundai", "Tucson", Suv, Hybrid, Mid, "korea", &["family", "space"]),
            ("Hyundai", "Ioniq 5", Suv, Electric, Mid, "korea", &["family", "city"]),
            ("Kia", "Sportage", Suv, Gas, Mid, "korea", &["family"]),
            ("Kia", "EV6", Hatch, Electric, Mid, "korea", &["sport"]),
            ("BYD", "Dolphin", Hatch, Electric, Low, "china", &["city"]),
            ("BYD", "Song Plus", Suv, Hybrid, Mid, "china", &["family", "space"]),
            ("Ford", "Ranger", Truck, Gas, Mid, "usa", &["work", "offroad"]),
            ("Toyota", "Hilux", Truck, Gas, Mid, "japan", &["work", "offroad"]),
        ];
        let items = rows
            .into_iter()
            .map(|(brand, model, body, fuel, tier, origin, tags)| {
                CatalogItem::new(brand, model, body, fuel, tier, origin, tags)
            })
            .collect();
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_unique_entries() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 18);
        let keys: BTreeSet<_> = catalog.items().iter().map(|i| i.key()).collect();
        assert_eq!(keys.len(), catalog.len());
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(Catalog::new(Vec::new()).is_err());
    }

    #[test]
    fn parses_toml_catalog() {
        let toml = r#"
            [[items]]
            brand = "Fiat"
            model = "500e"
            bodyType = "hatch"
            fuelType = "electric"
            budgetTier = "low"
            originRegion = "italy"
            tags = ["city"]
        "#;
        let catalog = Catalog::from_toml_str(toml).unwrap();
        let item = catalog.get(0).unwrap();
        assert_eq!(item.fuel_type, FuelType::Electric);
        assert_eq!(item.origin, "italy");
        assert!(item.has_tag("city"));
    }

    #[test]
    fn item_serializes_with_camel_case_keys() {
        let catalog = Catalog::default();
        let item = &catalog.items()[0];
        let value = serde_json::to_value(item).unwrap();
        assert_eq!(value["bodyType"], "sedan");
        assert_eq!(value["budgetTier"], "low");
        assert_eq!(value["originRegion"], "japan");
    }
}
