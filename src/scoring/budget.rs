//! Budget tier inference from monthly-payment mentions or keywords

use crate::catalog::BudgetTier;
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound (inclusive) of the low tier, in monthly currency units
pub const LOW_MAX: f64 = 600.0;
/// Upper bound (inclusive) of the mid tier
pub const MID_MAX: f64 = 1000.0;

// A number followed within a short span by "month"/"mo", e.g. "500 a month",
// "1,200 per month", "$900/mo".
static MONTHLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d[\d,.]*)[^\d\n]{0,16}?\b(?:month|mo\b)")
        .expect("monthly pattern should compile")
});

static LOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cheap|budget|\blow\b|affordable|economy").expect("pattern"));

static HIGH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"luxury|premium|performance|expensive").expect("pattern"));

/// All monthly amounts mentioned in `text`, in order of appearance
pub fn monthly_amounts(text: &str) -> Vec<f64> {
    MONTHLY_RE
        .captures_iter(text)
        .filter_map(|caps| parse_amount(&caps[1]))
        .collect()
}

fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_end_matches(['.', ',']);
    // "1,200" and "1.200" are thousands separators; "899.90" keeps its decimals
    let cleaned: String = match trimmed.rfind(['.', ',']) {
        Some(pos) if trimmed.len() - pos - 1 == 3 => {
            trimmed.chars().filter(|c| c.is_ascii_digit()).collect()
        }
        Some(pos) => {
            let (int, frac) = trimmed.split_at(pos);
            let int: String = int.chars().filter(|c| c.is_ascii_digit()).collect();
            format!("{}.{}", int, &frac[1..])
        }
        None => trimmed.to_string(),
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn tier_for_amount(amount: f64) -> BudgetTier {
    if amount <= LOW_MAX {
        BudgetTier::Low
    } else if amount <= MID_MAX {
        BudgetTier::Mid
    } else {
        BudgetTier::High
    }
}

/// Infer the budget tier from lowercase text.
///
/// Numeric monthly mentions win and are averaged; otherwise keywords decide,
/// with `Mid` as the default.
pub fn infer_budget_tier(text: &str) -> BudgetTier {
    let amounts = monthly_amounts(text);
    if !amounts.is_empty() {
        let avg = amounts.iter().sum::<f64>() / amounts.len() as f64;
        return tier_for_amount(avg);
    }
    if LOW_RE.is_match(text) {
        BudgetTier::Low
    } else if HIGH_RE.is_match(text) {
        BudgetTier::High
    } else {
        BudgetTier::Mid
    }
}
