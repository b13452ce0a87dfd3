//! Straight-line amortization of CAPEX categories

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Amortization period in years per CAPEX category.
///
/// Categories absent from the schedule, or with 0 years, are expensed in the
/// year they are spent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    years: BTreeMap<String, u32>,
}

impl AmortizationSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(category, years)` rows; the first row of a category wins
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut years = BTreeMap::new();
        for (category, n) in rows {
            years.entry(category).or_insert(n);
        }
        Self { years }
    }

    pub fn with(mut self, category: &str, years: u32) -> Self {
        self.years.insert(category.to_string(), years);
        self
    }

    /// Amortization period of `category`, 0 when expensed immediately
    pub fn years_for(&self, category: &str) -> u32 {
        self.years.get(category).copied().unwrap_or(0)
    }
}

/// Spread every year's spend evenly over that year and the `years - 1`
/// following ones, dropping what falls past the end of the series
pub fn straight_line(spend: &[f64], years: u32) -> Vec<f64> {
    let mut out = vec![0.0; spend.len()];
    if years == 0 {
        return out;
    }
    let n = years as usize;
    for (start, &value) in spend.iter().enumerate() {
        let share = value / years as f64;
        for slot in out.iter_mut().skip(start).take(n) {
            *slot += share;
        }
    }
    out
}
