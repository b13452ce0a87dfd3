//! Yearly CAPEX spend profile built from lump sums and distribution curves

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::distribution::{DistributionCurve, DistributionTable};
use crate::error::{check_percentage, ValueResult};
use crate::escalation::Escalation;
use crate::horizon::TimeHorizon;

/// One CAPEX input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexInput {
    /// Distribution category the line is spread with
    pub category: String,
    pub component: String,
    /// Lump-sum value in the economic conditions of the escalation year
    pub value: f64,
    /// Contingency in percent of `value`
    pub contingency_pct: f64,
}

impl CapexInput {
    pub fn new(category: &str, component: &str, value: f64, contingency_pct: f64) -> Self {
        Self {
            category: category.to_string(),
            component: component.to_string(),
            value,
            contingency_pct,
        }
    }
}

/// Scale every input value by `multiplier` percent (100 leaves them unchanged)
pub fn apply_ratio(inputs: &[CapexInput], multiplier: f64) -> Vec<CapexInput> {
    inputs
        .iter()
        .map(|input| CapexInput {
            value: input.value * multiplier / 100.0,
            ..input.clone()
        })
        .collect()
}

/// Escalated yearly spend of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: String,
    pub values: Vec<f64>,
}

/// Result of a CAPEX computation, every series aligned to `horizon`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexProfile {
    pub horizon: TimeHorizon,
    pub escalation: Escalation,
    /// Total spend including contingency
    pub capex: Vec<f64>,
    pub contingency: Vec<f64>,
    /// Per-category spend, in distribution table order
    pub categories: Vec<CategorySpend>,
}

impl CapexProfile {
    /// Profile with no spend at all
    pub fn empty(horizon: TimeHorizon, escalation: Escalation) -> Self {
        Self {
            horizon,
            escalation,
            capex: horizon.zeros(),
            contingency: horizon.zeros(),
            categories: Vec::new(),
        }
    }

    pub fn category(&self, name: &str) -> Option<&[f64]> {
        self.categories
            .iter()
            .find(|c| c.category == name)
            .map(|c| c.values.as_slice())
    }

    /// Total spend over the horizon
    pub fn total(&self) -> f64 {
        self.capex.iter().sum()
    }

    /// Every spend series multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |series: &[f64]| -> Vec<f64> { series.iter().map(|v| v * factor).collect() };
        Self {
            horizon: self.horizon,
            escalation: self.escalation,
            capex: scale(&self.capex),
            contingency: scale(&self.contingency),
            categories: self
                .categories
                .iter()
                .map(|c| CategorySpend {
                    category: c.category.clone(),
                    values: scale(&c.values),
                })
                .collect(),
        }
    }
}

/// CAPEX profile builder for one product
#[derive(Debug, Clone)]
pub struct CapexEngine {
    horizon: TimeHorizon,
    launch_year: i32,
    escalation: Escalation,
}

impl CapexEngine {
    pub fn new(horizon: TimeHorizon, launch_year: i32, escalation: Escalation) -> Self {
        Self {
            horizon,
            launch_year,
            escalation,
        }
    }

    /// Scale inputs by `multiplier` percent, then build the profile
    pub fn compute(
        &self,
        inputs: &[CapexInput],
        table: &DistributionTable,
        multiplier: f64,
    ) -> ValueResult<CapexProfile> {
        self.compute_by_category(&apply_ratio(inputs, multiplier), table)
    }

    /// Build the profile from inputs already scaled
    pub fn compute_by_category(
        &self,
        inputs: &[CapexInput],
        table: &DistributionTable,
    ) -> ValueResult<CapexProfile> {
        for input in inputs {
            check_percentage(
                &format!("contingency of '{}'", input.component),
                input.contingency_pct,
            )?;
            if !table.contains(&input.category) {
                info!(
                    "capex category '{}' has no distribution curve, component '{}' ignored",
                    input.category, input.component
                );
            }
        }

        let mut profile = CapexProfile::empty(self.horizon, self.escalation);
        for curve in table.iter() {
            let lines: Vec<&CapexInput> =
                inputs.iter().filter(|i| i.category == curve.category).collect();
            let total: f64 = lines.iter().map(|i| i.value).sum();
            let weighted_contingency = if total != 0.0 {
                lines
                    .iter()
                    .map(|i| i.value * i.contingency_pct / 100.0)
                    .sum::<f64>()
                    / total
            } else {
                0.0
            };

            let spend = self
                .escalation
                .apply(&self.value_vs_time(total, curve), self.horizon.year_start);

            for (i, &v) in spend.iter().enumerate() {
                profile.capex[i] += v;
                profile.contingency[i] += v * weighted_contingency;
            }
            profile.categories.push(CategorySpend {
                category: curve.category.clone(),
                values: spend,
            });
        }

        for (capex, contingency) in profile.capex.iter_mut().zip(&profile.contingency) {
            *capex += contingency;
        }

        debug!(
            "capex profile over {}: {} categories, total {:.2}",
            self.horizon,
            profile.categories.len(),
            profile.total()
        );
        Ok(profile)
    }

    /// Spread `value` over the horizon following `curve`, before escalation
    pub fn value_vs_time(&self, value: f64, curve: &DistributionCurve) -> Vec<f64> {
        self.horizon
            .map_years(|year| value * curve.share(year - self.launch_year))
    }
}
