//! Per-unit yearly OPEX profile

use log::debug;
use serde::{Deserialize, Serialize};

use super::learning_curve::LearningCurveSpec;
use crate::capex::DISTRIBUTION_POINTS;
use crate::error::{check_percentage, ValueError, ValueResult};
use crate::escalation::Escalation;
use crate::horizon::{align, SalesSeries, TimeHorizon};

/// Yearly unit cost of one OPEX component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexInput {
    pub component: String,
    pub value: f64,
}

impl OpexInput {
    pub fn new(component: &str, value: f64) -> Self {
        Self {
            component: component.to_string(),
            value,
        }
    }
}

/// After-sales cost as a share of unit OPEX.
///
/// Points 0..=9 cover `launch ..= launch+9`, point 10 every year after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAfterSales")]
pub struct AfterSalesDistribution {
    percentages: [f64; DISTRIBUTION_POINTS],
}

#[derive(Deserialize)]
struct RawAfterSales {
    percentages: [f64; DISTRIBUTION_POINTS],
}

impl TryFrom<RawAfterSales> for AfterSalesDistribution {
    type Error = ValueError;

    fn try_from(raw: RawAfterSales) -> ValueResult<Self> {
        Self::new(raw.percentages)
    }
}

impl AfterSalesDistribution {
    pub fn new(percentages: [f64; DISTRIBUTION_POINTS]) -> ValueResult<Self> {
        for &pct in &percentages {
            check_percentage("after-sales distribution", pct)?;
        }
        Ok(Self { percentages })
    }

    /// No after-sales cost
    pub fn none() -> Self {
        Self {
            percentages: [0.0; DISTRIBUTION_POINTS],
        }
    }

    pub fn percentages(&self) -> &[f64; DISTRIBUTION_POINTS] {
        &self.percentages
    }

    /// Fraction of unit OPEX spent on after-sales `offset` years after launch
    pub fn share(&self, offset: i32) -> f64 {
        if offset < 0 {
            0.0
        } else if offset >= DISTRIBUTION_POINTS as i32 - 1 {
            self.percentages[DISTRIBUTION_POINTS - 1] / 100.0
        } else {
            self.percentages[offset as usize] / 100.0
        }
    }
}

impl Default for AfterSalesDistribution {
    fn default() -> Self {
        Self::none()
    }
}

/// Escalated yearly cost of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOpex {
    pub component: String,
    pub values: Vec<f64>,
}

/// Result of an OPEX computation, every series aligned to `horizon`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexProfile {
    pub horizon: TimeHorizon,
    pub escalation: Escalation,
    /// Sales quantity of each horizon year
    pub quantity: Vec<f64>,
    /// Running total of the sales table, 0 where the table has no entry
    pub cumulative_quantity: Vec<f64>,
    pub learning_curve_coef: Vec<f64>,
    /// Unit cost after learning curve, not escalated
    pub opex_wo_escalation: Vec<f64>,
    pub opex_make: Vec<f64>,
    pub opex_buy: Vec<f64>,
    pub opex_make_wo_lc: Vec<f64>,
    /// Escalated unit cost
    pub opex: Vec<f64>,
    /// Escalated after-sales cost per unit
    pub opex_after_sales: Vec<f64>,
    pub components: Vec<ComponentOpex>,
}

impl OpexProfile {
    pub fn component(&self, name: &str) -> Option<&[f64]> {
        self.components
            .iter()
            .find(|c| c.component == name)
            .map(|c| c.values.as_slice())
    }

    /// Costs of the whole yearly production instead of one unit
    pub fn totals(&self) -> OpexProfile {
        self.map_monetary(|series| series.iter().zip(&self.quantity).map(|(v, q)| v * q).collect())
    }

    /// Every monetary series multiplied by `factor`; quantities and
    /// learning curve coefficients are kept
    pub fn scaled(&self, factor: f64) -> OpexProfile {
        self.map_monetary(|series| series.iter().map(|v| v * factor).collect())
    }

    fn map_monetary<F: Fn(&[f64]) -> Vec<f64>>(&self, f: F) -> OpexProfile {
        OpexProfile {
            horizon: self.horizon,
            escalation: self.escalation,
            quantity: self.quantity.clone(),
            cumulative_quantity: self.cumulative_quantity.clone(),
            learning_curve_coef: self.learning_curve_coef.clone(),
            opex_wo_escalation: f(&self.opex_wo_escalation),
            opex_make: f(&self.opex_make),
            opex_buy: f(&self.opex_buy),
            opex_make_wo_lc: f(&self.opex_make_wo_lc),
            opex: f(&self.opex),
            opex_after_sales: f(&self.opex_after_sales),
            components: self
                .components
                .iter()
                .map(|c| ComponentOpex {
                    component: c.component.clone(),
                    values: f(&c.values),
                })
                .collect(),
        }
    }
}

/// OPEX profile builder for one product
#[derive(Debug, Clone)]
pub struct OpexEngine {
    horizon: TimeHorizon,
    launch_year: i32,
    escalation: Escalation,
}

impl OpexEngine {
    pub fn new(horizon: TimeHorizon, launch_year: i32, escalation: Escalation) -> Self {
        Self {
            horizon,
            launch_year,
            escalation,
        }
    }

    /// Build the unit OPEX profile. `multiplier` is in percent and scales the
    /// summed unit cost, not the per-component detail.
    pub fn compute(
        &self,
        inputs: &[OpexInput],
        sales: &SalesSeries,
        after_sales: &AfterSalesDistribution,
        learning_curve: &LearningCurveSpec,
        multiplier: f64,
    ) -> ValueResult<OpexProfile> {
        let year_start = self.horizon.year_start;
        let unit_cost = inputs.iter().map(|i| i.value).sum::<f64>() * (multiplier / 100.0);

        let components = inputs
            .iter()
            .map(|input| ComponentOpex {
                component: input.component.clone(),
                values: self
                    .escalation
                    .apply(&self.value_vs_time(input.value), year_start),
            })
            .collect();

        let learning_curve_coef = align(
            &self.horizon,
            sales.years(),
            &learning_curve.yearly_coefficients(sales),
        );

        let make_share = learning_curve.percentage_make / 100.0;
        let base = self.value_vs_time(unit_cost);
        let make_wo_lc: Vec<f64> = base.iter().map(|v| make_share * v).collect();
        let buy: Vec<f64> = base.iter().map(|v| (1.0 - make_share) * v).collect();
        let make: Vec<f64> = make_wo_lc
            .iter()
            .zip(&learning_curve_coef)
            .map(|(v, c)| v * c)
            .collect();
        let opex_wo_escalation: Vec<f64> = make.iter().zip(&buy).map(|(m, b)| m + b).collect();

        let after_sales_raw: Vec<f64> = self
            .horizon
            .years()
            .zip(&opex_wo_escalation)
            .map(|(year, v)| v * after_sales.share(year - self.launch_year))
            .collect();

        let profile = OpexProfile {
            horizon: self.horizon,
            escalation: self.escalation,
            quantity: sales.aligned_quantity(&self.horizon),
            cumulative_quantity: sales.aligned_cumulative(&self.horizon),
            opex: self.escalation.apply(&opex_wo_escalation, year_start),
            opex_make: self.escalation.apply(&make, year_start),
            opex_buy: self.escalation.apply(&buy, year_start),
            opex_make_wo_lc: self.escalation.apply(&make_wo_lc, year_start),
            opex_after_sales: self.escalation.apply(&after_sales_raw, year_start),
            opex_wo_escalation,
            learning_curve_coef,
            components,
        };

        debug!(
            "opex profile over {}: unit cost {:.2}, {} components",
            self.horizon,
            unit_cost,
            profile.components.len()
        );
        Ok(profile)
    }

    /// `value` in every year from launch on, 0 before
    fn value_vs_time(&self, value: f64) -> Vec<f64> {
        self.horizon
            .map_years(|year| if year >= self.launch_year { value } else { 0.0 })
    }
}
