//! Study description read from `study.json`
//!
//! The JSON keeps the field names analysts already use (`WACC`,
//! `learning_curve_coefficient`, `percentage_at_delivery_year-1`, ...).
//! Payment terms are checked while parsing, everything else when converted
//! into the typed engine inputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capex::DISTRIBUTION_POINTS;
use crate::cashflow::discount::wacc_from_percent;
use crate::cashflow::{CashflowConfig, Currency, DiscountMode, ExchangeRate, PaymentTerms};
use crate::error::{ValueError, ValueResult};
use crate::escalation::{Escalation, EscalationConfig};
use crate::horizon::TimeHorizon;
use crate::opex::{AfterSalesDistribution, Breakpoint, LearningCurveSpec};

/// Name of the study file inside a study directory
pub const STUDY_FILE: &str = "study.json";

/// After-sales OPEX share used when a product gives none, in percent
pub const DEFAULT_AFTER_SALES: [f64; DISTRIBUTION_POINTS] =
    [8.0, 7.0, 6.0, 5.5, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0];

fn default_wacc() -> Option<f64> {
    Some(8.0)
}

fn default_multiplier() -> f64 {
    100.0
}

fn default_usd_eur() -> f64 {
    1.0
}

fn default_currency() -> Currency {
    Currency::Eur
}

/// Whole study: horizon, financial settings and products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub year_start: i32,
    pub year_end: i32,

    /// Weighted average cost of capital in percent; absent or 0 disables
    /// discounting
    #[serde(rename = "WACC", default = "default_wacc")]
    pub wacc: Option<f64>,

    #[serde(default)]
    pub discount_mode: DiscountMode,

    /// Currency the input tables are expressed in
    #[serde(default = "default_currency")]
    pub currency: Currency,

    /// EUR for one USD
    #[serde(default = "default_usd_eur")]
    pub usd_eur: f64,

    #[serde(default)]
    pub escalation_capex: EscalationConfig,

    #[serde(default)]
    pub escalation_opex: EscalationConfig,

    pub products: Vec<ProductConfig>,
}

/// Make/Buy split and breakpoints as two parallel lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurveConfig {
    #[serde(default)]
    pub percentage_make: f64,
    pub learning_curve_coefficient: Vec<f64>,
    pub until_product_rank: Vec<u32>,
}

impl LearningCurveConfig {
    pub fn to_spec(&self) -> ValueResult<LearningCurveSpec> {
        if self.learning_curve_coefficient.len() != self.until_product_rank.len() {
            return Err(ValueError::LengthMismatch {
                series: "learning_curve_coefficient".to_string(),
                expected: self.until_product_rank.len(),
                actual: self.learning_curve_coefficient.len(),
            });
        }
        let breakpoints = self
            .until_product_rank
            .iter()
            .zip(&self.learning_curve_coefficient)
            .map(|(&rank, &coefficient)| Breakpoint::new(rank, coefficient))
            .collect();
        LearningCurveSpec::new(self.percentage_make, breakpoints)
    }
}

/// Paths of a product's tables, relative to the study directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePaths {
    pub capex: PathBuf,
    pub capex_distribution: PathBuf,
    pub opex: PathBuf,
    pub sales: PathBuf,
    pub sale_price: PathBuf,
    /// Without a table every category is expensed in the year it is spent
    #[serde(default)]
    pub amortization: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub launch_year: i32,

    #[serde(default = "default_multiplier")]
    pub capex_multiplier: f64,

    #[serde(default = "default_multiplier")]
    pub opex_multiplier: f64,

    /// Overrides the study-wide setting when present
    #[serde(default)]
    pub escalation_capex: Option<EscalationConfig>,

    #[serde(default)]
    pub escalation_opex: Option<EscalationConfig>,

    #[serde(rename = "learning_curve_product_dict", default)]
    pub learning_curve: Option<LearningCurveConfig>,

    #[serde(rename = "after_sales_opex_unit", default)]
    pub after_sales: Option<[f64; DISTRIBUTION_POINTS]>,

    #[serde(default)]
    pub payment_terms: PaymentTerms,

    pub tables: TablePaths,
}

impl ProductConfig {
    pub fn learning_curve(&self) -> ValueResult<LearningCurveSpec> {
        match &self.learning_curve {
            Some(config) => config.to_spec(),
            None => Ok(LearningCurveSpec::buy_only()),
        }
    }

    pub fn after_sales(&self) -> ValueResult<AfterSalesDistribution> {
        AfterSalesDistribution::new(self.after_sales.unwrap_or(DEFAULT_AFTER_SALES))
    }

    pub fn payment_terms(&self) -> PaymentTerms {
        self.payment_terms
    }
}

impl StudyConfig {
    /// Read `study.json` from a study directory
    pub fn load(study_dir: &Path) -> Result<Self> {
        Self::from_file(&study_dir.join(STUDY_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading study file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing study file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn horizon(&self) -> ValueResult<TimeHorizon> {
        TimeHorizon::new(self.year_start, self.year_end)
    }

    pub fn exchange_rate(&self) -> ExchangeRate {
        ExchangeRate::new(self.usd_eur)
    }

    pub fn capex_escalation(&self, product: &ProductConfig) -> Escalation {
        product
            .escalation_capex
            .as_ref()
            .unwrap_or(&self.escalation_capex)
            .resolve(&format!("{} capex escalation", product.name))
    }

    pub fn opex_escalation(&self, product: &ProductConfig) -> Escalation {
        product
            .escalation_opex
            .as_ref()
            .unwrap_or(&self.escalation_opex)
            .resolve(&format!("{} opex escalation", product.name))
    }

    /// Value block settings shared by every product; amortization comes
    /// from each product's own table
    pub fn cashflow_config(&self, product: &ProductConfig) -> CashflowConfig {
        CashflowConfig {
            wacc: wacc_from_percent(self.wacc),
            discount_mode: self.discount_mode,
            payment_terms: product.payment_terms(),
            ..CashflowConfig::default()
        }
    }

    /// Eager structural checks on everything that does not need the CSV
    /// tables
    pub fn validate(&self) -> ValueResult<()> {
        self.horizon()?;
        for product in &self.products {
            product.learning_curve()?;
            product.after_sales()?;
        }
        Ok(())
    }

    pub fn product(&self, name: &str) -> Option<&ProductConfig> {
        self.products.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MINIMAL: &str = r#"{
        "year_start": 2020,
        "year_end": 2030,
        "products": [{
            "name": "p1",
            "launch_year": 2024,
            "tables": {
                "capex": "capex.csv",
                "capex_distribution": "distribution.csv",
                "opex": "opex.csv",
                "sales": "sales.csv",
                "sale_price": "price.csv"
            }
        }]
    }"#;

    #[test]
    fn test_defaults() {
        let study = StudyConfig::from_json(MINIMAL).unwrap();
        assert_eq!(study.wacc, Some(8.0));
        assert_eq!(study.discount_mode, DiscountMode::Annual);
        assert_eq!(study.currency, Currency::Eur);
        assert_eq!(study.usd_eur, 1.0);

        let product = &study.products[0];
        assert_eq!(product.capex_multiplier, 100.0);
        assert_eq!(product.learning_curve().unwrap(), LearningCurveSpec::buy_only());
        assert_eq!(product.after_sales().unwrap().percentages(), &DEFAULT_AFTER_SALES);
        assert_eq!(product.payment_terms(), PaymentTerms::at_delivery());
        assert!(product.tables.amortization.is_none());

        let config = study.cashflow_config(product);
        assert_relative_eq!(config.wacc, 0.08);
        assert!(study.validate().is_ok());
    }

    #[test]
    fn test_escalation_override() {
        let mut study = StudyConfig::from_json(MINIMAL).unwrap();
        study.escalation_capex = EscalationConfig::new(2015, 2.0);
        let product = study.products[0].clone();
        assert_eq!(study.capex_escalation(&product), Escalation::new(2015, 0.02));

        study.products[0].escalation_capex = Some(EscalationConfig::new(2019, 3.0));
        let product = study.products[0].clone();
        assert_eq!(study.capex_escalation(&product), Escalation::new(2019, 0.03));
        // Nothing given at all
        assert_eq!(study.opex_escalation(&product), Escalation::new(2010, 0.0));
    }

    #[test]
    fn test_learning_curve_lists() {
        let config = LearningCurveConfig {
            percentage_make: 40.0,
            learning_curve_coefficient: vec![0.8, 0.9],
            until_product_rank: vec![50, 200],
        };
        let spec = config.to_spec().unwrap();
        assert_eq!(spec.breakpoints().len(), 2);
        assert_eq!(spec.reference_rank(), 200);

        let uneven = LearningCurveConfig {
            until_product_rank: vec![50],
            ..config
        };
        assert!(matches!(uneven.to_spec(), Err(ValueError::LengthMismatch { .. })));
    }

    #[test]
    fn test_invalid_payment_terms_rejected() {
        let text = MINIMAL.replace(
            "\"launch_year\": 2024,",
            "\"launch_year\": 2024, \"payment_terms\": {\"percentage_at_delivery_year-1\": 70, \"percentage_at_delivery_year-2\": 40},",
        );
        let err = StudyConfig::from_json(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("at most 100% allowed"), "{:#}", err);
    }

    #[test]
    fn test_wacc_zero_disables_discounting() {
        let text = MINIMAL.replace("\"year_end\": 2030,", "\"year_end\": 2030, \"WACC\": 0,");
        let study = StudyConfig::from_json(&text).unwrap();
        let config = study.cashflow_config(&study.products[0]);
        assert_eq!(config.wacc, 0.0);
    }
}
