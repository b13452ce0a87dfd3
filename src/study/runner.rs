//! Study runner: evaluates products and rolls them up into a portfolio
//!
//! The study file and its tables are read once; each product is then
//! evaluated independently, so the portfolio run fans out over rayon.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;

use crate::aggregation::{compute_cf_df_info, sum_cashflows, sum_hypotheses};
use crate::capex::{CapexEngine, CapexProfile};
use crate::cashflow::{
    CashflowConfig, CashflowEngine, CashflowInfo, CashflowLedger, Currency, DiscountMode,
    ExchangeRate, HypothesisSummary,
};
use crate::error::ValueResult;
use crate::horizon::TimeHorizon;
use crate::opex::{OpexEngine, OpexProfile};

use super::config::{ProductConfig, StudyConfig};
use super::loader::ProductTables;

/// Everything computed for one product
#[derive(Debug, Clone)]
pub struct ProductValuation {
    pub name: String,
    pub capex: CapexProfile,
    /// Unit OPEX
    pub opex: OpexProfile,
    /// OPEX multiplied by the yearly quantity
    pub opex_total: OpexProfile,
    pub ledger: CashflowLedger,
    pub info: CashflowInfo,
    pub hypothesis: HypothesisSummary,
}

impl ProductValuation {
    /// Same valuation with every monetary figure converted
    pub fn converted(&self, rate: &ExchangeRate, from: Currency, to: Currency) -> Self {
        Self {
            name: self.name.clone(),
            capex: rate.convert_capex(&self.capex, from, to),
            opex: rate.convert_opex(&self.opex, from, to),
            opex_total: rate.convert_opex(&self.opex_total, from, to),
            ledger: rate.convert_ledger(&self.ledger, from, to),
            info: rate.convert_info(&self.info, from, to),
            hypothesis: rate.convert_hypothesis(&self.hypothesis, from, to),
        }
    }
}

/// Portfolio roll-up with the per-product detail
#[derive(Debug, Clone)]
pub struct PortfolioValuation {
    pub currency: Currency,
    pub products: Vec<ProductValuation>,
    pub ledger: CashflowLedger,
    pub info: CashflowInfo,
    pub hypothesis: HypothesisSummary,
}

impl PortfolioValuation {
    /// Combine product valuations sharing one horizon
    pub fn from_products(currency: Currency, products: Vec<ProductValuation>) -> ValueResult<Self> {
        let ledgers: Vec<CashflowLedger> = products.iter().map(|p| p.ledger.clone()).collect();
        let hypotheses: Vec<HypothesisSummary> =
            products.iter().map(|p| p.hypothesis.clone()).collect();

        let ledger = sum_cashflows(&ledgers)?;
        let info = compute_cf_df_info(&ledger);
        let hypothesis = sum_hypotheses(&hypotheses)?;
        Ok(Self {
            currency,
            products,
            ledger,
            info,
            hypothesis,
        })
    }

    /// Express every monetary output in `to`
    pub fn in_currency(&self, rate: &ExchangeRate, to: Currency) -> Self {
        let from = self.currency;
        Self {
            currency: to,
            products: self
                .products
                .iter()
                .map(|p| p.converted(rate, from, to))
                .collect(),
            ledger: rate.convert_ledger(&self.ledger, from, to),
            info: rate.convert_info(&self.info, from, to),
            hypothesis: rate.convert_hypothesis(&self.hypothesis, from, to),
        }
    }
}

/// Evaluates the products of one study
#[derive(Debug, Clone)]
pub struct StudyRunner {
    study: StudyConfig,
    study_dir: PathBuf,
    horizon: TimeHorizon,
}

impl StudyRunner {
    /// Read and check `study.json` from `study_dir`
    pub fn from_dir(study_dir: &Path) -> Result<Self> {
        let study = StudyConfig::load(study_dir)?;
        Self::with_study(study, study_dir)
    }

    /// Use an already parsed study; table paths resolve against `study_dir`
    pub fn with_study(study: StudyConfig, study_dir: &Path) -> Result<Self> {
        study
            .validate()
            .with_context(|| format!("invalid study in {}", study_dir.display()))?;
        let horizon = study.horizon()?;
        Ok(Self {
            study,
            study_dir: study_dir.to_path_buf(),
            horizon,
        })
    }

    /// Override the discount mode of the study file
    pub fn with_discount_mode(mut self, mode: DiscountMode) -> Self {
        self.study.discount_mode = mode;
        self
    }

    pub fn study(&self) -> &StudyConfig {
        &self.study
    }

    pub fn horizon(&self) -> TimeHorizon {
        self.horizon
    }

    /// Evaluate one product from tables already in memory
    pub fn evaluate(&self, product: &ProductConfig, tables: &ProductTables) -> ValueResult<ProductValuation> {
        let capex = CapexEngine::new(
            self.horizon,
            product.launch_year,
            self.study.capex_escalation(product),
        )
        .compute(&tables.capex, &tables.distribution, product.capex_multiplier)?;

        let opex = OpexEngine::new(
            self.horizon,
            product.launch_year,
            self.study.opex_escalation(product),
        )
        .compute(
            &tables.opex,
            &tables.sales,
            &product.after_sales()?,
            &product.learning_curve()?,
            product.opex_multiplier,
        )?;

        let config = CashflowConfig {
            amortization: tables.amortization.clone(),
            ..self.study.cashflow_config(product)
        };
        let result = CashflowEngine::new(self.horizon, config).compute_cashflow(
            &capex,
            &opex,
            &tables.sales,
            &tables.sale_price,
        )?;
        let hypothesis = HypothesisSummary::from_product(&result.ledger, &capex, &opex);

        info!(
            "{}: npv {:.2}, irr {:?}, break-even {:?}",
            product.name, result.info.npv, result.info.irr, result.info.year_break_even_cashflow
        );
        Ok(ProductValuation {
            name: product.name.clone(),
            opex_total: opex.totals(),
            capex,
            opex,
            ledger: result.ledger,
            info: result.info,
            hypothesis,
        })
    }

    /// Load one product's tables and evaluate it
    pub fn run_product(&self, product: &ProductConfig) -> Result<ProductValuation> {
        let tables = ProductTables::load(&self.study_dir, product)
            .with_context(|| format!("loading tables of product {}", product.name))?;
        self.evaluate(product, &tables)
            .with_context(|| format!("evaluating product {}", product.name))
    }

    /// Evaluate the named product
    pub fn run_named(&self, name: &str) -> Result<ProductValuation> {
        let product = self
            .study
            .product(name)
            .with_context(|| format!("no product named {} in the study", name))?;
        self.run_product(product)
    }

    /// Evaluate every product in parallel and roll them up
    pub fn run(&self) -> Result<PortfolioValuation> {
        let products = self
            .study
            .products
            .par_iter()
            .map(|product| self.run_product(product))
            .collect::<Result<Vec<_>>>()?;
        let portfolio = PortfolioValuation::from_products(self.study.currency, products)
            .context("aggregating products")?;
        info!(
            "portfolio of {} products: npv {:.2}, irr {:?}",
            portfolio.products.len(),
            portfolio.info.npv,
            portfolio.info.irr
        );
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::loader::DEFAULT_STUDY_PATH;
    use approx::assert_relative_eq;

    fn runner() -> StudyRunner {
        StudyRunner::from_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_STUDY_PATH))
            .unwrap()
    }

    #[test]
    fn test_product_run_is_consistent() {
        let runner = runner();
        let valuation = runner.run_named("cabin_module").unwrap();
        let horizon = runner.horizon();

        assert_eq!(valuation.ledger.len(), horizon.len());
        assert_eq!(valuation.capex.capex.len(), horizon.len());

        // Every category spend ends up amortized or expensed
        let amort: f64 = valuation.ledger.column(|r| r.capex_amort).iter().sum();
        let amort_ebit: f64 = valuation.ledger.column(|r| r.capex_amort_ebit).iter().sum();
        let non_amort: f64 = valuation.ledger.column(|r| r.capex_non_amort).iter().sum();
        let tooling: f64 = valuation.capex.category("tooling").unwrap().iter().sum();
        assert_relative_eq!(amort, tooling, max_relative = 1e-12);
        assert_relative_eq!(amort + non_amort, valuation.capex.total(), max_relative = 1e-12);
        assert!(amort_ebit <= amort + 1e-6);

        // Last cumulative cash flow is the free cash flow
        let last = valuation.ledger.last().unwrap();
        assert_relative_eq!(valuation.info.total_free_cash_flow, last.cumulative_cash_flow);
        assert_relative_eq!(valuation.info.npv, last.cumulative_discounted_cf);
        assert_eq!(valuation.hypothesis.last_year, horizon.year_end);
    }

    #[test]
    fn test_portfolio_is_sum_of_products() {
        let portfolio = runner().run().unwrap();
        assert_eq!(portfolio.products.len(), 2);

        let expected: f64 = portfolio.products.iter().map(|p| p.info.total_free_cash_flow).sum();
        assert_relative_eq!(portfolio.info.total_free_cash_flow, expected, max_relative = 1e-9);

        let sales: i64 = portfolio
            .products
            .iter()
            .map(|p| p.hypothesis.total_cumul_sales)
            .sum();
        assert_eq!(portfolio.hypothesis.total_cumul_sales, sales);
    }

    #[test]
    fn test_quarterly_override_changes_npv() {
        let annual = runner().run_named("cabin_module").unwrap();
        let quarterly = runner()
            .with_discount_mode(DiscountMode::Quarterly)
            .run_named("cabin_module")
            .unwrap();
        // Same cash, smaller per-period rate
        assert_relative_eq!(
            annual.info.total_free_cash_flow,
            quarterly.info.total_free_cash_flow
        );
        assert_ne!(annual.info.npv, quarterly.info.npv);
    }

    #[test]
    fn test_currency_conversion() {
        let portfolio = runner().run().unwrap();
        let rate = ExchangeRate::new(0.5);
        let usd = portfolio.in_currency(&rate, Currency::Usd);
        assert_eq!(usd.currency, Currency::Usd);
        assert_relative_eq!(usd.info.npv, portfolio.info.npv * 2.0, max_relative = 1e-12);
        assert_eq!(usd.info.irr, portfolio.info.irr);
        assert_eq!(usd.ledger.rows[3].quantity, portfolio.ledger.rows[3].quantity);
        assert_eq!(usd.hypothesis.total_cumul_sales, portfolio.hypothesis.total_cumul_sales);
    }

    #[test]
    fn test_converted_profiles_match_ledger() {
        let eur = runner().run_named("cabin_module").unwrap();
        let usd = eur.converted(&ExchangeRate::new(0.5), Currency::Eur, Currency::Usd);

        let ledger_capex: f64 = usd.ledger.column(|r| r.capex).iter().sum();
        assert_relative_eq!(ledger_capex, usd.capex.total(), max_relative = 1e-9);
        assert_relative_eq!(usd.capex.total(), eur.capex.total() * 2.0, max_relative = 1e-12);

        let last = usd.ledger.last().unwrap();
        let opex_total = usd.opex_total.opex.last().unwrap();
        assert_relative_eq!(last.opex_total, *opex_total, max_relative = 1e-9);
        assert_relative_eq!(usd.opex.opex[10], eur.opex.opex[10] * 2.0, max_relative = 1e-12);
        assert_eq!(usd.opex_total.quantity, eur.opex_total.quantity);
        assert_eq!(usd.opex.learning_curve_coef, eur.opex.learning_curve_coef);
    }

    #[test]
    fn test_unknown_product() {
        assert!(runner().run_named("nope").is_err());
    }
}
