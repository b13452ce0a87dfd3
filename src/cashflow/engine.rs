//! Value block: yearly cash-flow and P&L ledger of one product
//!
//! The ledger is built by a fixed sequence of pure stages, each taking the
//! ledger by value and returning it with more columns filled:
//!
//! `merge -> cost -> revenue -> discount -> pnl`
//!
//! `discount` follows the configured [`DiscountMode`]; `pnl` only reads
//! accrual columns and does not depend on it.

use log::debug;

use super::amortization::{straight_line, AmortizationSchedule};
use super::discount::{discount_factors, DiscountMode};
use super::ledger::CashflowLedger;
use super::payment::PaymentTerms;
use super::summary::CashflowInfo;
use crate::capex::CapexProfile;
use crate::error::{ValueError, ValueResult};
use crate::horizon::{cumsum, SalesSeries, TimeHorizon, YearlyTable};
use crate::opex::OpexProfile;

/// Configuration for a value block run
#[derive(Debug, Clone)]
pub struct CashflowConfig {
    /// Weighted average cost of capital as a decimal
    pub wacc: f64,

    /// Annual or quarterly-equivalent discounting
    pub discount_mode: DiscountMode,

    /// Advance payment of production costs
    pub payment_terms: PaymentTerms,

    /// Amortization period per CAPEX category
    pub amortization: AmortizationSchedule,
}

impl Default for CashflowConfig {
    fn default() -> Self {
        Self {
            wacc: 0.08,
            discount_mode: DiscountMode::Annual,
            payment_terms: PaymentTerms::at_delivery(),
            amortization: AmortizationSchedule::new(),
        }
    }
}

/// Complete value block result
#[derive(Debug, Clone)]
pub struct CashflowResult {
    pub ledger: CashflowLedger,
    pub info: CashflowInfo,
}

/// Cash-flow assembler for one product
pub struct CashflowEngine {
    horizon: TimeHorizon,
    config: CashflowConfig,
}

impl CashflowEngine {
    pub fn new(horizon: TimeHorizon, config: CashflowConfig) -> Self {
        Self { horizon, config }
    }

    pub fn config(&self) -> &CashflowConfig {
        &self.config
    }

    /// Full cash view: every stage, then the summary metrics
    pub fn compute_cashflow(
        &self,
        capex: &CapexProfile,
        opex: &OpexProfile,
        sales: &SalesSeries,
        prices: &YearlyTable,
    ) -> ValueResult<CashflowResult> {
        let ledger = self.merge(capex, opex, sales, prices)?;
        let ledger = self.cost(ledger, capex);
        let ledger = Self::revenue(ledger);
        let ledger = self.discount(ledger);
        let ledger = Self::pnl(ledger);
        let info = CashflowInfo::from_ledger(&ledger);

        debug!(
            "value block over {}: npv {:.2}, irr {:?}",
            self.horizon, info.npv, info.irr
        );
        Ok(CashflowResult { ledger, info })
    }

    /// Accrual view only: no discounting, no summary
    pub fn compute_pnl(
        &self,
        capex: &CapexProfile,
        opex: &OpexProfile,
        sales: &SalesSeries,
        prices: &YearlyTable,
    ) -> ValueResult<CashflowLedger> {
        let ledger = self.merge(capex, opex, sales, prices)?;
        let ledger = self.cost(ledger, capex);
        let ledger = Self::revenue(ledger);
        Ok(Self::pnl(ledger))
    }

    /// Join CAPEX, unit OPEX, sale price and sales on the horizon years.
    /// Years absent from a table read as 0.
    pub fn merge(
        &self,
        capex: &CapexProfile,
        opex: &OpexProfile,
        sales: &SalesSeries,
        prices: &YearlyTable,
    ) -> ValueResult<CashflowLedger> {
        for other in [capex.horizon, opex.horizon] {
            if other != self.horizon {
                return Err(ValueError::HorizonMismatch {
                    left: self.horizon.to_string(),
                    right: other.to_string(),
                });
            }
        }

        let quantity = sales.aligned_quantity(&self.horizon);
        let mut ledger = CashflowLedger::new(self.horizon);
        ledger.set_column(&capex.capex, |r, v| r.capex = v);
        ledger.set_column(&capex.contingency, |r, v| r.contingency = v);
        ledger.set_column(&opex.opex, |r, v| r.opex = v);
        ledger.set_column(&opex.opex_after_sales, |r, v| r.opex_after_sales = v);
        ledger.set_column(&prices.aligned(&self.horizon), |r, v| r.sale_price = v);
        ledger.set_column(&quantity, |r, v| r.quantity = v);
        ledger.set_column(&cumsum(&quantity), |r, v| r.cumulative_quantity = v);
        Ok(ledger)
    }

    /// Production costs with payment terms, CAPEX split by amortization,
    /// cash and accrual outflows, inventory
    pub fn cost(&self, mut ledger: CashflowLedger, capex: &CapexProfile) -> CashflowLedger {
        let opex_total: Vec<f64> = ledger.column(|r| r.opex * r.quantity);
        let opex_total_pay = self.config.payment_terms.schedule(&opex_total);

        let mut capex_amort = self.horizon.zeros();
        let mut capex_amort_ebit = self.horizon.zeros();
        let mut capex_non_amort = capex.contingency.clone();
        for category in &capex.categories {
            let years = self.config.amortization.years_for(&category.category);
            if years >= 1 {
                let spread = straight_line(&category.values, years);
                for i in 0..capex_amort.len() {
                    capex_amort[i] += category.values[i];
                    capex_amort_ebit[i] += spread[i];
                }
            } else {
                for (acc, v) in capex_non_amort.iter_mut().zip(&category.values) {
                    *acc += v;
                }
            }
        }

        let inventory: Vec<f64> = cumsum(&opex_total_pay)
            .iter()
            .zip(cumsum(&opex_total))
            .map(|(paid, consumed)| paid - consumed)
            .collect();

        for (i, row) in ledger.rows.iter_mut().enumerate() {
            let after_sales = row.opex_after_sales * row.quantity;
            row.opex_total = opex_total[i];
            row.opex_total_pay = opex_total_pay[i];
            row.capex_amort = capex_amort[i];
            row.capex_amort_ebit = capex_amort_ebit[i];
            row.capex_non_amort = capex_non_amort[i];
            row.cash_out = -row.capex_amort - row.capex_non_amort - row.opex_total_pay - after_sales;
            row.cash_out_pnl = -row.capex_non_amort - row.capex_amort_ebit - row.opex_total - after_sales;
            row.inventory = inventory[i];
        }
        ledger
    }

    /// Sales revenue. Only reads merged columns, so running it twice changes
    /// nothing.
    pub fn revenue(mut ledger: CashflowLedger) -> CashflowLedger {
        for row in &mut ledger.rows {
            row.cash_in = row.quantity * row.sale_price;
            row.cash_in_pnl = row.cash_in;
        }
        ledger
    }

    /// Net cash flow, discounted at the per-period rate of the discount mode
    pub fn discount(&self, mut ledger: CashflowLedger) -> CashflowLedger {
        let rate = self.config.discount_mode.period_rate(self.config.wacc);
        let factors = discount_factors(rate, ledger.len());

        let cash_flow = ledger.column(|r| r.cash_in + r.cash_out);
        let discounted: Vec<f64> = cash_flow.iter().zip(&factors).map(|(cf, f)| cf * f).collect();

        ledger.set_column(&cash_flow, |r, v| r.cash_flow = v);
        ledger.set_column(&cumsum(&cash_flow), |r, v| r.cumulative_cash_flow = v);
        ledger.set_column(&discounted, |r, v| r.discounted_cf = v);
        ledger.set_column(&cumsum(&discounted), |r, v| r.cumulative_discounted_cf = v);
        ledger
    }

    /// EBIT from the accrual columns
    pub fn pnl(mut ledger: CashflowLedger) -> CashflowLedger {
        let ebit = ledger.column(|r| r.cash_in_pnl + r.cash_out_pnl);
        ledger.set_column(&ebit, |r, v| r.ebit = v);
        ledger.set_column(&cumsum(&ebit), |r, v| r.cumulative_ebit = v);
        ledger
    }
}
