//! Scalar metrics derived from a ledger

use serde::{Deserialize, Serialize};

use super::irr::{compute_irr, irr_or_sentinel};
use super::ledger::CashflowLedger;
use crate::capex::CapexProfile;
use crate::opex::OpexProfile;

/// Return and exposure metrics of a ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowInfo {
    /// Smallest non-negative IRR, `None` when there is none
    pub irr: Option<f64>,
    /// Last cumulative discounted cash flow
    pub npv: f64,
    /// First year with a strictly positive cumulative cash flow
    pub year_break_even_cashflow: Option<i32>,
    /// First year with a strictly positive cumulative discounted cash flow
    pub year_break_even_discounted_cashflow: Option<i32>,
    /// Lowest cumulative cash flow
    pub peak_exposure: f64,
    /// Last cumulative cash flow
    pub total_free_cash_flow: f64,
}

impl CashflowInfo {
    /// Derive the metrics from a discounted ledger
    pub fn from_ledger(ledger: &CashflowLedger) -> Self {
        let cash_flow = ledger.column(|r| r.cash_flow);
        let last = ledger.last();

        Self {
            irr: compute_irr(&cash_flow),
            npv: last.map(|r| r.cumulative_discounted_cf).unwrap_or(0.0),
            year_break_even_cashflow: first_positive_year(ledger, |r| r.cumulative_cash_flow),
            year_break_even_discounted_cashflow: first_positive_year(ledger, |r| {
                r.cumulative_discounted_cf
            }),
            peak_exposure: ledger
                .rows
                .iter()
                .map(|r| r.cumulative_cash_flow)
                .reduce(f64::min)
                .unwrap_or(0.0),
            total_free_cash_flow: last.map(|r| r.cumulative_cash_flow).unwrap_or(0.0),
        }
    }

    /// IRR for flat exports, [`IRR_SENTINEL`](super::irr::IRR_SENTINEL) when absent
    pub fn irr_value(&self) -> f64 {
        irr_or_sentinel(self.irr)
    }

    /// Same metrics with monetary amounts multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> CashflowInfo {
        CashflowInfo {
            npv: self.npv * factor,
            peak_exposure: self.peak_exposure * factor,
            total_free_cash_flow: self.total_free_cash_flow * factor,
            ..self.clone()
        }
    }
}

fn first_positive_year<F: Fn(&super::ledger::CashflowRow) -> f64>(
    ledger: &CashflowLedger,
    f: F,
) -> Option<i32> {
    ledger.rows.iter().find(|r| f(r) > 0.0).map(|r| r.years)
}

/// Key assumptions of a product or a portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisSummary {
    /// Units sold over the horizon
    pub total_cumul_sales: i64,
    /// CAPEX including contingency over the horizon
    pub total_cumul_capex: f64,
    pub year_start_escalation_capex: i32,
    pub year_start_escalation_opex: i32,
    pub last_year: i32,
    /// Escalated unit OPEX of the last year
    pub opex_last_year: f64,
    pub sale_price_last_year: f64,
    pub contribution_margin_last_year: f64,
}

impl HypothesisSummary {
    /// Summarize one product from its ledger and cost profiles
    pub fn from_product(
        ledger: &CashflowLedger,
        capex: &CapexProfile,
        opex: &OpexProfile,
    ) -> Self {
        let total_sales: f64 = ledger.rows.iter().map(|r| r.quantity).sum();
        let opex_last_year = opex.opex.last().copied().unwrap_or(0.0);
        let sale_price_last_year = ledger.last().map(|r| r.sale_price).unwrap_or(0.0);

        let mut summary = Self {
            total_cumul_sales: total_sales as i64,
            total_cumul_capex: capex.total(),
            year_start_escalation_capex: capex.escalation.reference_year,
            year_start_escalation_opex: opex.escalation.reference_year,
            last_year: ledger.horizon.year_end,
            opex_last_year,
            sale_price_last_year,
            contribution_margin_last_year: 0.0,
        };
        summary.refresh_margin();
        summary
    }

    /// Recompute the contribution margin, 0 when the price is 0
    pub fn refresh_margin(&mut self) {
        self.contribution_margin_last_year = contribution_margin(
            self.sale_price_last_year,
            self.opex_last_year,
        );
    }

    /// Same summary with monetary amounts multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> HypothesisSummary {
        HypothesisSummary {
            total_cumul_capex: self.total_cumul_capex * factor,
            opex_last_year: self.opex_last_year * factor,
            sale_price_last_year: self.sale_price_last_year * factor,
            ..self.clone()
        }
    }
}

/// `(price - opex) / price`, 0 for a zero price
pub fn contribution_margin(sale_price: f64, opex: f64) -> f64 {
    if sale_price != 0.0 {
        (sale_price - opex) / sale_price
    } else {
        0.0
    }
}
