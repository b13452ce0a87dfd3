//! Roll-up of several products into one portfolio view
//!
//! Ledgers are summed year by year. Metrics that do not add up (IRR,
//! break-even years, margins) are derived again from the summed series.

use log::debug;

use crate::cashflow::{CashflowInfo, CashflowLedger, HypothesisSummary};
use crate::error::{ValueError, ValueResult};

/// Element-wise yearly sum of ledgers sharing one horizon
pub fn sum_cashflows(ledgers: &[CashflowLedger]) -> ValueResult<CashflowLedger> {
    let (first, rest) = ledgers.split_first().ok_or(ValueError::EmptyAggregation)?;
    let total = rest
        .iter()
        .try_fold(first.clone(), |acc, ledger| acc.add(ledger))?;
    debug!("summed {} ledgers over {}", ledgers.len(), total.horizon);
    Ok(total)
}

/// Summary metrics of a summed ledger, each break-even year read from its
/// own cumulative series
pub fn compute_cf_df_info(summed: &CashflowLedger) -> CashflowInfo {
    CashflowInfo::from_ledger(summed)
}

/// Fix the non-additive fields of a summed hypothesis summary: escalation
/// years and last year come from the first child, the margin is recomputed
pub fn compute_hypothesis_df_info(
    summary: &HypothesisSummary,
    children: &[HypothesisSummary],
) -> ValueResult<HypothesisSummary> {
    let first = children.first().ok_or(ValueError::EmptyAggregation)?;
    let mut out = summary.clone();
    out.year_start_escalation_capex = first.year_start_escalation_capex;
    out.year_start_escalation_opex = first.year_start_escalation_opex;
    out.last_year = first.last_year;
    out.refresh_margin();
    Ok(out)
}

/// Add up child summaries field by field, then fix the non-additive fields
pub fn sum_hypotheses(children: &[HypothesisSummary]) -> ValueResult<HypothesisSummary> {
    let (first, rest) = children.split_first().ok_or(ValueError::EmptyAggregation)?;
    let mut total = first.clone();
    for child in rest {
        total.total_cumul_sales += child.total_cumul_sales;
        total.total_cumul_capex += child.total_cumul_capex;
        total.opex_last_year += child.opex_last_year;
        total.sale_price_last_year += child.sale_price_last_year;
    }
    compute_hypothesis_df_info(&total, children)
}
