//! Yearly cash-flow ledger

use serde::{Deserialize, Serialize};

use crate::error::{ValueError, ValueResult};
use crate::horizon::TimeHorizon;

/// A single row of the ledger for one year.
///
/// Column names follow the exported table layout, which keeps a few legacy
/// capitalized names (`Inventory`, `EBIT`, `*_PnL`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    pub years: i32,

    // Volumes and price
    pub quantity: f64,
    pub cumulative_quantity: f64,
    pub sale_price: f64,

    // Investment
    pub capex: f64,
    pub contingency: f64,
    pub capex_amort: f64,
    #[serde(rename = "capex_amort_EBIT")]
    pub capex_amort_ebit: f64,
    pub capex_non_amort: f64,

    // Operating costs (per unit for opex and opex_after_sales)
    pub opex: f64,
    pub opex_after_sales: f64,
    pub opex_total: f64,
    pub opex_total_pay: f64,
    #[serde(rename = "Inventory")]
    pub inventory: f64,

    // Cash view
    pub cash_in: f64,
    pub cash_out: f64,
    pub cash_flow: f64,
    pub cumulative_cash_flow: f64,
    pub discounted_cf: f64,
    pub cumulative_discounted_cf: f64,

    // Accrual view
    #[serde(rename = "cash_in_PnL")]
    pub cash_in_pnl: f64,
    #[serde(rename = "cash_out_PnL")]
    pub cash_out_pnl: f64,
    #[serde(rename = "EBIT")]
    pub ebit: f64,
    #[serde(rename = "cumulative_EBIT")]
    pub cumulative_ebit: f64,
}

impl CashflowRow {
    pub fn new(years: i32) -> Self {
        Self {
            years,
            ..Default::default()
        }
    }

    /// Multiply every monetary column by `factor`; years and quantities are kept
    pub fn scale_monetary(&mut self, factor: f64) {
        for value in self.monetary_mut() {
            *value *= factor;
        }
    }

    /// Add the numeric columns of `other` to this row
    fn accumulate(&mut self, other: &CashflowRow) {
        self.quantity += other.quantity;
        self.cumulative_quantity += other.cumulative_quantity;
        for (value, add) in self.monetary_mut().into_iter().zip(other.monetary()) {
            *value += add;
        }
    }

    fn monetary(&self) -> Vec<f64> {
        vec![
            self.sale_price,
            self.capex,
            self.contingency,
            self.capex_amort,
            self.capex_amort_ebit,
            self.capex_non_amort,
            self.opex,
            self.opex_after_sales,
            self.opex_total,
            self.opex_total_pay,
            self.inventory,
            self.cash_in,
            self.cash_out,
            self.cash_flow,
            self.cumulative_cash_flow,
            self.discounted_cf,
            self.cumulative_discounted_cf,
            self.cash_in_pnl,
            self.cash_out_pnl,
            self.ebit,
            self.cumulative_ebit,
        ]
    }

    fn monetary_mut(&mut self) -> Vec<&mut f64> {
        vec![
            &mut self.sale_price,
            &mut self.capex,
            &mut self.contingency,
            &mut self.capex_amort,
            &mut self.capex_amort_ebit,
            &mut self.capex_non_amort,
            &mut self.opex,
            &mut self.opex_after_sales,
            &mut self.opex_total,
            &mut self.opex_total_pay,
            &mut self.inventory,
            &mut self.cash_in,
            &mut self.cash_out,
            &mut self.cash_flow,
            &mut self.cumulative_cash_flow,
            &mut self.discounted_cf,
            &mut self.cumulative_discounted_cf,
            &mut self.cash_in_pnl,
            &mut self.cash_out_pnl,
            &mut self.ebit,
            &mut self.cumulative_ebit,
        ]
    }
}

/// One row per horizon year, in calendar order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowLedger {
    pub horizon: TimeHorizon,
    pub rows: Vec<CashflowRow>,
}

impl CashflowLedger {
    /// Empty ledger: one zeroed row per horizon year
    pub fn new(horizon: TimeHorizon) -> Self {
        Self {
            horizon,
            rows: horizon.years().map(CashflowRow::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&CashflowRow> {
        self.rows.last()
    }

    /// Extract one column
    pub fn column<F: Fn(&CashflowRow) -> f64>(&self, f: F) -> Vec<f64> {
        self.rows.iter().map(f).collect()
    }

    /// Write `values` into one column, row by row
    pub fn set_column<F: Fn(&mut CashflowRow, f64)>(&mut self, values: &[f64], f: F) {
        for (row, &value) in self.rows.iter_mut().zip(values) {
            f(row, value);
        }
    }

    /// Same ledger with every monetary column multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> CashflowLedger {
        let mut out = self.clone();
        for row in &mut out.rows {
            row.scale_monetary(factor);
        }
        out
    }

    /// Element-wise yearly sum with another ledger on the same horizon
    pub fn add(&self, other: &CashflowLedger) -> ValueResult<CashflowLedger> {
        if self.horizon != other.horizon {
            return Err(ValueError::HorizonMismatch {
                left: self.horizon.to_string(),
                right: other.horizon.to_string(),
            });
        }
        let mut out = self.clone();
        for (row, add) in out.rows.iter_mut().zip(&other.rows) {
            row.accumulate(add);
        }
        Ok(out)
    }

    /// Write the ledger as CSV, one row per year
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(cash: f64) -> CashflowLedger {
        let mut ledger = CashflowLedger::new(TimeHorizon::new(2020, 2022).unwrap());
        for row in &mut ledger.rows {
            row.quantity = 2.0;
            row.cash_flow = cash;
            row.sale_price = 10.0;
        }
        ledger
    }

    #[test]
    fn test_add_sums_columns_and_keeps_years() {
        let total = ledger(5.0).add(&ledger(-1.0)).unwrap();
        assert_eq!(total.column(|r| r.years as f64), vec![2020.0, 2021.0, 2022.0]);
        assert_eq!(total.column(|r| r.cash_flow), vec![4.0; 3]);
        assert_eq!(total.column(|r| r.quantity), vec![4.0; 3]);
    }

    #[test]
    fn test_add_rejects_other_horizon() {
        let other = CashflowLedger::new(TimeHorizon::new(2020, 2030).unwrap());
        assert!(matches!(
            ledger(1.0).add(&other),
            Err(ValueError::HorizonMismatch { .. })
        ));
    }

    #[test]
    fn test_scaled_leaves_quantities() {
        let scaled = ledger(5.0).scaled(0.5);
        assert_eq!(scaled.rows[0].cash_flow, 2.5);
        assert_eq!(scaled.rows[0].sale_price, 5.0);
        assert_eq!(scaled.rows[0].quantity, 2.0);
        assert_eq!(scaled.rows[0].years, 2020);
    }

    #[test]
    fn test_csv_header_uses_export_names() {
        let mut out = Vec::new();
        ledger(1.0).write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("years,quantity,cumulative_quantity,sale_price"));
        assert!(header.contains("capex_amort_EBIT"));
        assert!(header.contains("Inventory"));
        assert!(header.ends_with("EBIT,cumulative_EBIT"));
        assert_eq!(text.lines().count(), 4);
    }
}
