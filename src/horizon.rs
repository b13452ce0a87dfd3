//! Study horizon and year-keyed input series
//!
//! Every output column is a `Vec<f64>` aligned to a [`TimeHorizon`]: index 0
//! is `year_start`, the last index is `year_end`. Input tables (sales, prices)
//! may cover other years and are aligned with a left join that fills absent
//! years with 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ValueError, ValueResult};

/// Inclusive range of calendar years covered by a study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHorizon")]
pub struct TimeHorizon {
    pub year_start: i32,
    pub year_end: i32,
}

#[derive(Deserialize)]
struct RawHorizon {
    year_start: i32,
    year_end: i32,
}

impl TryFrom<RawHorizon> for TimeHorizon {
    type Error = ValueError;

    fn try_from(raw: RawHorizon) -> ValueResult<Self> {
        Self::new(raw.year_start, raw.year_end)
    }
}

impl TimeHorizon {
    pub fn new(year_start: i32, year_end: i32) -> ValueResult<Self> {
        if year_end < year_start {
            return Err(ValueError::InvalidHorizon { year_start, year_end });
        }
        Ok(Self { year_start, year_end })
    }

    /// Number of years in the horizon
    pub fn len(&self) -> usize {
        (self.year_end - self.year_start + 1).max(0) as usize
    }

    /// False for any horizon built by `new` or deserialized, since both
    /// reject `year_end < year_start`
    pub fn is_empty(&self) -> bool {
        self.year_end < self.year_start
    }

    /// Calendar years in order
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.year_start..=self.year_end
    }

    /// Position of `year` in the horizon, if covered
    pub fn index_of(&self, year: i32) -> Option<usize> {
        if year < self.year_start || year > self.year_end {
            None
        } else {
            Some((year - self.year_start) as usize)
        }
    }

    /// Zero-filled series of horizon length
    pub fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.len()]
    }

    /// Build a series by evaluating `f` for every year
    pub fn map_years<F: FnMut(i32) -> f64>(&self, f: F) -> Vec<f64> {
        self.years().map(f).collect()
    }
}

impl std::fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year_start, self.year_end)
    }
}

/// Year-keyed values such as a sale price table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyTable {
    values: BTreeMap<i32, f64>,
}

impl YearlyTable {
    /// Build from `(year, value)` rows, rejecting repeated years
    pub fn from_rows<I>(table: &str, rows: I) -> ValueResult<Self>
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut values = BTreeMap::new();
        for (year, value) in rows {
            if values.insert(year, value).is_some() {
                return Err(ValueError::DuplicateYear {
                    table: table.to_string(),
                    year,
                });
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }

    /// Left join onto the horizon; absent years read as 0
    pub fn aligned(&self, horizon: &TimeHorizon) -> Vec<f64> {
        horizon.map_years(|y| self.get(y).unwrap_or(0.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.values.iter().map(|(&y, &v)| (y, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Yearly sales quantities, truncated to whole units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSales")]
pub struct SalesSeries {
    years: Vec<i32>,
    quantity: Vec<f64>,
    cumulative_quantity: Vec<f64>,
}

/// The running total is always rebuilt from the quantities
#[derive(Deserialize)]
struct RawSales {
    years: Vec<i32>,
    quantity: Vec<f64>,
}

impl TryFrom<RawSales> for SalesSeries {
    type Error = ValueError;

    fn try_from(raw: RawSales) -> ValueResult<Self> {
        if raw.years.len() != raw.quantity.len() {
            return Err(ValueError::LengthMismatch {
                series: "quantity".to_string(),
                expected: raw.years.len(),
                actual: raw.quantity.len(),
            });
        }
        Self::from_rows(raw.years.into_iter().zip(raw.quantity))
    }
}

impl SalesSeries {
    /// Build from `(year, quantity)` rows in any order.
    ///
    /// Quantities are truncated toward zero; the running total is taken over
    /// the table's own years, not the study horizon.
    pub fn from_rows<I>(rows: I) -> ValueResult<Self>
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let table = YearlyTable::from_rows("sales", rows)?;

        let mut years = Vec::with_capacity(table.len());
        let mut quantity = Vec::with_capacity(table.len());
        for (year, q) in table.iter() {
            if q < 0.0 || q.is_nan() {
                return Err(ValueError::NegativeQuantity { year, quantity: q });
            }
            years.push(year);
            quantity.push(q.trunc());
        }

        let cumulative_quantity = cumsum(&quantity);
        Ok(Self {
            years,
            quantity,
            cumulative_quantity,
        })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn quantity(&self) -> &[f64] {
        &self.quantity
    }

    pub fn cumulative_quantity(&self) -> &[f64] {
        &self.cumulative_quantity
    }

    pub fn max_cumulative(&self) -> f64 {
        self.cumulative_quantity.last().copied().unwrap_or(0.0)
    }

    /// Quantity per horizon year, 0 where the table has no entry
    pub fn aligned_quantity(&self, horizon: &TimeHorizon) -> Vec<f64> {
        align(horizon, &self.years, &self.quantity)
    }

    /// Table-wide running total per horizon year, 0 where the table has no entry
    pub fn aligned_cumulative(&self, horizon: &TimeHorizon) -> Vec<f64> {
        align(horizon, &self.years, &self.cumulative_quantity)
    }
}

/// Left join of a year-indexed column onto the horizon
pub(crate) fn align(horizon: &TimeHorizon, years: &[i32], values: &[f64]) -> Vec<f64> {
    let mut out = horizon.zeros();
    for (&year, &value) in years.iter().zip(values) {
        if let Some(idx) = horizon.index_of(year) {
            out[idx] = value;
        }
    }
    out
}

/// Running sum
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Value `offset` positions later, 0 past the end
pub(crate) fn lead(values: &[f64], offset: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| values.get(i + offset).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_indexing() {
        let horizon = TimeHorizon::new(2020, 2025).unwrap();
        assert_eq!(horizon.len(), 6);
        assert_eq!(horizon.index_of(2020), Some(0));
        assert_eq!(horizon.index_of(2025), Some(5));
        assert_eq!(horizon.index_of(2026), None);
        assert!(TimeHorizon::new(2025, 2020).is_err());
    }

    #[test]
    fn test_horizon_deserialization_is_checked() {
        let horizon: TimeHorizon =
            serde_json::from_str(r#"{"year_start": 2030, "year_end": 2030}"#).unwrap();
        assert_eq!(horizon.len(), 1);
        assert!(!horizon.is_empty());

        let reversed = serde_json::from_str::<TimeHorizon>(r#"{"year_start": 2030, "year_end": 2020}"#);
        assert!(reversed.is_err());
    }

    #[test]
    fn test_sales_truncation_and_cumulative() {
        let sales = SalesSeries::from_rows(vec![(2022, 3.9), (2020, 1.2), (2021, 0.0)]).unwrap();
        assert_eq!(sales.years(), &[2020, 2021, 2022]);
        assert_eq!(sales.quantity(), &[1.0, 0.0, 3.0]);
        assert_eq!(sales.cumulative_quantity(), &[1.0, 1.0, 4.0]);
    }

    #[test]
    fn test_sales_rejects_duplicates_and_negatives() {
        assert!(matches!(
            SalesSeries::from_rows(vec![(2020, 1.0), (2020, 2.0)]),
            Err(ValueError::DuplicateYear { year: 2020, .. })
        ));
        assert!(matches!(
            SalesSeries::from_rows(vec![(2020, -1.0)]),
            Err(ValueError::NegativeQuantity { .. })
        ));
    }

    #[test]
    fn test_sales_deserialization_is_checked() {
        let text = r#"{"years": [2021, 2020], "quantity": [5.9, 10], "cumulative_quantity": [0, 0]}"#;
        let sales: SalesSeries = serde_json::from_str(text).unwrap();
        assert_eq!(sales.years(), &[2020, 2021]);
        assert_eq!(sales.cumulative_quantity(), &[10.0, 15.0]);

        let negative = r#"{"years": [2020], "quantity": [-1]}"#;
        assert!(serde_json::from_str::<SalesSeries>(negative).is_err());
        let uneven = r#"{"years": [2020, 2021], "quantity": [1]}"#;
        assert!(serde_json::from_str::<SalesSeries>(uneven).is_err());
    }

    #[test]
    fn test_alignment_fills_zero() {
        let horizon = TimeHorizon::new(2019, 2022).unwrap();
        let prices = YearlyTable::from_rows("price", vec![(2020, 10.0), (2030, 99.0)]).unwrap();
        assert_eq!(prices.aligned(&horizon), vec![0.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_lead_shifts_with_zero_fill() {
        assert_eq!(lead(&[1.0, 2.0, 3.0], 1), vec![2.0, 3.0, 0.0]);
        assert_eq!(lead(&[1.0, 2.0, 3.0], 2), vec![3.0, 0.0, 0.0]);
    }
}
