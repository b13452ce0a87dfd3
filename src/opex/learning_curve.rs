//! Piecewise Wright's-law learning curve
//!
//! The unit cost multiplier of the `r`-th unit produced follows `r^b` with
//! `b = log2(coefficient)`. Each breakpoint closes a segment with its own
//! coefficient; later segments continue from the value reached at the
//! previous breakpoint. The per-rank table is normalized so the last
//! breakpoint costs 1, averaged over all ranks produced so far, and finally
//! turned into a per-year multiplier for the units produced that year.

use serde::{Deserialize, Serialize};

use crate::error::{check_percentage, ValueError, ValueResult};
use crate::horizon::SalesSeries;

/// End of a learning curve segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Last production rank covered by the segment
    pub until_rank: u32,
    /// Cost ratio per doubling of production, in (0, 1]
    pub coefficient: f64,
}

impl Breakpoint {
    pub fn new(until_rank: u32, coefficient: f64) -> Self {
        Self {
            until_rank,
            coefficient,
        }
    }

    /// Wright exponent `log2(coefficient)`
    pub fn exponent(&self) -> f64 {
        self.coefficient.ln() / 2f64.ln()
    }
}

/// Make/Buy split and learning curve of the manufactured share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLearningCurve")]
pub struct LearningCurveSpec {
    /// Share of OPEX manufactured in-house, in percent
    pub percentage_make: f64,
    breakpoints: Vec<Breakpoint>,
}

#[derive(Deserialize)]
struct RawLearningCurve {
    percentage_make: f64,
    breakpoints: Vec<Breakpoint>,
}

impl TryFrom<RawLearningCurve> for LearningCurveSpec {
    type Error = ValueError;

    fn try_from(raw: RawLearningCurve) -> ValueResult<Self> {
        Self::new(raw.percentage_make, raw.breakpoints)
    }
}

impl LearningCurveSpec {
    pub fn new(percentage_make: f64, breakpoints: Vec<Breakpoint>) -> ValueResult<Self> {
        check_percentage("percentage_make", percentage_make)?;
        if breakpoints.is_empty() {
            return Err(invalid("at least one breakpoint is required"));
        }
        let mut previous = 0;
        for bp in &breakpoints {
            if bp.until_rank <= previous {
                return Err(invalid(format!(
                    "ranks must be >= 1 and strictly increasing, got {} after {}",
                    bp.until_rank, previous
                )));
            }
            if !(bp.coefficient > 0.0 && bp.coefficient <= 1.0) {
                return Err(invalid(format!(
                    "coefficient {} at rank {} is outside (0, 1]",
                    bp.coefficient, bp.until_rank
                )));
            }
            previous = bp.until_rank;
        }
        Ok(Self {
            percentage_make,
            breakpoints,
        })
    }

    /// Fully bought-in production: no learning effect applies
    pub fn buy_only() -> Self {
        Self {
            percentage_make: 0.0,
            breakpoints: vec![Breakpoint::new(1, 1.0)],
        }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Rank at which the unit cost is the reference cost
    pub fn reference_rank(&self) -> u32 {
        self.breakpoints.last().map(|bp| bp.until_rank).unwrap_or(1)
    }

    /// Mean normalized cost of ranks `1..=r`, for `r` in
    /// `1..=max(max_cumulative, reference_rank)`; entry `r - 1` holds rank `r`
    pub fn rank_table(&self, max_cumulative: f64) -> Vec<f64> {
        let reference = self.reference_rank() as usize;
        let ranks = reference.max(max_cumulative as usize);
        let mut coef = vec![0.0; ranks];

        let mut start = 1;
        for (i, bp) in self.breakpoints.iter().enumerate() {
            let b = bp.exponent();
            let end = bp.until_rank as usize;
            for r in start..=end {
                let rank = r as f64;
                coef[r - 1] = if i == 0 {
                    rank.powf(b)
                } else {
                    rank.powf(b) / (rank - 1.0).powf(b) * coef[r - 2]
                };
            }
            start = end + 1;
        }
        let last = coef[reference - 1];
        for value in coef.iter_mut().skip(reference) {
            *value = last;
        }

        let mut sum = 0.0;
        coef.iter()
            .enumerate()
            .map(|(i, &value)| {
                sum += value / last;
                sum / (i + 1) as f64
            })
            .collect()
    }

    /// Multiplier per sales-table year applied to the unit cost of the units
    /// produced that year. Years without production read 0.
    pub fn yearly_coefficients(&self, sales: &SalesSeries) -> Vec<f64> {
        let table = self.rank_table(sales.max_cumulative());
        let mean_at = |cumulative: f64| -> Option<f64> {
            if cumulative >= 1.0 {
                table.get(cumulative as usize - 1).copied()
            } else {
                None
            }
        };

        let mut previous_term = 0.0;
        sales
            .quantity()
            .iter()
            .zip(sales.cumulative_quantity())
            .map(|(&quantity, &cumulative)| {
                let mean = mean_at(cumulative);
                let value = match mean {
                    Some(m) if quantity != 0.0 => (m * cumulative - previous_term) / quantity,
                    _ => 0.0,
                };
                previous_term = mean.map(|m| m * cumulative).unwrap_or(0.0);
                value
            })
            .collect()
    }
}

impl Default for LearningCurveSpec {
    fn default() -> Self {
        Self::buy_only()
    }
}

fn invalid(detail: impl Into<String>) -> ValueError {
    ValueError::InvalidLearningCurve {
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spec() -> LearningCurveSpec {
        LearningCurveSpec::new(
            0.0,
            vec![Breakpoint::new(50, 0.8), Breakpoint::new(200, 0.9)],
        )
        .unwrap()
    }

    fn sales() -> SalesSeries {
        SalesSeries::from_rows((2020..=2050).map(|y| (y, if y < 2030 { 0.0 } else { 50.0 }))).unwrap()
    }

    #[test]
    fn test_yearly_coefficients() {
        let coefs = spec().yearly_coefficients(&sales());
        assert_eq!(coefs.len(), 31);
        assert!(coefs[..10].iter().all(|&c| c == 0.0));

        let expected = [
            1.7504758369369793,
            1.163459820395767,
            1.0746639903174695,
            1.0206701531218665,
        ];
        for (actual, expected) in coefs[10..14].iter().zip(expected) {
            assert_relative_eq!(*actual, expected, max_relative = 1e-12);
        }
        // Past the last breakpoint every unit costs the reference cost
        for &c in &coefs[14..] {
            assert_relative_eq!(c, 1.0, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_rank_table_properties() {
        let table = spec().rank_table(120.0);
        assert_eq!(table.len(), 200);

        // Rank 1 raw value is 1^b = 1, divided by the reference-rank cost
        let raw_reference = 50f64.powf(Breakpoint::new(50, 0.8).exponent())
            * (51..=200)
                .map(|r| {
                    let b = Breakpoint::new(200, 0.9).exponent();
                    (r as f64).powf(b) / ((r - 1) as f64).powf(b)
                })
                .product::<f64>();
        assert_relative_eq!(table[0], 1.0 / raw_reference, max_relative = 1e-12);

        for pair in table.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_flat_curve_is_neutral() {
        let flat = LearningCurveSpec::new(100.0, vec![Breakpoint::new(10, 1.0)]).unwrap();
        let coefs = flat.yearly_coefficients(&sales());
        for &c in &coefs[10..] {
            assert_relative_eq!(c, 1.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_zero_quantity_year_reads_zero() {
        let sales = SalesSeries::from_rows(vec![(2030, 10.0), (2031, 0.0), (2032, 10.0)]).unwrap();
        let coefs = spec().yearly_coefficients(&sales);
        assert!(coefs[0] > 1.0);
        assert_eq!(coefs[1], 0.0);
        assert!(coefs[2] > 0.0 && coefs[2] < coefs[0]);
    }

    #[test]
    fn test_invalid_breakpoints() {
        assert!(LearningCurveSpec::new(0.0, vec![]).is_err());
        assert!(LearningCurveSpec::new(
            0.0,
            vec![Breakpoint::new(50, 0.8), Breakpoint::new(50, 0.9)]
        )
        .is_err());
        assert!(LearningCurveSpec::new(0.0, vec![Breakpoint::new(0, 0.8)]).is_err());
        assert!(LearningCurveSpec::new(0.0, vec![Breakpoint::new(10, 1.2)]).is_err());
        assert!(LearningCurveSpec::new(0.0, vec![Breakpoint::new(10, 0.0)]).is_err());
        assert!(matches!(
            LearningCurveSpec::new(120.0, vec![Breakpoint::new(10, 0.9)]),
            Err(ValueError::PercentageOutOfRange { .. })
        ));
    }

    #[test]
    fn test_deserialized_spec_is_checked() {
        let empty = r#"{"percentage_make": 50, "breakpoints": []}"#;
        assert!(serde_json::from_str::<LearningCurveSpec>(empty).is_err());

        let decreasing = r#"{"percentage_make": 50, "breakpoints": [
            {"until_rank": 200, "coefficient": 0.9},
            {"until_rank": 50, "coefficient": 0.8}
        ]}"#;
        assert!(serde_json::from_str::<LearningCurveSpec>(decreasing).is_err());

        let text = serde_json::to_string(&spec()).unwrap();
        let parsed: LearningCurveSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, spec());
        assert!(parsed
            .yearly_coefficients(&sales())
            .iter()
            .all(|c| c.is_finite()));
    }
}
