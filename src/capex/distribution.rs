//! CAPEX temporal distribution curves

use serde::{Deserialize, Serialize};

use crate::error::{check_percentage, ValueError, ValueResult};

/// Number of points in a distribution curve
pub const DISTRIBUTION_POINTS: usize = 11;

/// Offset from launch year of the first curve point (`launch_year-6`)
pub const FIRST_OFFSET: i32 = -6;

/// Offset from launch year where the flat tail starts (`launch_year+4 onwards`)
pub const TAIL_OFFSET: i32 = 4;

const SUM_TOLERANCE: f64 = 1e-6;

/// How one category's lump-sum spend is spread around the launch year.
///
/// Points 0..=9 cover `launch-6 ..= launch+3`; point 10 applies to every year
/// from `launch+4` onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct DistributionCurve {
    pub category: String,
    percentages: [f64; DISTRIBUTION_POINTS],
}

#[derive(Deserialize)]
struct RawCurve {
    category: String,
    percentages: [f64; DISTRIBUTION_POINTS],
}

impl TryFrom<RawCurve> for DistributionCurve {
    type Error = ValueError;

    fn try_from(raw: RawCurve) -> ValueResult<Self> {
        Self::new(raw.category, raw.percentages)
    }
}

impl DistributionCurve {
    /// Validate percentages: each in [0, 100], together exactly 100
    pub fn new(category: impl Into<String>, percentages: [f64; DISTRIBUTION_POINTS]) -> ValueResult<Self> {
        let category = category.into();
        for &pct in &percentages {
            check_percentage(&format!("capex distribution '{}'", category), pct)?;
        }
        let sum: f64 = percentages.iter().sum();
        if (sum - 100.0).abs() > SUM_TOLERANCE {
            return Err(ValueError::DistributionSum { category, sum });
        }
        Ok(Self { category, percentages })
    }

    pub fn percentages(&self) -> &[f64; DISTRIBUTION_POINTS] {
        &self.percentages
    }

    /// Fraction of the category value spent `offset` years from launch
    pub fn share(&self, offset: i32) -> f64 {
        if offset < FIRST_OFFSET {
            0.0
        } else if offset >= TAIL_OFFSET {
            self.percentages[DISTRIBUTION_POINTS - 1] / 100.0
        } else {
            self.percentages[(offset - FIRST_OFFSET) as usize] / 100.0
        }
    }
}

/// One curve per category, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct DistributionTable {
    curves: Vec<DistributionCurve>,
}

#[derive(Deserialize)]
struct RawTable {
    curves: Vec<DistributionCurve>,
}

impl TryFrom<RawTable> for DistributionTable {
    type Error = ValueError;

    fn try_from(raw: RawTable) -> ValueResult<Self> {
        Self::new(raw.curves)
    }
}

impl DistributionTable {
    /// Reject tables that give a category more than one curve
    pub fn new(curves: Vec<DistributionCurve>) -> ValueResult<Self> {
        for curve in &curves {
            let rows = curves.iter().filter(|c| c.category == curve.category).count();
            if rows > 1 {
                return Err(ValueError::DuplicateDistribution {
                    category: curve.category.clone(),
                    rows,
                });
            }
        }
        Ok(Self { curves })
    }

    pub fn get(&self, category: &str) -> Option<&DistributionCurve> {
        self.curves.iter().find(|c| c.category == category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.get(category).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistributionCurve> {
        self.curves.iter()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(category: &str) -> DistributionCurve {
        DistributionCurve::new(
            category,
            [0.0, 15.0, 20.0, 20.0, 25.0, 20.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_share_by_offset() {
        let c = curve("development1");
        assert_eq!(c.share(-7), 0.0);
        assert_eq!(c.share(-6), 0.0);
        assert_eq!(c.share(-5), 0.15);
        assert_eq!(c.share(-2), 0.25);
        assert_eq!(c.share(10), 0.0);
    }

    #[test]
    fn test_tail_applies_from_launch_plus_four() {
        let c = DistributionCurve::new(
            "tooling",
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0, 0.0, 0.0, 0.0, 50.0],
        )
        .unwrap();
        assert_eq!(c.share(3), 0.0);
        assert_eq!(c.share(4), 0.5);
        assert_eq!(c.share(25), 0.5);
    }

    #[test]
    fn test_sum_must_be_100() {
        let result = DistributionCurve::new("x", [10.0; DISTRIBUTION_POINTS]);
        assert!(matches!(result, Err(ValueError::DistributionSum { .. })));
    }

    #[test]
    fn test_out_of_range_percentage() {
        let mut pct = [0.0; DISTRIBUTION_POINTS];
        pct[0] = 120.0;
        pct[1] = -20.0;
        assert!(matches!(
            DistributionCurve::new("x", pct),
            Err(ValueError::PercentageOutOfRange { .. })
        ));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let result = DistributionTable::new(vec![curve("a"), curve("b"), curve("a")]);
        match result {
            Err(ValueError::DuplicateDistribution { category, rows }) => {
                assert_eq!(category, "a");
                assert_eq!(rows, 2);
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialized_curves_are_checked() {
        let half = r#"{"category": "x", "percentages": [50, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]}"#;
        assert!(serde_json::from_str::<DistributionCurve>(half).is_err());

        let full = r#"{"category": "x", "percentages": [50, 0, 0, 0, 0, 0, 50, 0, 0, 0, 0]}"#;
        let c: DistributionCurve = serde_json::from_str(full).unwrap();
        assert_eq!(c.share(0), 0.5);

        let table = serde_json::to_string(&DistributionTable::new(vec![curve("a"), curve("b")]).unwrap()).unwrap();
        let duplicated = table.replace("\"b\"", "\"a\"");
        assert!(serde_json::from_str::<DistributionTable>(&table).is_ok());
        assert!(serde_json::from_str::<DistributionTable>(&duplicated).is_err());
    }
}
