//! OPEX payment terms: share of a year's production cost paid in advance

use serde::{Deserialize, Serialize};

use crate::error::{check_percentage, ValueError, ValueResult};
use crate::horizon::lead;

/// Percentages of a delivery year's OPEX paid one and two years earlier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPaymentTerms")]
pub struct PaymentTerms {
    #[serde(rename = "percentage_at_delivery_year-1")]
    year_minus_1: f64,
    #[serde(rename = "percentage_at_delivery_year-2")]
    year_minus_2: f64,
}

#[derive(Deserialize)]
struct RawPaymentTerms {
    #[serde(rename = "percentage_at_delivery_year-1")]
    year_minus_1: f64,
    #[serde(rename = "percentage_at_delivery_year-2")]
    year_minus_2: f64,
}

impl TryFrom<RawPaymentTerms> for PaymentTerms {
    type Error = ValueError;

    fn try_from(raw: RawPaymentTerms) -> ValueResult<Self> {
        Self::new(raw.year_minus_1, raw.year_minus_2)
    }
}

impl PaymentTerms {
    pub fn new(year_minus_1_pct: f64, year_minus_2_pct: f64) -> ValueResult<Self> {
        check_percentage("percentage_at_delivery_year-1", year_minus_1_pct)?;
        check_percentage("percentage_at_delivery_year-2", year_minus_2_pct)?;
        let total = year_minus_1_pct + year_minus_2_pct;
        if total > 100.0 {
            return Err(ValueError::PaymentTermsExceeded { total });
        }
        Ok(Self {
            year_minus_1: year_minus_1_pct,
            year_minus_2: year_minus_2_pct,
        })
    }

    /// Everything paid at delivery
    pub fn at_delivery() -> Self {
        Self::default()
    }

    pub fn year_minus_1(&self) -> f64 {
        self.year_minus_1
    }

    pub fn year_minus_2(&self) -> f64 {
        self.year_minus_2
    }

    /// Cash paid each year for the costs in `opex_total`. Advances on
    /// deliveries beyond the last year are not paid.
    pub fn schedule(&self, opex_total: &[f64]) -> Vec<f64> {
        let p1 = self.year_minus_1 / 100.0;
        let p2 = self.year_minus_2 / 100.0;
        let at_delivery_share = 1.0 - p1 - p2;

        let advance_1: Vec<f64> = lead(&opex_total.iter().map(|v| v * p1).collect::<Vec<_>>(), 1);
        let advance_2: Vec<f64> = lead(&opex_total.iter().map(|v| v * p2).collect::<Vec<_>>(), 2);

        opex_total
            .iter()
            .zip(advance_1.iter().zip(&advance_2))
            .map(|(total, (a1, a2))| total * at_delivery_share + a1 + a2)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_schedule_shifts_advances() {
        let terms = PaymentTerms::new(20.0, 10.0).unwrap();
        let pay = terms.schedule(&[0.0, 0.0, 100.0, 100.0]);
        assert_relative_eq!(pay[0], 10.0, max_relative = 1e-12);
        assert_relative_eq!(pay[1], 30.0, max_relative = 1e-12);
        assert_relative_eq!(pay[2], 90.0, max_relative = 1e-12);
        assert_relative_eq!(pay[3], 70.0, max_relative = 1e-12);
        // Whatever is billed in advance is eventually paid
        assert_relative_eq!(pay.iter().sum::<f64>(), 200.0, max_relative = 1e-12);
    }

    #[test]
    fn test_at_delivery_is_identity() {
        let pay = PaymentTerms::at_delivery().schedule(&[1.0, 2.0, 3.0]);
        assert_eq!(pay, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_invalid_terms() {
        assert!(matches!(
            PaymentTerms::new(60.0, 50.0),
            Err(ValueError::PaymentTermsExceeded { .. })
        ));
        assert!(PaymentTerms::new(-1.0, 0.0).is_err());
        assert!(PaymentTerms::new(100.0, 0.0).is_ok());
    }

    #[test]
    fn test_deserialized_terms_are_checked() {
        let text = r#"{"percentage_at_delivery_year-1": 20, "percentage_at_delivery_year-2": 10}"#;
        let terms: PaymentTerms = serde_json::from_str(text).unwrap();
        assert_eq!(terms, PaymentTerms::new(20.0, 10.0).unwrap());

        let over = r#"{"percentage_at_delivery_year-1": 70, "percentage_at_delivery_year-2": 40}"#;
        assert!(serde_json::from_str::<PaymentTerms>(over).is_err());
    }
}
