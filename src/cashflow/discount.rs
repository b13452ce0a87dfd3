//! Discounting of yearly cash flows at the WACC

use serde::{Deserialize, Serialize};

/// How the WACC is turned into a per-period discount rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountMode {
    /// One period per year at the WACC
    #[default]
    Annual,
    /// Equivalent quarterly rate `(1 + WACC)^(1/4) - 1`
    Quarterly,
}

impl DiscountMode {
    /// Per-period rate for a WACC given as a decimal
    pub fn period_rate(&self, wacc: f64) -> f64 {
        match self {
            DiscountMode::Annual => wacc,
            DiscountMode::Quarterly => (1.0 + wacc).powf(1.0 / 4.0) - 1.0,
        }
    }
}

/// WACC in percent to decimal; absent or zero means no discounting
pub fn wacc_from_percent(wacc_pct: Option<f64>) -> f64 {
    match wacc_pct {
        Some(pct) if pct != 0.0 => pct / 100.0,
        _ => 0.0,
    }
}

/// Factor `(1 / (1 + rate))^t` for periods `t = 0..periods`
pub fn discount_factors(rate: f64, periods: usize) -> Vec<f64> {
    let base = 1.0 / (1.0 + rate);
    (0..periods).map(|t| base.powf(t as f64)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_annual_factors() {
        let factors = discount_factors(DiscountMode::Annual.period_rate(0.08), 3);
        assert_eq!(factors[0], 1.0);
        assert_relative_eq!(factors[1], 1.0 / 1.08, max_relative = 1e-12);
        assert_relative_eq!(factors[2], 1.0 / 1.08 / 1.08, max_relative = 1e-12);
    }

    #[test]
    fn test_quarterly_rate() {
        let rate = DiscountMode::Quarterly.period_rate(0.08);
        assert_relative_eq!((1.0 + rate).powi(4), 1.08, max_relative = 1e-12);
    }

    #[test]
    fn test_wacc_percent() {
        assert_relative_eq!(wacc_from_percent(Some(8.0)), 0.08);
        assert_eq!(wacc_from_percent(Some(0.0)), 0.0);
        assert_eq!(wacc_from_percent(None), 0.0);
    }
}
