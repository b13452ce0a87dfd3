//! Compound yearly escalation (inflation) anchored at a reference year

use log::warn;
use serde::{Deserialize, Serialize};

/// Reference year used when an escalation input does not name one
pub const DEFAULT_REFERENCE_YEAR: i32 = 2010;

/// Escalate `series` (starting at `year_start`) with a compound yearly `rate`.
///
/// `series'[i] = series[i] * (1 + rate)^(year_start + i - ref_year)`. The
/// exponent is negative for years before the reference year.
pub fn escalate(series: &[f64], rate: f64, ref_year: i32, year_start: i32) -> Vec<f64> {
    series
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let exponent = (year_start + i as i32 - ref_year) as f64;
            value * (1.0 + rate).powf(exponent)
        })
        .collect()
}

/// Resolved escalation: reference year and yearly rate as a decimal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub reference_year: i32,
    pub rate: f64,
}

impl Escalation {
    pub fn new(reference_year: i32, rate: f64) -> Self {
        Self { reference_year, rate }
    }

    /// No escalation at all
    pub fn none() -> Self {
        Self::new(DEFAULT_REFERENCE_YEAR, 0.0)
    }

    /// Multiplier applied to values of `year`
    pub fn factor(&self, year: i32) -> f64 {
        (1.0 + self.rate).powf((year - self.reference_year) as f64)
    }

    /// Escalate a series whose first value belongs to `year_start`
    pub fn apply(&self, series: &[f64], year_start: i32) -> Vec<f64> {
        escalate(series, self.rate, self.reference_year, year_start)
    }
}

impl Default for Escalation {
    fn default() -> Self {
        Self::none()
    }
}

/// Escalation settings as supplied by a study, either field possibly absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Year of the economic conditions the inputs are expressed in
    #[serde(default)]
    pub year_economical_conditions: Option<i32>,
    /// Yearly escalation rate in percent
    #[serde(default)]
    pub yearly_escalation_rate: Option<f64>,
}

impl EscalationConfig {
    pub fn new(year_economical_conditions: i32, yearly_escalation_rate_pct: f64) -> Self {
        Self {
            year_economical_conditions: Some(year_economical_conditions),
            yearly_escalation_rate: Some(yearly_escalation_rate_pct),
        }
    }

    /// Resolve into an [`Escalation`]. Missing fields fall back to no
    /// escalation and are logged as warnings.
    pub fn resolve(&self, label: &str) -> Escalation {
        let reference_year = match self.year_economical_conditions {
            Some(year) => year,
            None => {
                warn!(
                    "{}: year_economical_conditions missing, using {}",
                    label, DEFAULT_REFERENCE_YEAR
                );
                DEFAULT_REFERENCE_YEAR
            }
        };
        let rate = match self.yearly_escalation_rate {
            Some(pct) => pct / 100.0,
            None => {
                warn!("{}: yearly_escalation_rate missing, using 0%", label);
                0.0
            }
        };
        Escalation::new(reference_year, rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_escalation_after_reference_year() {
        let out = escalate(&[100.0, 100.0, 100.0], 0.02, 2020, 2020);
        assert_relative_eq!(out[0], 100.0);
        assert_relative_eq!(out[1], 102.0);
        assert_relative_eq!(out[2], 104.04, max_relative = 1e-12);
    }

    #[test]
    fn test_escalation_before_reference_year() {
        // Reference year after the horizon: values are deflated
        let out = escalate(&[102.0], 0.02, 2021, 2020);
        assert_relative_eq!(out[0], 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_negative_rate() {
        let out = escalate(&[100.0, 100.0], -0.1, 2020, 2020);
        assert_relative_eq!(out[1], 90.0, max_relative = 1e-12);
    }

    #[test]
    fn test_missing_config_defaults_to_no_escalation() {
        let esc = EscalationConfig::default().resolve("capex");
        assert_eq!(esc.reference_year, DEFAULT_REFERENCE_YEAR);
        assert_eq!(esc.rate, 0.0);
        assert_eq!(esc.factor(2050), 1.0);
    }

    #[test]
    fn test_config_rate_in_percent() {
        let esc = EscalationConfig::new(2021, 2.0).resolve("opex");
        assert_relative_eq!(esc.rate, 0.02);
        assert_relative_eq!(esc.factor(2030), 1.02f64.powi(9), max_relative = 1e-12);
    }
}
