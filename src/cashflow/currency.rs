//! Fixed-rate USD/EUR conversion of monetary outputs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ledger::CashflowLedger;
use super::summary::{CashflowInfo, HypothesisSummary};
use crate::capex::CapexProfile;
use crate::error::{ValueError, ValueResult};
use crate::opex::OpexProfile;

/// Table columns that are never converted
pub const TABLE_EXCLUDED: &[&str] = &[
    "years",
    "year",
    "quantity",
    "cumulative_quantity",
    "discount",
    "pdp_perc",
    "lc_coef_new",
    "lc_coef_mod",
    "Quarters",
];

/// Summary keys that are never converted
pub const INFO_EXCLUDED: &[&str] = &[
    "irr",
    "year_min_irr",
    "year_max_irr",
    "year_break_even",
    "year_break_even_cashflow",
    "year_break_even_discounted_cashflow",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unknown currency '{}', expected USD or EUR", other)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
        }
    }
}

/// EUR obtained for one USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub usd_eur: f64,
}

impl ExchangeRate {
    pub fn new(usd_eur: f64) -> Self {
        Self { usd_eur }
    }

    /// Multiplier turning amounts in `from` into amounts in `to`
    pub fn factor(&self, from: Currency, to: Currency) -> f64 {
        match (from, to) {
            (Currency::Usd, Currency::Eur) => self.usd_eur,
            (Currency::Eur, Currency::Usd) => 1.0 / self.usd_eur,
            _ => 1.0,
        }
    }

    pub fn convert(&self, values: &Monetary, exclude: &[&str], from: Currency, to: Currency) -> Monetary {
        values.scaled(self.factor(from, to), exclude)
    }

    pub fn convert_ledger(&self, ledger: &CashflowLedger, from: Currency, to: Currency) -> CashflowLedger {
        ledger.scaled(self.factor(from, to))
    }

    pub fn convert_capex(&self, profile: &CapexProfile, from: Currency, to: Currency) -> CapexProfile {
        profile.scaled(self.factor(from, to))
    }

    /// Quantities and learning curve coefficients are left as they are
    pub fn convert_opex(&self, profile: &OpexProfile, from: Currency, to: Currency) -> OpexProfile {
        profile.scaled(self.factor(from, to))
    }

    pub fn convert_info(&self, info: &CashflowInfo, from: Currency, to: Currency) -> CashflowInfo {
        info.scaled(self.factor(from, to))
    }

    pub fn convert_hypothesis(
        &self,
        summary: &HypothesisSummary,
        from: Currency,
        to: Currency,
    ) -> HypothesisSummary {
        summary.scaled(self.factor(from, to))
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Shapes of monetary data that can be converted
#[derive(Debug, Clone, PartialEq)]
pub enum Monetary {
    Scalar(f64),
    /// Flat name to value mapping, like a summary
    Mapping(BTreeMap<String, f64>),
    /// Columns of equal length, like a ledger
    Table(BTreeMap<String, Vec<f64>>),
    /// Several named tables
    Tables(BTreeMap<String, BTreeMap<String, Vec<f64>>>),
}

impl Monetary {
    /// Interpret a JSON value. Numbers are scalars, objects of numbers are
    /// mappings, objects of number arrays are tables and objects of tables
    /// are table sets; anything else is rejected.
    pub fn from_json(value: &Value) -> ValueResult<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Monetary::Scalar).ok_or_else(|| unsupported(value)),
            Value::Object(map) if map.values().all(Value::is_number) => {
                let mapping = map
                    .iter()
                    .map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)).ok_or_else(|| unsupported(v)))
                    .collect::<ValueResult<_>>()?;
                Ok(Monetary::Mapping(mapping))
            }
            Value::Object(map) if map.values().all(Value::is_array) => {
                Ok(Monetary::Table(table_from_json(map)?))
            }
            Value::Object(map) if map.values().all(Value::is_object) => {
                let tables = map
                    .iter()
                    .map(|(k, v)| match v {
                        Value::Object(inner) if inner.values().all(Value::is_array) => {
                            Ok((k.clone(), table_from_json(inner)?))
                        }
                        other => Err(unsupported(other)),
                    })
                    .collect::<ValueResult<_>>()?;
                Ok(Monetary::Tables(tables))
            }
            other => Err(unsupported(other)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Monetary::Scalar(v) => Value::from(*v),
            Monetary::Mapping(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect(),
            ),
            Monetary::Table(table) => table_to_json(table),
            Monetary::Tables(tables) => Value::Object(
                tables
                    .iter()
                    .map(|(k, t)| (k.clone(), table_to_json(t)))
                    .collect(),
            ),
        }
    }

    /// Multiply by `factor`, leaving keys listed in `exclude` untouched
    pub fn scaled(&self, factor: f64, exclude: &[&str]) -> Monetary {
        let keep = |key: &str| exclude.iter().any(|excluded| *excluded == key);
        match self {
            Monetary::Scalar(v) => Monetary::Scalar(v * factor),
            Monetary::Mapping(map) => Monetary::Mapping(
                map.iter()
                    .map(|(k, &v)| (k.clone(), if keep(k.as_str()) { v } else { v * factor }))
                    .collect(),
            ),
            Monetary::Table(table) => Monetary::Table(scale_table(table, factor, &keep)),
            Monetary::Tables(tables) => Monetary::Tables(
                tables
                    .iter()
                    .map(|(k, t)| (k.clone(), scale_table(t, factor, &keep)))
                    .collect(),
            ),
        }
    }
}

fn scale_table<F: Fn(&str) -> bool>(
    table: &BTreeMap<String, Vec<f64>>,
    factor: f64,
    keep: &F,
) -> BTreeMap<String, Vec<f64>> {
    table
        .iter()
        .map(|(k, column)| {
            let column = if keep(k.as_str()) {
                column.clone()
            } else {
                column.iter().map(|v| v * factor).collect()
            };
            (k.clone(), column)
        })
        .collect()
}

fn table_from_json(map: &Map<String, Value>) -> ValueResult<BTreeMap<String, Vec<f64>>> {
    map.iter()
        .map(|(k, v)| {
            let column = v
                .as_array()
                .ok_or_else(|| unsupported(v))?
                .iter()
                .map(|cell| cell.as_f64().ok_or_else(|| unsupported(cell)))
                .collect::<ValueResult<Vec<f64>>>()?;
            Ok((k.clone(), column))
        })
        .collect()
}

fn table_to_json(table: &BTreeMap<String, Vec<f64>>) -> Value {
    Value::Object(
        table
            .iter()
            .map(|(k, column)| (k.clone(), Value::from(column.clone())))
            .collect(),
    )
}

fn unsupported(value: &Value) -> ValueError {
    let shape = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mixed object",
    };
    ValueError::UnsupportedShape {
        shape: shape.to_string(),
    }
}
