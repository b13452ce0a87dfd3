//! CSV table loaders for a product
//!
//! Column names are those of the analysts' spreadsheets. Each file maps
//! onto a private row struct which is then turned into the engine type.

use std::path::Path;

use anyhow::{Context, Result};
use csv::Reader;

use crate::capex::{CapexInput, DistributionCurve, DistributionTable, DISTRIBUTION_POINTS};
use crate::cashflow::AmortizationSchedule;
use crate::horizon::{SalesSeries, YearlyTable};
use crate::opex::OpexInput;

use super::config::ProductConfig;

/// Default study directory, relative to the working directory
pub const DEFAULT_STUDY_PATH: &str = "data/study";

/// One row of the CAPEX input table
#[derive(Debug, serde::Deserialize)]
struct CapexRow {
    #[serde(rename = "Distribution Category")]
    category: String,
    #[serde(rename = "Capex Component")]
    component: String,
    #[serde(rename = "Capex value")]
    value: f64,
    #[serde(rename = "Contingency (%)", default)]
    contingency: f64,
}

impl CapexRow {
    fn to_input(self) -> CapexInput {
        CapexInput::new(&self.category, &self.component, self.value, self.contingency)
    }
}

/// One row of the CAPEX distribution table: launch year offsets -6..=+3,
/// then the flat tail
#[derive(Debug, serde::Deserialize)]
struct DistributionRow {
    #[serde(rename = "Distribution Category")]
    category: String,
    #[serde(rename = "launch_year-6")]
    minus_6: f64,
    #[serde(rename = "launch_year-5")]
    minus_5: f64,
    #[serde(rename = "launch_year-4")]
    minus_4: f64,
    #[serde(rename = "launch_year-3")]
    minus_3: f64,
    #[serde(rename = "launch_year-2")]
    minus_2: f64,
    #[serde(rename = "launch_year-1")]
    minus_1: f64,
    #[serde(rename = "launch_year")]
    launch: f64,
    #[serde(rename = "launch_year+1")]
    plus_1: f64,
    #[serde(rename = "launch_year+2")]
    plus_2: f64,
    #[serde(rename = "launch_year+3")]
    plus_3: f64,
    #[serde(rename = "launch_year+4 onwards")]
    onwards: f64,
}

impl DistributionRow {
    fn to_curve(self) -> crate::error::ValueResult<DistributionCurve> {
        let percentages: [f64; DISTRIBUTION_POINTS] = [
            self.minus_6,
            self.minus_5,
            self.minus_4,
            self.minus_3,
            self.minus_2,
            self.minus_1,
            self.launch,
            self.plus_1,
            self.plus_2,
            self.plus_3,
            self.onwards,
        ];
        DistributionCurve::new(self.category, percentages)
    }
}

#[derive(Debug, serde::Deserialize)]
struct OpexRow {
    #[serde(rename = "components")]
    component: String,
    opex: f64,
}

#[derive(Debug, serde::Deserialize)]
struct SalesRow {
    years: i32,
    quantity: f64,
}

#[derive(Debug, serde::Deserialize)]
struct PriceRow {
    years: i32,
    sale_price: f64,
}

#[derive(Debug, serde::Deserialize)]
struct AmortizationRow {
    #[serde(rename = "Distribution Category")]
    category: String,
    #[serde(rename = "Nb years")]
    years: u32,
}

/// Deserialize every row of a CSV file
fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("{}: row {}", path.display(), line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_capex(path: &Path) -> Result<Vec<CapexInput>> {
    let rows: Vec<CapexRow> = read_rows(path)?;
    Ok(rows.into_iter().map(CapexRow::to_input).collect())
}

pub fn load_distribution(path: &Path) -> Result<DistributionTable> {
    let rows: Vec<DistributionRow> = read_rows(path)?;
    let curves = rows
        .into_iter()
        .map(DistributionRow::to_curve)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid distribution in {}", path.display()))?;
    DistributionTable::new(curves).with_context(|| format!("invalid distribution in {}", path.display()))
}

pub fn load_opex(path: &Path) -> Result<Vec<OpexInput>> {
    let rows: Vec<OpexRow> = read_rows(path)?;
    Ok(rows
        .into_iter()
        .map(|row| OpexInput::new(&row.component, row.opex))
        .collect())
}

pub fn load_sales(path: &Path) -> Result<SalesSeries> {
    let rows: Vec<SalesRow> = read_rows(path)?;
    SalesSeries::from_rows(rows.into_iter().map(|row| (row.years, row.quantity)))
        .with_context(|| format!("invalid sales in {}", path.display()))
}

pub fn load_sale_price(path: &Path) -> Result<YearlyTable> {
    let rows: Vec<PriceRow> = read_rows(path)?;
    YearlyTable::from_rows("sale_price", rows.into_iter().map(|row| (row.years, row.sale_price)))
        .with_context(|| format!("invalid sale price in {}", path.display()))
}

pub fn load_amortization(path: &Path) -> Result<AmortizationSchedule> {
    let rows: Vec<AmortizationRow> = read_rows(path)?;
    Ok(AmortizationSchedule::from_rows(
        rows.into_iter().map(|row| (row.category, row.years)),
    ))
}

/// Every table of one product, as read from disk
#[derive(Debug, Clone)]
pub struct ProductTables {
    pub capex: Vec<CapexInput>,
    pub distribution: DistributionTable,
    pub opex: Vec<OpexInput>,
    pub sales: SalesSeries,
    pub sale_price: YearlyTable,
    pub amortization: AmortizationSchedule,
}

impl ProductTables {
    /// Load the tables a product refers to, resolving paths against
    /// `study_dir`
    pub fn load(study_dir: &Path, product: &ProductConfig) -> Result<Self> {
        let tables = &product.tables;
        let amortization = match &tables.amortization {
            Some(path) => load_amortization(&study_dir.join(path))?,
            None => AmortizationSchedule::new(),
        };
        Ok(Self {
            capex: load_capex(&study_dir.join(&tables.capex))?,
            distribution: load_distribution(&study_dir.join(&tables.capex_distribution))?,
            opex: load_opex(&study_dir.join(&tables.opex))?,
            sales: load_sales(&study_dir.join(&tables.sales))?,
            sale_price: load_sale_price(&study_dir.join(&tables.sale_price))?,
            amortization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::StudyConfig;
    use std::path::PathBuf;

    fn sample_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_STUDY_PATH)
    }

    #[test]
    fn test_load_sample_product() {
        let dir = sample_dir();
        let study = StudyConfig::load(&dir).unwrap();
        let product = study.product("cabin_module").unwrap();
        let tables = ProductTables::load(&dir, product).unwrap();

        assert_eq!(tables.capex.len(), 4);
        assert_eq!(tables.capex[0].category, "development");
        assert_eq!(tables.capex[0].contingency_pct, 10.0);
        assert_eq!(tables.distribution.len(), 2);
        assert!(tables.distribution.contains("tooling"));
        assert_eq!(tables.opex.len(), 3);
        assert_eq!(tables.sales.years().first(), Some(&2027));
        assert_eq!(tables.sale_price.get(2030), Some(2400.0));
        assert_eq!(tables.amortization.years_for("tooling"), 5);
        assert_eq!(tables.amortization.years_for("development"), 0);
    }

    #[test]
    fn test_every_sample_product_loads() {
        let dir = sample_dir();
        let study = StudyConfig::load(&dir).unwrap();
        assert!(study.validate().is_ok());
        for product in &study.products {
            assert!(ProductTables::load(&dir, product).is_ok(), "{}", product.name);
        }
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_opex(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.csv"));
    }
}
