//! Study layer: JSON study description, CSV tables and the runner

pub mod config;
pub mod loader;
pub mod runner;

pub use config::{LearningCurveConfig, ProductConfig, StudyConfig, TablePaths, STUDY_FILE};
pub use loader::{ProductTables, DEFAULT_STUDY_PATH};
pub use runner::{PortfolioValuation, ProductValuation, StudyRunner};
