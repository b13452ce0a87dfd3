//! CAPEX spend profiles

pub mod distribution;
pub mod engine;

pub use distribution::{DistributionCurve, DistributionTable, DISTRIBUTION_POINTS};
pub use engine::{apply_ratio, CapexEngine, CapexInput, CapexProfile, CategorySpend};
