//! Value Assessment - yearly cash-flow and return projections for manufactured products
//!
//! This library provides:
//! - CAPEX spend profiles from lump sums and launch-relative distribution curves
//! - Unit OPEX profiles with Make/Buy split, learning curve and after-sales share
//! - The value block: cash-flow and P&L ledger, NPV, IRR and break-even years
//! - Portfolio roll-up of several products
//! - Study files (JSON + CSV tables) evaluated in parallel

pub mod error;
pub mod horizon;
pub mod escalation;
pub mod capex;
pub mod opex;
pub mod cashflow;
pub mod aggregation;
pub mod study;

// Re-export commonly used types
pub use error::{ValueError, ValueResult};
pub use horizon::{SalesSeries, TimeHorizon, YearlyTable};
pub use escalation::{Escalation, EscalationConfig};
pub use capex::{CapexEngine, CapexInput, CapexProfile, DistributionCurve, DistributionTable};
pub use opex::{AfterSalesDistribution, LearningCurveSpec, OpexEngine, OpexInput, OpexProfile};
pub use cashflow::{
    CashflowConfig, CashflowEngine, CashflowInfo, CashflowLedger, CashflowRow, Currency,
    DiscountMode, ExchangeRate, HypothesisSummary, PaymentTerms,
};
pub use study::{PortfolioValuation, ProductValuation, StudyConfig, StudyRunner};
