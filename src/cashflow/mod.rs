//! Cash-flow, P&L and return metrics of a product

pub mod amortization;
pub mod currency;
pub mod discount;
pub mod engine;
pub mod irr;
pub mod ledger;
pub mod payment;
pub mod summary;

pub use amortization::AmortizationSchedule;
pub use currency::{Currency, ExchangeRate, Monetary};
pub use discount::DiscountMode;
pub use engine::{CashflowConfig, CashflowEngine, CashflowResult};
pub use irr::compute_irr;
pub use ledger::{CashflowLedger, CashflowRow};
pub use payment::PaymentTerms;
pub use summary::{CashflowInfo, HypothesisSummary};
