//! Unit OPEX profiles and the manufacturing learning curve

pub mod engine;
pub mod learning_curve;

pub use engine::{AfterSalesDistribution, ComponentOpex, OpexEngine, OpexInput, OpexProfile};
pub use learning_curve::{Breakpoint, LearningCurveSpec};
