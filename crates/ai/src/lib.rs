//! `depotwatch-ai`
//!
//! **Responsibility:** the heuristic "AI" collaborators consumed by the
//! exception engine.
//!
//! - Anomaly detection flags an order and optionally names its exception type.
//! - Order analysis returns severity-tagged findings and a risk score.
//!
//! Both are read-only: they never mutate orders. The contracts are traits so
//! a model-backed implementation can replace the heuristics without touching
//! the engine.

pub mod analysis;
pub mod anomaly;
pub mod result;

pub use analysis::{Finding, HeuristicOrderAnalyzer, OrderAnalysis, OrderAnalyzer};
pub use anomaly::{AnomalyCheck, AnomalyDetector, ThresholdAnomalyDetector};
pub use result::{AiError, Severity};
