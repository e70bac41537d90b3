//! Order exception handling engine.
//!
//! Classifies anomalous orders, applies declarative auto-resolution rules,
//! and keeps a queryable, subscribable history of handling results.
//!
//! ```text
//! orders ─► AnomalyDetector ─► OrderAnalyzer ─► classify ─► rules ─► ResultStore ─► EventBus
//! ```
//!
//! Everything is owned by an [`ExceptionEngine`] instance; there is no global
//! state, so independent engines can coexist (one per test, one per site).

pub mod classify;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod result;
pub mod rule;
pub mod store;

pub use classify::{Classification, ClassificationSource, GENERAL_EXCEPTION, HIGH_RISK, classify};
pub use config::EngineConfig;
pub use defaults::default_rules;
pub use engine::{ExceptionEngine, ManualOutcome, ResultsSnapshot, Subscription};
pub use error::{ConfigError, EngineError, RuleError, StoreError};
pub use estimate::{
    EstimateWindows, FixedOffsetEstimator, HourRange, RandomizedEstimator, ResolutionEstimator,
};
pub use result::{ExceptionHandlingResult, ExceptionStats, HandlingStatus, ResolutionStep};
pub use rule::{
    ActionKind, AutoResolutionRule, ConditionOperator, ConditionValue, Priority, RuleAction,
    RuleCondition, RuleDefinition,
};
pub use store::{InMemoryResultStore, ResultStore};
