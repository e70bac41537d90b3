//! The exception handling engine.

use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use depotwatch_ai::{AnomalyCheck, AnomalyDetector, OrderAnalysis, OrderAnalyzer};
use depotwatch_core::OrderId;
use depotwatch_events::{EventBus, InMemoryEventBus, Listener, SubscriptionId};
use depotwatch_orders::{Order, OrderStatus};

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::defaults::default_rules;
use crate::error::{ConfigError, EngineError, StoreError};
use crate::estimate::{RandomizedEstimator, ResolutionEstimator};
use crate::result::{ExceptionHandlingResult, ExceptionStats};
use crate::rule::AutoResolutionRule;
use crate::store::{InMemoryResultStore, ResultStore};

/// Full result list, as delivered to subscribers after every mutation.
pub type ResultsSnapshot = Vec<ExceptionHandlingResult>;

/// Outcome of [`ExceptionEngine::manually_handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum ManualOutcome {
    Resolved(ExceptionHandlingResult),
    /// No result exists for the order; nothing was changed.
    NotFound,
}

impl ManualOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ManualOutcome::Resolved(_))
    }

    pub fn into_result(self) -> Option<ExceptionHandlingResult> {
        match self {
            ManualOutcome::Resolved(r) => Some(r),
            ManualOutcome::NotFound => None,
        }
    }
}

/// Handle for a registered subscriber.
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<dyn EventBus<ResultsSnapshot>>,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `false` if the engine is gone or the callback was already removed.
    pub fn unsubscribe(self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.unsubscribe(self.id))
    }
}

/// Classifies flagged orders, applies auto-resolution rules and keeps the
/// per-order handling history.
///
/// Batches are not serialized internally: callers must not run two
/// `detect_and_handle` calls against the same engine concurrently.
pub struct ExceptionEngine {
    detector: Arc<dyn AnomalyDetector>,
    analyzer: Arc<dyn OrderAnalyzer>,
    estimator: Arc<dyn ResolutionEstimator>,
    store: Arc<dyn ResultStore>,
    bus: Arc<dyn EventBus<ResultsSnapshot>>,
    rules: RwLock<Vec<AutoResolutionRule>>,
    high_risk_threshold: f64,
}

impl core::fmt::Debug for ExceptionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExceptionEngine")
            .field("rules", &self.rules.read().map(|r| r.len()).unwrap_or(0))
            .field("high_risk_threshold", &self.high_risk_threshold)
            .finish_non_exhaustive()
    }
}

impl ExceptionEngine {
    /// Engine with the built-in rule table, in-memory store and bus, and the
    /// randomized estimator.
    pub fn new(detector: Arc<dyn AnomalyDetector>, analyzer: Arc<dyn OrderAnalyzer>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            detector,
            analyzer,
            estimator: Arc::new(RandomizedEstimator::new(defaults.estimate_windows)),
            store: Arc::new(InMemoryResultStore::new()),
            bus: Arc::new(InMemoryEventBus::<ResultsSnapshot>::new()),
            rules: RwLock::new(default_rules()),
            high_risk_threshold: defaults.high_risk_threshold,
        }
    }

    /// Engine wired from configuration: threshold, estimate windows and the
    /// startup rule list.
    pub fn from_config(
        config: &EngineConfig,
        detector: Arc<dyn AnomalyDetector>,
        analyzer: Arc<dyn OrderAnalyzer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config.load_rules()?;
        info!(
            rules = rules.len(),
            threshold = config.high_risk_threshold,
            "exception engine configured"
        );

        Ok(Self::new(detector, analyzer)
            .with_rules(rules)
            .with_high_risk_threshold(config.high_risk_threshold)
            .with_estimator(Arc::new(RandomizedEstimator::new(config.estimate_windows))))
    }

    /// Replace the whole rule list.
    pub fn with_rules(mut self, rules: Vec<AutoResolutionRule>) -> Self {
        self.rules = RwLock::new(rules);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ResolutionEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn EventBus<ResultsSnapshot>>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_high_risk_threshold(mut self, threshold: f64) -> Self {
        self.high_risk_threshold = threshold;
        self
    }

    /// Detect, classify and handle a batch of orders.
    ///
    /// Orders that already have a result get it back unchanged. Orders that
    /// are neither flagged by the detector nor in `exception` status produce
    /// nothing. A collaborator failure aborts the rest of the batch; results
    /// stored earlier in the same call are kept.
    pub async fn detect_and_handle(
        &self,
        orders: &[Order],
    ) -> Result<Vec<ExceptionHandlingResult>, EngineError> {
        let mut handled = Vec::new();

        for order in orders {
            if let Some(existing) = self.store.get(&order.id)? {
                debug!(order = %order.id, "order already handled; reusing result");
                handled.push(existing);
                continue;
            }

            let check = self.detector.detect(order).await.inspect_err(|e| {
                warn!(order = %order.id, error = %e, "anomaly detection failed; aborting batch");
            })?;

            if !check.is_anomaly && order.status != OrderStatus::Exception {
                debug!(order = %order.id, "order is normal");
                continue;
            }

            let analysis = self.analyzer.analyze(order).await.inspect_err(|e| {
                warn!(order = %order.id, error = %e, "order analysis failed; aborting batch");
            })?;

            let result = self.build_result(order, &check, &analysis, Utc::now())?;
            info!(
                order = %order.id,
                exception_type = %result.exception_type,
                status = ?result.status,
                auto_resolved = result.auto_resolution_applied,
                "order exception detected"
            );

            self.store.upsert(result.clone())?;
            self.notify()?;
            handled.push(result);
        }

        Ok(handled)
    }

    fn build_result(
        &self,
        order: &Order,
        check: &AnomalyCheck,
        analysis: &OrderAnalysis,
        now: DateTime<Utc>,
    ) -> Result<ExceptionHandlingResult, EngineError> {
        let classification = classify(check, analysis, self.high_risk_threshold);

        let matched: Vec<AutoResolutionRule> = self
            .rules
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .iter()
            .filter(|r| r.matches(&classification.exception_type, order))
            .cloned()
            .collect();

        let priority = matched
            .iter()
            .map(|r| r.priority)
            .max()
            .unwrap_or_else(|| classification.baseline_priority());
        debug!(
            order = %order.id,
            exception_type = %classification.exception_type,
            rules_matched = matched.len(),
            "rules evaluated"
        );

        let mut result =
            ExceptionHandlingResult::new(order.id, classification.exception_type, now, priority);

        if !matched.is_empty() {
            result.apply_rules(&matched, now);
            result.estimated_resolution_time = Some(self.estimator.estimate(priority, now));
        }
        Ok(result)
    }

    /// Record an operator action on an existing result and mark it resolved.
    ///
    /// Unknown orders are a silent miss: no mutation, no notification.
    pub fn manually_handle(
        &self,
        order_id: OrderId,
        action: impl Into<String>,
        result_text: impl Into<String>,
    ) -> Result<ManualOutcome, EngineError> {
        let Some(mut result) = self.store.get(&order_id)? else {
            debug!(order = %order_id, "manual handling for unknown order ignored");
            return Ok(ManualOutcome::NotFound);
        };

        let previous = result.status;
        result.resolve_manually(action, result_text, Utc::now());
        self.store.upsert(result.clone())?;
        info!(order = %order_id, from = ?previous, "exception resolved manually");

        self.notify()?;
        Ok(ManualOutcome::Resolved(result))
    }

    /// Register a callback that receives the full result list after every
    /// mutation.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[ExceptionHandlingResult]) + Send + Sync + 'static,
    {
        let listener: Listener<ResultsSnapshot> =
            Arc::new(move |snapshot: &ResultsSnapshot| callback(snapshot.as_slice()));
        let id = self.bus.subscribe(listener);
        Subscription {
            bus: Arc::downgrade(&self.bus),
            id,
        }
    }

    pub fn add_custom_rule(&self, rule: AutoResolutionRule) -> Result<(), EngineError> {
        let mut rules = self.rules.write().map_err(|_| StoreError::Poisoned)?;
        info!(rule = %rule.name, exception_type = %rule.exception_type, "custom rule added");
        rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> Result<Vec<AutoResolutionRule>, EngineError> {
        Ok(self.rules.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    pub fn result(&self, order_id: OrderId) -> Result<Option<ExceptionHandlingResult>, EngineError> {
        Ok(self.store.get(&order_id)?)
    }

    /// Full handling history, oldest detection first.
    pub fn results(&self) -> Result<Vec<ExceptionHandlingResult>, EngineError> {
        Ok(self.store.list()?)
    }

    pub fn stats(&self) -> Result<ExceptionStats, EngineError> {
        Ok(ExceptionStats::from_results(&self.store.list()?))
    }

    fn notify(&self) -> Result<(), EngineError> {
        let snapshot = self.store.list()?;
        let delivered = self.bus.publish(&snapshot);
        debug!(results = snapshot.len(), subscribers = delivered, "subscribers notified");
        Ok(())
    }
}
