use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotwatch_core::{Entity, OrderId};

use crate::rule::{ActionKind, AutoResolutionRule, Priority};

/// Workflow status of a handled exception.
///
/// `pending → processing → resolved`, or `processing → escalated`. Manual
/// handling forces `resolved` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlingStatus {
    Pending,
    Processing,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStep {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub automated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Handling record for one flagged order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionHandlingResult {
    pub order_id: OrderId,
    pub exception_type: String,
    pub detected_at: DateTime<Utc>,
    pub status: HandlingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub priority: Priority,
    pub auto_resolution_applied: bool,
    pub resolution_steps: Vec<ResolutionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_resolution_time: Option<DateTime<Utc>>,
}

impl ExceptionHandlingResult {
    /// Fresh `pending` result with no steps.
    pub fn new(
        order_id: OrderId,
        exception_type: impl Into<String>,
        detected_at: DateTime<Utc>,
        priority: Priority,
    ) -> Self {
        Self {
            order_id,
            exception_type: exception_type.into(),
            detected_at,
            status: HandlingStatus::Pending,
            assigned_to: None,
            priority,
            auto_resolution_applied: false,
            resolution_steps: Vec::new(),
            estimated_resolution_time: None,
        }
    }

    /// Apply matched rules: one automated step per action, rule order then
    /// action order. Any `escalate` moves the result to `escalated` and
    /// assigns it to the action's target; the last one wins.
    ///
    /// No-op for an empty rule list.
    pub fn apply_rules(&mut self, rules: &[AutoResolutionRule], at: DateTime<Utc>) {
        if rules.is_empty() {
            return;
        }

        self.auto_resolution_applied = true;
        self.status = HandlingStatus::Processing;

        for action in rules.iter().flat_map(|r| r.actions.iter()) {
            self.resolution_steps.push(ResolutionStep {
                action: action.describe(),
                timestamp: at,
                automated: true,
                result: None,
            });

            if action.kind == ActionKind::Escalate {
                self.status = HandlingStatus::Escalated;
                self.assigned_to = action.target.clone();
            }
        }
    }

    /// Record an operator action and force the result to `resolved`.
    pub fn resolve_manually(
        &mut self,
        action: impl Into<String>,
        result: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.resolution_steps.push(ResolutionStep {
            action: action.into(),
            timestamp: at,
            automated: false,
            result: Some(result.into()),
        });
        self.status = HandlingStatus::Resolved;
    }
}

impl Entity for ExceptionHandlingResult {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.order_id
    }
}

/// Dashboard counters over the result history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub resolved: usize,
    pub escalated: usize,
    /// Results where at least one rule fired.
    pub auto_resolved: usize,
}

impl ExceptionStats {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExceptionHandlingResult>) -> Self {
        results.into_iter().fold(Self::default(), |mut s, r| {
            s.total += 1;
            match r.status {
                HandlingStatus::Pending => s.pending += 1,
                HandlingStatus::Processing => s.processing += 1,
                HandlingStatus::Resolved => s.resolved += 1,
                HandlingStatus::Escalated => s.escalated += 1,
            }
            if r.auto_resolution_applied {
                s.auto_resolved += 1;
            }
            s
        })
    }
}
