//! Declarative auto-resolution rules.
//!
//! A rule fires for one exception type when all of its conditions hold on the
//! order. Conditions are typed: the field is an [`OrderField`] and the
//! operator a [`ConditionOperator`], so a rule that references a field or
//! operator that does not exist cannot be built.
//!
//! On the wire (rule files, dashboard) rules use string names; they go through
//! [`RuleDefinition`] and are validated on the way in.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotwatch_orders::{FieldKind, FieldValue, Order, OrderField};

use crate::error::RuleError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

impl ConditionOperator {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::GreaterThan => "greaterThan",
            ConditionOperator::LessThan => "lessThan",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(self, ConditionOperator::GreaterThan | ConditionOperator::LessThan)
    }
}

impl FromStr for ConditionOperator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ConditionOperator::Equals),
            "contains" => Ok(ConditionOperator::Contains),
            "greaterThan" => Ok(ConditionOperator::GreaterThan),
            "lessThan" => Ok(ConditionOperator::LessThan),
            other => Err(RuleError::UnknownOperator(other.to_string())),
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
}

impl ConditionValue {
    /// Numeric view; text is accepted when it parses as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            ConditionValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Timestamp view; only RFC 3339 text qualifies.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ConditionValue::Number(_) => None,
            ConditionValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    pub fn render(&self) -> String {
        match self {
            ConditionValue::Number(n) => n.to_string(),
            ConditionValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Text(value)
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        ConditionValue::Number(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Number(value as f64)
    }
}

/// One `field <operator> value` test against an order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCondition {
    pub field: OrderField,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl RuleCondition {
    /// Build a condition, rejecting comparisons that could never match:
    /// ordering on text fields, non-numeric values for numeric fields,
    /// non-RFC 3339 values for ordering on timestamps.
    pub fn new(
        field: OrderField,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Result<Self, RuleError> {
        let value = value.into();
        let invalid = |reason: &str| RuleError::InvalidValue {
            field: field.name().to_string(),
            reason: reason.to_string(),
        };

        match (field.kind(), operator) {
            (FieldKind::Text, op) if op.is_ordering() => {
                return Err(invalid("ordering comparison on a text field"));
            }
            (FieldKind::Number, ConditionOperator::Equals)
            | (FieldKind::Number, ConditionOperator::GreaterThan)
            | (FieldKind::Number, ConditionOperator::LessThan) => {
                if value.as_number().is_none() {
                    return Err(invalid("expected a number"));
                }
            }
            (FieldKind::Timestamp, op) if op.is_ordering() => {
                if value.as_timestamp().is_none() {
                    return Err(invalid("expected an RFC 3339 timestamp"));
                }
            }
            _ => {}
        }

        Ok(Self {
            field,
            operator,
            value,
        })
    }

    /// Build from wire names (`"type"`, `"equals"`).
    pub fn parse(
        field: &str,
        operator: &str,
        value: impl Into<ConditionValue>,
    ) -> Result<Self, RuleError> {
        let field: OrderField = field
            .parse()
            .map_err(|_| RuleError::UnknownField(field.to_string()))?;
        let operator: ConditionOperator = operator.parse()?;
        Self::new(field, operator, value)
    }

    pub fn equals(field: OrderField, value: impl Into<ConditionValue>) -> Self {
        Self::unchecked(field, ConditionOperator::Equals, value.into())
    }

    pub fn contains(field: OrderField, value: impl Into<ConditionValue>) -> Self {
        Self::unchecked(field, ConditionOperator::Contains, value.into())
    }

    pub fn greater_than(field: OrderField, value: f64) -> Self {
        Self::unchecked(field, ConditionOperator::GreaterThan, value.into())
    }

    pub fn less_than(field: OrderField, value: f64) -> Self {
        Self::unchecked(field, ConditionOperator::LessThan, value.into())
    }

    fn unchecked(field: OrderField, operator: ConditionOperator, value: ConditionValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn evaluate(&self, order: &Order) -> bool {
        let actual = self.field.value(order);
        match self.operator {
            ConditionOperator::Equals => match &actual {
                FieldValue::Number(a) => self.value.as_number().is_some_and(|b| *a == b),
                FieldValue::Text(a) => *a == self.value.render(),
                FieldValue::Timestamp(a) => self.value.as_timestamp().is_some_and(|b| *a == b),
            },
            ConditionOperator::Contains => actual.render().contains(&self.value.render()),
            ConditionOperator::GreaterThan => {
                compare(&actual, &self.value) == Some(Ordering::Greater)
            }
            ConditionOperator::LessThan => compare(&actual, &self.value) == Some(Ordering::Less),
        }
    }
}

/// Ordering of a field value against a condition value; text never orders.
fn compare(actual: &FieldValue, expected: &ConditionValue) -> Option<Ordering> {
    match actual {
        FieldValue::Number(a) => a.partial_cmp(&expected.as_number()?),
        FieldValue::Timestamp(a) => Some(a.cmp(&expected.as_timestamp()?)),
        FieldValue::Text(_) => None,
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.field,
            self.operator.name(),
            self.value.render()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Notify,
    Escalate,
    Adjust,
    Reassign,
    Cancel,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Notify => "notify",
            ActionKind::Escalate => "escalate",
            ActionKind::Adjust => "adjust",
            ActionKind::Reassign => "reassign",
            ActionKind::Cancel => "cancel",
        }
    }
}

impl FromStr for ActionKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notify" => Ok(ActionKind::Notify),
            "escalate" => Ok(ActionKind::Escalate),
            "adjust" => Ok(ActionKind::Adjust),
            "reassign" => Ok(ActionKind::Reassign),
            "cancel" => Ok(ActionKind::Cancel),
            other => Err(RuleError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAction {
    pub kind: ActionKind,
    pub target: Option<String>,
    pub value: Option<String>,
    pub message: Option<String>,
}

impl RuleAction {
    fn of(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            value: None,
            message: None,
        }
    }

    pub fn notify(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            message: Some(message.into()),
            ..Self::of(ActionKind::Notify)
        }
    }

    pub fn escalate(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::of(ActionKind::Escalate)
        }
    }

    pub fn adjust(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            value: Some(value.into()),
            ..Self::of(ActionKind::Adjust)
        }
    }

    pub fn reassign(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::of(ActionKind::Reassign)
        }
    }

    pub fn cancel() -> Self {
        Self::of(ActionKind::Cancel)
    }

    /// Resolution-step text for this action. Missing parts render empty.
    pub fn describe(&self) -> String {
        let target = self.target.as_deref().unwrap_or("");
        match self.kind {
            ActionKind::Notify => {
                format!("通知{target}: {}", self.message.as_deref().unwrap_or(""))
            }
            ActionKind::Escalate => format!("升级给{target}"),
            ActionKind::Adjust => {
                format!("调整{target}为{}", self.value.as_deref().unwrap_or(""))
            }
            ActionKind::Reassign => format!("重新分配给{target}"),
            ActionKind::Cancel => "取消订单".to_string(),
        }
    }
}

/// A condition→action rule for one exception type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleDefinition", into = "RuleDefinition")]
pub struct AutoResolutionRule {
    pub name: String,
    pub exception_type: String,
    /// All must hold (AND); an empty list always holds.
    pub conditions: Vec<RuleCondition>,
    /// Applied in order.
    pub actions: Vec<RuleAction>,
    pub priority: Priority,
}

impl AutoResolutionRule {
    pub fn new(
        name: impl Into<String>,
        exception_type: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            name: name.into(),
            exception_type: exception_type.into(),
            conditions: Vec::new(),
            actions: Vec::new(),
            priority,
        }
    }

    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn then(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn matches(&self, exception_type: &str, order: &Order) -> bool {
        self.exception_type == exception_type && self.conditions.iter().all(|c| c.evaluate(order))
    }
}

/// Wire form of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub field: String,
    pub operator: String,
    pub value: ConditionValue,
}

/// Wire form of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Wire form of a rule, as found in rule files:
///
/// ```json
/// {
///   "name": "inbound quality",
///   "exceptionType": "质量问题",
///   "conditions": [{ "field": "type", "operator": "equals", "value": "inbound" }],
///   "actions": [{ "type": "notify", "target": "quality_control", "message": "..." }],
///   "priority": "high"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    #[serde(default)]
    pub name: String,
    pub exception_type: String,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub priority: Priority,
}

impl TryFrom<RuleDefinition> for AutoResolutionRule {
    type Error = RuleError;

    fn try_from(def: RuleDefinition) -> Result<Self, Self::Error> {
        let conditions = def
            .conditions
            .into_iter()
            .map(|c| RuleCondition::parse(&c.field, &c.operator, c.value))
            .collect::<Result<Vec<_>, _>>()?;

        let actions = def
            .actions
            .into_iter()
            .map(|a| {
                Ok(RuleAction {
                    kind: a.kind.parse()?,
                    target: a.target,
                    value: a.value,
                    message: a.message,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        let name = if def.name.is_empty() {
            def.exception_type.clone()
        } else {
            def.name
        };

        Ok(Self {
            name,
            exception_type: def.exception_type,
            conditions,
            actions,
            priority: def.priority,
        })
    }
}

impl From<AutoResolutionRule> for RuleDefinition {
    fn from(rule: AutoResolutionRule) -> Self {
        Self {
            name: rule.name,
            exception_type: rule.exception_type,
            conditions: rule
                .conditions
                .into_iter()
                .map(|c| ConditionDefinition {
                    field: c.field.name().to_string(),
                    operator: c.operator.name().to_string(),
                    value: c.value,
                })
                .collect(),
            actions: rule
                .actions
                .into_iter()
                .map(|a| ActionDefinition {
                    kind: a.kind.name().to_string(),
                    target: a.target,
                    value: a.value,
                    message: a.message,
                })
                .collect(),
            priority: rule.priority,
        }
    }
}
