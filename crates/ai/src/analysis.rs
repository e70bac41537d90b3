use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use depotwatch_orders::{Order, OrderStatus};

use crate::result::{AiError, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub category: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Finding {
    pub fn new(category: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            severity,
            recommendations: Vec::new(),
        }
    }

    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAnalysis {
    /// Findings in the order the analyzer produced them.
    pub findings: Vec<Finding>,
    pub summary: String,
    /// Overall risk in `[0, 1]`.
    pub risk_score: f64,
}

impl OrderAnalysis {
    /// First finding tagged `high`, in list order.
    pub fn first_high(&self) -> Option<&Finding> {
        self.findings.iter().find(|f| f.severity == Severity::High)
    }
}

/// Produces findings and a risk score for a flagged order.
#[async_trait]
pub trait OrderAnalyzer: Send + Sync {
    async fn analyze(&self, order: &Order) -> Result<OrderAnalysis, AiError>;
}

/// Deterministic rule-of-thumb analyzer.
///
/// Risk = 0.5 per high finding + 0.2 per medium finding + 0.6 × value share,
/// clamped to `[0, 1]`, where value share is `value / value_threshold` capped
/// at 1.
#[derive(Debug, Clone)]
pub struct HeuristicOrderAnalyzer {
    value_threshold: f64,
    stale_after: Duration,
    reference_time: Option<DateTime<Utc>>,
}

impl Default for HeuristicOrderAnalyzer {
    fn default() -> Self {
        Self {
            value_threshold: 100_000.0,
            stale_after: Duration::hours(48),
            reference_time: None,
        }
    }
}

impl HeuristicOrderAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value_threshold(mut self, value_threshold: f64) -> Self {
        self.value_threshold = value_threshold;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Pin "now" for staleness checks (tests, replays).
    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }
}

#[async_trait]
impl OrderAnalyzer for HeuristicOrderAnalyzer {
    async fn analyze(&self, order: &Order) -> Result<OrderAnalysis, AiError> {
        if !(self.value_threshold.is_finite() && self.value_threshold > 0.0) {
            return Err(AiError::InvalidInput(
                "value_threshold must be a finite positive number".to_string(),
            ));
        }
        if !order.value.is_finite() {
            return Err(AiError::InvalidInput(format!(
                "order {} has a non-finite value",
                order.order_number
            )));
        }

        let now = self.reference_time.unwrap_or_else(Utc::now);
        let mut findings = Vec::new();

        for exception in order.open_exceptions() {
            findings.push(
                Finding::new(
                    exception.exception_type.clone(),
                    exception.description.clone(),
                    Severity::High,
                )
                .recommend("优先处理未关闭异常"),
            );
        }

        if order.value > self.value_threshold {
            findings.push(
                Finding::new(
                    "高额订单",
                    format!("订单金额 {:.2} 超过 {:.2}", order.value, self.value_threshold),
                    Severity::Medium,
                )
                .recommend("安排二次审核"),
            );
        }

        if order.status != OrderStatus::Completed && now - order.created_at > self.stale_after {
            findings.push(
                Finding::new(
                    "延迟交付",
                    format!("订单已创建 {} 小时仍未完成", (now - order.created_at).num_hours()),
                    Severity::Medium,
                )
                .recommend("确认承运与仓储进度"),
            );
        }

        let high = findings.iter().filter(|f| f.severity == Severity::High).count() as f64;
        let medium = findings.iter().filter(|f| f.severity == Severity::Medium).count() as f64;
        let value_share = (order.value / self.value_threshold).clamp(0.0, 1.0);
        let risk_score = (0.5 * high + 0.2 * medium + 0.6 * value_share).clamp(0.0, 1.0);

        Ok(OrderAnalysis {
            summary: format!("发现{}项问题，风险评分{:.2}", findings.len(), risk_score),
            findings,
            risk_score,
        })
    }
}
