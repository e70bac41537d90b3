use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use depotwatch_orders::Order;

use crate::result::AiError;

/// Anomaly detection output for a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyCheck {
    pub is_anomaly: bool,
    /// Exception type, when the detector can name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_type: Option<String>,
    pub confidence: f64,
    pub details: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

impl AnomalyCheck {
    pub fn normal(confidence: f64) -> Self {
        Self {
            is_anomaly: false,
            anomaly_type: None,
            confidence,
            details: "未发现异常".to_string(),
            suggested_actions: Vec::new(),
        }
    }

    pub fn anomaly(confidence: f64, details: impl Into<String>) -> Self {
        Self {
            is_anomaly: true,
            anomaly_type: None,
            confidence,
            details: details.into(),
            suggested_actions: Vec::new(),
        }
    }

    pub fn with_type(mut self, anomaly_type: impl Into<String>) -> Self {
        self.anomaly_type = Some(anomaly_type.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

/// Flags anomalous orders.
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect(&self, order: &Order) -> Result<AnomalyCheck, AiError>;
}

/// Deterministic threshold-based detector.
///
/// Checks, first hit wins:
/// 1. an open exception on the order (typed with that exception's type)
/// 2. quantity above `quantity_threshold` (typed `数量异常`)
/// 3. value above `value_threshold` (untyped; analysis decides the category)
#[derive(Debug, Clone)]
pub struct ThresholdAnomalyDetector {
    value_threshold: f64,
    quantity_threshold: i64,
}

impl Default for ThresholdAnomalyDetector {
    fn default() -> Self {
        Self {
            value_threshold: 100_000.0,
            quantity_threshold: 1_000,
        }
    }
}

impl ThresholdAnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value_threshold(mut self, value_threshold: f64) -> Self {
        self.value_threshold = value_threshold;
        self
    }

    pub fn with_quantity_threshold(mut self, quantity_threshold: i64) -> Self {
        self.quantity_threshold = quantity_threshold;
        self
    }
}

#[async_trait]
impl AnomalyDetector for ThresholdAnomalyDetector {
    async fn detect(&self, order: &Order) -> Result<AnomalyCheck, AiError> {
        if !order.value.is_finite() {
            return Err(AiError::InvalidInput(format!(
                "order {} has a non-finite value",
                order.order_number
            )));
        }

        if let Some(open) = order.open_exceptions().next() {
            return Ok(AnomalyCheck::anomaly(0.9, format!("订单存在未关闭异常: {}", open.description))
                .with_type(open.exception_type.clone())
                .with_actions(["核实异常原因", "联系相关责任人"]));
        }

        if order.quantity > self.quantity_threshold {
            return Ok(AnomalyCheck::anomaly(
                0.75,
                format!(
                    "订单数量 {} 超过阈值 {}",
                    order.quantity, self.quantity_threshold
                ),
            )
            .with_type("数量异常")
            .with_actions(["复核订单数量"]));
        }

        if order.value > self.value_threshold {
            return Ok(AnomalyCheck::anomaly(
                0.7,
                format!(
                    "订单金额 {:.2} 超过阈值 {:.2}",
                    order.value, self.value_threshold
                ),
            )
            .with_actions(["人工复核高额订单"]));
        }

        Ok(AnomalyCheck::normal(0.95))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depotwatch_orders::{OrderDirection, OrderException};

    fn order(quantity: i64, value: f64) -> Order {
        Order::new("IN-1", "供应商", "钢卷", quantity, value, OrderDirection::Inbound, Utc::now())
    }

    #[tokio::test]
    async fn ordinary_order_is_not_anomalous() {
        let check = ThresholdAnomalyDetector::new().detect(&order(10, 5_000.0)).await.unwrap();
        assert!(!check.is_anomaly);
        assert_eq!(check.anomaly_type, None);
    }

    #[tokio::test]
    async fn open_exception_names_the_type() {
        let o = order(10, 5_000.0).with_exception(OrderException::open("质量问题", "包装破损", Utc::now()));
        let check = ThresholdAnomalyDetector::new().detect(&o).await.unwrap();
        assert!(check.is_anomaly);
        assert_eq!(check.anomaly_type.as_deref(), Some("质量问题"));
    }

    #[tokio::test]
    async fn open_exception_wins_over_thresholds() {
        let o = order(5_000, 500_000.0).with_exception(OrderException::open("库存不足", "", Utc::now()));
        let check = ThresholdAnomalyDetector::new().detect(&o).await.unwrap();
        assert_eq!(check.anomaly_type.as_deref(), Some("库存不足"));
    }

    #[tokio::test]
    async fn large_quantity_is_typed() {
        let check = ThresholdAnomalyDetector::new()
            .with_quantity_threshold(100)
            .detect(&order(101, 5_000.0))
            .await
            .unwrap();
        assert!(check.is_anomaly);
        assert_eq!(check.anomaly_type.as_deref(), Some("数量异常"));
    }

    #[tokio::test]
    async fn high_value_is_flagged_without_type() {
        let check = ThresholdAnomalyDetector::new().detect(&order(10, 150_000.0)).await.unwrap();
        assert!(check.is_anomaly);
        assert_eq!(check.anomaly_type, None);
    }

    #[tokio::test]
    async fn non_finite_value_is_invalid_input() {
        let err = ThresholdAnomalyDetector::new()
            .detect(&order(10, f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidInput(_)));
    }

    #[test]
    fn check_serializes_camel_case() {
        let json = serde_json::to_value(AnomalyCheck::anomaly(0.5, "x").with_type("t")).unwrap();
        assert_eq!(json["isAnomaly"], true);
        assert_eq!(json["anomalyType"], "t");
    }
}
