//! One-shot batch runner: load orders, handle exceptions, report.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use depotwatch_ai::{HeuristicOrderAnalyzer, ThresholdAnomalyDetector};
use depotwatch_exceptions::{EngineConfig, ExceptionEngine, ExceptionHandlingResult, ExceptionStats};
use depotwatch_orders::{InMemoryOrderRepository, Order, OrderRepository};

pub const ENV_ORDERS_FILE: &str = "DEPOTWATCH_ORDERS_FILE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub results: Vec<ExceptionHandlingResult>,
    pub stats: ExceptionStats,
}

/// Parse a JSON array of orders into a validated repository.
pub fn load_orders(json: &str) -> anyhow::Result<InMemoryOrderRepository> {
    let orders: Vec<Order> = serde_json::from_str(json).context("orders file is not a valid order list")?;
    InMemoryOrderRepository::with_orders(orders).context("orders file contains invalid records")
}

pub async fn run(config: &EngineConfig, orders_file: &Path) -> anyhow::Result<Report> {
    let raw = std::fs::read_to_string(orders_file)
        .with_context(|| format!("failed to read {}", orders_file.display()))?;
    let repo = load_orders(&raw)?;
    handle(config, &repo).await
}

/// Run every order in the repository through a heuristic-backed engine.
pub async fn handle(
    config: &EngineConfig,
    repo: &impl OrderRepository,
) -> anyhow::Result<Report> {
    let engine = ExceptionEngine::from_config(
        config,
        Arc::new(ThresholdAnomalyDetector::new()),
        Arc::new(HeuristicOrderAnalyzer::new()),
    )?;

    let orders = repo.list().await?;
    let results = engine
        .detect_and_handle(&orders)
        .await
        .context("exception handling aborted")?;
    let stats = engine.stats()?;

    info!(
        orders = orders.len(),
        exceptions = results.len(),
        escalated = stats.escalated,
        "batch complete"
    );
    Ok(Report { results, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depotwatch_orders::OrderDirection;

    fn sample() -> String {
        let now = Utc::now();
        let orders = vec![
            Order::new("OUT-1", "客户", "服务器", 2, 250_000.0, OrderDirection::Outbound, now),
            Order::new("OUT-2", "客户", "胶带", 3, 90.0, OrderDirection::Outbound, now),
        ];
        serde_json::to_string(&orders).unwrap()
    }

    #[tokio::test]
    async fn reports_only_flagged_orders() {
        let repo = load_orders(&sample()).unwrap();
        let report = handle(&EngineConfig::default(), &repo).await.unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].exception_type, "high_risk");
        assert_eq!(report.stats.escalated, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["total"], 1);
    }

    #[test]
    fn rejects_malformed_orders_file() {
        let err = load_orders(r#"[{ "orderNumber": "x" }]"#).unwrap_err();
        assert!(err.to_string().contains("not a valid order list"));
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let err = run(&EngineConfig::default(), Path::new("/nonexistent/orders.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/orders.json"));
    }
}
