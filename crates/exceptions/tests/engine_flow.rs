use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use depotwatch_ai::{HeuristicOrderAnalyzer, ThresholdAnomalyDetector};
use depotwatch_exceptions::{
    AutoResolutionRule, ExceptionEngine, FixedOffsetEstimator, HandlingStatus, Priority,
    RuleAction, RuleCondition, HIGH_RISK,
};
use depotwatch_orders::{
    InMemoryOrderRepository, Order, OrderDirection, OrderField, OrderRepository, OrderStatus,
};

fn heuristic_engine() -> ExceptionEngine {
    ExceptionEngine::new(
        Arc::new(ThresholdAnomalyDetector::new()),
        Arc::new(HeuristicOrderAnalyzer::new()),
    )
    .with_estimator(Arc::new(FixedOffsetEstimator::new(Duration::hours(2))))
}

#[tokio::test]
async fn repository_orders_flow_through_the_built_in_rules() {
    let now = Utc::now();
    let damaged = Order::new("IN-100", "华东供应商", "托盘", 40, 95_000.0, OrderDirection::Inbound, now);
    let pricey = Order::new("OUT-100", "零售客户", "服务器", 2, 250_000.0, OrderDirection::Outbound, now);
    let bulk = Order::new("OUT-101", "批发客户", "纸箱", 5_000, 20_000.0, OrderDirection::Outbound, now);
    let quiet = Order::new("OUT-102", "零售客户", "胶带", 3, 90.0, OrderDirection::Outbound, now);

    let repo = InMemoryOrderRepository::with_orders([
        damaged.clone(),
        pricey.clone(),
        bulk.clone(),
        quiet.clone(),
    ])
    .unwrap();
    repo.record_exception(damaged.id, "质量问题", "外包装破损", now)
        .await
        .unwrap();

    let orders = repo.list().await.unwrap();
    let engine = heuristic_engine();
    let results = engine.detect_and_handle(&orders).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.order_id != quiet.id));

    let by_id = |id| results.iter().find(|r| r.order_id == id).unwrap();

    let quality = by_id(damaged.id);
    assert_eq!(quality.exception_type, "质量问题");
    assert_eq!(quality.status, HandlingStatus::Processing);
    assert_eq!(quality.assigned_to, None);
    assert_eq!(quality.resolution_steps.len(), 2);

    let risky = by_id(pricey.id);
    assert_eq!(risky.exception_type, HIGH_RISK);
    assert_eq!(risky.status, HandlingStatus::Escalated);
    assert_eq!(risky.assigned_to.as_deref(), Some("operations_manager"));

    let oversized = by_id(bulk.id);
    assert_eq!(oversized.exception_type, "数量异常");
    assert_eq!(oversized.assigned_to.as_deref(), Some("warehouse_supervisor"));

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.escalated, 2);
    assert_eq!(stats.processing, 1);
}

#[tokio::test]
async fn resolving_the_order_does_not_reopen_the_handled_result() {
    let now = Utc::now();
    let order = Order::new("IN-200", "供应商", "钢板", 10, 1_000.0, OrderDirection::Inbound, now);
    let repo = InMemoryOrderRepository::with_orders([order.clone()]).unwrap();
    repo.record_exception(order.id, "质量问题", "锈蚀", now).await.unwrap();

    let engine = heuristic_engine();
    engine.detect_and_handle(&repo.list_exceptions().await.unwrap()).await.unwrap();

    let fixed = repo.resolve_exception(order.id, "质量问题", now).await.unwrap();
    assert_eq!(fixed.status, OrderStatus::Processing);

    engine.manually_handle(order.id, "退货换新", "供应商已补发").unwrap();
    let again = engine.detect_and_handle(&[fixed]).await.unwrap();
    assert_eq!(again[0].status, HandlingStatus::Resolved);
}

fn rule_for(kind: &str, min_quantity: i64, actions: usize) -> AutoResolutionRule {
    (0..actions).fold(
        AutoResolutionRule::new(format!("{kind}-{min_quantity}"), kind, Priority::Medium)
            .when(RuleCondition::greater_than(OrderField::Quantity, min_quantity as f64)),
        |rule, i| rule.then(RuleAction::notify(format!("team{i}"), "检查")),
    )
}

proptest! {
    #[test]
    fn step_count_equals_actions_of_matched_rules(
        quantity in 1i64..500,
        specs in proptest::collection::vec((0i64..500, 1usize..4), 0..6),
    ) {
        let rules: Vec<AutoResolutionRule> = specs
            .iter()
            .map(|(min, n)| rule_for("数量异常", *min, *n))
            .collect();
        let expected: usize = specs
            .iter()
            .filter(|(min, _)| quantity > *min)
            .map(|(_, n)| n)
            .sum();

        let order = Order::new("P-1", "c", "p", quantity, 1.0, OrderDirection::Outbound, Utc::now())
            .with_status(OrderStatus::Exception);
        let engine = ExceptionEngine::new(
            Arc::new(ThresholdAnomalyDetector::new().with_quantity_threshold(0)),
            Arc::new(HeuristicOrderAnalyzer::new()),
        )
        .with_rules(rules);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let results = runtime.block_on(engine.detect_and_handle(&[order])).unwrap();

        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(results[0].resolution_steps.len(), expected);
        prop_assert_eq!(results[0].auto_resolution_applied, expected > 0);
    }
}
