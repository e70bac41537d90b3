//! Built-in rule table loaded at engine start.

use depotwatch_orders::OrderField;

use crate::classify::HIGH_RISK;
use crate::rule::{AutoResolutionRule, Priority, RuleAction, RuleCondition};

pub fn default_rules() -> Vec<AutoResolutionRule> {
    vec![
        AutoResolutionRule::new("入库质量检查", "质量问题", Priority::High)
            .when(RuleCondition::equals(OrderField::Direction, "inbound"))
            .then(RuleAction::notify("quality_control", "入库货物质量异常，请安排抽检"))
            .then(RuleAction::reassign("quality_team")),
        AutoResolutionRule::new("出库延迟处理", "延迟交付", Priority::Medium)
            .when(RuleCondition::equals(OrderField::Direction, "outbound"))
            .then(RuleAction::notify("logistics", "出库订单延迟，请确认承运安排"))
            .then(RuleAction::adjust("priority", "urgent")),
        AutoResolutionRule::new("库存不足补货", "库存不足", Priority::Medium)
            .then(RuleAction::notify("procurement", "库存不足，请尽快补货"))
            .then(RuleAction::adjust("quantity", "available_stock")),
        AutoResolutionRule::new("高风险订单升级", HIGH_RISK, Priority::High)
            .when(RuleCondition::greater_than(OrderField::Value, 100_000.0))
            .then(RuleAction::notify("risk_team", "高价值订单存在风险"))
            .then(RuleAction::escalate("operations_manager")),
        AutoResolutionRule::new("数量异常复核", "数量异常", Priority::Medium)
            .when(RuleCondition::greater_than(OrderField::Quantity, 1_000.0))
            .then(RuleAction::escalate("warehouse_supervisor")),
    ]
}
