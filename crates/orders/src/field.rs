//! Typed field accessor map for orders.
//!
//! Rule conditions name an order field by its dashboard name (`"type"`,
//! `"value"`, ...). Resolving that name to an [`OrderField`] happens once, when
//! the rule is built, so an unknown name is rejected up front instead of
//! silently never matching.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotwatch_core::DomainError;

use crate::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    Id,
    OrderNumber,
    Customer,
    Product,
    Quantity,
    Value,
    Status,
    #[serde(rename = "type")]
    Direction,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    pub const ALL: [OrderField; 10] = [
        OrderField::Id,
        OrderField::OrderNumber,
        OrderField::Customer,
        OrderField::Product,
        OrderField::Quantity,
        OrderField::Value,
        OrderField::Status,
        OrderField::Direction,
        OrderField::CreatedAt,
        OrderField::UpdatedAt,
    ];

    /// Dashboard (wire) name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            OrderField::Id => "id",
            OrderField::OrderNumber => "orderNumber",
            OrderField::Customer => "customer",
            OrderField::Product => "product",
            OrderField::Quantity => "quantity",
            OrderField::Value => "value",
            OrderField::Status => "status",
            OrderField::Direction => "type",
            OrderField::CreatedAt => "createdAt",
            OrderField::UpdatedAt => "updatedAt",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            OrderField::Quantity | OrderField::Value => FieldKind::Number,
            OrderField::CreatedAt | OrderField::UpdatedAt => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }

    pub fn value(&self, order: &Order) -> FieldValue {
        match self {
            OrderField::Id => FieldValue::Text(order.id.to_string()),
            OrderField::OrderNumber => FieldValue::Text(order.order_number.clone()),
            OrderField::Customer => FieldValue::Text(order.customer.clone()),
            OrderField::Product => FieldValue::Text(order.product.clone()),
            OrderField::Quantity => FieldValue::Number(order.quantity as f64),
            OrderField::Value => FieldValue::Number(order.value),
            OrderField::Status => FieldValue::Text(order.status.as_str().to_string()),
            OrderField::Direction => FieldValue::Text(order.direction.as_str().to_string()),
            OrderField::CreatedAt => FieldValue::Timestamp(order.created_at),
            OrderField::UpdatedAt => FieldValue::Timestamp(order.updated_at),
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OrderField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown order field `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
}

/// The value of one order field, as seen by a rule condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Text rendering used by substring matching.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Timestamp(t) => t.to_rfc3339(),
        }
    }
}
