use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotwatch_core::{DomainError, DomainResult, Entity, OrderId};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Exception,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Exception => "exception",
        }
    }
}

/// Whether goods are arriving at or leaving the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Inbound,
    Outbound,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Inbound => "inbound",
            OrderDirection::Outbound => "outbound",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionStatus {
    Open,
    Resolved,
}

/// An anomaly recorded against an order by an operator or upstream system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderException {
    #[serde(rename = "type")]
    pub exception_type: String,
    pub description: String,
    pub status: ExceptionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl OrderException {
    pub fn open(
        exception_type: impl Into<String>,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            exception_type: exception_type.into(),
            description: description.into(),
            status: ExceptionStatus::Open,
            created_at: at,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ExceptionStatus::Open
    }
}

/// A warehouse order as seen by the dashboard.
///
/// Field names on the wire follow the dashboard JSON (`orderNumber`, `type`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    /// Counterparty: customer for outbound orders, supplier for inbound ones.
    pub customer: String,
    pub product: String,
    pub quantity: i64,
    /// Monetary value in the dashboard's display currency.
    pub value: f64,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub direction: OrderDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<OrderException>,
}

impl Order {
    /// New `pending` order with no exceptions.
    pub fn new(
        order_number: impl Into<String>,
        customer: impl Into<String>,
        product: impl Into<String>,
        quantity: i64,
        value: f64,
        direction: OrderDirection,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_number: order_number.into(),
            customer: customer.into(),
            product: product.into(),
            quantity,
            value,
            status: OrderStatus::Pending,
            direction,
            created_at: at,
            updated_at: at,
            exceptions: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_exception(mut self, exception: OrderException) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn open_exceptions(&self) -> impl Iterator<Item = &OrderException> {
        self.exceptions.iter().filter(|e| e.is_open())
    }

    pub fn has_open_exception(&self) -> bool {
        self.open_exceptions().next().is_some()
    }

    /// Record-level checks applied by the data accessor on insert.
    pub fn validate(&self) -> DomainResult<()> {
        if self.order_number.trim().is_empty() {
            return Err(DomainError::validation("order_number must not be empty"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !(self.value.is_finite() && self.value >= 0.0) {
            return Err(DomainError::validation("value must be a finite non-negative amount"));
        }
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
