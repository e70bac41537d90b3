//! Order data accessor.
//!
//! All order creation and mutation goes through an [`OrderRepository`]. The
//! exception engine only ever reads orders handed to it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use depotwatch_core::{DomainError, DomainResult, Entity, OrderId};

use crate::order::{ExceptionStatus, Order, OrderException, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// All orders, oldest first.
    async fn list(&self) -> DomainResult<Vec<Order>>;

    async fn get(&self, id: OrderId) -> DomainResult<Order>;

    /// Insert a new order. Fails with `Conflict` if the id is taken.
    async fn insert(&self, order: Order) -> DomainResult<Order>;

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Order>;

    /// Attach an open exception and move the order to `exception`.
    async fn record_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order>;

    /// Resolve the open exception of the given type.
    ///
    /// Once no open exception remains the order returns to `processing`.
    async fn resolve_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order>;

    /// Orders currently in `exception` status.
    async fn list_exceptions(&self) -> DomainResult<Vec<Order>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Exception)
            .collect())
    }
}

#[async_trait]
impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    async fn list(&self) -> DomainResult<Vec<Order>> {
        (**self).list().await
    }

    async fn get(&self, id: OrderId) -> DomainResult<Order> {
        (**self).get(id).await
    }

    async fn insert(&self, order: Order) -> DomainResult<Order> {
        (**self).insert(order).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        (**self).update_status(id, status, at).await
    }

    async fn record_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        (**self).record_exception(id, exception_type, description, at).await
    }

    async fn resolve_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        (**self).resolve_exception(id, exception_type, at).await
    }
}

/// In-memory order store for tests/dev and the batch runner.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from an existing batch, validating every record.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> DomainResult<Self> {
        let repo = Self::new();
        {
            let mut map = repo.write()?;
            for order in orders {
                order.validate()?;
                if map.contains_key(order.id()) {
                    return Err(DomainError::conflict(format!("duplicate order {}", order.id)));
                }
                map.insert(order.id, order);
            }
        }
        Ok(repo)
    }

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, HashMap<OrderId, Order>>> {
        self.inner
            .read()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))
    }

    fn write(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, HashMap<OrderId, Order>>> {
        self.inner
            .write()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))
    }

    fn mutate<F>(&self, id: OrderId, f: F) -> DomainResult<Order>
    where
        F: FnOnce(&mut Order) -> DomainResult<()>,
    {
        let mut map = self.write()?;
        let order = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        f(order)?;
        Ok(order.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn list(&self) -> DomainResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.read()?.values().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn get(&self, id: OrderId) -> DomainResult<Order> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))
    }

    async fn insert(&self, order: Order) -> DomainResult<Order> {
        order.validate()?;
        let mut map = self.write()?;
        if map.contains_key(order.id()) {
            return Err(DomainError::conflict(format!("order {} already exists", order.id)));
        }
        map.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        self.mutate(id, |order| {
            order.status = status;
            order.updated_at = at;
            Ok(())
        })
    }

    async fn record_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        if exception_type.trim().is_empty() {
            return Err(DomainError::validation("exception type must not be empty"));
        }
        let order = self.mutate(id, |order| {
            order
                .exceptions
                .push(OrderException::open(exception_type, description, at));
            order.status = OrderStatus::Exception;
            order.updated_at = at;
            Ok(())
        })?;
        info!(order = %id, exception_type, "order exception recorded");
        Ok(order)
    }

    async fn resolve_exception(
        &self,
        id: OrderId,
        exception_type: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Order> {
        let order = self.mutate(id, |order| {
            let exception = order
                .exceptions
                .iter_mut()
                .find(|e| e.is_open() && e.exception_type == exception_type)
                .ok_or_else(|| {
                    DomainError::not_found(format!("open `{exception_type}` exception on order {id}"))
                })?;
            exception.status = ExceptionStatus::Resolved;
            exception.resolved_at = Some(at);

            if !order.has_open_exception() && order.status == OrderStatus::Exception {
                order.status = OrderStatus::Processing;
            }
            order.updated_at = at;
            Ok(())
        })?;
        info!(order = %id, exception_type, "order exception resolved");
        Ok(order)
    }
}
