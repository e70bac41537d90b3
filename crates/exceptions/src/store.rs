use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use depotwatch_core::{Entity, OrderId};

use crate::error::StoreError;
use crate::result::ExceptionHandlingResult;

/// Keyed store of handling results (one per order).
pub trait ResultStore: Send + Sync {
    fn get(&self, order_id: &OrderId) -> Result<Option<ExceptionHandlingResult>, StoreError>;

    fn upsert(&self, result: ExceptionHandlingResult) -> Result<(), StoreError>;

    /// All results, oldest detection first.
    fn list(&self) -> Result<Vec<ExceptionHandlingResult>, StoreError>;
}

impl<S> ResultStore for Arc<S>
where
    S: ResultStore + ?Sized,
{
    fn get(&self, order_id: &OrderId) -> Result<Option<ExceptionHandlingResult>, StoreError> {
        (**self).get(order_id)
    }

    fn upsert(&self, result: ExceptionHandlingResult) -> Result<(), StoreError> {
        (**self).upsert(result)
    }

    fn list(&self) -> Result<Vec<ExceptionHandlingResult>, StoreError> {
        (**self).list()
    }
}

/// Process-lifetime store. Nothing is ever removed.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    inner: RwLock<HashMap<OrderId, ExceptionHandlingResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn get(&self, order_id: &OrderId) -> Result<Option<ExceptionHandlingResult>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(order_id).cloned())
    }

    fn upsert(&self, result: ExceptionHandlingResult) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(*result.id(), result);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ExceptionHandlingResult>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<ExceptionHandlingResult> = map.values().cloned().collect();
        all.sort_by(|a, b| {
            a.detected_at
                .cmp(&b.detected_at)
                .then(a.order_id.cmp(&b.order_id))
        });
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Priority;
    use chrono::{Duration, Utc};

    #[test]
    fn upsert_replaces_by_order_id() {
        let store = InMemoryResultStore::new();
        let mut r = ExceptionHandlingResult::new(OrderId::new(), "t", Utc::now(), Priority::Low);
        store.upsert(r.clone()).unwrap();

        r.resolve_manually("a", "b", Utc::now());
        store.upsert(r.clone()).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.get(&r.order_id).unwrap(), Some(r));
    }

    #[test]
    fn list_is_ordered_by_detection_time() {
        let store = InMemoryResultStore::new();
        let now = Utc::now();
        let later = ExceptionHandlingResult::new(OrderId::new(), "b", now, Priority::Low);
        let earlier =
            ExceptionHandlingResult::new(OrderId::new(), "a", now - Duration::minutes(5), Priority::Low);
        store.upsert(later).unwrap();
        store.upsert(earlier).unwrap();

        let types: Vec<String> = store.list().unwrap().into_iter().map(|r| r.exception_type).collect();
        assert_eq!(types, ["a", "b"]);
    }

    #[test]
    fn unknown_id_is_none() {
        assert_eq!(InMemoryResultStore::new().get(&OrderId::new()).unwrap(), None);
    }
}
