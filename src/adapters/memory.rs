use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    adapters::{Adapter, Query, Record, RecordStream},
    error::Error,
    options::ExecOptions,
    query::{Direction, Filter, FilterOp},
};

#[derive(Clone, Default)]
struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Vec<Record>>>>,
}

/// In-process adapter backed by a mutex-guarded map, keyed by source.
///
/// Engine-native order is insertion order. The tenancy prefix namespaces
/// sources, so two prefixes never see each other's records. Intended for
/// tests and small embedded use.
pub struct MemoryAdapter {
    store: MemoryStore,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::default(),
        }
    }

    fn matches(record: &Record, predicate: &Filter) -> bool {
        let field = record
            .data
            .get(&predicate.field)
            .unwrap_or(&serde_json::Value::Null);

        match &predicate.op {
            FilterOp::Eq(value) => match serde_json::to_value(value) {
                Ok(wanted) => *field == wanted,
                Err(_) => false,
            },
            FilterOp::IsNull => field.is_null(),
            FilterOp::IsNotNull => !field.is_null(),
        }
    }

    fn compare(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
        use serde_json::Value as Json;

        match (a, b) {
            (Json::Null, Json::Null) => Ordering::Equal,
            (Json::Null, _) => Ordering::Less,
            (_, Json::Null) => Ordering::Greater,
            (Json::Bool(x), Json::Bool(y)) => x.cmp(y),
            (Json::Number(x), Json::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Json::String(x), Json::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }

    fn apply(records: &[Record], query: &Query) -> Vec<Record> {
        let mut matched: Vec<Record> = records
            .iter()
            .filter(|record| query.predicates.iter().all(|p| Self::matches(record, p)))
            .cloned()
            .collect();

        if !query.order.is_empty() {
            matched.sort_by(|a, b| {
                for order in &query.order {
                    let left = a.data.get(&order.field).unwrap_or(&serde_json::Value::Null);
                    let right = b.data.get(&order.field).unwrap_or(&serde_json::Value::Null);
                    let mut ordering = Self::compare(left, right);
                    if order.direction == Direction::Desc {
                        ordering = ordering.reverse();
                    }
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let mut bounded: Vec<Record> = matched.into_iter().skip(offset).collect();
        if let Some(limit) = query.limit {
            bounded.truncate(limit as usize);
        }

        match &query.select {
            Some(fields) => bounded.into_iter().map(|r| r.project(fields)).collect(),
            None => bounded,
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Adapter for MemoryAdapter {
    async fn execute(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<Vec<Record>, Error> {
        let store = self.store.records.lock().unwrap();
        let records = store
            .get(&opts.scoped_source(source))
            .map(|r| Self::apply(r, &query))
            .unwrap_or_default();
        Ok(records)
    }

    async fn count(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<u64, Error> {
        let store = self.store.records.lock().unwrap();
        let count = store
            .get(&opts.scoped_source(source))
            .map(|records| {
                records
                    .iter()
                    .filter(|record| query.predicates.iter().all(|p| Self::matches(record, p)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn get_by_id(
        &self,
        source: &str,
        id: Uuid,
        opts: &ExecOptions,
    ) -> Result<Option<Record>, Error> {
        let store = self.store.records.lock().unwrap();
        Ok(store
            .get(&opts.scoped_source(source))
            .and_then(|records| records.iter().find(|r| r.id == id).cloned()))
    }

    async fn insert(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error> {
        let mut store = self.store.records.lock().unwrap();
        let records = store
            .entry(opts.scoped_source(&record.source))
            .or_default();

        if records.iter().any(|r| r.id == record.id) {
            return Err(Error::Conflict);
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error> {
        let mut store = self.store.records.lock().unwrap();
        let records = store
            .get_mut(&opts.scoped_source(&record.source))
            .ok_or(Error::NotFound)?;

        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(Error::NotFound)?;

        stored.data = record.data;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, source: &str, id: Uuid, opts: &ExecOptions) -> Result<Record, Error> {
        let mut store = self.store.records.lock().unwrap();
        let records = store
            .get_mut(&opts.scoped_source(source))
            .ok_or(Error::NotFound)?;

        let position = records
            .iter()
            .position(|r| r.id == id)
            .ok_or(Error::NotFound)?;

        Ok(records.remove(position))
    }

    async fn stream(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<RecordStream, Error> {
        let records = self.execute(source, query, opts).await?;
        Ok(Box::pin(tokio_stream::iter(
            records.into_iter().map(Ok),
        )))
    }
}
