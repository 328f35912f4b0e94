pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub mod query;
pub mod record;

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;
use uuid::Uuid;

pub use query::Query;
pub use record::Record;

use crate::{error::Error, options::ExecOptions};

/// Lazy record stream returned by [`Adapter::stream`].
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, Error>> + Send>>;

/// Storage contract the repo proxies into.
///
/// Implementations own connection pooling, transactions and actual query
/// execution; the repo only hands them finished plans. Predicate fields are
/// not validated upstream, so an unknown field is an execution-time failure
/// here (or a non-match, for stores that treat missing fields as null).
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Runs a query and returns the matching records in order.
    async fn execute(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<Vec<Record>, Error>;

    /// Aggregate row count for a query; bounds are ignored.
    async fn count(&self, source: &str, query: Query, opts: &ExecOptions)
    -> Result<u64, Error>;

    async fn get_by_id(
        &self,
        source: &str,
        id: Uuid,
        opts: &ExecOptions,
    ) -> Result<Option<Record>, Error>;

    async fn insert(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error>;

    async fn update(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error>;

    async fn delete(&self, source: &str, id: Uuid, opts: &ExecOptions) -> Result<Record, Error>;

    /// Lazy variant of [`execute`](Self::execute) for large result sets.
    async fn stream(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<RecordStream, Error>;
}
