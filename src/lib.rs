//! # Selida
//!
//! *σελίδα — Greek for "page".*
//!
//! Selida attaches a standard set of create/read/update/delete and
//! pagination operations to plain serde types, proxying the actual storage
//! work to a pluggable adapter. You describe *what* to read — equality
//! filters, soft-delete mode, ordering, a page — and the repo turns that
//! into one executable query plus honest pagination metadata.
//!
//! ## What's inside
//!
//! ### Filtered reads
//! Every multi-result read accepts filters as a map or an ordered pair
//! list; both normalize to the same canonical form before the query is
//! built. Soft-deleted rows (nullable `deleted_at` marker) can be excluded
//! or selected explicitly.
//!
//! ### Pagination that never lies
//! Paginated reads count the filtered set first, clamp out-of-range pages
//! and offsets into `[1, total_pages]`, and return the entries together
//! with `{page, page_size, total_entries, total_pages}`. An empty result
//! set is "page 1 of 1", never "page 0".
//!
//! ### Capability-scoped repos
//! The operations a repo exposes are fixed at construction: a read-only
//! config drops the writes, and any operation can be omitted by name.
//! Disabled operations fail fast instead of reaching the database.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use selida::{Config, FindOptions, MemoryAdapter, Repo, filters};
//!
//! let repo = Repo::new(Box::new(MemoryAdapter::new()));
//!
//! let page = repo
//!     .find::<Gadget>(
//!         filters! { "kind" => "best" },
//!         FindOptions::new().exclude_deleted().page(2).page_size(20),
//!     )
//!     .await?;
//! ```
//!
//! ## Feature flags
//!
//! | Flag       | Default | Description                         |
//! |------------|---------|-------------------------------------|
//! | `postgres` | ✓       | PostgreSQL adapter via sqlx          |
//!

pub mod adapters;
pub mod config;
pub mod entity;
pub mod error;
pub mod options;
pub mod page;
pub mod query;

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;
use uuid::Uuid;

#[cfg(feature = "postgres")]
pub use crate::adapters::postgres::PostgresAdapter;
pub use crate::adapters::{Adapter, Query, Record, RecordStream, memory::MemoryAdapter};
pub use crate::config::{Config, DEFAULT_PAGE_SIZE, Op};
pub use crate::entity::Entity;
pub use crate::error::{Error, ValidationError, ValidationErrors};
pub use crate::options::{ExecOptions, FindOptions};
pub use crate::page::{Listing, Page, PageMeta, PageRequest};
pub use crate::query::{Direction, Filters, OrderBy, ToValue, Value};

use crate::options::Controls;

/// Lazy entity stream returned by [`Repo::stream`].
pub type EntityStream<T> = Pin<Box<dyn Stream<Item = Result<T, Error>> + Send>>;

/// The repo is the primary interface: CRUD plus filtered, paginated reads
/// over a storage adapter. Cheap to clone; all state behind it is read-only
/// after construction.
#[derive(Clone)]
pub struct Repo {
    inner: Arc<RepoInner>,
}

struct RepoInner {
    adapter: Box<dyn Adapter>,
    config: Config,
    enabled: HashSet<Op>,
}

impl Repo {
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::with_config(adapter, Config::default())
    }

    pub fn with_config(adapter: Box<dyn Adapter>, config: Config) -> Self {
        let enabled = config.enabled_ops();
        Self {
            inner: Arc::new(RepoInner {
                adapter,
                config,
                enabled,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn is_enabled(&self, op: Op) -> bool {
        self.inner.enabled.contains(&op)
    }

    fn ensure(&self, op: Op) -> Result<(), Error> {
        if self.inner.enabled.contains(&op) {
            Ok(())
        } else {
            Err(Error::OperationDisabled(op))
        }
    }

    // ==================== Single-record reads ====================

    /// Fetch an entity by id; absence is `Ok(None)`.
    pub async fn get<T: Entity>(&self, id: Uuid, opts: ExecOptions) -> Result<Option<T>, Error> {
        self.ensure(Op::Get)?;
        match self.inner.adapter.get_by_id(T::SOURCE, id, &opts).await? {
            Some(record) => record.to_entity().map(Some),
            None => Ok(None),
        }
    }

    /// Fetch an entity by id; absence is [`Error::NotFound`].
    pub async fn fetch<T: Entity>(&self, id: Uuid, opts: ExecOptions) -> Result<T, Error> {
        self.ensure(Op::Fetch)?;
        match self.inner.adapter.get_by_id(T::SOURCE, id, &opts).await? {
            Some(record) => record.to_entity(),
            None => Err(Error::NotFound),
        }
    }

    /// First entity matching the filters, in engine-native order.
    pub async fn find_by<T: Entity>(
        &self,
        filters: impl Into<Filters>,
        opts: ExecOptions,
    ) -> Result<Option<T>, Error> {
        self.ensure(Op::FindBy)?;
        let query = Query::new().filtered(filters.into()).bounded(0, 1);
        let records = self.inner.adapter.execute(T::SOURCE, query, &opts).await?;
        Ok(records.into_iter().next().and_then(|r| r.to_entity().ok()))
    }

    // ==================== Multi-record reads ====================

    /// The main read: filters plus [`FindOptions`] in, a bare list or a
    /// [`Page`] envelope out, depending on whether pagination was engaged.
    pub async fn find<T: Entity>(
        &self,
        filters: impl Into<Filters>,
        options: FindOptions,
    ) -> Result<Listing<T>, Error> {
        self.ensure(Op::Find)?;
        let (controls, exec) = options.split();

        let query = self.read_query(filters.into(), &controls);
        let (query, meta) = self.paginate(T::SOURCE, query, &controls, &exec).await?;
        let entries = self.materialize::<T>(query, &exec).await?;

        Ok(match meta {
            Some(meta) => Listing::Paged(Page::new(entries, meta)),
            None => Listing::Unpaged(entries),
        })
    }

    /// Count of the filtered set. Ordering, projection and pagination
    /// controls do not affect the result.
    pub async fn count<T: Entity>(
        &self,
        filters: impl Into<Filters>,
        options: FindOptions,
    ) -> Result<u64, Error> {
        self.ensure(Op::Count)?;
        let (controls, exec) = options.split();
        let query = self.filter_query(filters.into(), &controls);
        self.inner.adapter.count(T::SOURCE, query, &exec).await
    }

    /// Lazy read for large result sets. Applies the full modifier pipeline
    /// except pagination; page/offset controls are ignored.
    pub async fn stream<T: Entity>(
        &self,
        filters: impl Into<Filters>,
        options: FindOptions,
    ) -> Result<EntityStream<T>, Error> {
        self.ensure(Op::Stream)?;
        let (controls, exec) = options.split();
        let query = self.read_query(filters.into(), &controls);

        let records = self.inner.adapter.stream(T::SOURCE, query, &exec).await?;
        Ok(Box::pin(records.map(|item| {
            item.and_then(|record| record.to_entity::<T>())
        })))
    }

    // ==================== Writes ====================

    /// Validate and insert. Returns the stored copy.
    pub async fn create<T: Entity>(&self, entity: &T, opts: ExecOptions) -> Result<T, Error> {
        self.ensure(Op::Create)?;
        entity.validate().into_result()?;

        let record = Record::from_entity(entity)?;
        debug!(source = T::SOURCE, id = %record.id, "create");
        self.inner.adapter.insert(record, &opts).await?.to_entity()
    }

    /// Validate and update in place; absence is [`Error::NotFound`].
    pub async fn update<T: Entity>(&self, entity: &T, opts: ExecOptions) -> Result<T, Error> {
        self.ensure(Op::Update)?;
        entity.validate().into_result()?;

        let record = Record::from_entity(entity)?;
        debug!(source = T::SOURCE, id = %record.id, "update");
        self.inner.adapter.update(record, &opts).await?.to_entity()
    }

    /// Hard delete; returns the deleted entity, absence is
    /// [`Error::NotFound`].
    pub async fn delete<T: Entity>(&self, id: Uuid, opts: ExecOptions) -> Result<T, Error> {
        self.ensure(Op::Delete)?;
        debug!(source = T::SOURCE, id = %id, "delete");
        self.inner.adapter.delete(T::SOURCE, id, &opts).await?.to_entity()
    }

    // ==================== Query pipeline ====================

    /// Stages 1-2 of the modifier pipeline: soft-delete predicates, then
    /// equality filters. This is the portion a count shares with a read.
    fn filter_query(&self, filters: Filters, controls: &Controls) -> Query {
        let marker = &self.inner.config.deleted_field;
        let mut query = Query::new();
        if controls.exclude_deleted {
            query = query.exclude_deleted(marker);
        }
        if controls.only_deleted {
            query = query.only_deleted(marker);
        }
        query.filtered(filters)
    }

    /// Stages 3-4: ordering and projection, override-or-default. An
    /// explicit override replaces the configured default, never merges.
    fn read_query(&self, filters: Filters, controls: &Controls) -> Query {
        let config = &self.inner.config;
        let mut query = self.filter_query(filters, controls);

        query = match &controls.order_by {
            Some(order) => query.ordered(order.clone()),
            None => query.ordered(config.order_by.clone()),
        };

        match controls.select.clone().or_else(|| config.select.clone()) {
            Some(fields) => query.selected(fields),
            None => query,
        }
    }

    /// Stage 5, the pagination engine: counts the filtered set, clamps the
    /// request and bounds the query. `PageRequest::None` passes the query
    /// through untouched.
    async fn paginate(
        &self,
        source: &str,
        query: Query,
        controls: &Controls,
        exec: &ExecOptions,
    ) -> Result<(Query, Option<PageMeta>), Error> {
        if controls.pagination == PageRequest::None {
            return Ok((query, None));
        }

        let page_size = page::resolve_page_size(controls.page_size, self.inner.config.page_size);
        let total_entries = self
            .inner
            .adapter
            .count(source, query.clone(), exec)
            .await?;

        match page::bound(controls.pagination, page_size, total_entries) {
            Some((offset, meta)) => Ok((query.bounded(offset, page_size), Some(meta))),
            None => Ok((query, None)),
        }
    }

    /// Runs the final query and decodes rows. Rows that do not decode into
    /// `T` are dropped, so a degenerate result normalizes to an empty list
    /// instead of a malformed value.
    async fn materialize<T: Entity>(
        &self,
        query: Query,
        exec: &ExecOptions,
    ) -> Result<Vec<T>, Error> {
        let start = Instant::now();
        let records = self.inner.adapter.execute(T::SOURCE, query, exec).await?;
        histogram!("selida.query.duration_ms",
            "source" => T::SOURCE
        )
        .record(start.elapsed().as_millis() as f64);

        Ok(records
            .into_iter()
            .filter_map(|record| record.to_entity().ok())
            .collect())
    }
}
