use std::time::Duration;

use crate::page::PageRequest;
use crate::query::OrderBy;

/// Options forwarded verbatim to the adapter. The adapter contract rejects
/// nothing here; whatever it does not understand it ignores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOptions {
    /// Tenancy prefix: adapters namespace the source under it.
    pub prefix: Option<String>,
    /// Statement timeout, honored by adapters that support one.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn scoped_source(&self, source: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{source}"),
            None => source.to_string(),
        }
    }
}

/// Caller options for the multi-result read entry points.
///
/// Control fields are consumed by the query pipeline and pagination engine;
/// everything else rides through to the adapter untouched.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    exclude_deleted: bool,
    only_deleted: bool,
    page: Option<i64>,
    offset: Option<i64>,
    page_size: Option<u64>,
    order_by: Option<Vec<OrderBy>>,
    select: Option<Vec<String>>,
    exec: ExecOptions,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_deleted(mut self) -> Self {
        self.exclude_deleted = true;
        self
    }

    pub fn only_deleted(mut self) -> Self {
        self.only_deleted = true;
        self
    }

    /// 1-indexed page. Takes precedence over [`offset`](Self::offset); a
    /// non-positive value disables this clause instead of failing.
    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    /// Absolute row offset. A negative value disables pagination.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Replaces the configured default ordering for this call.
    pub fn order_by(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = Some(order.into_iter().collect());
        self
    }

    /// Replaces the configured default projection for this call.
    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exec.prefix = Some(prefix.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.exec.timeout = Some(timeout);
        self
    }

    /// Option router: control keys out, adapter options through.
    pub(crate) fn split(self) -> (Controls, ExecOptions) {
        (
            Controls {
                exclude_deleted: self.exclude_deleted,
                only_deleted: self.only_deleted,
                pagination: PageRequest::resolve(self.page, self.offset),
                page_size: self.page_size,
                order_by: self.order_by,
                select: self.select,
            },
            self.exec,
        )
    }
}

/// The control half of [`FindOptions`], fully consumed by this crate.
#[derive(Debug, Clone, Default)]
pub(crate) struct Controls {
    pub exclude_deleted: bool,
    pub only_deleted: bool,
    pub pagination: PageRequest,
    pub page_size: Option<u64>,
    pub order_by: Option<Vec<OrderBy>>,
    pub select: Option<Vec<String>>,
}
