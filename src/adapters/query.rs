use crate::query::{Filter, FilterOp, Filters, OrderBy};

/// Query plan handed to the storage adapter.
///
/// Built incrementally by the modifier pipeline; every stage consumes the
/// plan and returns a new one, so a base plan can be reused and stage
/// ordering stays explicit. The fixed order is: soft-delete predicates,
/// equality filters, ordering, projection, then bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub select: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `marker IS NULL` predicate.
    pub fn exclude_deleted(mut self, marker: &str) -> Self {
        self.predicates.push(Filter {
            field: marker.to_string(),
            op: FilterOp::IsNull,
        });
        self
    }

    /// Appends a `marker IS NOT NULL` predicate.
    ///
    /// Requesting this together with [`exclude_deleted`](Self::exclude_deleted)
    /// leaves both predicates in place, which no row can satisfy.
    pub fn only_deleted(mut self, marker: &str) -> Self {
        self.predicates.push(Filter {
            field: marker.to_string(),
            op: FilterOp::IsNotNull,
        });
        self
    }

    /// Appends one equality predicate per filter pair, in order.
    pub fn filtered(mut self, filters: Filters) -> Self {
        for (field, value) in filters.into_pairs() {
            self.predicates.push(Filter {
                field,
                op: FilterOp::Eq(value),
            });
        }
        self
    }

    /// Replaces the ordering. An empty list means engine-native order.
    pub fn ordered(mut self, order: Vec<OrderBy>) -> Self {
        self.order = order;
        self
    }

    /// Replaces the projection with the given field list.
    pub fn selected(mut self, fields: Vec<String>) -> Self {
        self.select = Some(fields);
        self
    }

    /// Applies pagination bounds.
    pub fn bounded(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }
}
