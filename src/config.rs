use std::collections::HashSet;
use std::fmt::Display;

use crate::query::OrderBy;

/// Page size used when neither the call nor the configuration provides one.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Operations a [`Repo`](crate::Repo) can expose. The enabled set is computed
/// once at construction; a disabled operation fails fast with
/// [`Error::OperationDisabled`](crate::Error::OperationDisabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Fetch,
    FindBy,
    Find,
    Count,
    Stream,
    Create,
    Update,
    Delete,
}

impl Op {
    pub const ALL: [Op; 9] = [
        Op::Get,
        Op::Fetch,
        Op::FindBy,
        Op::Find,
        Op::Count,
        Op::Stream,
        Op::Create,
        Op::Update,
        Op::Delete,
    ];

    pub const WRITES: [Op; 3] = [Op::Create, Op::Update, Op::Delete];

    pub fn name(self) -> &'static str {
        match self {
            Op::Get => "get",
            Op::Fetch => "fetch",
            Op::FindBy => "find_by",
            Op::Find => "find",
            Op::Count => "count",
            Op::Stream => "stream",
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Repo-wide defaults, captured once at construction and read-only after.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default page size for paginated reads. A zero value falls back to
    /// [`DEFAULT_PAGE_SIZE`].
    pub page_size: u64,
    /// Default ordering. Empty means engine-native order.
    pub order_by: Vec<OrderBy>,
    /// Default projection. `None` means whole-record.
    pub select: Option<Vec<String>>,
    /// Nullable marker field used by the soft-delete filters.
    pub deleted_field: String,
    /// Suppresses create/update/delete wholesale.
    pub read_only: bool,
    /// Operations to omit from the repo.
    pub except: HashSet<Op>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order_by: Vec::new(),
            select: None,
            deleted_field: "deleted_at".to_string(),
            read_only: false,
            except: HashSet::new(),
        }
    }
}

impl Config {
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_order_by(mut self, order_by: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = order_by.into_iter().collect();
        self
    }

    pub fn with_select(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_deleted_field(mut self, field: impl Into<String>) -> Self {
        self.deleted_field = field.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn without(mut self, ops: impl IntoIterator<Item = Op>) -> Self {
        self.except.extend(ops);
        self
    }

    pub(crate) fn enabled_ops(&self) -> HashSet<Op> {
        let mut ops: HashSet<Op> = Op::ALL.into_iter().collect();
        if self.read_only {
            for op in Op::WRITES {
                ops.remove(&op);
            }
        }
        for op in &self.except {
            ops.remove(op);
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_everything() {
        let ops = Config::default().enabled_ops();
        assert_eq!(ops.len(), Op::ALL.len());
    }

    #[test]
    fn read_only_removes_writes() {
        let ops = Config::default().read_only().enabled_ops();
        for op in Op::WRITES {
            assert!(!ops.contains(&op));
        }
        assert!(ops.contains(&Op::Find));
        assert!(ops.contains(&Op::Get));
    }

    #[test]
    fn except_removes_named_ops() {
        let ops = Config::default()
            .without([Op::Delete, Op::Stream])
            .enabled_ops();
        assert!(!ops.contains(&Op::Delete));
        assert!(!ops.contains(&Op::Stream));
        assert!(ops.contains(&Op::Create));
    }
}
