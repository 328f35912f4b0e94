use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationErrors;

/// A named record shape the repo can persist and query.
///
/// The serialized form is what filters, ordering and projection run against,
/// so filterable fields must appear in the entity's serde output. Entities
/// that participate in soft deletion carry a nullable marker field (by
/// default `deleted_at`).
pub trait Entity:
    Serialize + for<'de> Deserialize<'de> + Sized + Send + Sync + 'static
{
    /// Storage source (table) name.
    const SOURCE: &'static str;

    fn id(&self) -> Uuid;

    /// Schema-level checks applied before create/update.
    fn validate(&self) -> ValidationErrors {
        ValidationErrors::new()
    }
}
