use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::Entity, error::Error};

/// Storage-level row shape: the entity payload as JSON plus the columns the
/// adapters manage themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: Uuid,
    pub source: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn to_entity<T: Entity>(self) -> Result<T, Error> {
        if self.source != T::SOURCE {
            return Err(Error::TypeMismatch);
        }

        serde_json::from_value::<T>(self.data).map_err(|e| Error::Deserialize(e.to_string()))
    }

    pub fn from_entity<T: Entity>(entity: &T) -> Result<Self, Error> {
        let now = Utc::now();
        Ok(Self {
            id: entity.id(),
            source: T::SOURCE.to_string(),
            data: serde_json::to_value(entity).map_err(|e| Error::Serialize(e.to_string()))?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Keeps only the selected fields of the payload.
    pub fn project(mut self, fields: &[String]) -> Self {
        if let serde_json::Value::Object(map) = &mut self.data {
            map.retain(|key, _| fields.iter().any(|f| f == key));
        }
        self
    }
}
