use std::fmt::Display;

use crate::config::Op;

/// A single failed check from [`Entity::validate`](crate::Entity::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// Accumulated validation failures for a write operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub(crate) fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

#[derive(Debug)]
pub enum Error {
    NotFound,
    Conflict,
    Validation(ValidationErrors),
    OperationDisabled(Op),
    TypeMismatch,
    Serialize(String),
    Deserialize(String),
    Backend(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound => write!(f, "Not found"),
            Error::Conflict => write!(f, "Conflict"),
            Error::Validation(errors) => {
                write!(f, "Validation failed:")?;
                for err in errors.errors() {
                    write!(f, " {}: {};", err.field, err.message)?;
                }
                Ok(())
            }
            Error::OperationDisabled(op) => write!(f, "Operation `{}` is disabled", op),
            Error::TypeMismatch => write!(f, "Type mismatch"),
            Error::Serialize(err) => write!(f, "Serialization error: {}", err),
            Error::Deserialize(err) => write!(f, "Deserialization error: {}", err),
            Error::Backend(err) => write!(f, "Backend error: {}", err),
        }
    }
}

impl std::error::Error for Error {}
