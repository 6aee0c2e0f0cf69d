//! The result shape handed back to form and page callers.
//!
//! On the wire a success is `{"success": true, "data": ...}` and a failure is
//! `{"success": false, "kind": "...", "errors": [{"<field>": "<message>"}, ...]}`.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, FieldError, StoreError, StoreResult};

#[derive(Debug)]
pub enum ActionResult<T> {
    Success(T),
    Failure {
        kind: ErrorKind,
        errors: Vec<FieldError>,
    },
}

impl<T> ActionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ActionResult::Success(data) => Some(data),
            ActionResult::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ActionResult::Success(data) => Some(data),
            ActionResult::Failure { .. } => None,
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            ActionResult::Success(_) => &[],
            ActionResult::Failure { errors, .. } => errors,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// First root-level message, if any. This is what a toast shows.
    pub fn root_error(&self) -> Option<&str> {
        self.errors()
            .iter()
            .find(|e| e.is_root())
            .map(|e| e.message.as_str())
    }
}

impl<T> From<StoreResult<T>> for ActionResult<T> {
    fn from(result: StoreResult<T>) -> Self {
        match result {
            Ok(data) => ActionResult::Success(data),
            Err(e) => {
                if matches!(e, StoreError::Conflict(_) | StoreError::Database(_)) {
                    log::warn!("transaction rolled back: {}", e);
                }
                ActionResult::Failure {
                    kind: e.kind(),
                    errors: e.into_field_errors(),
                }
            }
        }
    }
}

struct FieldErrorEntry<'a>(&'a FieldError);

impl Serialize for FieldErrorEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.field, &self.0.message)?;
        map.end()
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionResult::Success(data) => {
                let mut s = serializer.serialize_struct("ActionResult", 2)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("data", data)?;
                s.end()
            }
            ActionResult::Failure { kind, errors } => {
                let entries: Vec<FieldErrorEntry<'_>> = errors.iter().map(FieldErrorEntry).collect();
                let mut s = serializer.serialize_struct("ActionResult", 3)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("kind", kind)?;
                s.serialize_field("errors", &entries)?;
                s.end()
            }
        }
    }
}
