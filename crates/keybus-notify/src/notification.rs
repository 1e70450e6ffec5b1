//! Notification payload types.
//!
//! A notification says that a row in a table changed, how it changed and
//! which row it was.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced by the notification layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The operation verb is not one of INSERT, UPDATE or DELETE
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

/// Kind of change made to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// A row was added.
    Insert,
    /// A row was modified.
    Update,
    /// A row was removed.
    Delete,
}

impl Operation {
    /// SQL verb for this operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(NotifyError::UnknownOperation(s.to_string())),
        }
    }
}

/// Payload carried through the bus for one row change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Table the row belongs to; also the topic key.
    pub table: String,
    /// What happened to the row.
    pub operation: Operation,
    /// Row identifier.
    pub id: i64,
}

impl Notification {
    /// Create a notification
    pub fn new(table: impl Into<String>, operation: Operation, id: i64) -> Self {
        Self {
            table: table.into(),
            operation,
            id,
        }
    }

    /// Short description for logging
    pub fn description(&self) -> String {
        format!("{} {} #{}", self.operation, self.table, self.id)
    }
}
