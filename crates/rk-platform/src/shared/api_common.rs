//! Common API types and utilities

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};

/// A numeric parameter accepted either as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    /// The numeric value, or `Bad arguments.` when the string is not an integer.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            NumberOrString::Number(n) => Ok(*n),
            NumberOrString::String(s) => s
                .trim()
                .parse()
                .map_err(|_| PlatformError::bad_arguments()),
        }
    }
}

/// Unwrap a required field, failing with `Bad arguments.` when it is absent.
pub fn required<T>(value: Option<T>) -> Result<T> {
    value.ok_or_else(PlatformError::bad_arguments)
}

/// `{ message, data }` envelope for mutations.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> MessageResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}
