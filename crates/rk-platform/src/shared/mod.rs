//! Shared Platform Types

pub mod api_common;
pub mod error;
pub mod health_api;
pub mod indexes;

pub use error::{PlatformError, Result};
