//! Rolekeeper Common
//!
//! Runtime helpers shared by the Rolekeeper binaries.

pub mod logging;
