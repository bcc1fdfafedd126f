//! Utility modules for the gateway
//!
//! - **error**: error taxonomy, HTTP mapping and helper constructors

pub mod error;

pub use error::{GatewayError, Result};
