//! Error handling for the gateway
//!
//! This module defines the error types used throughout the gateway and how
//! they are rendered to HTTP clients.

mod helpers;
mod response;
#[cfg(test)]
mod tests;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{GatewayError, Result};
