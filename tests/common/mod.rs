//! Common test utilities for telegate
//!
//! # Usage
//!
//! ```rust
//! use crate::common::{fixtures, assertions};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let state = fixtures::app_state(fixtures::gateway_config()).await;
//!     // ...
//! }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::{assert_error_code, wait_until};
pub use fixtures::{app_state, gateway_config, refused_endpoint};
