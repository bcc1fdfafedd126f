//! JWT token handling
//!
//! HS256 bearer tokens guarding the admin surface and the update socket.

mod handler;
pub mod types;

#[cfg(test)]
mod tests;

pub use types::{Claims, JwtHandler};
