//! Integration tests for telegate
//!
//! These tests drive the gateway through its public API with real
//! sockets, fake upstreams and the in-memory store.

pub mod bridge_relay_tests;
pub mod error_handling_tests;
pub mod gateway_scenario_tests;
pub mod registry_persistence_tests;
