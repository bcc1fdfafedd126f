//! Service registry
//!
//! Holds the live set of service descriptors with their dependencies and
//! derived health, persists them to the store, and orders them by
//! dependency.

mod discovery;
mod registry;
mod topology;
mod types;


pub use discovery::DiscoveryReport;
pub use registry::{SERVICE_KEY_PREFIX, ServiceRegistry};
pub use topology::{TopologyOrder, dependency_graph, topological_order};
pub use types::{
    CheckKind, CheckRecord, DependencyNode, HealthCheckResult, HealthStatus, RegistryEvent,
    ServiceDescriptor, ServiceMetrics, ServiceRegistration, ServiceStatus,
};
