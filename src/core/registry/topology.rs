//! Dependency graph and topological ordering

use super::types::{DependencyNode, ServiceDescriptor};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A topological order plus everything that had to be skipped to get it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyOrder {
    /// Every service exactly once, dependencies first
    pub order: Vec<String>,
    /// Each detected cycle as a closed path, e.g. `[a, b, a]`
    pub cycles: Vec<Vec<String>>,
    /// `(service, dependency)` pairs naming unregistered services
    pub missing: Vec<(String, String)>,
}

/// Depth-first topological sort seeded in ascending priority order.
///
/// Missing dependencies are skipped and cycles are broken at the first
/// back edge, so the result always contains every service.
pub fn topological_order(services: &HashMap<String, ServiceDescriptor>) -> TopologyOrder {
    let mut seeds: Vec<&ServiceDescriptor> = services.values().collect();
    seeds.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let mut walk = Walk {
        services,
        visited: HashSet::new(),
        stack: Vec::new(),
        result: TopologyOrder::default(),
    };
    for service in seeds {
        walk.visit(&service.id);
    }
    walk.result
}

struct Walk<'a> {
    services: &'a HashMap<String, ServiceDescriptor>,
    visited: HashSet<&'a str>,
    stack: Vec<&'a str>,
    result: TopologyOrder,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, id: &'a str) {
        if self.visited.contains(id) {
            return;
        }
        if let Some(pos) = self.stack.iter().position(|s| *s == id) {
            let mut cycle: Vec<String> = self.stack[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(id.to_string());
            self.result.cycles.push(cycle);
            return;
        }
        let services = self.services;
        let Some(service) = services.get(id) else {
            return;
        };

        self.stack.push(id);
        for dependency in &service.dependencies {
            if services.contains_key(dependency.as_str()) {
                self.visit(dependency.as_str());
            } else {
                self.result
                    .missing
                    .push((id.to_string(), dependency.clone()));
            }
        }
        self.stack.pop();

        self.visited.insert(id);
        self.result.order.push(id.to_string());
    }
}

/// Declared dependencies and the inverse dependents of every service
pub fn dependency_graph(
    services: &HashMap<String, ServiceDescriptor>,
) -> BTreeMap<String, DependencyNode> {
    let mut graph: BTreeMap<String, DependencyNode> = services
        .values()
        .map(|s| {
            let node = DependencyNode {
                dependencies: s.dependencies.iter().cloned().collect(),
                dependents: Vec::new(),
            };
            (s.id.clone(), node)
        })
        .collect();

    for service in services.values() {
        for dependency in &service.dependencies {
            if let Some(node) = graph.get_mut(dependency) {
                node.dependents.push(service.id.clone());
            }
        }
    }
    for node in graph.values_mut() {
        node.dependents.sort();
    }
    graph
}
