//! Catalog - the declared capabilities and their dependency graph.
//!
//! A catalog is validated once when the resolver is built: every
//! dependency must be declared and the graph must be acyclic, so
//! dependency-first resolution always terminates.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Topo;

use crate::core::{CapabilityName, Implementation};
use crate::resolver::errors::ResolveError;

/// How to obtain one capability.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySpec {
    /// Base location; defaults to the capability name
    pub location: Option<String>,

    /// Capabilities that must reach a terminal state first
    pub depends_on: Vec<CapabilityName>,

    /// Stand-in installed when every candidate fails
    pub fallback: Option<Implementation>,
}

impl CapabilitySpec {
    /// Spec expecting the capability at `location`.
    pub fn at(location: impl Into<String>) -> Self {
        CapabilitySpec {
            location: Some(location.into()),
            ..Default::default()
        }
    }

    pub fn depends_on(mut self, name: impl Into<CapabilityName>) -> Self {
        let name = name.into();
        if !self.depends_on.contains(&name) {
            self.depends_on.push(name);
        }
        self
    }

    pub fn with_fallback(mut self, fallback: Implementation) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Declared capabilities.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    specs: BTreeMap<CapabilityName, CapabilitySpec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) a capability.
    pub fn insert(&mut self, name: impl Into<CapabilityName>, spec: CapabilitySpec) {
        self.specs.insert(name.into(), spec);
    }

    /// Builder form of [`Catalog::insert`].
    pub fn with(mut self, name: impl Into<CapabilityName>, spec: CapabilitySpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn get(&self, name: &CapabilityName) -> Option<&CapabilitySpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &CapabilityName) -> bool {
        self.specs.contains_key(name)
    }

    /// Declared names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.specs.keys()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Base location for a capability. Without a declared location the name
    /// itself is used, in its declared spelling or else the caller's.
    pub fn location_for(&self, name: &CapabilityName) -> String {
        match self.specs.get_key_value(name) {
            Some((_, CapabilitySpec { location: Some(location), .. })) => location.clone(),
            Some((declared, _)) => declared.original().to_string(),
            None => name.original().to_string(),
        }
    }

    pub fn fallback_for(&self, name: &CapabilityName) -> Option<Implementation> {
        self.specs.get(name).and_then(|spec| spec.fallback.clone())
    }

    /// Direct dependencies of a capability.
    pub fn dependencies(&self, name: &CapabilityName) -> &[CapabilityName] {
        self.specs
            .get(name)
            .map(|spec| spec.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// All transitive dependencies of a capability.
    pub fn transitive_dependencies(&self, name: &CapabilityName) -> HashSet<CapabilityName> {
        let mut visited = HashSet::new();
        let mut stack: Vec<CapabilityName> = self.dependencies(name).to_vec();

        while let Some(current) = stack.pop() {
            if visited.insert(current.clone()) {
                stack.extend(self.dependencies(&current).iter().cloned());
            }
        }

        visited
    }

    /// Graph with an edge `a -> b` when `a` depends on `b`.
    fn graph(&self) -> (DiGraph<&CapabilityName, ()>, HashMap<&CapabilityName, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for name in self.specs.keys() {
            nodes.insert(name, graph.add_node(name));
        }
        for (name, spec) in &self.specs {
            for dep in &spec.depends_on {
                if let (Some(&from), Some(&to)) = (nodes.get(name), nodes.get(dep)) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        (graph, nodes)
    }

    /// Check that dependencies are declared and acyclic.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for (name, spec) in &self.specs {
            if let Some(dep) = spec.depends_on.iter().find(|d| !self.specs.contains_key(*d)) {
                return Err(ResolveError::UnknownDependency {
                    capability: name.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }

        let (graph, _) = self.graph();
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || graph.contains_edge(component[0], component[0]);
            if is_cycle {
                let mut capabilities: Vec<String> =
                    component.iter().map(|&n| graph[n].to_string()).collect();
                capabilities.sort();
                capabilities.push(capabilities[0].clone());
                return Err(ResolveError::DependencyCycle { capabilities });
            }
        }

        Ok(())
    }

    /// Declared names with dependencies before dependents.
    pub fn topological_order(&self) -> Vec<CapabilityName> {
        let (graph, _) = self.graph();
        let mut topo = Topo::new(&graph);
        let mut order = Vec::new();

        while let Some(node) = topo.next(&graph) {
            order.push(graph[node].clone());
        }

        // Edges point at dependencies, so Topo yields dependents first.
        order.reverse();
        order
    }
}
