//! Dependency resolver — produces a load order where every unit comes
//! after all of its dependencies.
//!
//! Depth-first traversal with three-color marking, driven by an explicit
//! stack so that deep dependency chains cannot overflow the call stack.
//!
//! Dependencies naming a unit that is not part of the graph are tolerated:
//! they are treated as already satisfied and reported through
//! [`Resolution::missing`] so callers can warn about them.

use std::collections::HashMap;
use thiserror::Error;

/// Adjacency list of unit identifiers, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Re-adding an existing identifier replaces its dependencies
    /// but keeps its original position.
    pub fn add<I, S>(&mut self, identifier: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifier = identifier.into();
        let dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        match self.index.get(&identifier) {
            Some(&i) => self.nodes[i].1 = dependencies,
            None => {
                self.index.insert(identifier.clone(), self.nodes.len());
                self.nodes.push((identifier, dependencies));
            }
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Declared dependencies of a node (empty for unknown identifiers).
    pub fn dependencies_of(&self, identifier: &str) -> &[String] {
        self.index
            .get(identifier)
            .map(|&i| self.nodes[i].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        let mut graph = Self::new();
        for (id, deps) in iter {
            graph.add(id, deps);
        }
        graph
    }
}

/// A dependency reference to a unit absent from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    pub unit: String,
    pub dependency: String,
}

/// Successful resolution: a safe load order plus dangling references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub order: Vec<String>,
    pub missing: Vec<MissingDependency>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The graph contains a cycle; `path` starts and ends at the same unit.
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Resolve a load order for `graph`.
///
/// Fails closed: on a cycle no partial order is returned.
pub fn resolve(graph: &DependencyGraph) -> Result<Resolution, ResolveError> {
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(graph.len());
    let mut resolution = Resolution::default();

    for root in graph.identifiers() {
        if marks.contains_key(root) {
            continue;
        }

        // (node, index of the next dependency to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::InProgress);

        while let Some(&(node, next)) = stack.last() {
            let Some(dependency) = graph.dependencies_of(node).get(next) else {
                stack.pop();
                marks.insert(node, Mark::Done);
                resolution.order.push(node.to_string());
                continue;
            };

            let top = stack.len() - 1;
            stack[top].1 += 1;
            let dependency = dependency.as_str();

            match marks.get(dependency) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == dependency)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(id, _)| id.to_string()).collect();
                    path.push(dependency.to_string());
                    return Err(ResolveError::Cycle { path });
                }
                None if !graph.contains(dependency) => {
                    resolution.missing.push(MissingDependency {
                        unit: node.to_string(),
                        dependency: dependency.to_string(),
                    });
                }
                None => {
                    marks.insert(dependency, Mark::InProgress);
                    stack.push((dependency, 0));
                }
            }
        }
    }

    Ok(resolution)
}
