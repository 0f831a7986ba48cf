/// Binding dependency graph
///
/// Tracks which binding targets read from which state paths and detects
/// circular dependencies. Each target and each resolved source is a node;
/// edges point from target to source.
use crate::expression::{BindingExpression, BindingSource};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },
}

/// Dependency graph (target -> sources it reads)
#[derive(Clone, Debug, Default)]
pub struct BindingGraph {
    dependencies: BTreeMap<String, Vec<String>>,

    /// Reverse lookup: source -> targets that read it
    dependents: BTreeMap<String, Vec<String>>,
}

impl BindingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a document's top-level bindings.
    ///
    /// Only `state` sources can feed back into a target; sources that fail to
    /// parse are skipped (the expression rule reports them).
    pub fn from_bindings(bindings: &BTreeMap<String, String>) -> Self {
        let targets: BTreeSet<String> = bindings.keys().map(|t| normalize_target(t)).collect();
        let mut graph = Self::new();

        for (target, source) in bindings {
            let Ok(expr) = BindingExpression::parse(source) else {
                continue;
            };
            if expr.source != BindingSource::State {
                continue;
            }
            let resolved = resolve_source(&expr.path_string(), &targets);
            graph.add_dependency(normalize_target(target), resolved);
        }

        graph
    }

    /// Add a dependency relationship: target reads from source
    pub fn add_dependency(&mut self, target: String, source: String) {
        self.dependencies
            .entry(target.clone())
            .or_default()
            .push(source.clone());

        self.dependents.entry(source).or_default().push(target);
    }

    pub fn get_dependencies(&self, node: &str) -> Option<&[String]> {
        self.dependencies.get(node).map(|v| v.as_slice())
    }

    pub fn get_dependents(&self, node: &str) -> Option<&[String]> {
        self.dependents.get(node).map(|v| v.as_slice())
    }

    pub fn all_nodes(&self) -> BTreeSet<String> {
        let mut nodes = BTreeSet::new();
        nodes.extend(self.dependencies.keys().cloned());
        nodes.extend(self.dependents.keys().cloned());
        nodes
    }

    /// Every cycle reachable through a back-edge, as the full node path
    /// (first node repeated at the end).
    ///
    /// Iterative DFS with an explicit recursion stack, so deep binding chains
    /// cannot overflow the call stack.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        for start in self.dependencies.keys() {
            if visited.contains(start.as_str()) {
                continue;
            }

            // (node, index of the next dependency to explore)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            visited.insert(start);
            on_stack.insert(start);

            while let Some(&(node, next)) = stack.last() {
                let deps = self.get_dependencies(node).unwrap_or(&[]);

                if next >= deps.len() {
                    on_stack.remove(node);
                    stack.pop();
                    continue;
                }

                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                let dep = deps[next].as_str();

                if on_stack.contains(dep) {
                    let begin = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[begin..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.push(dep.to_string());
                    cycles.push(cycle);
                } else if !visited.contains(dep) {
                    visited.insert(dep);
                    on_stack.insert(dep);
                    stack.push((dep, 0));
                }
            }
        }

        cycles
    }

    /// Returns an error naming the first cycle found
    pub fn detect_circular_dependencies(&self) -> Result<(), GraphError> {
        match self.find_cycles().into_iter().next() {
            Some(cycle) => Err(GraphError::CircularDependency {
                path: cycle.join(" -> "),
            }),
            None => Ok(()),
        }
    }

    /// Nodes ordered so every source comes before the targets reading it
    pub fn evaluation_order(&self) -> Result<Vec<String>, GraphError> {
        self.detect_circular_dependencies()?;

        let mut remaining: HashMap<&str, usize> = HashMap::new();
        for node in self.all_nodes_ref() {
            let degree = self.dependencies.get(node).map(|v| v.len()).unwrap_or(0);
            remaining.insert(node, degree);
        }

        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(node, _)| *node)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<&str> = ready.into_iter().collect();
        let mut order = Vec::new();

        while let Some(node) = queue.pop_front() {
            order.push(node.to_string());

            if let Some(dependents) = self.dependents.get(node) {
                for dependent in dependents {
                    if let Some(degree) = remaining.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent.as_str());
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    fn all_nodes_ref(&self) -> BTreeSet<&str> {
        self.dependencies
            .keys()
            .chain(self.dependents.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Binding targets may be written with or without the `state.` prefix
pub fn normalize_target(target: &str) -> String {
    target.strip_prefix("state.").unwrap_or(target).to_string()
}

/// Map a source path onto the target whose namespace it falls in.
///
/// `user.name` resolves to target `user` when `user` is bound; the longest
/// matching target wins. Paths outside every target stay as they are.
fn resolve_source(path: &str, targets: &BTreeSet<String>) -> String {
    targets
        .iter()
        .filter(|target| {
            path == target.as_str()
                || (path.starts_with(target.as_str())
                    && path.as_bytes().get(target.len()) == Some(&b'.'))
        })
        .max_by_key(|target| target.len())
        .cloned()
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_two_node_cycle_is_reported_once() {
        let graph = BindingGraph::from_bindings(&bindings(&[
            ("a", "{{state.b}}"),
            ("b", "{{state.a}}"),
        ]));

        let cycles = graph.find_cycles();
        assert_eq!(cycles, vec![vec!["a", "b", "a"]]);
        assert!(graph.detect_circular_dependencies().is_err());
    }

    #[test]
    fn test_nested_source_resolves_into_target_namespace() {
        let graph = BindingGraph::from_bindings(&bindings(&[
            ("state.summary", "{{state.totals.sum}}"),
            ("totals", "{{state.summary.count}}"),
        ]));

        assert_eq!(graph.get_dependencies("summary"), Some(&["totals".to_string()][..]));
        assert_eq!(graph.find_cycles().len(), 1);
    }

    #[test]
    fn test_self_binding_is_a_cycle() {
        let graph = BindingGraph::from_bindings(&bindings(&[("a", "{{state.a.b}}")]));
        assert_eq!(graph.find_cycles(), vec![vec!["a", "a"]]);
    }

    #[test]
    fn test_non_state_sources_do_not_create_edges() {
        let graph = BindingGraph::from_bindings(&bindings(&[
            ("user", "{{context.user_id}}"),
            ("order", "{{inputs.order_id}}"),
        ]));
        assert!(graph.all_nodes().is_empty());
    }

    #[test]
    fn test_evaluation_order_puts_sources_first() {
        let graph = BindingGraph::from_bindings(&bindings(&[
            ("a", "{{state.b}}"),
            ("b", "{{state.c}}"),
        ]));

        let order = graph.evaluation_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut graph = BindingGraph::new();
        for i in 0..50_000 {
            graph.add_dependency(format!("n{}", i), format!("n{}", i + 1));
        }
        assert!(graph.find_cycles().is_empty());

        graph.add_dependency("n50000".to_string(), "n0".to_string());
        assert_eq!(graph.find_cycles().len(), 1);
    }
}
