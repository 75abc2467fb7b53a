//! Dependency graph and execution order.

use core::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use preflight_plugin::TagPhases;

use crate::registry::{PluginRecord, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// CompositeKey
// ─────────────────────────────────────────────────────────────────────────────

/// Tie-break key among plugins that are ready at the same time.
///
/// Ordered field by field: tag phase, priority, registration order, id.
/// Smaller keys run first. Registration order is unique, so two distinct
/// plugins never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    /// Tag phase score.
    pub phase: i32,
    /// Effective priority.
    pub priority: i32,
    /// Registration sequence number.
    pub insertion_index: u64,
    /// Plugin id.
    pub id: String,
}

impl CompositeKey {
    /// Computes the key of a record.
    #[must_use]
    pub fn of(record: &PluginRecord, phases: &TagPhases) -> Self {
        Self {
            phase: phases.score(record.meta().tags()),
            priority: record.priority(),
            insertion_index: record.insertion_index(),
            id: record.id().to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DependencyGraph
// ─────────────────────────────────────────────────────────────────────────────

/// Edges between active plugins.
///
/// `indegree[id]` counts the active prerequisites of `id`; `children[id]`
/// lists the active plugins that require `id`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    indegree: HashMap<String, usize>,
    children: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph over the registry's active plugins.
    ///
    /// Requirements naming an unknown or inactive plugin are logged and
    /// dropped.
    #[must_use]
    pub fn build(registry: &Registry) -> Self {
        let mut graph = Self::default();
        for record in registry.active_records() {
            graph.indegree.insert(record.id().to_string(), 0);
        }

        for record in registry.active_records() {
            for dep in record.requires() {
                if !graph.indegree.contains_key(dep.as_str()) {
                    tracing::warn!(
                        plugin = %record.id(),
                        dependency = %dep,
                        "missing dependency for {}: '{}' (ignored)",
                        record.id(),
                        dep
                    );
                    continue;
                }
                graph.add_edge(dep, record.id());
            }
        }
        graph
    }

    /// Builds a graph whose edges all point forward in `order`.
    ///
    /// Requirements that point backwards (cycle members already linearized
    /// by [`resolve_order`]) are dropped, so the result is acyclic and every
    /// id in `order` eventually becomes ready.
    #[must_use]
    pub fn flattened(registry: &Registry, order: &[String]) -> Self {
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut graph = Self::default();
        for id in order {
            graph.indegree.insert(id.clone(), 0);
        }

        for (index, id) in order.iter().enumerate() {
            let Some(record) = registry.get(id) else {
                continue;
            };
            for dep in record.requires() {
                match position.get(dep.as_str()) {
                    Some(&dep_index) if dep_index < index => graph.add_edge(dep, id),
                    Some(_) => {
                        tracing::debug!(plugin = %id, dependency = %dep, "dropping cyclic edge");
                    }
                    None => {}
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        self.children
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        if let Some(degree) = self.indegree.get_mut(to) {
            *degree += 1;
        }
    }

    /// Number of plugins in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indegree.len()
    }

    /// Returns `true` if the graph has no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indegree.is_empty()
    }

    /// Number of unmet prerequisites of `id`.
    #[must_use]
    pub fn indegree(&self, id: &str) -> usize {
        self.indegree.get(id).copied().unwrap_or(0)
    }

    /// Plugins that require `id`.
    #[must_use]
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Ids with no prerequisites.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.as_str())
    }

    /// Marks `id` complete and returns the children that became ready.
    ///
    /// Consumes edges, so each child is returned at most once.
    pub fn complete(&mut self, id: &str) -> Vec<String> {
        let Some(children) = self.children.remove(id) else {
            return Vec::new();
        };
        let mut ready = Vec::new();
        for child in children {
            if let Some(degree) = self.indegree.get_mut(child.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push(child);
                }
            }
        }
        ready
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// resolve_order
// ─────────────────────────────────────────────────────────────────────────────

/// Computes the execution order of the registry's active plugins.
///
/// Kahn's algorithm over [`DependencyGraph::build`], always releasing the
/// ready plugin with the smallest [`CompositeKey`]. Never fails: members of
/// a dependency cycle are logged and appended in key order.
#[must_use]
pub fn resolve_order(registry: &Registry) -> Vec<String> {
    let mut graph = DependencyGraph::build(registry);
    let total = graph.len();

    let mut ready: BinaryHeap<Reverse<CompositeKey>> = graph
        .roots()
        .filter_map(|id| registry.key(id))
        .map(Reverse)
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(total);
    while let Some(Reverse(key)) = ready.pop() {
        for child in graph.complete(&key.id) {
            if let Some(child_key) = registry.key(&child) {
                ready.push(Reverse(child_key));
            }
        }
        order.push(key.id);
    }

    if order.len() < total {
        let mut remaining: Vec<CompositeKey> = {
            let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
            registry
                .active_records()
                .filter(|r| !placed.contains(r.id()))
                .map(|r| CompositeKey::of(r, registry.phases()))
                .collect()
        };
        remaining.sort();

        let ids: Vec<&str> = remaining.iter().map(|k| k.id.as_str()).collect();
        tracing::error!(
            plugins = ?ids,
            "dependency cycle detected; appending remaining plugins by priority"
        );
        order.extend(remaining.into_iter().map(|k| k.id));
    }

    log_order(registry, &order);
    order
}

fn log_order(registry: &Registry, order: &[String]) {
    if order.is_empty() {
        tracing::info!("no active plugins to schedule");
        return;
    }
    tracing::info!(count = order.len(), "plugin execution order");
    for (position, id) in order.iter().enumerate() {
        if let Some(key) = registry.key(id) {
            tracing::info!(
                "{}. {} (priority={}, tag_phase={})",
                position + 1,
                id,
                key.priority,
                key.phase
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_plugin::{HookError, Plugin, PluginMeta, PreCompileContext};
    use std::sync::Arc;

    struct Stub {
        meta: PluginMeta,
        requires: Vec<String>,
        priority: Option<i32>,
    }

    impl Plugin for Stub {
        fn meta(&self) -> &PluginMeta {
            &self.meta
        }

        fn requires(&self) -> Vec<String> {
            self.requires.clone()
        }

        fn priority(&self) -> Option<i32> {
            self.priority
        }

        fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
            Ok(())
        }
    }

    fn add(registry: &mut Registry, id: &str, tags: &[&str], requires: &[&str], priority: Option<i32>) {
        registry
            .add(Arc::new(Stub {
                meta: PluginMeta::new(id, id, "1.0.0").unwrap().with_tags(tags),
                requires: requires.iter().map(|s| (*s).to_string()).collect(),
                priority,
            }))
            .unwrap();
    }

    #[test]
    fn empty_registry_orders_nothing() {
        assert!(resolve_order(&Registry::new()).is_empty());
    }

    #[test]
    fn no_dependencies_follow_composite_key() {
        let mut registry = Registry::new();
        add(&mut registry, "late", &[], &[], Some(1));
        add(&mut registry, "lint", &["lint"], &[], Some(0));
        add(&mut registry, "clean", &["cleanup"], &[], Some(99));
        add(&mut registry, "b", &[], &[], Some(1));
        assert_eq!(resolve_order(&registry), ["clean", "lint", "late", "b"]);
    }

    #[test]
    fn insertion_order_breaks_ties_before_id() {
        let mut registry = Registry::new();
        add(&mut registry, "zz", &[], &[], None);
        add(&mut registry, "aa", &[], &[], None);
        assert_eq!(resolve_order(&registry), ["zz", "aa"]);
    }

    #[test]
    fn dependency_beats_phase() {
        let mut registry = Registry::new();
        add(&mut registry, "format", &["format"], &[], None);
        add(&mut registry, "wipe", &["clean"], &["format"], None);
        assert_eq!(resolve_order(&registry), ["format", "wipe"]);
    }

    #[test]
    fn simple_chain() {
        let mut registry = Registry::new();
        add(&mut registry, "c", &[], &["b"], None);
        add(&mut registry, "b", &[], &["a"], None);
        add(&mut registry, "a", &[], &[], None);
        assert_eq!(resolve_order(&registry), ["a", "b", "c"]);
    }

    #[test]
    fn diamond() {
        let mut registry = Registry::new();
        add(&mut registry, "top", &[], &["left", "right"], None);
        add(&mut registry, "right", &[], &["base"], Some(2));
        add(&mut registry, "left", &[], &["base"], Some(1));
        add(&mut registry, "base", &[], &[], None);
        assert_eq!(resolve_order(&registry), ["base", "left", "right", "top"]);
    }

    #[test]
    fn missing_dependency_is_ignored() {
        let mut registry = Registry::new();
        add(&mut registry, "a", &[], &["ghost"], None);
        add(&mut registry, "b", &[], &[], None);
        assert_eq!(resolve_order(&registry), ["a", "b"]);
    }

    #[test]
    fn inactive_dependency_is_ignored() {
        let mut registry = Registry::new();
        add(&mut registry, "dep", &[], &[], Some(50));
        add(&mut registry, "user", &[], &["dep"], Some(1));
        registry.disable("dep");
        assert_eq!(resolve_order(&registry), ["user"]);
    }

    #[test]
    fn direct_cycle_is_appended_by_key() {
        let mut registry = Registry::new();
        add(&mut registry, "a", &[], &["b"], Some(2));
        add(&mut registry, "b", &[], &["a"], Some(1));
        add(&mut registry, "free", &[], &[], Some(9));
        assert_eq!(resolve_order(&registry), ["free", "b", "a"]);
    }

    #[test]
    fn indirect_cycle_keeps_downstream_after() {
        let mut registry = Registry::new();
        add(&mut registry, "a", &[], &["c"], None);
        add(&mut registry, "b", &[], &["a"], None);
        add(&mut registry, "c", &[], &["b"], None);
        add(&mut registry, "d", &[], &["a"], None);
        let order = resolve_order(&registry);
        assert_eq!(order, ["a", "b", "c", "d"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut registry = Registry::new();
        add(&mut registry, "narcissus", &[], &["narcissus"], None);
        assert_eq!(resolve_order(&registry), ["narcissus"]);
    }

    #[test]
    fn flattened_graph_only_points_forward() {
        let mut registry = Registry::new();
        add(&mut registry, "a", &[], &["b"], Some(2));
        add(&mut registry, "b", &[], &["a"], Some(1));
        add(&mut registry, "c", &[], &["a", "ghost"], None);
        let order = resolve_order(&registry);
        assert_eq!(order, ["b", "a", "c"]);

        let graph = DependencyGraph::flattened(&registry, &order);
        assert_eq!(graph.indegree("b"), 0);
        assert_eq!(graph.indegree("a"), 1);
        assert_eq!(graph.indegree("c"), 1);
        assert_eq!(graph.children("b"), ["a"]);
        assert!(graph.children("a").contains(&"c".to_string()));
    }

    #[test]
    fn complete_releases_children_once() {
        let mut registry = Registry::new();
        add(&mut registry, "a", &[], &[], None);
        add(&mut registry, "b", &[], &[], None);
        add(&mut registry, "c", &[], &["a", "b"], None);
        let mut graph = DependencyGraph::build(&registry);
        assert!(graph.complete("a").is_empty());
        assert_eq!(graph.complete("b"), ["c"]);
        assert!(graph.complete("b").is_empty());
    }
}
