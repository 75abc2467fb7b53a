//! Ordering properties of `resolve_order` over generated registries.
//!
//! Each case generates up to a dozen plugins with random tags, optional
//! priorities and random `requires` lists, then checks:
//!
//! - every active plugin appears exactly once, inactive ones never
//! - acyclic requirements between active plugins are always honored
//! - with no requirements the order is the composite-key sort
//! - the result does not depend on anything but registry contents


use std::collections::HashSet;

use preflight_scheduler::{CompositeKey, Registry, resolve_order};
use proptest::prelude::*;
use test_utils::{TestPlugin, positions, registry_of};

const TAGS: &[&str] = &["clean", "check", "codegen", "license", "lint", "minify", "misc"];

#[derive(Debug, Clone)]
struct Shape {
    tags: Vec<&'static str>,
    priority: Option<i32>,
    requires: Vec<usize>,
    active: bool,
}

fn shape(n: usize) -> impl Strategy<Value = Shape> {
    (
        proptest::sample::subsequence(TAGS.to_vec(), 0..3),
        proptest::option::of(0i32..60),
        proptest::collection::vec(0..n, 0..3),
        proptest::bool::weighted(0.85),
    )
        .prop_map(|(tags, priority, requires, active)| Shape {
            tags,
            priority,
            requires,
            active,
        })
}

fn shapes() -> impl Strategy<Value = Vec<Shape>> {
    (1usize..12).prop_flat_map(|n| proptest::collection::vec(shape(n), n))
}

fn build(shapes: &[Shape], acyclic: bool) -> Registry {
    let plugins = shapes.iter().enumerate().map(|(i, s)| {
        let requires: Vec<String> = s
            .requires
            .iter()
            .filter(|&&dep| !acyclic || dep < i)
            .map(|dep| format!("p{dep}"))
            .collect();
        let requires: Vec<&str> = requires.iter().map(String::as_str).collect();
        let mut plugin = TestPlugin::new(&format!("p{i}"))
            .tags(&s.tags)
            .requires(&requires);
        if let Some(p) = s.priority {
            plugin = plugin.priority(p);
        }
        plugin
    });
    let mut registry = registry_of(plugins);
    for (i, s) in shapes.iter().enumerate() {
        if !s.active {
            registry.disable(&format!("p{i}"));
        }
    }
    registry
}

proptest! {
    #[test]
    fn every_active_plugin_exactly_once(shapes in shapes(), acyclic in any::<bool>()) {
        let registry = build(&shapes, acyclic);
        let order = resolve_order(&registry);

        let expected: HashSet<String> = registry
            .active_records()
            .map(|r| r.id().to_string())
            .collect();
        let seen: HashSet<String> = order.iter().cloned().collect();

        prop_assert_eq!(order.len(), seen.len());
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn acyclic_dependencies_are_respected(shapes in shapes()) {
        let registry = build(&shapes, true);
        let order = resolve_order(&registry);
        let pos = positions(&order);

        for record in registry.active_records() {
            for dep in record.requires() {
                if let Some(&dep_pos) = pos.get(dep.as_str()) {
                    prop_assert!(dep_pos < pos[record.id()], "{} ran before {}", record.id(), dep);
                }
            }
        }
    }

    #[test]
    fn without_dependencies_order_is_key_sort(shapes in shapes()) {
        let stripped: Vec<Shape> = shapes
            .into_iter()
            .map(|s| Shape { requires: Vec::new(), ..s })
            .collect();
        let registry = build(&stripped, true);

        let mut keys: Vec<CompositeKey> = registry
            .active_records()
            .filter_map(|r| registry.key(r.id()))
            .collect();
        keys.sort();
        let expected: Vec<String> = keys.into_iter().map(|k| k.id).collect();

        prop_assert_eq!(resolve_order(&registry), expected);
    }

    #[test]
    fn order_is_deterministic(shapes in shapes(), acyclic in any::<bool>()) {
        let first = resolve_order(&build(&shapes, acyclic));
        let second = resolve_order(&build(&shapes, acyclic));
        prop_assert_eq!(first, second);
    }
}
