// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::nop;
use crate::graph::{link_id, GraphBuilder, ModuleOptions};
use flowkit_core::{FlowError, ModuleMask};

fn graph_with(names: &[&str]) -> GraphBuilder {
    let mut builder = GraphBuilder::new();
    for name in names {
        builder.add_module(*name, nop(), ModuleOptions::default()).unwrap();
    }
    builder
}

fn config_error(result: Result<impl std::fmt::Debug, FlowError>) -> String {
    match result {
        Err(FlowError::Configuration(msg)) => msg,
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn rejects_duplicate_modules_and_links() {
    let mut builder = graph_with(&["a", "b"]);
    let msg = config_error(builder.add_module("a", nop(), ModuleOptions::default()));
    assert!(msg.contains("'a'"), "{msg}");

    assert_eq!(builder.link("a", "b").unwrap(), "a-->b");
    assert!(config_error(builder.link("a", "b")).contains("already exists"));
    assert!(config_error(builder.link("a", "a")).contains("itself"));
    assert!(config_error(builder.link("a", "ghost")).contains("ghost"));
    assert!(config_error(builder.link("ghost", "a")).contains("ghost"));
    assert!(builder.add_module("", nop(), ModuleOptions::default()).is_err());
}

#[test]
fn rejects_cycles() {
    let mut builder = graph_with(&["src", "a", "b", "c"]);
    builder.link("src", "a").unwrap();
    builder.link("a", "b").unwrap();
    builder.link("b", "c").unwrap();
    builder.link("c", "a").unwrap();

    let msg = config_error(builder.build());
    assert!(msg.starts_with("Circular dependency"), "{msg}");
    assert!(msg.contains('a') && msg.contains('b') && msg.contains('c'));
    assert!(!msg.contains("src"), "{msg}");
}

#[test]
fn rejects_unusable_options() {
    let mut builder = graph_with(&["src"]);
    builder.add_module("worker", nop(), ModuleOptions::default().with_parallelism(0)).unwrap();
    builder.link("src", "worker").unwrap();
    assert!(config_error(builder.build()).contains("parallelism"));

    let mut builder = graph_with(&["src"]);
    builder.add_module("worker", nop(), ModuleOptions::default().with_queue_capacity(0)).unwrap();
    builder.link("src", "worker").unwrap();
    assert!(config_error(builder.build()).contains("queue capacity"));
}

#[test]
fn computes_parent_and_route_masks() {
    // a --> c <-- b, c --> d; e is isolated from a.
    let mut builder = graph_with(&["a", "b", "c", "d", "e"]);
    builder.link("a", "c").unwrap();
    builder.link("b", "c").unwrap();
    builder.link("c", "d").unwrap();
    builder.link("e", "d").unwrap();
    let graph = builder.build().unwrap();

    let id = |name: &str| graph.id_of(name).unwrap();
    let c = graph.node(id("c")).unwrap();
    assert_eq!(c.parents(), &[id("a"), id("b")].into_iter().collect::<ModuleMask>());
    assert_eq!(c.successors(), &[id("d")]);
    assert!(!c.is_root() && !c.is_leaf() && c.route_mask().is_none());

    // From a, only b and e are unreachable.
    let a = graph.node(id("a")).unwrap();
    assert!(a.is_root());
    assert_eq!(a.route_mask().unwrap(), &[id("b"), id("e")].into_iter().collect::<ModuleMask>());

    let e = graph.node(id("e")).unwrap();
    assert_eq!(
        e.route_mask().unwrap(),
        &[id("a"), id("b"), id("c")].into_iter().collect::<ModuleMask>()
    );

    assert!(graph.node(id("d")).unwrap().is_leaf());
    assert_eq!(graph.all_modules().len(), 5);
    assert_eq!(graph.link_endpoints(&link_id("c", "d")), Some((id("c"), id("d"))));
    assert_eq!(graph.links().count(), 4);
}

#[test]
fn module_ids_follow_insertion_order() {
    let graph = graph_with(&["x", "y", "z"]).build().unwrap();
    let names: Vec<(usize, &str)> = graph.nodes().map(|(id, node)| (id, node.name())).collect();
    assert_eq!(names, vec![(0, "x"), (1, "y"), (2, "z")]);
    assert_eq!(graph.id_of("missing"), None);
}
