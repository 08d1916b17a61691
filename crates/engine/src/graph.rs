// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The module graph.
//!
//! A [`GraphBuilder`] collects modules and links; [`GraphBuilder::build`] validates them and
//! freezes the result into an immutable [`Graph`]. No module or link can be added afterwards.
//!
//! Build also precomputes the masks the engine needs at run time:
//! - each module's *parent mask* (its direct upstream modules), used for the fan-in join
//! - each root's *route mask* (modules not reachable from it), preset on frames it emits
//! - the mask of all modules, which an EOS must collect before its stream counts as drained

use crate::constants::{DEFAULT_PARALLELISM, DEFAULT_QUEUE_CAPACITY, LINK_ID_SEPARATOR};
use flowkit_core::error::Result;
use flowkit_core::{FlowError, Forwarding, InputMode, Module, ModuleId, ModuleMask, ModuleParams};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Identifies a link as `"<upstream>--><downstream>"`.
pub type LinkId = String;

pub fn link_id(upstream: &str, downstream: &str) -> LinkId {
    format!("{upstream}{LINK_ID_SEPARATOR}{downstream}")
}

/// Per-module settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOptions {
    /// Worker threads. Root modules get none regardless; modules with inputs need at least 1.
    pub parallelism: usize,
    /// Capacity of each input conveyor.
    pub queue_capacity: usize,
    pub input_mode: InputMode,
    /// Handed to the module on open.
    pub params: ModuleParams,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            input_mode: InputMode::default(),
            params: ModuleParams::new(),
        }
    }
}

impl ModuleOptions {
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

struct PendingModule {
    module: Box<dyn Module>,
    forwarding: Forwarding,
    options: ModuleOptions,
}

/// Collects modules and links before the graph is frozen.
#[derive(Default)]
pub struct GraphBuilder {
    modules: IndexMap<String, PendingModule>,
    links: IndexMap<LinkId, (ModuleId, ModuleId)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. Its forwarding capability is read here, once.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the name is empty or already taken.
    pub fn add_module(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn Module>,
        options: ModuleOptions,
    ) -> Result<ModuleId> {
        let name = name.into();
        if name.is_empty() {
            return Err(FlowError::Configuration("Module name must not be empty".to_string()));
        }
        if self.modules.contains_key(&name) {
            return Err(FlowError::Configuration(format!("Module '{name}' added twice")));
        }
        let forwarding = module.forwarding();
        let id = self.modules.len();
        tracing::debug!(
            module = %name,
            id,
            ?forwarding,
            parallelism = options.parallelism,
            "Added module"
        );
        self.modules.insert(name, PendingModule { module, forwarding, options });
        Ok(id)
    }

    /// Links `upstream` to `downstream`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if either endpoint is unknown, the link already exists,
    /// or both endpoints are the same module.
    pub fn link(&mut self, upstream: &str, downstream: &str) -> Result<LinkId> {
        let up = self.modules.get_index_of(upstream).ok_or_else(|| {
            FlowError::Configuration(format!("Cannot link unknown upstream module '{upstream}'"))
        })?;
        let down = self.modules.get_index_of(downstream).ok_or_else(|| {
            FlowError::Configuration(format!(
                "Cannot link unknown downstream module '{downstream}'"
            ))
        })?;
        if up == down {
            return Err(FlowError::Configuration(format!(
                "Cannot link module '{upstream}' to itself"
            )));
        }
        let id = link_id(upstream, downstream);
        if self.links.contains_key(&id) {
            return Err(FlowError::Configuration(format!("Link '{id}' already exists")));
        }
        tracing::debug!(link = %id, "Linked modules");
        self.links.insert(id.clone(), (up, down));
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Validates the graph and freezes it.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the graph has a cycle, a module with inputs has
    /// parallelism 0, or a queue capacity is 0.
    pub fn build(self) -> Result<Graph> {
        let count = self.modules.len();
        let mut successors: Vec<Vec<ModuleId>> = vec![Vec::new(); count];
        let mut parents: Vec<ModuleMask> = vec![ModuleMask::new(); count];
        for &(up, down) in self.links.values() {
            successors[up].push(down);
            parents[down].insert(up);
        }

        check_acyclic(&self.modules, &successors, &parents)?;

        for (id, (name, pending)) in self.modules.iter().enumerate() {
            if !parents[id].is_empty() && pending.options.parallelism == 0 {
                return Err(FlowError::Configuration(format!(
                    "Module '{name}' has upstream links and needs parallelism of at least 1"
                )));
            }
            if pending.options.queue_capacity == 0 {
                return Err(FlowError::Configuration(format!(
                    "Module '{name}' needs a queue capacity of at least 1"
                )));
            }
        }

        let all_modules: ModuleMask = (0..count).collect();
        let mut route_masks: Vec<Option<ModuleMask>> = (0..count)
            .map(|id| {
                parents[id].is_empty().then(|| {
                    let mut unreachable = all_modules.clone();
                    unreachable.subtract(&reachable_from(id, &successors));
                    unreachable
                })
            })
            .collect();

        let mut index = IndexMap::with_capacity(count);
        let mut nodes = Vec::with_capacity(count);
        for (id, (name, pending)) in self.modules.into_iter().enumerate() {
            let route_mask = route_masks[id].take();
            index.insert(name.clone(), id);
            nodes.push(GraphNode {
                name: Arc::from(name),
                module: RwLock::new(pending.module),
                forwarding: pending.forwarding,
                options: pending.options,
                parents: std::mem::take(&mut parents[id]),
                successors: std::mem::take(&mut successors[id]),
                route_mask,
            });
        }

        tracing::info!(modules = nodes.len(), links = self.links.len(), "Graph built");
        Ok(Graph { nodes, index, links: self.links, all_modules })
    }
}

/// Kahn's algorithm; whatever is left unsorted sits on a cycle.
fn check_acyclic(
    modules: &IndexMap<String, PendingModule>,
    successors: &[Vec<ModuleId>],
    parents: &[ModuleMask],
) -> Result<()> {
    let mut in_degree: Vec<usize> = parents.iter().map(ModuleMask::len).collect();
    let mut ready: VecDeque<ModuleId> =
        in_degree.iter().enumerate().filter(|(_, d)| **d == 0).map(|(id, _)| id).collect();
    let mut sorted = 0;
    while let Some(id) = ready.pop_front() {
        sorted += 1;
        for &next in &successors[id] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }
    if sorted == modules.len() {
        return Ok(());
    }
    let cyclic: Vec<&str> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > 0)
        .filter_map(|(id, _)| modules.get_index(id).map(|(name, _)| name.as_str()))
        .collect();
    Err(FlowError::Configuration(format!(
        "Circular dependency detected among modules: {}",
        cyclic.join(", ")
    )))
}

fn reachable_from(root: ModuleId, successors: &[Vec<ModuleId>]) -> ModuleMask {
    let mut seen = ModuleMask::single(root);
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        for &next in &successors[id] {
            if seen.insert(next) {
                pending.push(next);
            }
        }
    }
    seen
}

/// A frozen module vertex.
pub struct GraphNode {
    name: Arc<str>,
    pub(crate) module: RwLock<Box<dyn Module>>,
    forwarding: Forwarding,
    options: ModuleOptions,
    parents: ModuleMask,
    successors: Vec<ModuleId>,
    route_mask: Option<ModuleMask>,
}

impl GraphNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub const fn forwarding(&self) -> Forwarding {
        self.forwarding
    }

    pub const fn options(&self) -> &ModuleOptions {
        &self.options
    }

    /// Direct upstream modules.
    pub const fn parents(&self) -> &ModuleMask {
        &self.parents
    }

    pub fn successors(&self) -> &[ModuleId] {
        &self.successors
    }

    /// A root has no upstream link; frames enter the graph through it.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.successors.is_empty()
    }

    /// For roots: the modules its frames will never reach.
    pub const fn route_mask(&self) -> Option<&ModuleMask> {
        self.route_mask.as_ref()
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name)
            .field("forwarding", &self.forwarding)
            .field("options", &self.options)
            .field("parents", &self.parents)
            .field("successors", &self.successors)
            .field("route_mask", &self.route_mask)
            .finish_non_exhaustive()
    }
}

/// The immutable module graph owned by a pipeline.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    index: IndexMap<String, ModuleId>,
    links: IndexMap<LinkId, (ModuleId, ModuleId)>,
    all_modules: ModuleMask,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ModuleId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order, with their ids.
    pub fn nodes(&self) -> impl Iterator<Item = (ModuleId, &GraphNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.index.get(name).copied()
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.links.contains_key(link)
    }

    /// `(upstream, downstream)` ids of a link.
    pub fn link_endpoints(&self, link: &str) -> Option<(ModuleId, ModuleId)> {
        self.links.get(link).copied()
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Every module id; an EOS must be acknowledged by all of them.
    pub const fn all_modules(&self) -> &ModuleMask {
        &self.all_modules
    }
}
