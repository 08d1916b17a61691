// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The pipeline orchestrator.
//!
//! A [`Pipeline`] owns a frozen [`Graph`], one [`Connector`] per non-root module, the event bus
//! and the stream-message dispatcher. `start` opens every module and spawns one OS thread per
//! (module, worker); `stop` unblocks and joins them, then closes the modules.
//!
//! Frames enter through root modules ([`Pipeline::provide_data`] or a root's
//! [`ModuleHandle::transmit`]) and are pushed to each successor's connector once the
//! successor's upstream modules have all passed them.

use crate::connector::{Connector, ConnectorStatus};
use crate::constants::{MAX_THREAD_NAME_LEN, METER_NAME, THREAD_NAME_PREFIX};
use crate::conveyor::PushOutcome;
use crate::dispatcher::StreamMsgDispatcher;
use crate::event_bus::EventBus;
use crate::graph::{Graph, GraphBuilder, GraphNode, LinkId, ModuleOptions};
use crate::streams::StreamTable;
use crate::watcher::default_watcher;
use flowkit_core::error::Result;
use flowkit_core::{
    BusWatcher, Event, EventKind, FlowError, Forwarding, FrameFlag, Module, ModuleHandle,
    ModuleId, ModuleMask, ModuleStats, ModuleStatsTracker, OpenContext, PipelineLink,
    SharedFrame, StreamMsg, StreamMsgKind, StreamMsgObserver,
};
use indexmap::IndexMap;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

/// Called with every frame that leaves a leaf module.
pub type FrameDoneFn = Arc<dyn Fn(&SharedFrame) + Send + Sync>;

/// Called with every valid frame a given module passes on, EOS included.
pub type ModuleObserverFn = Arc<dyn Fn(&SharedFrame) + Send + Sync>;

/// Where the pipeline is in its lifecycle, as seen by modules waiting to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Stopped,
    Starting,
    Running,
}

struct EngineMetrics {
    processed: Counter<u64>,
    errored: Counter<u64>,
    dropped: Counter<u64>,
    duration: Histogram<f64>,
    /// Pre-built labels, indexed by module id.
    labels: Vec<[KeyValue; 2]>,
}

impl EngineMetrics {
    fn new(pipeline: &str, graph: &Graph) -> Self {
        let meter = global::meter(METER_NAME);
        Self {
            processed: meter
                .u64_counter("module.frames.processed")
                .with_description("Frames successfully processed by a module")
                .build(),
            errored: meter
                .u64_counter("module.frames.errored")
                .with_description("Frames a module failed to process")
                .build(),
            dropped: meter
                .u64_counter("conveyor.frames.dropped")
                .with_description("Frames evicted from best-effort input queues")
                .build(),
            duration: meter
                .f64_histogram("module.process.duration")
                .with_description("Time spent in Module::process, in seconds")
                .build(),
            labels: graph
                .nodes()
                .map(|(_, node)| {
                    [
                        KeyValue::new("pipeline", pipeline.to_string()),
                        KeyValue::new("module", node.name().to_string()),
                    ]
                })
                .collect(),
        }
    }
}

/// Shared run-time state. Workers and module handles reach the pipeline through it.
pub(crate) struct Router {
    name: Arc<str>,
    graph: Graph,
    /// Indexed by module id; roots have no connector.
    connectors: Vec<Option<Connector>>,
    bus: EventBus,
    dispatcher: Arc<StreamMsgDispatcher>,
    streams: Arc<StreamTable>,
    stats: Vec<ModuleStatsTracker>,
    metrics: EngineMetrics,
    frame_done: RwLock<Option<FrameDoneFn>>,
    /// Indexed by module id.
    module_observers: Vec<RwLock<Option<ModuleObserverFn>>>,
    running: AtomicBool,
    run_state: Mutex<RunState>,
    run_state_changed: Condvar,
}

impl Router {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_run_state(&self, state: RunState) {
        *self.run_state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        self.run_state_changed.notify_all();
    }

    fn connector(&self, id: ModuleId) -> Option<&Connector> {
        self.connectors.get(id).and_then(Option::as_ref)
    }

    /// Runs `process`, recording duration and outcome.
    fn process(&self, id: ModuleId, node: &GraphNode, frame: &SharedFrame) -> Result<()> {
        let started = Instant::now();
        let result = node.module.read().unwrap_or_else(PoisonError::into_inner).process(frame);
        if let Some(labels) = self.metrics.labels.get(id) {
            self.metrics.duration.record(started.elapsed().as_secs_f64(), labels);
            match result {
                Ok(()) => self.metrics.processed.add(1, labels),
                Err(_) => self.metrics.errored.add(1, labels),
            }
        }
        result
    }

    fn report_failure(&self, id: ModuleId, node: &GraphNode, frame: &SharedFrame, err: &FlowError) {
        self.stats[id].errored();
        tracing::error!(
            module = %node.name(),
            stream_id = %frame.stream_id(),
            channel_idx = frame.channel_idx(),
            error = %err,
            "Process failed; worker stopping"
        );
        self.bus.post_event(
            Event::new(EventKind::Error, node.name(), err.to_string())
                .with_stream(frame.stream_id(), frame.channel_idx()),
        );
    }

    /// Hands a frame that `id` has finished with to its successors.
    fn transmit_from(&self, id: ModuleId, frame: SharedFrame) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let stats = &self.stats[id];

        if let Some(route_mask) = node.route_mask() {
            frame.reset_passed_modules(route_mask.clone());
        }
        let passed = frame.mark_passed(id);
        let is_eos = frame.is_eos();

        if !is_eos {
            if frame.is_removed() || self.streams.is_removed(frame.stream_id()) {
                stats.discarded();
                return;
            }
            if frame.is_invalid() {
                tracing::debug!(
                    module = %node.name(),
                    stream_id = %frame.stream_id(),
                    "Invalid frame dropped"
                );
                let (stream_id, channel_idx) = (frame.stream_id(), frame.channel_idx());
                self.dispatcher.post(
                    StreamMsg::new(StreamMsgKind::FrameError, stream_id, channel_idx)
                        .from_module(node.name())
                        .at(frame.timestamp()),
                );
                stats.discarded();
                return;
            }
        }

        let observer = self
            .module_observers
            .get(id)
            .and_then(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone());
        if let Some(observer) = observer {
            observer(&frame);
        }

        self.deliver(id, node, &frame, &passed);

        if is_eos {
            // A root also acknowledges on behalf of the modules its frames never reach.
            let acknowledged = if node.is_root() { passed } else { ModuleMask::single(id) };
            self.bus.post_event(
                Event::new(EventKind::Eos, node.name(), "eos")
                    .with_stream(frame.stream_id(), frame.channel_idx())
                    .with_mask(acknowledged),
            );
        }
    }

    /// Pushes to every successor whose upstream modules have all passed the frame, or hands
    /// the frame to the frame-done callback when `node` is a leaf.
    ///
    /// `sent` counts only frames that actually left `node`: queued on at least one successor,
    /// or completed at a leaf.
    fn deliver(&self, id: ModuleId, node: &GraphNode, frame: &SharedFrame, passed: &ModuleMask) {
        if node.is_leaf() {
            self.stats[id].sent();
            let callback = self.frame_done.read().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(callback) = callback {
                callback(frame);
            }
            return;
        }

        let mut forwarded = false;
        for &next in node.successors() {
            let Some(next_node) = self.graph.node(next) else {
                continue;
            };
            // Only the last upstream to pass the frame forwards it.
            if !passed.covers(next_node.parents()) {
                continue;
            }
            let Some(connector) = self.connector(next) else {
                continue;
            };
            match connector.push(Arc::clone(frame)) {
                PushOutcome::Queued => forwarded = true,
                PushOutcome::DroppedOldest => {
                    forwarded = true;
                    self.stats[next].discarded();
                    if let Some(labels) = self.metrics.labels.get(next) {
                        self.metrics.dropped.add(1, labels);
                    }
                },
                PushOutcome::Rejected => {
                    tracing::trace!(module = %next_node.name(), "Link stopped; frame discarded");
                },
            }
        }
        if forwarded {
            self.stats[id].sent();
        }
    }
}

impl PipelineLink for Router {
    fn transmit(&self, module: ModuleId, frame: SharedFrame) -> bool {
        let Some(node) = self.graph.node(module) else {
            return false;
        };
        if !self.is_running() {
            return false;
        }
        if node.forwarding() == Forwarding::Auto && !node.is_root() {
            tracing::warn!(
                module = %node.name(),
                "Auto-forwarding module called transmit; frame refused"
            );
            return false;
        }
        self.transmit_from(module, frame);
        true
    }

    fn post_event(&self, event: Event) -> bool {
        self.bus.post_event(event)
    }

    fn post_stream_msg(&self, msg: StreamMsg) -> bool {
        self.dispatcher.post(msg)
    }

    fn stream_index(&self, stream_id: &str) -> usize {
        self.streams.index_of(stream_id)
    }

    fn wait_running(&self) -> bool {
        let mut state = self.run_state.lock().unwrap_or_else(PoisonError::into_inner);
        while *state == RunState::Starting {
            state = self.run_state_changed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        *state == RunState::Running
    }
}

fn run_worker(router: &Router, id: ModuleId, worker: usize) {
    let (Some(node), Some(connector)) = (router.graph.node(id), router.connector(id)) else {
        return;
    };
    let stats = &router.stats[id];
    let self_transmit = node.forwarding() == Forwarding::SelfTransmit;
    tracing::debug!("Worker started");

    while let Some(frame) = connector.pop_from(worker) {
        stats.received();

        if self_transmit {
            if let Err(e) = router.process(id, node, &frame) {
                router.report_failure(id, node, &frame, &e);
                break;
            }
            continue;
        }

        if frame.is_eos() {
            node.module.read().unwrap_or_else(PoisonError::into_inner).on_eos(frame.stream_id());
        } else if router.streams.is_removed(frame.stream_id()) {
            frame.set_flag(FrameFlag::Removed);
        } else if let Err(e) = router.process(id, node, &frame) {
            router.report_failure(id, node, &frame, &e);
            break;
        }
        router.transmit_from(id, frame);
    }

    tracing::debug!("Worker exiting");
}

/// `fk-<module>-<worker>`, with the module name shortened to fit the platform limit.
pub(crate) fn worker_thread_name(module: &str, worker: usize) -> String {
    let suffix = format!("-{worker}");
    let budget = MAX_THREAD_NAME_LEN.saturating_sub(THREAD_NAME_PREFIX.len() + 1 + suffix.len());
    let mut prefix = String::with_capacity(budget);
    for c in module.chars() {
        if prefix.len() + c.len_utf8() > budget {
            break;
        }
        prefix.push(c);
    }
    format!("{THREAD_NAME_PREFIX}-{prefix}{suffix}")
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    workers: Vec<JoinHandle<()>>,
}

/// A runnable module graph.
pub struct Pipeline {
    router: Arc<Router>,
    lifecycle: Mutex<Lifecycle>,
}

impl Pipeline {
    /// Wraps a frozen graph. The default event watcher is registered here, before any other.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Runtime` if the dispatcher thread cannot be spawned.
    pub fn new(name: impl Into<String>, graph: Graph) -> Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        let dispatcher = Arc::new(StreamMsgDispatcher::new()?);
        let streams = Arc::new(StreamTable::new());

        let bus = EventBus::new();
        bus.add_watcher(default_watcher(
            Arc::clone(&name),
            Arc::clone(&streams),
            Arc::clone(&dispatcher),
        ));

        let connectors = graph
            .nodes()
            .map(|(_, node)| {
                (!node.is_root()).then(|| {
                    let options = node.options();
                    Connector::new(options.parallelism, options.queue_capacity, options.input_mode)
                })
            })
            .collect();
        let stats = graph.nodes().map(|_| ModuleStatsTracker::new()).collect();
        let module_observers = graph.nodes().map(|_| RwLock::new(None)).collect();
        let metrics = EngineMetrics::new(&name, &graph);

        tracing::info!(pipeline = %name, modules = graph.len(), "Pipeline created");
        Ok(Self {
            router: Arc::new(Router {
                name,
                graph,
                connectors,
                bus,
                dispatcher,
                streams,
                stats,
                metrics,
                frame_done: RwLock::new(None),
                module_observers,
                running: AtomicBool::new(false),
                run_state: Mutex::new(RunState::Stopped),
                run_state_changed: Condvar::new(),
            }),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.router.name
    }

    pub fn graph(&self) -> &Graph {
        &self.router.graph
    }

    pub fn is_running(&self) -> bool {
        self.router.is_running()
    }

    /// Opens every module, starts the event bus and spawns the workers.
    ///
    /// Starting a running pipeline is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ModuleOpen` if a module rejects its params or fails to open; every
    /// module opened before it is closed again and no thread is spawned. Returns
    /// `FlowError::Runtime` if a thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if lifecycle.running {
            return Ok(());
        }
        let router = &self.router;

        router.set_run_state(RunState::Starting);
        self.open_modules()?;

        router.streams.set_eos_mask(router.graph.all_modules().clone());
        if let Err(e) = router.bus.start() {
            router.set_run_state(RunState::Stopped);
            self.close_modules();
            router.streams.set_eos_mask(ModuleMask::new());
            return Err(e);
        }
        for connector in router.connectors.iter().flatten() {
            connector.start();
        }
        router.running.store(true, Ordering::Release);
        lifecycle.running = true;

        for (id, node) in router.graph.nodes() {
            if node.is_root() {
                continue;
            }
            for worker in 0..node.options().parallelism {
                let worker_router = Arc::clone(router);
                let module = node.shared_name();
                let spawned = std::thread::Builder::new()
                    .name(worker_thread_name(node.name(), worker))
                    .spawn(move || {
                        let _span = tracing::info_span!("module_worker", module = %module, worker)
                            .entered();
                        run_worker(&worker_router, id, worker);
                    });
                match spawned {
                    Ok(handle) => lifecycle.workers.push(handle),
                    Err(e) => {
                        self.teardown(&mut lifecycle);
                        return Err(FlowError::Runtime(format!(
                            "Failed to spawn worker {worker} of module '{}': {e}",
                            node.name()
                        )));
                    },
                }
            }
        }

        // Producers parked in `ModuleHandle::wait_until_running` may go now.
        router.set_run_state(RunState::Running);
        tracing::info!(
            pipeline = %router.name,
            modules = router.graph.len(),
            workers = lifecycle.workers.len(),
            "Pipeline started"
        );
        Ok(())
    }

    fn open_modules(&self) -> Result<()> {
        let router = &self.router;
        let link: Weak<dyn PipelineLink> = Arc::downgrade(router) as Weak<dyn PipelineLink>;
        let mut opened: Vec<ModuleId> = Vec::with_capacity(router.graph.len());

        for (id, node) in router.graph.nodes() {
            let ctx = OpenContext {
                name: node.name().to_string(),
                params: node.options().params.clone(),
                handle: ModuleHandle::new(node.shared_name(), id, link.clone()),
            };
            let result = {
                let mut module = node.module.write().unwrap_or_else(PoisonError::into_inner);
                module.check_params(&ctx.params).and_then(|()| module.open(&ctx))
            };
            if let Err(e) = result {
                tracing::error!(
                    pipeline = %router.name,
                    module = %node.name(),
                    error = %e,
                    "Module failed to open"
                );
                router.set_run_state(RunState::Stopped);
                for &opened_id in opened.iter().rev() {
                    if let Some(opened_node) = router.graph.node(opened_id) {
                        close_module(opened_node);
                    }
                }
                return Err(FlowError::ModuleOpen {
                    module: node.name().to_string(),
                    reason: e.to_string(),
                });
            }
            tracing::debug!(module = %node.name(), "Module opened");
            opened.push(id);
        }
        Ok(())
    }

    fn close_modules(&self) {
        for (_, node) in self.router.graph.nodes() {
            close_module(node);
        }
    }

    /// Stops the pipeline.
    ///
    /// Raises every connector's stop flag, discards queued frames, joins the workers, stops the
    /// event bus and closes every module. Stopping a stopped pipeline is a no-op. Safe to call
    /// from the stream-message observer.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if !lifecycle.running {
            return;
        }
        self.teardown(&mut lifecycle);
        tracing::info!(pipeline = %self.router.name, "Pipeline stopped");
    }

    fn teardown(&self, lifecycle: &mut Lifecycle) {
        let router = &self.router;
        router.running.store(false, Ordering::Release);
        router.set_run_state(RunState::Stopped);

        for connector in router.connectors.iter().flatten() {
            connector.stop();
        }
        for (id, connector) in router.connectors.iter().enumerate() {
            if let Some(connector) = connector {
                let dropped = connector.drain_all().len();
                if dropped > 0 {
                    tracing::debug!(
                        module = %router.graph.node(id).map_or("", GraphNode::name),
                        dropped,
                        "Discarded queued frames on stop"
                    );
                    router.stats[id].discarded_n(dropped as u64);
                }
            }
        }

        let current = std::thread::current().id();
        for handle in lifecycle.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!(pipeline = %router.name, "Worker thread panicked");
            }
        }

        router.bus.stop();
        router.streams.set_eos_mask(ModuleMask::new());
        self.close_modules();
        lifecycle.running = false;
    }

    /// Feeds a frame into the graph as if `module` had emitted it.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Runtime` if the pipeline is not running, and
    /// `FlowError::Configuration` if `module` is unknown or has upstream links.
    pub fn provide_data(&self, module: &str, frame: SharedFrame) -> Result<()> {
        let router = &self.router;
        let id = router.graph.id_of(module).ok_or_else(|| {
            FlowError::Configuration(format!("Unknown module '{module}'"))
        })?;
        if router.graph.node(id).is_some_and(|node| !node.is_root()) {
            return Err(FlowError::Configuration(format!(
                "Module '{module}' has upstream links and cannot accept external data"
            )));
        }
        if !router.is_running() {
            return Err(FlowError::Runtime(format!("Pipeline '{}' is not running", router.name)));
        }
        router.transmit_from(id, frame);
        Ok(())
    }

    /// Returns the channel index for `stream_id`, assigning the smallest free one.
    pub fn stream_index(&self, stream_id: &str) -> usize {
        self.router.streams.index_of(stream_id)
    }

    /// Marks a stream removed: its frames are dropped until its EOS drains through.
    /// Returns false if the stream was already marked.
    pub fn remove_stream(&self, stream_id: &str) -> bool {
        let marked = self.router.streams.mark_removed(stream_id);
        if marked {
            tracing::info!(pipeline = %self.router.name, stream_id, "Stream removed");
        }
        marked
    }

    pub fn is_stream_removed(&self, stream_id: &str) -> bool {
        self.router.streams.is_removed(stream_id)
    }

    /// Status of the connector a link feeds into.
    pub fn query_link_status(&self, link: &str) -> Option<ConnectorStatus> {
        let (_, downstream) = self.router.graph.link_endpoints(link)?;
        self.router.connector(downstream).map(Connector::query_status)
    }

    /// Ids of every link, as `"<up>--><down>"`.
    pub fn link_ids(&self) -> Vec<LinkId> {
        self.router.graph.links().map(str::to_string).collect()
    }

    /// Statistics snapshot for every module, in insertion order.
    pub fn module_stats(&self) -> IndexMap<String, ModuleStats> {
        self.router
            .graph
            .nodes()
            .map(|(id, node)| (node.name().to_string(), self.router.stats[id].snapshot()))
            .collect()
    }

    /// Sets the single stream-message observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn StreamMsgObserver>) {
        self.router.dispatcher.set_observer(Some(observer));
    }

    pub fn clear_observer(&self) {
        self.router.dispatcher.set_observer(None);
    }

    /// Sets the callback invoked for every frame leaving a leaf module.
    pub fn set_frame_done_callback(&self, callback: FrameDoneFn) {
        *self.router.frame_done.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Sets the observer of `module`, replacing any previous one.
    ///
    /// The observer runs on the thread that passes the frame on, after the module is done with it
    /// and before any successor sees it. Invalid frames and frames of removed streams are not
    /// observed.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if `module` is unknown.
    pub fn set_module_observer(&self, module: &str, observer: ModuleObserverFn) -> Result<()> {
        *self.observer_slot(module)?.write().unwrap_or_else(PoisonError::into_inner) =
            Some(observer);
        Ok(())
    }

    /// Removes the observer of `module`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if `module` is unknown.
    pub fn clear_module_observer(&self, module: &str) -> Result<()> {
        *self.observer_slot(module)?.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn observer_slot(&self, module: &str) -> Result<&RwLock<Option<ModuleObserverFn>>> {
        self.router
            .graph
            .id_of(module)
            .and_then(|id| self.router.module_observers.get(id))
            .ok_or_else(|| FlowError::Configuration(format!("Unknown module '{module}'")))
    }

    /// Appends a watcher after the default one.
    pub fn add_watcher(&self, watcher: BusWatcher) {
        self.router.bus.add_watcher(watcher);
    }

    /// Posts an event on the pipeline's bus. Returns false if the bus is not running.
    pub fn post_event(&self, event: Event) -> bool {
        self.router.bus.post_event(event)
    }

    /// Whether the event bus is consuming events. It stops on its own after an error.
    pub fn is_event_bus_running(&self) -> bool {
        self.router.bus.is_running()
    }

    /// Streams whose EOS some, but not all, modules have passed.
    pub fn pending_eos_streams(&self) -> Vec<String> {
        self.router.streams.pending_eos()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
        self.router.dispatcher.shutdown();
    }
}

fn close_module(node: &GraphNode) {
    node.module.write().unwrap_or_else(PoisonError::into_inner).close();
    tracing::debug!(module = %node.name(), "Module closed");
}

/// Builds a [`Pipeline`] from modules and links in one go.
pub struct PipelineBuilder {
    name: String,
    graph: GraphBuilder,
    observer: Option<Arc<dyn StreamMsgObserver>>,
    frame_done: Option<FrameDoneFn>,
    watchers: Vec<BusWatcher>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: GraphBuilder::new(),
            observer: None,
            frame_done: None,
            watchers: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// See [`GraphBuilder::add_module`].
    pub fn add_module(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn Module>,
        options: ModuleOptions,
    ) -> Result<ModuleId> {
        self.graph.add_module(name, module, options)
    }

    /// # Errors
    ///
    /// See [`GraphBuilder::link`].
    pub fn link(&mut self, upstream: &str, downstream: &str) -> Result<LinkId> {
        self.graph.link(upstream, downstream)
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StreamMsgObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn with_frame_done(mut self, callback: FrameDoneFn) -> Self {
        self.frame_done = Some(callback);
        self
    }

    #[must_use]
    pub fn with_watcher(mut self, watcher: BusWatcher) -> Self {
        self.watchers.push(watcher);
        self
    }

    /// # Errors
    ///
    /// Returns whatever [`GraphBuilder::build`] or [`Pipeline::new`] returns.
    pub fn build(self) -> Result<Pipeline> {
        let pipeline = Pipeline::new(self.name, self.graph.build()?)?;
        if let Some(observer) = self.observer {
            pipeline.set_observer(observer);
        }
        if let Some(callback) = self.frame_done {
            pipeline.set_frame_done_callback(callback);
        }
        for watcher in self.watchers {
            pipeline.add_watcher(watcher);
        }
        Ok(pipeline)
    }
}
