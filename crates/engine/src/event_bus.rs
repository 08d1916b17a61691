// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The pipeline-wide event bus.
//!
//! Any thread may post; a single consumer thread hands each event to the watcher chain in
//! registration order. A watcher answering [`HandleFlag::Stop`] or [`HandleFlag::Intercept`]
//! hides the event from the watchers after it; `Stop` (or a terminal event kind) also ends
//! the loop.

use crate::constants::EVENT_BUS_THREAD_NAME;
use flowkit_core::error::Result;
use flowkit_core::{BusWatcher, Event, FlowError, HandleFlag};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

type EventRx = mpsc::UnboundedReceiver<Event>;

pub struct EventBus {
    tx: mpsc::UnboundedSender<Event>,
    /// Parked here while the consumer thread is not running.
    rx: Mutex<Option<EventRx>>,
    watchers: Arc<Mutex<Vec<BusWatcher>>>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<EventRx>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            watchers: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Appends a watcher to the chain.
    ///
    /// Watchers run on the bus thread while the chain is locked; they must not call
    /// `add_watcher` themselves.
    pub fn add_watcher(&self, watcher: BusWatcher) {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner).push(watcher);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueues an event without blocking. Returns false if the bus is not running.
    pub fn post_event(&self, event: Event) -> bool {
        if !self.is_running() {
            tracing::warn!(
                kind = ?event.kind,
                module = %event.module_name,
                "Event bus not running; event dropped"
            );
            return false;
        }
        self.tx.send(event).is_ok()
    }

    /// Spawns the consumer thread. Starting a running bus is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Runtime` if the thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if thread.is_some() {
            return Ok(());
        }
        let Some(mut rx) = self.rx.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return Err(FlowError::Runtime("Event bus receiver missing".to_string()));
        };

        // Leftovers of a previous run (including its stop request) must not leak into this one.
        while rx.try_recv().is_ok() {}

        self.running.store(true, Ordering::Release);
        let watchers = Arc::clone(&self.watchers);
        let running = Arc::clone(&self.running);
        let spawned = std::thread::Builder::new()
            .name(EVENT_BUS_THREAD_NAME.to_string())
            .spawn(move || event_loop(rx, &watchers, &running));

        match spawned {
            Ok(handle) => {
                *thread = Some(handle);
                tracing::debug!("Event bus started");
                Ok(())
            },
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(FlowError::Runtime(format!("Failed to spawn event bus thread: {e}")))
            },
        }
    }

    /// Asks the loop to stop and joins the consumer thread.
    pub fn stop(&self) {
        let Some(handle) = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take()
        else {
            return;
        };
        // Sent even if the loop already ended on its own; the next start discards it.
        let _ = self.tx.send(Event::stop());
        if handle.thread().id() == std::thread::current().id() {
            // Called from a watcher: the loop exits after this event, the receiver goes with it.
            self.running.store(false, Ordering::Release);
            return;
        }
        match handle.join() {
            Ok(rx) => {
                *self.rx.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
            },
            Err(_) => tracing::error!("Event bus thread panicked"),
        }
        self.running.store(false, Ordering::Release);
        tracing::debug!("Event bus stopped");
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.stop();
    }
}

fn event_loop(mut rx: EventRx, watchers: &Mutex<Vec<BusWatcher>>, running: &AtomicBool) -> EventRx {
    while let Some(event) = rx.blocking_recv() {
        let mut stop = event.kind.is_terminal();
        {
            let mut watchers = watchers.lock().unwrap_or_else(PoisonError::into_inner);
            for watcher in watchers.iter_mut() {
                let flag = watcher(&event);
                if flag == HandleFlag::Stop {
                    stop = true;
                }
                if flag.short_circuits() {
                    break;
                }
            }
        }
        if stop {
            tracing::debug!(kind = ?event.kind, module = %event.module_name, "Event loop stopping");
            break;
        }
    }
    running.store(false, Ordering::Release);
    rx
}
