// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Stream-message dispatcher: delivers [`StreamMsg`]s to the pipeline's observer on a
//! dedicated thread, so the observer may call back into the pipeline (including `stop`).

use crate::constants::DISPATCHER_THREAD_NAME;
use flowkit_core::error::Result;
use flowkit_core::{FlowError, StreamMsg, StreamMsgObserver};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

enum Dispatch {
    Message(StreamMsg),
    Shutdown,
}

type SharedObserver = Arc<RwLock<Option<Arc<dyn StreamMsgObserver>>>>;

pub struct StreamMsgDispatcher {
    tx: mpsc::UnboundedSender<Dispatch>,
    observer: SharedObserver,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl StreamMsgDispatcher {
    /// Spawns the dispatcher thread.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Runtime` if the thread cannot be spawned.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer: SharedObserver = Arc::new(RwLock::new(None));
        let loop_observer = Arc::clone(&observer);
        let handle = std::thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || dispatch_loop(rx, &loop_observer))
            .map_err(|e| FlowError::Runtime(format!("Failed to spawn dispatcher thread: {e}")))?;
        Ok(Self { tx, observer, thread: Mutex::new(Some(handle)) })
    }

    /// Replaces the observer. `None` detaches it; messages are then dropped.
    pub fn set_observer(&self, observer: Option<Arc<dyn StreamMsgObserver>>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    pub fn has_observer(&self) -> bool {
        self.observer.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Queues a message. Returns false after shutdown.
    pub fn post(&self, msg: StreamMsg) -> bool {
        self.tx.send(Dispatch::Message(msg)).is_ok()
    }

    /// Delivers what is already queued, then joins the thread.
    ///
    /// Called from the dispatcher thread itself (an observer dropping the last pipeline
    /// reference), the thread is left to exit on its own.
    pub fn shutdown(&self) {
        let Some(handle) = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take()
        else {
            return;
        };
        let _ = self.tx.send(Dispatch::Shutdown);
        if handle.thread().id() == std::thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Stream message dispatcher thread panicked");
        }
    }
}

impl Drop for StreamMsgDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<Dispatch>,
    observer: &RwLock<Option<Arc<dyn StreamMsgObserver>>>,
) {
    while let Some(Dispatch::Message(msg)) = rx.blocking_recv() {
        // Clone out of the lock so an observer may replace itself.
        let current = observer.read().unwrap_or_else(PoisonError::into_inner).clone();
        match current {
            Some(observer) => observer.update(&msg),
            None => tracing::debug!(
                kind = ?msg.kind,
                stream_id = %msg.stream_id,
                "No observer; stream message dropped"
            ),
        }
    }
    tracing::debug!("Stream message dispatcher exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flowkit_core::{ChannelObserver, StreamMsgKind};

    #[test]
    fn shutdown_flushes_queued_messages() {
        let dispatcher = StreamMsgDispatcher::new().unwrap();
        let (observer, mut rx) = ChannelObserver::new();
        dispatcher.set_observer(Some(Arc::new(observer)));

        for idx in 0..5 {
            assert!(dispatcher.post(StreamMsg::new(StreamMsgKind::User(1), "s", idx)));
        }
        dispatcher.shutdown();

        let delivered: Vec<usize> =
            std::iter::from_fn(|| rx.try_recv().ok()).map(|m| m.channel_idx).collect();
        assert_eq!(delivered, vec![0, 1, 2, 3, 4]);
        assert!(!dispatcher.post(StreamMsg::new(StreamMsgKind::Eos, "s", 0)));
    }

    #[test]
    fn messages_without_observer_are_dropped() {
        let dispatcher = StreamMsgDispatcher::new().unwrap();
        assert!(!dispatcher.has_observer());
        assert!(dispatcher.post(StreamMsg::new(StreamMsgKind::Eos, "s", 0)));
        dispatcher.shutdown();
    }
}
