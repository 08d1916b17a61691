// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Modules and helpers shared by the engine integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use flowkit_core::error::Result;
use flowkit_core::{
    FlowError, Frame, Module, OpenContext, SharedFrame, StreamMsg, StreamMsgKind,
};
use flowkit_engine::Pipeline;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

pub use flowkit_nodes::core::source::SEQUENCE_KEY;

pub const WAIT: Duration = Duration::from_secs(10);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn data(stream_id: &str, channel_idx: usize, seq: u64) -> SharedFrame {
    let frame = Frame::new(stream_id, channel_idx).with_timestamp(i64::try_from(seq).unwrap());
    frame.collection.insert(SEQUENCE_KEY, seq);
    frame.into_shared()
}

pub fn eos(stream_id: &str, channel_idx: usize) -> SharedFrame {
    Frame::eos(stream_id, channel_idx).into_shared()
}

pub fn seq_of(frame: &SharedFrame) -> u64 {
    frame.collection.get::<u64>(SEQUENCE_KEY).map_or(u64::MAX, |seq| *seq)
}

pub fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    check()
}

/// Stream messages collected through a plain closure observer.
pub struct Messages {
    rx: mpsc::Receiver<StreamMsg>,
}

impl Messages {
    pub fn attach(pipeline: &Pipeline) -> Self {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        pipeline.set_observer(Arc::new(move |msg: &StreamMsg| {
            tx.lock().unwrap().send(msg.clone()).ok();
        }));
        Self { rx }
    }

    /// Next message of `kind`, skipping others.
    pub fn wait_for(&self, kind: StreamMsgKind) -> Option<StreamMsg> {
        let start = Instant::now();
        while let Some(left) = WAIT.checked_sub(start.elapsed()) {
            match self.rx.recv_timeout(left) {
                Ok(msg) if msg.kind == kind => return Some(msg),
                Ok(_) => {},
                Err(_) => return None,
            }
        }
        None
    }

    /// Everything that arrives within `window`.
    pub fn collect_for(&self, window: Duration) -> Vec<StreamMsg> {
        let start = Instant::now();
        let mut out = Vec::new();
        while let Some(left) = window.checked_sub(start.elapsed()) {
            match self.rx.recv_timeout(left) {
                Ok(msg) => out.push(msg),
                Err(_) => break,
            }
        }
        out
    }
}

/// What a [`Recorder`] saw for one data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub stream_id: String,
    pub seq: u64,
    pub thread: String,
}

pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

/// Records every data frame it processes, optionally after a delay.
pub struct Recorder {
    log: SeenLog,
    delay: Duration,
    eos: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> (Self, SeenLog) {
        Self::slow(Duration::ZERO)
    }

    pub fn slow(delay: Duration) -> (Self, SeenLog) {
        let log = SeenLog::default();
        (Self { log: Arc::clone(&log), delay, eos: Arc::default() }, log)
    }

    /// Counter of `on_eos` calls.
    pub fn eos_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.eos)
    }
}

impl Module for Recorder {
    fn process(&self, frame: &SharedFrame) -> Result<()> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.log.lock().unwrap().push(Seen {
            stream_id: frame.stream_id().to_string(),
            seq: seq_of(frame),
            thread: std::thread::current().name().unwrap_or_default().to_string(),
        });
        Ok(())
    }

    fn on_eos(&self, _stream_id: &str) {
        self.eos.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn seqs(log: &SeenLog) -> Vec<u64> {
    log.lock().unwrap().iter().map(|seen| seen.seq).collect()
}

/// Counts lifecycle calls; optionally refuses to open.
#[derive(Clone, Default)]
pub struct Lifecycle {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl Lifecycle {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct Counted {
    counters: Lifecycle,
    fail_open: bool,
    open: bool,
}

impl Counted {
    pub fn new(counters: &Lifecycle) -> Self {
        Self { counters: counters.clone(), fail_open: false, open: false }
    }

    pub fn failing(counters: &Lifecycle) -> Self {
        Self { fail_open: true, ..Self::new(counters) }
    }
}

impl Module for Counted {
    fn open(&mut self, ctx: &OpenContext) -> Result<()> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(FlowError::Configuration(format!("{} cannot open", ctx.name)));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        // Only count real releases; repeated closes are no-ops.
        if std::mem::take(&mut self.open) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn process(&self, _frame: &SharedFrame) -> Result<()> {
        Ok(())
    }
}

/// Fails on the frame whose sequence number is `fail_at`.
pub struct Failing {
    pub fail_at: u64,
}

impl Module for Failing {
    fn process(&self, frame: &SharedFrame) -> Result<()> {
        if seq_of(frame) == self.fail_at {
            return Err(FlowError::process("fail", format!("bad frame {}", self.fail_at)));
        }
        Ok(())
    }
}

/// Root with no behaviour; frames enter through `provide_data`.
pub struct Entry;

impl Module for Entry {
    fn process(&self, _frame: &SharedFrame) -> Result<()> {
        Ok(())
    }
}
