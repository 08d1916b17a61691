// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use crate::streams::{EosProgress, StreamTable};
use flowkit_core::ModuleMask;

#[test]
fn indices_are_dense_and_reused() {
    let table = StreamTable::new();
    assert_eq!(table.index_of("cam-0"), 0);
    assert_eq!(table.index_of("cam-1"), 1);
    assert_eq!(table.index_of("cam-0"), 0);
    assert_eq!(table.index_of("cam-2"), 2);

    table.release("cam-1");
    assert_eq!(table.index_of("cam-3"), 1);
    assert_eq!(table.index_of("cam-4"), 3);
}

#[test]
fn eos_drains_once_every_module_acknowledged() {
    let table = StreamTable::new();
    assert_eq!(table.acknowledge_eos("s", &ModuleMask::single(0)), EosProgress::Ignored);

    table.set_eos_mask((0..3).collect());
    let idx = table.index_of("s");
    assert_eq!(table.acknowledge_eos("s", &ModuleMask::single(0)), EosProgress::Pending);
    assert_eq!(table.acknowledge_eos("s", &ModuleMask::single(2)), EosProgress::Pending);
    assert_eq!(table.pending_eos(), vec!["s".to_string()]);
    assert_eq!(table.acknowledge_eos("s", &ModuleMask::single(1)), EosProgress::Drained);

    assert!(table.pending_eos().is_empty());
    // The index was released with the stream.
    assert_eq!(table.index_of("other"), idx);
}

#[test]
fn draining_clears_the_removal_mark() {
    let table = StreamTable::new();
    table.set_eos_mask(ModuleMask::single(0));
    assert!(table.mark_removed("s"));
    assert!(!table.mark_removed("s"));
    assert!(table.is_removed("s"));

    assert_eq!(table.acknowledge_eos("s", &ModuleMask::single(0)), EosProgress::Drained);
    assert!(!table.is_removed("s"));
}

#[test]
fn new_eos_mask_forgets_pending_streams() {
    let table = StreamTable::new();
    table.set_eos_mask((0..2).collect());
    table.acknowledge_eos("s", &ModuleMask::single(0));
    table.set_eos_mask(ModuleMask::new());
    assert!(table.pending_eos().is_empty());
}
