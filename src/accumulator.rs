// Copyright 2019 Fullstop000 <fullstop1005@gmail.com>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

//! Public entry point: a single write transaction's worth of pending
//! terms, ready to be merged into a segment once flushed.

use std::cell::Cell;

use crate::table::{PendingTerms, Sink};
use crate::util::slice::Term;
use crate::util::status::Result;

pub use crate::table::Sink as TermSink;
pub use crate::util::status::{Status, TermError};

/// Accumulates terms written during one transaction into an in-memory
/// hash table, keeping a running byte count of its own footprint in
/// the `byte_counter` cell it's constructed with so a caller can flush
/// once that counter crosses its own budget.
///
/// Not `Sync`: every operation takes `&mut self`, so sharing one
/// instance across threads is a compile error rather than a runtime
/// race — this component is defined to run on a single thread.
pub struct Accumulator<'a> {
    table: PendingTerms<'a>,
}

impl<'a> Accumulator<'a> {
    /// Creates an empty accumulator. `byte_counter` is debited on every
    /// write and credited back on every drain (`iterate`) or `clear`,
    /// so the caller can read it at any time to learn this instance's
    /// current footprint.
    pub fn new(byte_counter: &'a Cell<i64>) -> Accumulator<'a> {
        Accumulator {
            table: PendingTerms::new(byte_counter),
        }
    }

    /// Records one `(rowid, column, position)` occurrence of `term`.
    /// `column < 0` records a deletion marker for `rowid` instead: the
    /// rowid is remembered but no position is recorded.
    ///
    /// Fails with `Status::OutOfMemory` if growing the table or an
    /// entry's buffer requires an allocation the allocator refuses;
    /// the table is left exactly as it was before the call.
    pub fn write(&mut self, rowid: i64, column: i32, position: i32, term: Term<'_>) -> Result<()> {
        self.table.write(rowid, column, position, term.as_bytes())
    }

    /// Looks up `term` without removing it, returning its finalized
    /// doclist payload if present.
    pub fn point_query(&mut self, term: Term<'_>) -> Option<Term<'_>> {
        self.table.point_query(term.as_bytes()).map(Term::new)
    }

    /// Drains every pending term in ascending key order, calling
    /// `sink` once per term (`on_term`) and once per document within
    /// that term (`on_doc`), finishing each term with `on_term_end`.
    /// The table is empty and its byte counter back to the value it
    /// had before any of this instance's writes once this returns,
    /// whether or not `sink` ran to completion.
    pub fn iterate(&mut self, sink: &mut dyn Sink) -> Result<()> {
        self.table.iterate(sink)
    }

    /// Positions an ordered cursor over every term (or, if `prefix` is
    /// given, every term starting with it) in ascending key order,
    /// without removing anything. Replaces any cursor from a prior
    /// `scan_init` call silently; only one scan can be active on an
    /// instance at a time.
    pub fn scan_init(&mut self, prefix: Option<Term<'_>>) -> Result<()> {
        self.table.scan_init(prefix.map(|t| t.as_bytes()))
    }

    /// True once the current scan has no more terms to visit.
    pub fn scan_eof(&self) -> bool {
        self.table.scan_eof()
    }

    /// Advances the current scan to its next term.
    pub fn scan_next(&mut self) {
        self.table.scan_next()
    }

    /// The current scan position's `(term, doclist payload)`, or
    /// `None` if the scan is at eof or was never started.
    pub fn scan_entry(&mut self) -> Option<(Term<'_>, Term<'_>)> {
        self.table
            .scan_entry()
            .map(|(key, payload)| (Term::new(key), Term::new(payload)))
    }

    /// Discards every pending term without visiting any of them,
    /// crediting the byte counter back in full.
    pub fn clear(&mut self) {
        self.table.clear()
    }

    /// Number of distinct terms currently pending.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if no terms are currently pending.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }
}
