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

//! The pending-terms hash table: open addressing by chaining over an
//! arena of [`Entry`] values. Entries are never moved once created —
//! only arena indices cross the chain/cursor boundary — so growing an
//! individual entry's buffer, or the slot array itself, never
//! invalidates anything a caller might be holding.

use std::cell::Cell;

use crate::entry::Entry;
use crate::merge::binary_lift_merge;
use crate::util::comparator::{ByteWiseComparator, Comparator};
use crate::util::slice::Term;
use crate::util::status::{Result, Status, TermError};
use crate::util::varint::get_varint;

const INITIAL_SLOTS: usize = 1024;

fn hash_term(term: &[u8]) -> u64 {
    let mut h: u64 = 13;
    for &b in term.iter().rev() {
        h = (h << 3) ^ h ^ (b as u64);
    }
    h
}

fn try_reserve_exact<T>(v: &mut Vec<T>, additional: usize, what: &str) -> Result<()> {
    v.try_reserve_exact(additional).map_err(|_| {
        warn!("out of memory: {}", what);
        TermError::out_of_memory(what)
    })
}

pub(crate) struct PendingTerms<'a> {
    slots: Vec<Option<u32>>,
    arena: Vec<Entry>,
    entry_count: usize,
    byte_counter: &'a Cell<i64>,
    cursor: Option<(Vec<u32>, usize)>,
}

impl<'a> PendingTerms<'a> {
    pub(crate) fn new(byte_counter: &'a Cell<i64>) -> PendingTerms<'a> {
        PendingTerms {
            slots: vec![None; INITIAL_SLOTS],
            arena: Vec::new(),
            entry_count: 0,
            byte_counter,
            cursor: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entry_count
    }

    fn slot_index(&self, term: &[u8]) -> usize {
        let mask = self.slots.len() - 1;
        (hash_term(term) as usize) & mask
    }

    fn find(&self, term: &[u8]) -> Option<u32> {
        let mut cur = self.slots[self.slot_index(term)];
        while let Some(idx) = cur {
            let entry = &self.arena[idx as usize];
            if entry.key() == term {
                return Some(idx);
            }
            cur = entry.next;
        }
        None
    }

    fn adjust_counter(&self, delta: i64) {
        self.byte_counter.set(self.byte_counter.get() + delta);
    }

    fn maybe_resize(&mut self) -> Result<()> {
        if self.entry_count * 2 < self.slots.len() {
            return Ok(());
        }
        let new_len = self.slots.len() * 2;
        trace!(
            "resizing pending-terms hash table from {} to {} slots ({} entries)",
            self.slots.len(),
            new_len,
            self.entry_count
        );
        let mut new_slots = Vec::new();
        try_reserve_exact(&mut new_slots, new_len, "hash table resize failed")?;
        new_slots.resize(new_len, None);
        let mask = new_len - 1;
        for idx in 0..self.arena.len() {
            let slot = (hash_term(self.arena[idx].key()) as usize) & mask;
            self.arena[idx].next = new_slots[slot];
            new_slots[slot] = Some(idx as u32);
        }
        self.slots = new_slots;
        Ok(())
    }

    pub(crate) fn write(&mut self, rowid: i64, column: i32, position: i32, term: &[u8]) -> Result<()> {
        if let Some(idx) = self.find(term) {
            let before = self.arena[idx as usize].len();
            self.arena[idx as usize].try_append(rowid, column, position)?;
            let after = self.arena[idx as usize].len();
            self.adjust_counter(after as i64 - before as i64);
            return Ok(());
        }

        self.maybe_resize()?;
        let entry = Entry::try_new(term, rowid, column, position)?;
        let len = entry.len() as i64;

        try_reserve_exact(&mut self.arena, 1, "pending-terms arena growth failed")?;
        let idx = self.arena.len() as u32;
        self.arena.push(entry);

        let slot = self.slot_index(term);
        self.arena[idx as usize].next = self.slots[slot];
        self.slots[slot] = Some(idx);
        self.entry_count += 1;
        self.adjust_counter(len);
        Ok(())
    }

    pub(crate) fn point_query(&mut self, term: &[u8]) -> Option<&[u8]> {
        let idx = self.find(term)?;
        let entry = &mut self.arena[idx as usize];
        entry.finalize_current_poslist();
        Some(entry.payload())
    }

    /// Builds the ascending-by-key list of arena indices matching
    /// `prefix` (or every live entry, if `prefix` is `None`), ordered
    /// by the crate's byte-wise comparator.
    fn sorted_matching(&self, prefix: Option<&[u8]>) -> Vec<u32> {
        let candidates = (0..self.arena.len() as u32).filter(|&idx| match prefix {
            Some(p) => self.arena[idx as usize].key().starts_with(p),
            None => true,
        });
        let arena = &self.arena;
        let cmp = ByteWiseComparator;
        binary_lift_merge(candidates, |a, b| {
            cmp.compare(arena[a as usize].key(), arena[b as usize].key())
        })
    }

    /// Destructively drains every entry (prefix-filtered beforehand is
    /// not applicable: `iterate` always drains the whole table) in
    /// ascending key order, calling `sink` once per term and once per
    /// document within that term. Entries are gone, emitted or not,
    /// once this returns.
    pub(crate) fn iterate(&mut self, sink: &mut dyn Sink) -> Result<()> {
        let order = self.sorted_matching(None);
        debug!("draining {} pending terms via iterate", order.len());
        let mut aborted = false;
        let mut result = Ok(());

        for idx in order {
            if aborted {
                break;
            }
            let entry = &mut self.arena[idx as usize];
            entry.finalize_current_poslist();
            let key = entry.key().to_vec();
            let payload = entry.payload();

            match sink.on_term(Term::new(&key)) {
                Status::Ok => {}
                other => {
                    aborted = true;
                    result = Err(TermError::new(other, Some("iterate aborted by sink")));
                    continue;
                }
            }

            let mut running_rowid: i64 = 0;
            for (rowid, framed) in DocBlocks::new(payload) {
                running_rowid = rowid;
                match sink.on_doc(running_rowid, Term::new(framed)) {
                    Status::Ok => {}
                    other => {
                        aborted = true;
                        result = Err(TermError::new(other, Some("iterate aborted by sink")));
                        break;
                    }
                }
            }
            let _ = running_rowid;

            if !aborted {
                match sink.on_term_end() {
                    Status::Ok => {}
                    other => {
                        aborted = true;
                        result = Err(TermError::new(other, Some("iterate aborted by sink")));
                    }
                }
            }
        }

        self.drop_all();
        result
    }

    fn drop_all(&mut self) {
        let freed: i64 = self.arena.iter().map(|e| e.len() as i64).sum();
        debug!(
            "dropping {} pending entries, releasing {} bytes",
            self.arena.len(),
            freed
        );
        self.adjust_counter(-freed);
        self.arena.clear();
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.entry_count = 0;
        self.cursor = None;
    }

    pub(crate) fn scan_init(&mut self, prefix: Option<&[u8]>) -> Result<()> {
        let order = self.sorted_matching(prefix);
        self.cursor = Some((order, 0));
        Ok(())
    }

    pub(crate) fn scan_eof(&self) -> bool {
        match &self.cursor {
            Some((order, pos)) => *pos >= order.len(),
            None => true,
        }
    }

    pub(crate) fn scan_next(&mut self) {
        if let Some((_, pos)) = &mut self.cursor {
            *pos += 1;
        }
    }

    pub(crate) fn scan_entry(&mut self) -> Option<(&[u8], &[u8])> {
        let (order, pos) = self.cursor.as_ref()?;
        let idx = *order.get(*pos)?;
        let entry = &mut self.arena[idx as usize];
        entry.finalize_current_poslist();
        Some((entry.key(), entry.payload()))
    }

    pub(crate) fn clear(&mut self) {
        self.drop_all();
    }
}

/// Callbacks driven by `iterate`'s destructive drain.
pub trait Sink {
    fn on_term(&mut self, term: Term<'_>) -> Status;
    fn on_doc(&mut self, rowid: i64, framed: Term<'_>) -> Status;
    fn on_term_end(&mut self) -> Status;
}

/// Walks a finalized doclist payload, yielding `(absolute_rowid,
/// framed_bytes)` per document, where `framed_bytes` is exactly the
/// `[size-varint || poslist-bytes]` pair `iterate`'s sink expects:
/// this component's entry buffer already stores the back-patched size
/// slot immediately before the poslist bytes it describes, so no
/// copying or reordering is needed to produce that framing.
struct DocBlocks<'a> {
    buf: &'a [u8],
    pos: usize,
    running_rowid: i64,
    first: bool,
}

impl<'a> DocBlocks<'a> {
    fn new(buf: &'a [u8]) -> DocBlocks<'a> {
        DocBlocks {
            buf,
            pos: 0,
            running_rowid: 0,
            first: true,
        }
    }
}

impl<'a> Iterator for DocBlocks<'a> {
    type Item = (i64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let (delta, n) = get_varint(&self.buf[self.pos..]);
        self.pos += n;
        if self.first {
            self.running_rowid = delta as i64;
            self.first = false;
        } else {
            self.running_rowid += delta as i64;
        }
        let size_start = self.pos;
        let (size, _) = crate::util::varint::get_fixed4(&self.buf[size_start..size_start + 4]);
        let chunk_end = size_start + 4 + size as usize;
        let framed = &self.buf[size_start..chunk_end];
        self.pos = chunk_end;
        Some((self.running_rowid, framed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        terms: Vec<Vec<u8>>,
        docs: Vec<(i64, Vec<u8>)>,
    }

    impl RecordingSink {
        fn new() -> Self {
            RecordingSink {
                terms: Vec::new(),
                docs: Vec::new(),
            }
        }
    }

    impl Sink for RecordingSink {
        fn on_term(&mut self, term: Term<'_>) -> Status {
            self.terms.push(term.as_bytes().to_vec());
            Status::Ok
        }
        fn on_doc(&mut self, rowid: i64, framed: Term<'_>) -> Status {
            self.docs.push((rowid, framed.as_bytes().to_vec()));
            Status::Ok
        }
        fn on_term_end(&mut self) -> Status {
            Status::Ok
        }
    }

    fn new_table(counter: &Cell<i64>) -> PendingTerms<'_> {
        PendingTerms::new(counter)
    }

    #[test]
    fn test_point_query_roundtrip() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        t.write(5, 0, 3, b"hello").unwrap();
        let got = t.point_query(b"hello").unwrap().to_vec();
        assert!(!got.is_empty());
        assert!(t.point_query(b"missing").is_none());
    }

    #[test]
    fn test_byte_counter_tracks_length() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        t.write(1, 0, 0, b"cat").unwrap();
        t.write(1, 0, 4, b"cat").unwrap();
        t.write(3, 0, 2, b"dog").unwrap();
        let total: i64 = t.arena.iter().map(|e| e.len() as i64).sum();
        assert_eq!(total, counter.get());
    }

    #[test]
    fn test_prefix_scan() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        for term in ["ant", "antelope", "bee", "bear", "cat"] {
            t.write(1, 0, 0, term.as_bytes()).unwrap();
        }

        t.scan_init(Some(b"be")).unwrap();
        let mut got = Vec::new();
        while !t.scan_eof() {
            let (term, _) = t.scan_entry().unwrap();
            got.push(term.to_vec());
            t.scan_next();
        }
        assert_eq!(got, vec![b"bear".to_vec(), b"bee".to_vec()]);

        t.scan_init(Some(b"ant")).unwrap();
        let mut got = Vec::new();
        while !t.scan_eof() {
            let (term, _) = t.scan_entry().unwrap();
            got.push(term.to_vec());
            t.scan_next();
        }
        assert_eq!(got, vec![b"ant".to_vec(), b"antelope".to_vec()]);

        t.scan_init(None).unwrap();
        let mut got = Vec::new();
        while !t.scan_eof() {
            let (term, _) = t.scan_entry().unwrap();
            got.push(term.to_vec());
            t.scan_next();
        }
        assert_eq!(got.len(), 5);
        let mut sorted = got.clone();
        sorted.sort();
        assert_eq!(got, sorted);
    }

    #[test]
    fn test_iterate_drains_and_orders() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        for term in ["zebra", "apple", "mango"] {
            t.write(1, 0, 0, term.as_bytes()).unwrap();
        }
        let mut sink = RecordingSink::new();
        t.iterate(&mut sink).unwrap();
        assert_eq!(
            sink.terms,
            vec![b"apple".to_vec(), b"mango".to_vec(), b"zebra".to_vec()]
        );
        assert!(t.scan_eof());
        assert!(t.point_query(b"apple").is_none());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_rehash_2048_terms() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        for i in 0..2048 {
            let term = format!("t{:04}", i);
            t.write(1, 0, 0, term.as_bytes()).unwrap();
            assert!(t.entry_count * 2 <= t.slots.len());
        }
        for i in 0..2048 {
            let term = format!("t{:04}", i);
            assert!(t.point_query(term.as_bytes()).is_some());
        }
        let mut sink = RecordingSink::new();
        t.iterate(&mut sink).unwrap();
        assert_eq!(sink.terms.len(), 2048);
        let mut sorted = sink.terms.clone();
        sorted.sort();
        assert_eq!(sink.terms, sorted);
    }

    #[test]
    fn test_iterate_decodes_doc_blocks() {
        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        t.write(1, 0, 0, b"cat").unwrap();
        t.write(1, 0, 4, b"cat").unwrap();
        t.write(3, 0, 2, b"cat").unwrap();
        let mut sink = RecordingSink::new();
        t.iterate(&mut sink).unwrap();
        assert_eq!(sink.docs.len(), 2);
        assert_eq!(sink.docs[0].0, 1);
        assert_eq!(sink.docs[1].0, 3);
    }

    #[test]
    fn test_sink_abort_frees_remaining_entries() {
        struct AbortAfterFirst {
            seen: usize,
        }
        impl Sink for AbortAfterFirst {
            fn on_term(&mut self, _term: Term<'_>) -> Status {
                self.seen += 1;
                if self.seen > 1 {
                    Status::Aborted
                } else {
                    Status::Ok
                }
            }
            fn on_doc(&mut self, _rowid: i64, _framed: Term<'_>) -> Status {
                Status::Ok
            }
            fn on_term_end(&mut self) -> Status {
                Status::Ok
            }
        }

        let counter = Cell::new(0);
        let mut t = new_table(&counter);
        for term in ["a", "b", "c"] {
            t.write(1, 0, 0, term.as_bytes()).unwrap();
        }
        let mut sink = AbortAfterFirst { seen: 0 };
        let err = t.iterate(&mut sink);
        assert!(err.is_err());
        assert_eq!(t.len(), 0);
        assert_eq!(counter.get(), 0);
    }
}
