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

//! Per-term doclist encoder. One `Entry` per distinct term; the hash
//! table owns a `Vec<Entry>` arena and never hands out anything but
//! indices into it, so growing an entry's buffer never invalidates a
//! pointer held elsewhere.

use crate::util::status::{Result, TermError};
use crate::util::varint::{put_fixed4, put_varint};

/// Minimum free tail bytes an entry's buffer must keep available
/// before every write: worst case a single `write()` call appends a
/// 9-byte rowid delta, a 4-byte size slot, a 1-byte column marker, a
/// 3-byte column varint and a 5-byte position varint.
const MIN_FREE_TAIL: usize = 9 + 4 + 1 + 3 + 5;

const INITIAL_CAPACITY: usize = 128;

/// Byte offset of the 4-byte back-patchable length slot belonging to
/// the *current* (most recently opened) document's position list.
/// Writing through `patch` is the only permitted out-of-order mutation
/// of an entry's buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SizeSlot(usize);

impl SizeSlot {
    fn patch(self, buf: &mut [u8], len: u32) {
        put_fixed4(&mut buf[self.0..self.0 + 4], len);
    }

    pub(crate) fn offset(self) -> usize {
        self.0
    }
}

/// One physical record per distinct term: the term's key plus its
/// growable doclist payload and the cursor state needed to extend it.
pub(crate) struct Entry {
    key: Box<[u8]>,
    buf: Vec<u8>,
    size_slot: SizeSlot,
    last_rowid: i64,
    last_column: i32,
    last_position: i32,
    /// True from the moment a poslist is opened (by a new entry, a new
    /// rowid, or a column change) until its first position is written.
    /// `last_position == 0` is ambiguous between "reset" and "a real
    /// position 0 was already written"; this flag disambiguates it so
    /// the monotonicity assertion below doesn't fire on a poslist's
    /// first element.
    fresh_poslist: bool,
    /// Next entry in this key's hash bucket chain, as an arena index.
    pub(crate) next: Option<u32>,
}

impl Entry {
    /// Creates a new entry: absolute rowid, a reserved size slot, and
    /// (for ordinary writes) the first position. `column < 0` signals a
    /// deletion marker: only the rowid/size-slot bookkeeping happens
    /// and the poslist is left empty. Fails with `OutOfMemory` rather
    /// than aborting the process if the initial buffer can't be
    /// allocated.
    pub(crate) fn try_new(key: &[u8], rowid: i64, column: i32, position: i32) -> Result<Entry> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(INITIAL_CAPACITY).map_err(|_| {
            warn!("out of memory allocating entry buffer for a new term");
            TermError::out_of_memory("entry buffer allocation failed")
        })?;
        put_varint(&mut buf, rowid as u64);
        let size_slot = SizeSlot(buf.len());
        buf.extend_from_slice(&[0u8; 4]);

        let mut entry = Entry {
            key: key.to_vec().into_boxed_slice(),
            buf,
            size_slot,
            last_rowid: rowid,
            last_column: 0,
            last_position: 0,
            fresh_poslist: true,
            next: None,
        };
        if column >= 0 {
            entry.write_position(column, position);
        }
        Ok(entry)
    }

    #[cfg(test)]
    fn new(key: &[u8], rowid: i64, column: i32, position: i32) -> Entry {
        Entry::try_new(key, rowid, column, position).expect("test allocation failure")
    }

    pub(crate) fn key(&self) -> &[u8] {
        &self.key
    }

    /// Number of payload bytes currently in use.
    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Appends one more `(rowid, column, position)` record to an
    /// already-existing entry.
    pub(crate) fn try_append(&mut self, rowid: i64, column: i32, position: i32) -> Result<()> {
        debug_assert!(
            rowid >= self.last_rowid,
            "rowids must be non-decreasing within a term (got {} after {})",
            rowid,
            self.last_rowid
        );
        self.ensure_capacity(MIN_FREE_TAIL)?;

        if rowid > self.last_rowid {
            self.finalize_current_poslist();
            let delta = (rowid - self.last_rowid) as u64;
            put_varint(&mut self.buf, delta);
            self.size_slot = SizeSlot(self.buf.len());
            self.buf.extend_from_slice(&[0u8; 4]);
            self.last_rowid = rowid;
            self.last_column = 0;
            self.last_position = 0;
            self.fresh_poslist = true;
        }

        if column >= 0 {
            self.write_position(column, position);
        }
        Ok(())
    }

    #[cfg(test)]
    fn append(&mut self, rowid: i64, column: i32, position: i32) {
        self.try_append(rowid, column, position)
            .expect("test allocation failure")
    }

    fn write_position(&mut self, column: i32, position: i32) {
        if column != self.last_column {
            debug_assert!(
                column >= self.last_column,
                "columns must be non-decreasing within a rowid (got {} after {})",
                column,
                self.last_column
            );
            self.buf.push(0x01);
            put_varint(&mut self.buf, column as u64);
            self.last_column = column;
            self.last_position = 0;
            self.fresh_poslist = true;
        }
        debug_assert!(
            self.fresh_poslist || position > self.last_position,
            "positions must strictly increase within (rowid, column) (got {} after {})",
            position,
            self.last_position
        );
        let delta = (position - self.last_position + 2) as u64;
        put_varint(&mut self.buf, delta);
        self.last_position = position;
        self.fresh_poslist = false;
    }

    /// Back-patches the length of the poslist currently open at
    /// `size_slot` with its true length. Idempotent: safe to call
    /// repeatedly (point queries and scans both call it on read).
    pub(crate) fn finalize_current_poslist(&mut self) {
        let len = (self.buf.len() - self.size_slot.offset() - 4) as u32;
        self.size_slot.patch(&mut self.buf, len);
    }

    /// The finalized doclist payload, ready to hand to a consumer.
    /// Callers must have called `finalize_current_poslist` first if
    /// the last poslist's size slot may still hold scratch bytes.
    pub(crate) fn payload(&self) -> &[u8] {
        &self.buf
    }

    fn ensure_capacity(&mut self, min_free: usize) -> Result<()> {
        if self.buf.capacity() - self.buf.len() >= min_free {
            return Ok(());
        }
        let additional = (self.buf.capacity() + min_free).max(min_free);
        self.buf.try_reserve_exact(additional).map_err(|_| {
            warn!(
                "out of memory growing entry buffer from {} to {} bytes",
                self.buf.capacity(),
                self.buf.capacity() + additional
            );
            TermError::out_of_memory("entry buffer growth failed")
        })
    }
}
