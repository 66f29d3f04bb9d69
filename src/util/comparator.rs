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

use std::cmp::Ordering;

/// Orders term keys. Terms are raw byte sequences, compared unsigned
/// byte-by-byte; a strict prefix sorts before the key it is a prefix of.
pub trait Comparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// The only comparator this crate ships: plain unsigned lexicographic
/// order over raw bytes. There is deliberately no Unicode-aware
/// collation or pluggable second implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteWiseComparator;

impl Comparator for ByteWiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        // `[u8]`'s derived `Ord` is already unsigned byte-by-byte
        // comparison with shorter-is-less on a shared prefix, which is
        // exactly the rule this component requires.
        a.cmp(b)
    }
}
