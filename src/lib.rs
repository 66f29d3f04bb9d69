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

#![allow(clippy::unreadable_literal)]

//! An in-memory pending-terms hash table for a full-text-search index
//! write transaction: terms written during one transaction accumulate
//! here, each as a growable delta-encoded doclist, until the caller
//! drains them in sorted order to merge into a segment on disk.

#[macro_use]
extern crate log;

mod accumulator;
mod entry;
mod merge;
mod table;
mod util;

pub use accumulator::{Accumulator, Status, TermError, TermSink};
pub use util::comparator::{ByteWiseComparator, Comparator};
pub use util::slice::Term;
pub use util::status::Result;
