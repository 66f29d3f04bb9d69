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

use std::fmt;

/// A borrowed term key or doclist view. Thin wrapper over `&[u8]` kept
/// at the public surface instead of bare slices so call sites read as
/// "this is a term/doclist", not "this is some bytes".
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Term<'a>(&'a [u8]);

impl<'a> Term<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Term(bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: Term<'_>) -> bool {
        self.0.starts_with(prefix.0)
    }
}

impl<'a> From<&'a [u8]> for Term<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Term(bytes)
    }
}

impl<'a> fmt::Debug for Term<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term({})", hex(self.0))
    }
}

/// Renders bytes as a hex string, for debug output and log lines only
/// (never used on the hot write path).
pub fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with() {
        let t = Term::new(b"antelope");
        assert!(t.starts_with(Term::new(b"ant")));
        assert!(!t.starts_with(Term::new(b"bee")));
        assert!(t.starts_with(Term::new(b"")));
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xff, 0x1a]), "00ff1a");
    }
}
