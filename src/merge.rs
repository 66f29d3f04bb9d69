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

//! Binary-lifting merge over 32 slots: a streaming bottom-up merge
//! sort for `ordered_scan`, preferred over collect-then-sort because
//! the hash table is walked exactly once and the final entry count is
//! not known ahead of time.
//!
//! Operates over plain `Vec<u32>` arena indices rather than intrusive
//! linked lists, which is simpler to reason about and just as cheap to
//! move between slots.

use std::cmp::Ordering;

const LEVELS: usize = 32;

/// Merges `items` (one singleton list per item, in arbitrary order)
/// into one list sorted ascending by `cmp`, using at most `LEVELS`
/// auxiliary slots that double in size as items accumulate.
pub(crate) fn binary_lift_merge<I, F>(items: I, mut cmp: F) -> Vec<u32>
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u32, u32) -> Ordering,
{
    let mut slots: Vec<Option<Vec<u32>>> = vec![None; LEVELS];

    for item in items {
        let mut carry = vec![item];
        for slot in slots.iter_mut() {
            match slot.take() {
                None => {
                    *slot = Some(carry);
                    carry = Vec::new();
                    break;
                }
                Some(existing) => {
                    carry = merge_two(existing, carry, &mut cmp);
                }
            }
        }
        if !carry.is_empty() {
            // Only reachable with more entries than 2^LEVELS, which
            // this component will never see in one transaction; fold
            // the overflow into the top slot rather than losing it.
            let top = slots.last_mut().unwrap();
            let merged = match top.take() {
                Some(existing) => merge_two(existing, carry, &mut cmp),
                None => carry,
            };
            *top = Some(merged);
        }
    }

    let mut result: Option<Vec<u32>> = None;
    for slot in slots.into_iter().rev() {
        if let Some(list) = slot {
            result = Some(match result {
                None => list,
                Some(acc) => merge_two(list, acc, &mut cmp),
            });
        }
    }
    result.unwrap_or_default()
}

fn merge_two<F>(a: Vec<u32>, b: Vec<u32>, cmp: &mut F) -> Vec<u32>
where
    F: FnMut(u32, u32) -> Ordering,
{
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut ai = a.into_iter().peekable();
    let mut bi = b.into_iter().peekable();
    loop {
        match (ai.peek(), bi.peek()) {
            (Some(&x), Some(&y)) => {
                if cmp(x, y) != Ordering::Greater {
                    out.push(ai.next().unwrap());
                } else {
                    out.push(bi.next().unwrap());
                }
            }
            (Some(_), None) => {
                out.extend(ai);
                break;
            }
            (None, Some(_)) => {
                out.extend(bi);
                break;
            }
            (None, None) => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_into_sorted_order() {
        let keys = [5u32, 1, 4, 2, 3];
        let sorted = binary_lift_merge(keys.iter().copied(), |a, b| a.cmp(&b));
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_input() {
        let sorted = binary_lift_merge(std::iter::empty(), |a: u32, b: u32| a.cmp(&b));
        assert!(sorted.is_empty());
    }

    #[test]
    fn test_large_input_is_sorted() {
        let items: Vec<u32> = (0..5000).rev().collect();
        let sorted = binary_lift_merge(items, |a, b| a.cmp(&b));
        let expected: Vec<u32> = (0..5000).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_stable_enough_for_unique_keys() {
        // keys are unique so stability is not required, just correctness.
        let items = vec![10u32, 20, 30, 40];
        let sorted = binary_lift_merge(items, |a, b| b.cmp(&a));
        assert_eq!(sorted, vec![40, 30, 20, 10]);
    }
}
