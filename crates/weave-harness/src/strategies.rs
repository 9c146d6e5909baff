#![forbid(unsafe_code)]

//! Proptest strategies for keyed orderings.

use proptest::prelude::*;
use proptest::sample::subsequence;

/// Size of the key universe the strategies draw from.
pub const KEY_SPACE: u8 = 24;

/// A list of distinct keys in random order, at most `max_len` long.
pub fn unique_keys(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    let universe: Vec<u8> = (0..KEY_SPACE).collect();
    let max_len = max_len.min(universe.len());
    subsequence(universe, 0..=max_len).prop_shuffle()
}

/// Two independent orderings over the same key universe.
pub fn ordering_pair(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (unique_keys(max_len), unique_keys(max_len))
}

/// A sequence of orderings, as a stream would push them.
pub fn ordering_sequence(max_len: usize, max_steps: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(unique_keys(max_len), 1..=max_steps.max(1))
}

/// `keys` with a random contiguous slice reversed, so some relative orders
/// flip and the rest survive.
pub fn partially_reversed(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    unique_keys(max_len).prop_flat_map(|keys| {
        let len = keys.len();
        (Just(keys), 0..=len, 0..=len).prop_map(|(keys, a, b)| {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            let mut next = keys.clone();
            next[start..end].reverse();
            (keys, next)
        })
    })
}
