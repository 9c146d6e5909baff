#![forbid(unsafe_code)]

//! Keyed list diff.
//!
//! [`diff`] turns the previous key order and the next [`KeyedOrdering`] into
//! a batch of [`ViewChange`] commands. Applying the batch in order to a list
//! ordered like `from` yields a list ordered like `to`.
//!
//! # Algorithm
//!
//! `to` is walked from its last entry to its first, keeping a cursor on the
//! unconsumed prefix of `from`:
//!
//! - a key absent from `from` is inserted before its successor in `to`, and
//!   its factory is realised on the spot;
//! - for a key present in `from`, the tail of the unconsumed prefix is
//!   drained first: keys absent from `to` are removed, keys already moved in
//!   this pass are skipped. If the tail is then the key itself it is consumed
//!   in place, otherwise the key is moved before its successor in `to`;
//! - whatever remains of the prefix once `to` is exhausted is removed back
//!   to front, except keys that were moved.
//!
//! # Invariants
//!
//! 1. Every `ref_key` in the batch names a key that is present in the list
//!    at the moment that command is applied. References always point at the
//!    successor in `to`, which the backward pass has already placed.
//! 2. A key is moved only if some other key common to both orderings flips
//!    its relative order against it.
//! 3. Orderings whose common keys keep their relative order produce no
//!    `Move` at all.
//! 4. Each key receives at most one command.
//!
//! # Complexity
//!
//! One backward pass: O(|from| + |to|) with O(1) set lookups.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Duplicate key in `to` | Debug assertion; unspecified batch in release |
//! | Duplicate key in `from` | Unspecified batch |

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashSet;

// ---------------------------------------------------------------------------
// Child factories
// ---------------------------------------------------------------------------

/// Produces the child for an inserted key.
pub trait ChildFactory<C> {
    fn create(self) -> C;
}

impl<C, F: FnOnce() -> C> ChildFactory<C> for F {
    fn create(self) -> C {
        self()
    }
}

/// A cloneable, reusable factory.
///
/// Orderings that travel through multicast streams must be `Clone`; wrapping
/// a factory here makes that cheap.
pub struct SharedFactory<C> {
    make: Rc<dyn Fn() -> C>,
}

impl<C> Clone for SharedFactory<C> {
    fn clone(&self) -> Self {
        Self {
            make: Rc::clone(&self.make),
        }
    }
}

impl<C> fmt::Debug for SharedFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFactory")
    }
}

impl<C> SharedFactory<C> {
    pub fn new(make: impl Fn() -> C + 'static) -> Self {
        Self {
            make: Rc::new(make),
        }
    }
}

impl<C> ChildFactory<C> for SharedFactory<C> {
    fn create(self) -> C {
        (self.make)()
    }
}

// ---------------------------------------------------------------------------
// KeyedOrdering
// ---------------------------------------------------------------------------

/// Ordered `(key, factory)` pairs describing the next logical child list.
#[derive(Clone)]
pub struct KeyedOrdering<K, F> {
    entries: Vec<(K, F)>,
}

impl<K: fmt::Debug, F> fmt::Debug for KeyedOrdering<K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl<K, F> Default for KeyedOrdering<K, F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, F> KeyedOrdering<K, F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append an entry. Keys must stay unique.
    pub fn push(&mut self, key: K, factory: F) {
        self.entries.push((key, factory));
    }

    #[must_use]
    pub fn with(mut self, key: K, factory: F) -> Self {
        self.push(key, factory);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<(K, F)> {
        self.entries
    }
}

impl<K, F> FromIterator<(K, F)> for KeyedOrdering<K, F> {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, F> IntoIterator for KeyedOrdering<K, F> {
    type Item = (K, F);
    type IntoIter = std::vec::IntoIter<(K, F)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// ViewChange
// ---------------------------------------------------------------------------

/// One reconciliation command.
///
/// `ref_key` names the key the subject must end up immediately before;
/// `None` means the end of the list.
#[derive(Clone, PartialEq, Eq)]
pub enum ViewChange<K, C> {
    Insert {
        key: K,
        ref_key: Option<K>,
        child: C,
    },
    Move {
        key: K,
        ref_key: Option<K>,
    },
    Remove {
        key: K,
    },
}

impl<K: fmt::Debug, C> fmt::Debug for ViewChange<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { key, ref_key, .. } => f
                .debug_struct("Insert")
                .field("key", key)
                .field("ref_key", ref_key)
                .finish_non_exhaustive(),
            Self::Move { key, ref_key } => f
                .debug_struct("Move")
                .field("key", key)
                .field("ref_key", ref_key)
                .finish(),
            Self::Remove { key } => f.debug_struct("Remove").field("key", key).finish(),
        }
    }
}

impl<K, C> ViewChange<K, C> {
    /// The key this command applies to.
    pub fn key(&self) -> &K {
        match self {
            Self::Insert { key, .. } | Self::Move { key, .. } | Self::Remove { key } => key,
        }
    }

    /// The placement reference, for inserts and moves.
    pub fn ref_key(&self) -> Option<&K> {
        match self {
            Self::Insert { ref_key, .. } | Self::Move { ref_key, .. } => ref_key.as_ref(),
            Self::Remove { .. } => None,
        }
    }

    #[must_use]
    pub fn is_move(&self) -> bool {
        matches!(self, Self::Move { .. })
    }

    /// Replace the child payload of an insert.
    pub fn map_child<D>(self, map: impl FnOnce(C) -> D) -> ViewChange<K, D> {
        match self {
            Self::Insert {
                key,
                ref_key,
                child,
            } => ViewChange::Insert {
                key,
                ref_key,
                child: map(child),
            },
            Self::Move { key, ref_key } => ViewChange::Move { key, ref_key },
            Self::Remove { key } => ViewChange::Remove { key },
        }
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Compute the commands turning `from` into the order of `to`.
///
/// Factories of inserted keys are realised during the pass; factories of
/// keys already present in `from` are dropped unused.
pub fn diff<K, F, C>(from: &[K], to: KeyedOrdering<K, F>) -> Vec<ViewChange<K, C>>
where
    K: Clone + Eq + Hash,
    F: ChildFactory<C>,
{
    let entries = to.into_entries();
    let in_from: AHashSet<&K> = from.iter().collect();
    let in_to: AHashSet<K> = entries.iter().map(|(key, _)| key.clone()).collect();
    debug_assert_eq!(in_to.len(), entries.len(), "duplicate key in ordering");

    let mut moved: AHashSet<K> = AHashSet::new();
    let mut changes = Vec::new();
    let mut cursor = from.len();
    let mut successor: Option<K> = None;

    for (key, factory) in entries.into_iter().rev() {
        let ref_key = successor.replace(key.clone());

        if !in_from.contains(&key) {
            changes.push(ViewChange::Insert {
                key,
                ref_key,
                child: factory.create(),
            });
            continue;
        }

        while cursor > 0 {
            let tail = &from[cursor - 1];
            if *tail == key {
                break;
            }
            if !in_to.contains(tail) {
                changes.push(ViewChange::Remove { key: tail.clone() });
            } else if !moved.contains(tail) {
                break;
            }
            cursor -= 1;
        }

        if cursor > 0 && from[cursor - 1] == key {
            cursor -= 1;
        } else {
            changes.push(ViewChange::Move {
                key: key.clone(),
                ref_key,
            });
            moved.insert(key);
        }
    }

    // Every key of `to` still in the prefix was moved above.
    for key in from[..cursor].iter().rev() {
        if !in_to.contains(key) {
            changes.push(ViewChange::Remove { key: key.clone() });
        }
    }
    changes
}

// ---------------------------------------------------------------------------
// KeyedDiffer
// ---------------------------------------------------------------------------

/// Remembers the previous key order so consecutive orderings can be diffed.
#[derive(Debug, Clone, Default)]
pub struct KeyedDiffer<K> {
    previous: Vec<K>,
}

impl<K: Clone + Eq + Hash> KeyedDiffer<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: Vec::new(),
        }
    }

    /// Diff `ordering` against the last one seen and remember it.
    pub fn next<F, C>(&mut self, ordering: KeyedOrdering<K, F>) -> Vec<ViewChange<K, C>>
    where
        F: ChildFactory<C>,
    {
        let keys: Vec<K> = ordering.keys().cloned().collect();
        let changes = diff(&self.previous, ordering);
        self.previous = keys;
        changes
    }

    /// Keys of the last ordering seen.
    #[must_use]
    pub fn previous(&self) -> &[K] {
        &self.previous
    }

    /// Commands removing every remembered key, leaving the differ empty.
    pub fn clear<C>(&mut self) -> Vec<ViewChange<K, C>> {
        std::mem::take(&mut self.previous)
            .into_iter()
            .map(|key| ViewChange::Remove { key })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::replay;
    use proptest::prelude::*;

    type Change = ViewChange<char, String>;

    fn ordering(keys: &str) -> KeyedOrdering<char, impl FnOnce() -> String + Clone> {
        keys.chars()
            .map(|k| (k, move || format!("child-{k}")))
            .collect()
    }

    fn keys(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn run(from: &str, to: &str) -> Vec<Change> {
        diff(&keys(from), ordering(to))
    }

    #[test]
    fn end_to_end_scenario() {
        let changes = run("xyz", "yzw");
        assert_eq!(
            changes,
            vec![
                Change::Insert {
                    key: 'w',
                    ref_key: None,
                    child: "child-w".into(),
                },
                Change::Remove { key: 'x' },
            ]
        );
    }

    #[test]
    fn identical_orders_produce_nothing() {
        assert!(run("abcde", "abcde").is_empty());
        assert!(run("", "").is_empty());
    }

    #[test]
    fn from_empty_inserts_back_to_front() {
        let changes = run("", "abc");
        let summary: Vec<(char, Option<char>)> = changes
            .iter()
            .map(|c| (*c.key(), c.ref_key().copied()))
            .collect();
        assert_eq!(summary, vec![('c', None), ('b', Some('c')), ('a', Some('b'))]);
    }

    #[test]
    fn to_empty_removes_back_to_front() {
        assert_eq!(
            run("abc", ""),
            vec![
                Change::Remove { key: 'c' },
                Change::Remove { key: 'b' },
                Change::Remove { key: 'a' },
            ]
        );
    }

    #[test]
    fn leftover_prefix_skips_moved_keys() {
        let changes = run("axb", "ba");
        assert_eq!(
            changes,
            vec![
                Change::Move {
                    key: 'a',
                    ref_key: None,
                },
                Change::Remove { key: 'x' },
            ]
        );
        assert_eq!(replay(&keys("axb"), &changes), Ok(keys("ba")));
    }

    #[test]
    fn swap_moves_once_without_removing() {
        let changes = run("abc", "bac");
        assert_eq!(
            changes,
            vec![Change::Move {
                key: 'a',
                ref_key: Some('c'),
            }]
        );
    }

    #[test]
    fn move_to_end_then_insert_before_it() {
        let changes = run("ab", "bca");
        assert_eq!(
            changes,
            vec![
                Change::Move {
                    key: 'a',
                    ref_key: None,
                },
                Change::Insert {
                    key: 'c',
                    ref_key: Some('a'),
                    child: "child-c".into(),
                },
            ]
        );
        assert_eq!(replay(&keys("ab"), &changes), Ok(keys("bca")));
    }

    #[test]
    fn trailing_removals_are_drained_before_kept_key() {
        let changes = run("axyb", "ab");
        assert_eq!(
            changes,
            vec![Change::Remove { key: 'y' }, Change::Remove { key: 'x' }]
        );
    }

    #[test]
    fn reverse_moves_all_but_one() {
        let changes = run("abcd", "dcba");
        assert_eq!(changes.iter().filter(|c| c.is_move()).count(), 3);
        assert_eq!(replay(&keys("abcd"), &changes), Ok(keys("dcba")));
    }

    #[test]
    fn existing_factories_are_not_called() {
        let calls = std::cell::Cell::new(0);
        let to: KeyedOrdering<char, _> = "ab"
            .chars()
            .map(|k| {
                let calls = &calls;
                (k, move || {
                    calls.set(calls.get() + 1);
                    k
                })
            })
            .collect();
        let changes: Vec<ViewChange<char, char>> = diff(&keys("a"), to);
        assert_eq!(calls.get(), 1);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn shared_factory_is_reusable() {
        let factory = SharedFactory::new(|| 7u8);
        let to = KeyedOrdering::new()
            .with('a', factory.clone())
            .with('b', factory);
        let changes = diff(&[], to);
        assert!(changes
            .iter()
            .all(|c| matches!(c, ViewChange::Insert { child: 7, .. })));
    }

    #[test]
    fn differ_tracks_previous_order() {
        let mut differ = KeyedDiffer::new();
        let first: Vec<Change> = differ.next(ordering("ab"));
        assert_eq!(first.len(), 2);
        assert_eq!(differ.previous(), &['a', 'b']);

        let second: Vec<Change> = differ.next(ordering("ba"));
        assert_eq!(second.iter().filter(|c| c.is_move()).count(), 1);

        let cleared: Vec<Change> = differ.clear();
        assert_eq!(cleared.len(), 2);
        assert!(differ.previous().is_empty());
    }

    #[test]
    fn map_child_preserves_shape() {
        let change: ViewChange<char, u8> = ViewChange::Insert {
            key: 'k',
            ref_key: Some('r'),
            child: 2,
        };
        let mapped = change.map_child(|c| u32::from(c) * 10);
        assert_eq!(
            mapped,
            ViewChange::Insert {
                key: 'k',
                ref_key: Some('r'),
                child: 20,
            }
        );
        let debug = format!("{:?}", ViewChange::<char, ()>::Move { key: 'k', ref_key: None });
        assert!(debug.contains("Move"));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn unique_keys(max: usize) -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(0u8..24, 0..max).prop_map(|keys| {
            let mut seen = AHashSet::new();
            keys.into_iter().filter(|k| seen.insert(*k)).collect()
        })
    }

    fn unit_ordering(keys: &[u8]) -> KeyedOrdering<u8, impl FnOnce() + Clone> {
        keys.iter().map(|k| (*k, || ())).collect()
    }

    /// Keys common to both orders that appear in a flipped pair.
    fn inverted_keys(from: &[u8], to: &[u8]) -> AHashSet<u8> {
        let common: Vec<u8> = to.iter().copied().filter(|k| from.contains(k)).collect();
        let pos = |k: u8| from.iter().position(|x| *x == k);
        let mut inverted = AHashSet::new();
        for (i, a) in common.iter().enumerate() {
            for b in &common[i + 1..] {
                if pos(*a) > pos(*b) {
                    inverted.insert(*a);
                    inverted.insert(*b);
                }
            }
        }
        inverted
    }

    proptest! {
        #[test]
        fn replaying_diff_yields_target(from in unique_keys(20), to in unique_keys(20)) {
            let changes: Vec<ViewChange<u8, ()>> = diff(&from, unit_ordering(&to));
            prop_assert_eq!(replay(&from, &changes), Ok(to));
        }

        #[test]
        fn moves_only_touch_inverted_keys(from in unique_keys(20), to in unique_keys(20)) {
            let changes: Vec<ViewChange<u8, ()>> = diff(&from, unit_ordering(&to));
            let inverted = inverted_keys(&from, &to);
            let moves: Vec<u8> = changes.iter().filter(|c| c.is_move()).map(|c| *c.key()).collect();
            prop_assert!(moves.len() <= inverted.len());
            for key in moves {
                prop_assert!(inverted.contains(&key));
            }
        }

        #[test]
        fn each_key_gets_at_most_one_command(from in unique_keys(20), to in unique_keys(20)) {
            let changes: Vec<ViewChange<u8, ()>> = diff(&from, unit_ordering(&to));
            let mut seen = AHashSet::new();
            for change in &changes {
                prop_assert!(seen.insert(*change.key()));
            }
        }

        #[test]
        fn preserved_relative_order_means_no_moves(
            from in unique_keys(20),
            extra in unique_keys(8),
            keep in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let mut to: Vec<u8> = from
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(key, _)| *key)
                .collect();
            for key in extra.into_iter().map(|k| k + 100) {
                let at = usize::from(key) % (to.len() + 1);
                to.insert(at, key);
            }
            let changes: Vec<ViewChange<u8, ()>> = diff(&from, unit_ordering(&to));
            prop_assert!(changes.iter().all(|c| !c.is_move()));
        }
    }
}
