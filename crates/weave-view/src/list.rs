#![forbid(unsafe_code)]

//! Keyed boundary list.
//!
//! [`BoundaryList`] maps each live key to one boundary record of its arena
//! and keeps the record chain in logical order. Relinking is O(1); moving
//! the nodes of a range is left to the caller (see [`BoundaryArena::place`]).
//!
//! Two styles of use are supported:
//!
//! - immediate: [`insert_before`](BoundaryList::insert_before) and
//!   [`remove_child`](BoundaryList::remove_child) update the chain at once;
//! - deferred: [`reserve`](BoundaryList::reserve) and
//!   [`retire`](BoundaryList::retire) only touch the key index, leaving chain
//!   changes to scheduled tasks that address records by [`ViewId`].
//!
//! # Failure Modes
//!
//! | Condition | Error |
//! |-----------|-------|
//! | `ref_key` not in the list | [`ListError::ReferenceNotFound`] |
//! | `key` not in the list | [`ListError::NotFound`] |
//! | `reserve` of a live key | [`ListError::DuplicateKey`] |
//! | Record missing from the arena | [`ListError::View`] |

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use slotmap::SecondaryMap;
use weave_core::{HostNode, View, ViewError, range_nodes};

use crate::boundary::{BoundaryArena, BoundaryView, ViewId};

/// Integrity faults reported by [`BoundaryList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The reference key is not a member of the list.
    ReferenceNotFound { key: String },
    /// The key is not a member of the list.
    NotFound { key: String },
    /// The key is already a member of the list.
    DuplicateKey { key: String },
    /// The underlying boundary record could not be used.
    View(ViewError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceNotFound { key } => write!(f, "reference key {key} not found"),
            Self::NotFound { key } => write!(f, "key {key} not found"),
            Self::DuplicateKey { key } => write!(f, "key {key} already present"),
            Self::View(err) => write!(f, "boundary error: {err}"),
        }
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::View(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ViewError> for ListError {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}

fn key_label<K: fmt::Debug>(key: &K) -> String {
    format!("{key:?}")
}

/// Ordered, keyed boundary views sharing one parent.
pub struct BoundaryList<K, N: HostNode> {
    arena: BoundaryArena<N>,
    keys: AHashMap<K, ViewId>,
    owners: SecondaryMap<ViewId, K>,
}

impl<K: fmt::Debug, N: HostNode> fmt::Debug for BoundaryList<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryList")
            .field("len", &self.keys.len())
            .field("arena", &self.arena)
            .finish()
    }
}

impl<K, N> BoundaryList<K, N>
where
    K: Clone + Eq + Hash + fmt::Debug,
    N: HostNode,
{
    pub fn new(parent: Rc<dyn View<N>>) -> Self {
        Self {
            arena: BoundaryArena::new(parent),
            keys: AHashMap::new(),
            owners: SecondaryMap::new(),
        }
    }

    #[must_use]
    pub fn arena(&self) -> &BoundaryArena<N> {
        &self.arena
    }

    /// Link `key` before `ref_key`, or at the end when `ref_key` is `None`.
    ///
    /// A new key gets a fresh, empty boundary. An existing key keeps its
    /// boundary (and the nodes it tracks) and is relinked.
    pub fn insert_before(
        &mut self,
        key: K,
        ref_key: Option<&K>,
    ) -> Result<BoundaryView<N>, ListError> {
        let before = ref_key.map(|r| self.resolve_ref(r)).transpose()?;
        let id = match self.keys.get(&key) {
            Some(id) => *id,
            None => self.allocate(key),
        };
        self.arena.link_before(id, before)?;
        Ok(self.arena.view(id))
    }

    /// Drop `key` from the list and its chain.
    ///
    /// The nodes it tracked stay in the host tree and are returned so the
    /// caller can dispose of them.
    pub fn remove_child(&mut self, key: &K) -> Result<Vec<N>, ListError> {
        let id = self.retire(key)?;
        let (head, tail) = self.arena.bounds(id)?;
        self.arena.discard(id);
        Ok(range_nodes(head, tail.as_ref()))
    }

    /// The boundary of `key`, if present.
    #[must_use]
    pub fn get_view(&self, key: &K) -> Option<BoundaryView<N>> {
        self.keys.get(key).map(|id| self.arena.view(*id))
    }

    /// The boundary of `key`, or [`ListError::NotFound`].
    pub fn view(&self, key: &K) -> Result<BoundaryView<N>, ListError> {
        self.resolve(key).map(|id| self.arena.view(id))
    }

    /// Record id of a member key.
    pub fn resolve(&self, key: &K) -> Result<ViewId, ListError> {
        self.keys.get(key).copied().ok_or_else(|| ListError::NotFound {
            key: key_label(key),
        })
    }

    fn resolve_ref(&self, key: &K) -> Result<ViewId, ListError> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| ListError::ReferenceNotFound {
                key: key_label(key),
            })
    }

    /// Resolve an optional reference key.
    pub fn resolve_before(&self, ref_key: Option<&K>) -> Result<Option<ViewId>, ListError> {
        ref_key.map(|r| self.resolve_ref(r)).transpose()
    }

    /// Register `key` with a fresh, unlinked record.
    pub fn reserve(&mut self, key: K) -> Result<ViewId, ListError> {
        if self.keys.contains_key(&key) {
            return Err(ListError::DuplicateKey {
                key: key_label(&key),
            });
        }
        Ok(self.allocate(key))
    }

    /// Remove `key` from the index only. The record stays in the arena,
    /// linked and holding its nodes, until the caller discards it.
    pub fn retire(&mut self, key: &K) -> Result<ViewId, ListError> {
        let id = self.keys.remove(key).ok_or_else(|| ListError::NotFound {
            key: key_label(key),
        })?;
        self.owners.remove(id);
        Ok(id)
    }

    fn allocate(&mut self, key: K) -> ViewId {
        let id = self.arena.create();
        self.owners.insert(id, key.clone());
        self.keys.insert(key, id);
        id
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    #[must_use]
    pub fn key_of(&self, id: ViewId) -> Option<&K> {
        self.owners.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Member keys in chain order. Unlinked and retired records are skipped.
    #[must_use]
    pub fn keys_in_order(&self) -> Vec<K> {
        self.arena
            .order()
            .into_iter()
            .filter_map(|id| self.owners.get(id).cloned())
            .collect()
    }

    /// Every member key, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.keys()
    }
}
