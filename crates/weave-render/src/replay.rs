#![forbid(unsafe_code)]

//! Checked application of a change batch to a plain key sequence.
//!
//! [`replay`] is the reference model for what a batch does: every command is
//! validated at the moment it is applied, so a reference to a key that is
//! not yet (or no longer) present is reported instead of silently
//! misplacing the subject.

use std::fmt;

use crate::keyed_diff::ViewChange;

/// Why a batch could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// A move or remove names a key that is not in the list.
    UnknownKey { index: usize, key: String },
    /// An insert or move references a key that is not in the list.
    UnknownReference { index: usize, ref_key: String },
    /// An insert names a key that is already in the list.
    DuplicateInsert { index: usize, key: String },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey { index, key } => {
                write!(f, "command {index}: key {key} is not in the list")
            }
            Self::UnknownReference { index, ref_key } => {
                write!(f, "command {index}: reference key {ref_key} is not in the list")
            }
            Self::DuplicateInsert { index, key } => {
                write!(f, "command {index}: key {key} is already in the list")
            }
        }
    }
}

impl std::error::Error for ReplayError {}

/// Apply `changes` to `from` and return the resulting order.
pub fn replay<K, C>(from: &[K], changes: &[ViewChange<K, C>]) -> Result<Vec<K>, ReplayError>
where
    K: Clone + PartialEq + fmt::Debug,
{
    let mut list = from.to_vec();
    for (index, change) in changes.iter().enumerate() {
        match change {
            ViewChange::Insert { key, ref_key, .. } => {
                if list.contains(key) {
                    return Err(ReplayError::DuplicateInsert {
                        index,
                        key: format!("{key:?}"),
                    });
                }
                let at = position_of_ref(&list, ref_key.as_ref(), index)?;
                list.insert(at, key.clone());
            }
            ViewChange::Move { key, ref_key } => {
                if ref_key.as_ref() == Some(key) {
                    continue;
                }
                let current = list
                    .iter()
                    .position(|k| k == key)
                    .ok_or_else(|| ReplayError::UnknownKey {
                        index,
                        key: format!("{key:?}"),
                    })?;
                let subject = list.remove(current);
                let at = position_of_ref(&list, ref_key.as_ref(), index)?;
                list.insert(at, subject);
            }
            ViewChange::Remove { key } => {
                let current = list
                    .iter()
                    .position(|k| k == key)
                    .ok_or_else(|| ReplayError::UnknownKey {
                        index,
                        key: format!("{key:?}"),
                    })?;
                list.remove(current);
            }
        }
    }
    Ok(list)
}

fn position_of_ref<K: PartialEq + fmt::Debug>(
    list: &[K],
    ref_key: Option<&K>,
    index: usize,
) -> Result<usize, ReplayError> {
    match ref_key {
        None => Ok(list.len()),
        Some(ref_key) => list
            .iter()
            .position(|k| k == ref_key)
            .ok_or_else(|| ReplayError::UnknownReference {
                index,
                ref_key: format!("{ref_key:?}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Change = ViewChange<&'static str, ()>;

    #[test]
    fn boundary_list_round_trip_order() {
        let changes = [
            Change::Insert {
                key: "a",
                ref_key: None,
                child: (),
            },
            Change::Insert {
                key: "b",
                ref_key: None,
                child: (),
            },
            Change::Insert {
                key: "c",
                ref_key: None,
                child: (),
            },
            Change::Move {
                key: "a",
                ref_key: None,
            },
        ];
        assert_eq!(replay(&[], &changes), Ok(vec!["b", "c", "a"]));

        let removed = replay(&["b", "c", "a"], &[Change::Remove { key: "b" }]);
        assert_eq!(removed, Ok(vec!["c", "a"]));
    }

    #[test]
    fn reference_to_missing_key_is_reported() {
        let changes = [Change::Insert {
            key: "x",
            ref_key: Some("ghost"),
            child: (),
        }];
        assert_eq!(
            replay(&["a"], &changes),
            Err(ReplayError::UnknownReference {
                index: 0,
                ref_key: "\"ghost\"".into(),
            })
        );
    }

    #[test]
    fn reference_removed_earlier_in_batch_is_reported() {
        let changes = [
            Change::Remove { key: "b" },
            Change::Move {
                key: "a",
                ref_key: Some("b"),
            },
        ];
        let err = replay(&["a", "b"], &changes).unwrap_err();
        assert!(matches!(err, ReplayError::UnknownReference { index: 1, .. }));
    }

    #[test]
    fn duplicate_insert_and_unknown_remove() {
        let dup = [Change::Insert {
            key: "a",
            ref_key: None,
            child: (),
        }];
        assert!(matches!(
            replay(&["a"], &dup),
            Err(ReplayError::DuplicateInsert { index: 0, .. })
        ));

        let missing = [Change::Remove { key: "z" }];
        let err = replay(&["a"], &missing).unwrap_err();
        assert_eq!(err.to_string(), "command 0: key \"z\" is not in the list");
    }

    #[test]
    fn move_before_itself_is_noop() {
        let changes = [Change::Move {
            key: "a",
            ref_key: Some("a"),
        }];
        assert_eq!(replay(&["a", "b"], &changes), Ok(vec!["a", "b"]));
    }
}
