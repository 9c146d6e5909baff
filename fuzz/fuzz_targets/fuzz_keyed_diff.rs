#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weave_render::{KeyedOrdering, ViewChange, diff, replay};

const MAX_KEYS: usize = 64;

#[derive(Debug, Arbitrary)]
struct Input {
    from: Vec<u8>,
    to: Vec<u8>,
}

fn unique(keys: &[u8]) -> Vec<u8> {
    let mut seen = [false; 256];
    keys.iter()
        .copied()
        .filter(|key| !std::mem::replace(&mut seen[usize::from(*key)], true))
        .take(MAX_KEYS)
        .collect()
}

fuzz_target!(|input: Input| {
    let from = unique(&input.from);
    let to = unique(&input.to);
    let ordering: KeyedOrdering<u8, fn() -> u8> =
        to.iter().map(|key| (*key, (|| 0) as fn() -> u8)).collect();

    let changes: Vec<ViewChange<u8, u8>> = diff(&from, ordering);
    let replayed = replay(&from, &changes).expect("diff produced an unreplayable batch");
    assert_eq!(replayed, to);

    let inserts = changes
        .iter()
        .filter(|change| matches!(change, ViewChange::Insert { .. }))
        .count();
    let removes = changes
        .iter()
        .filter(|change| matches!(change, ViewChange::Remove { .. }))
        .count();
    assert_eq!(inserts, to.iter().filter(|key| !from.contains(key)).count());
    assert_eq!(removes, from.iter().filter(|key| !to.contains(key)).count());
    assert!(changes.iter().filter(|change| change.is_move()).count() <= to.len());
});
