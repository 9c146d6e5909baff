#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weave_core::View;
use weave_core::testing::MemNode;
use weave_view::BoundaryList;

const KEYS: u8 = 8;
const MAX_OPS: usize = 128;

#[derive(Debug, Arbitrary)]
enum Op {
    Insert { key: u8, before: Option<u8> },
    Move { key: u8, before: Option<u8> },
    Remove { key: u8 },
    Grow { key: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let root = MemNode::element("root");
    let mut list: BoundaryList<u8, MemNode> = BoundaryList::new(Rc::new(root.clone()));

    for op in ops.into_iter().take(MAX_OPS) {
        match op {
            Op::Insert { key, before } => {
                let key = key % KEYS;
                let before = before.map(|b| b % KEYS);
                if list.contains_key(&key) {
                    continue;
                }
                if let Ok(view) = list.insert_before(key, before.as_ref()) {
                    view.write(MemNode::text(format!("{key}")))
                        .expect("write into a fresh range");
                }
            }
            Op::Move { key, before } => {
                let key = key % KEYS;
                let before = before.map(|b| b % KEYS);
                if before == Some(key) {
                    continue;
                }
                if let (Ok(id), Ok(before)) =
                    (list.resolve(&key), list.resolve_before(before.as_ref()))
                {
                    list.arena().place(id, before).expect("place a member range");
                }
            }
            Op::Remove { key } => {
                if let Ok(nodes) = list.remove_child(&(key % KEYS)) {
                    for node in nodes {
                        root.remove_child(&node).expect("range nodes are root children");
                    }
                }
            }
            Op::Grow { key } => {
                let key = key % KEYS;
                if let Some(view) = list.get_view(&key) {
                    view.insert_before(MemNode::text(format!("{key}")), None)
                        .expect("append inside a range");
                }
            }
        }

        let mut expected = Vec::new();
        for key in list.keys_in_order() {
            let nodes = list
                .view(&key)
                .expect("ordered key is a member")
                .nodes()
                .expect("member record is live");
            for node in &nodes {
                assert_eq!(node.label(), key.to_string());
            }
            expected.extend(nodes);
        }
        assert_eq!(root.children(), expected);
    }
});
