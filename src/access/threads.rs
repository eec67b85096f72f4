//! Reply thread reconstruction.
//!
//! Replies arrive as one flat, chronologically ordered page. The tree is built over an arena
//! of indices: index every reply by id, link each reply under its parent's index, then assemble
//! nodes bottom-up. A reply whose parent is not in the page is dropped, never promoted to the
//! top level; pagination can therefore hide a subtree.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

/// Anything that can be placed in a thread by identifier and optional parent identifier.
pub trait Threaded {
    fn thread_id(&self) -> Uuid;
    fn thread_parent(&self) -> Option<Uuid>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<ThreadNode<T>>,
}

pub fn build_threads<T: Threaded>(items: Vec<T>) -> Vec<ThreadNode<T>> {
    let mut index = HashMap::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        index.entry(item.thread_id()).or_insert(position);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (position, item) in items.iter().enumerate() {
        match item.thread_parent() {
            None => roots.push(position),
            Some(parent) => match index.get(&parent) {
                Some(&parent_position) if parent_position != position => {
                    children[parent_position].push(position)
                }
                // unresolved parent: dropped
                _ => {}
            },
        }
    }

    // Pre-order walk from the roots. Every index sits in at most one child list, so the walk
    // cannot revisit a node and cycles without a root are never reached.
    let mut order = Vec::with_capacity(items.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(position) = stack.pop() {
        order.push(position);
        stack.extend(children[position].iter().rev().copied());
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut built: Vec<Option<ThreadNode<T>>> = (0..slots.len()).map(|_| None).collect();

    // Reverse pre-order visits every child before its parent.
    for &position in order.iter().rev() {
        let Some(item) = slots[position].take() else {
            continue;
        };
        let node_children = children[position]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[position] = Some(ThreadNode {
            item,
            children: node_children,
        });
    }

    roots.into_iter().filter_map(|root| built[root].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Post {
        id: Uuid,
        parent: Option<Uuid>,
        label: &'static str,
    }

    impl Threaded for Post {
        fn thread_id(&self) -> Uuid {
            self.id
        }

        fn thread_parent(&self) -> Option<Uuid> {
            self.parent
        }
    }

    fn post(label: &'static str, parent: Option<&Post>) -> Post {
        Post {
            id: Uuid::new_v4(),
            parent: parent.map(|p| p.id),
            label,
        }
    }

    fn labels(nodes: &[ThreadNode<Post>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.item.label).collect()
    }

    #[test]
    fn nests_chain_and_keeps_siblings_in_order() {
        let a = post("A", None);
        let b = post("B", Some(&a));
        let c = post("C", Some(&b));
        let d = post("D", None);

        let tree = build_threads(vec![a, b, c, d]);

        assert_eq!(labels(&tree), vec!["A", "D"]);
        assert_eq!(labels(&tree[0].children), vec!["B"]);
        assert_eq!(labels(&tree[0].children[0].children), vec!["C"]);
        assert!(tree[0].children[0].children[0].children.is_empty());
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn children_follow_input_order() {
        let root = post("root", None);
        let first = post("first", Some(&root));
        let second = post("second", Some(&root));
        let third = post("third", Some(&root));

        let tree = build_threads(vec![root, first, second, third]);
        assert_eq!(labels(&tree[0].children), vec!["first", "second", "third"]);
    }

    #[test]
    fn orphans_are_dropped_with_their_subtree() {
        let missing = post("missing", None);
        let a = post("A", None);
        let orphan = post("orphan", Some(&missing));
        let orphan_child = post("orphan-child", Some(&orphan));

        let tree = build_threads(vec![a, orphan, orphan_child]);
        assert_eq!(labels(&tree), vec!["A"]);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn self_parent_and_cycles_are_dropped() {
        let mut looped = post("self", None);
        looped.parent = Some(looped.id);

        let mut x = post("x", None);
        let y = post("y", Some(&x));
        x.parent = Some(y.id);

        let tree = build_threads(vec![looped, x, y]);
        assert!(tree.is_empty());
    }

    #[test]
    fn deep_threads_do_not_recurse() {
        let mut posts = vec![post("root", None)];
        for _ in 0..10_000 {
            let next = post("n", posts.last());
            posts.push(next);
        }

        let tree = build_threads(posts);
        let mut depth = 0;
        let mut node = &tree[0];
        while let Some(child) = node.children.first() {
            depth += 1;
            node = child;
        }
        assert_eq!(depth, 10_000);
        // dropping a 10k-deep tree recurses in Drop; flatten it first
        let mut pending = tree;
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }

    #[test]
    fn serializes_item_fields_flat() {
        let a = post("A", None);
        let tree = build_threads(vec![a]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["label"], "A");
        assert_eq!(json[0]["children"], serde_json::json!([]));
    }
}
