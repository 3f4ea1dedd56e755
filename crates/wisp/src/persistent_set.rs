//! Immutable, comparator-ordered AVL tree of datums (spec.md §3.4, §4.7,
//! the C5 component).
//!
//! Hand-written rather than built on a general persistent-collection
//! crate (the `mmcc`/`mm0` example in this retrieval pack depends on
//! `im` for exactly this purpose) because spec.md §8 invariant 5 pins
//! down literal AVL structural invariants — height balance within 1,
//! BST ordering — that a test can check directly against our own node
//! shape. Subtrees are shared via `Rc` on every `insert`/`remove`, so
//! prior references stay valid and unchanged (spec.md §8 invariant 6).

use std::cmp::Ordering;
use std::rc::Rc;

use crate::datum::Datum;

type Link = Option<Rc<Node>>;

struct Node {
    value: Datum,
    left: Link,
    right: Link,
    height: u8,
}

fn height(link: &Link) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

fn make_node(value: Datum, left: Link, right: Link) -> Rc<Node> {
    let height = 1 + height(&left).max(height(&right));
    Rc::new(Node { value, left, right, height })
}

fn balance_factor(left: &Link, right: &Link) -> i16 {
    i16::from(height(left)) - i16::from(height(right))
}

/// Rotates `node` left: its right child becomes the new root.
fn rotate_left(node: &Node) -> Rc<Node> {
    let right = node.right.clone().expect("rotate_left requires a right child");
    let new_left = make_node(node.value.clone(), node.left.clone(), right.left.clone());
    make_node(right.value.clone(), Some(new_left), right.right.clone())
}

/// Rotates `node` right: its left child becomes the new root.
fn rotate_right(node: &Node) -> Rc<Node> {
    let left = node.left.clone().expect("rotate_right requires a left child");
    let new_right = make_node(node.value.clone(), left.right.clone(), node.right.clone());
    make_node(left.value.clone(), left.left.clone(), Some(new_right))
}

fn rebalance(value: Datum, left: Link, right: Link) -> Rc<Node> {
    let balance = balance_factor(&left, &right);
    if balance == 2 {
        let left_node = left.as_ref().expect("balance 2 implies a left child");
        let node = if balance_factor(&left_node.left, &left_node.right) < 0 {
            // Left-Right case: rotate the left child left first.
            let new_left = rotate_left(left_node);
            make_node(value, Some(new_left), right)
        } else {
            make_node(value, left, right)
        };
        return rotate_right(&node);
    }
    if balance == -2 {
        let right_node = right.as_ref().expect("balance -2 implies a right child");
        let node = if balance_factor(&right_node.left, &right_node.right) > 0 {
            let new_right = rotate_right(right_node);
            make_node(value, left, Some(new_right))
        } else {
            make_node(value, left, right)
        };
        return rotate_left(&node);
    }
    make_node(value, left, right)
}

fn insert(link: &Link, value: Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> Rc<Node> {
    let Some(node) = link else {
        return make_node(value, None, None);
    };
    match before(&value, &node.value) {
        Ordering::Less => {
            let left = Some(insert(&node.left, value, before));
            rebalance(node.value.clone(), left, node.right.clone())
        }
        Ordering::Greater => {
            let right = Some(insert(&node.right, value, before));
            rebalance(node.value.clone(), node.left.clone(), right)
        }
        // Equivalence classes are represented once (spec.md §3.4 invariant c):
        // inserting an equal value replaces the stored representative.
        Ordering::Equal => make_node(value, node.left.clone(), node.right.clone()),
    }
}

fn min_value(node: &Node) -> Datum {
    node.left.as_ref().map_or_else(|| node.value.clone(), |left| min_value(left))
}

fn remove(link: &Link, value: &Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> Link {
    let node = link.as_ref()?;
    match before(value, &node.value) {
        Ordering::Less => {
            let left = remove(&node.left, value, before);
            Some(rebalance(node.value.clone(), left, node.right.clone()))
        }
        Ordering::Greater => {
            let right = remove(&node.right, value, before);
            Some(rebalance(node.value.clone(), node.left.clone(), right))
        }
        Ordering::Equal => match (&node.left, &node.right) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => Some(Rc::clone(only)),
            (Some(_), Some(_)) => {
                let successor = min_value(node.right.as_ref().expect("right child exists"));
                let right = remove(&node.right, &successor, before);
                Some(rebalance(successor, node.left.clone(), right))
            }
        },
    }
}

fn contains(link: &Link, value: &Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> bool {
    let Some(node) = link else { return false };
    match before(value, &node.value) {
        Ordering::Less => contains(&node.left, value, before),
        Ordering::Greater => contains(&node.right, value, before),
        Ordering::Equal => true,
    }
}

fn to_vec(link: &Link, out: &mut Vec<Datum>) {
    let Some(node) = link else { return };
    to_vec(&node.left, out);
    out.push(node.value.clone());
    to_vec(&node.right, out);
}

fn node_height(link: &Link) -> u8 {
    height(link)
}

fn check_invariants(link: &Link) -> bool {
    let Some(node) = link else { return true };
    let balance = balance_factor(&node.left, &node.right);
    balance.abs() <= 1 && check_invariants(&node.left) && check_invariants(&node.right)
}

/// An immutable, allocator-backed (via `Rc`), comparator-ordered AVL tree.
#[derive(Clone, Default)]
pub struct PersistentSet {
    root: Link,
}

impl PersistentSet {
    #[must_use]
    pub fn empty() -> Self {
        Self { root: None }
    }

    #[must_use]
    pub fn insert(&self, value: Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> Self {
        Self { root: Some(insert(&self.root, value, before)) }
    }

    #[must_use]
    pub fn remove(&self, value: &Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> Self {
        Self { root: remove(&self.root, value, before) }
    }

    #[must_use]
    pub fn contains(&self, value: &Datum, before: &dyn Fn(&Datum, &Datum) -> Ordering) -> bool {
        contains(&self.root, value, before)
    }

    /// In-order traversal, ascending by the comparator used to build this
    /// set (spec.md §4.7 "to-list").
    #[must_use]
    pub fn to_vec(&self) -> Vec<Datum> {
        let mut out = Vec::new();
        to_vec(&self.root, &mut out);
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.to_vec().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[must_use]
    pub fn height(&self) -> u8 {
        node_height(&self.root)
    }

    /// Checks spec.md §3.4 invariant (b): `|height(right) - height(left)| <= 1`
    /// at every node. Exposed for tests; a correctly implemented tree
    /// always satisfies this after any sequence of inserts/removes.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        check_invariants(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &Datum, b: &Datum) -> Ordering {
        let (Datum::Integer(a), Datum::Integer(b)) = (a, b) else {
            panic!("test comparator only handles integers")
        };
        a.cmp(b)
    }

    #[test]
    fn insert_remove_contains_roundtrip() {
        let set = PersistentSet::empty();
        let set = [3, 1, 4, 1, 5, 9, 2, 6].into_iter().fold(set, |s, n| s.insert(Datum::Integer(n), &cmp));
        assert!(set.contains(&Datum::Integer(5), &cmp));
        let removed = set.remove(&Datum::Integer(5), &cmp);
        assert!(!removed.contains(&Datum::Integer(5), &cmp));
        assert!(set.contains(&Datum::Integer(5), &cmp), "original set must be unaffected");
    }

    #[test]
    fn duplicates_collapse_to_one_equivalence_class() {
        let set = PersistentSet::empty().insert(Datum::Integer(1), &cmp).insert(Datum::Integer(1), &cmp);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn stays_balanced_under_sorted_insertion() {
        let mut set = PersistentSet::empty();
        for n in 0..200 {
            set = set.insert(Datum::Integer(n), &cmp);
            assert!(set.is_balanced(), "tree must stay height-balanced after inserting {n}");
        }
        assert!((set.height() as u32) < 2 * (200f64.log2().ceil() as u32 + 1));
    }

    #[test]
    fn to_vec_is_ascending() {
        let set = PersistentSet::empty();
        let set = [3, 1, 4, 1, 5, 9, 2, 6].into_iter().fold(set, |s, n| s.insert(Datum::Integer(n), &cmp));
        let values: Vec<i32> = set.to_vec().into_iter().map(|d| match d {
            Datum::Integer(n) => n,
            _ => unreachable!(),
        }).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 9]);
    }
}
