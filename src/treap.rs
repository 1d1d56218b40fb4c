//! An arena of implicit treaps
//!
//! A treap keeps its nodes heap-ordered on random priorities, which gives an
//! expected height of `O(log n)` without any rotations. In an *implicit* treap
//! the nodes carry no keys: a node's position in the sequence is the number of
//! nodes before it in an in-order walk, recovered from subtree sizes.
//!
//! ## Lazy tags
//!
//! Each node can hold two deferred updates meant for its children:
//!
//! 1. `pending_add`: a delta already applied to the node's own value and
//!    summary, but not yet to its children
//! 2. `pending_reverse`: the children still have to be swapped, and the flag
//!    handed down to each of them
//!
//! Both are pushed down before any descent into a node's children. A node's
//! summary is exact for the subtree it roots once the `pending_add` of every
//! ancestor is added on top. The root's summary needs no correction.
//!
//! ## Storage
//!
//! All nodes of a [`Forest`] live in one generational arena and refer to each
//! other by [`NodeKey`]. A [`Tree`] is an owning handle to one sequence in the
//! forest. Split and merge consume their input handles, so every node is
//! reachable from exactly one live tree.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::summary::{Scalar, Summary};

slotmap::new_key_type! {
    /// A handle to one element, valid until that element is erased
    pub struct NodeKey;
}

type Link = Option<NodeKey>;

/// A node in the arena
#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    priority: u64,
    summary: Summary<T>,
    pending_add: T,
    pending_reverse: bool,
    left: Link,
    right: Link,
    parent: Link,
}

impl<T: Scalar> Node<T> {
    fn new(value: T, priority: u64) -> Self {
        Node {
            value,
            priority,
            summary: Summary::of(value),
            pending_add: T::ZERO,
            pending_reverse: false,
            left: None,
            right: None,
            parent: None,
        }
    }

    // Add `delta` to the whole subtree. Only this node is updated eagerly.
    fn apply_add(&mut self, delta: T) {
        self.value += delta;
        self.summary = self.summary.shifted(delta);
        self.pending_add += delta;
    }

    fn toggle_reverse(&mut self) {
        self.pending_reverse = !self.pending_reverse;
    }
}

/// An owning handle to one sequence stored in a [`Forest`]
///
/// A handle is only meaningful together with the forest that produced it.
#[derive(Debug, Default)]
pub struct Tree {
    root: Link,
}

impl Tree {
    pub const fn empty() -> Self {
        Tree { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The element at the root of the tree, if any
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }
}

/// An arena holding any number of implicit treaps
///
/// Priorities come from one PRNG per forest, so trees built in quick
/// succession in different forests never share a priority stream unless they
/// were given the same seed.
pub struct Forest<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    rng: StdRng,
}

impl<T: Scalar> Forest<T> {
    /// Create an empty forest with priorities drawn from OS entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy(), 0)
    }

    /// Create an empty forest with a deterministic priority stream
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), 0)
    }

    pub(crate) fn from_rng(rng: StdRng, capacity: usize) -> Self {
        Forest {
            nodes: SlotMap::with_capacity_and_key(capacity),
            rng,
        }
    }

    /// Number of live nodes across every tree in the forest
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements in `tree`
    pub fn len(&self, tree: &Tree) -> usize {
        self.len_of(tree.root)
    }

    /// Length, sum, minimum and maximum of the whole of `tree`
    pub fn summary(&self, tree: &Tree) -> Summary<T> {
        tree.root
            .map_or(Summary::EMPTY, |root| self.nodes[root].summary)
    }

    /// A one-element tree holding `value`, with a fresh random priority
    pub fn singleton(&mut self, value: T) -> Tree {
        self.leaf(value).1
    }

    pub(crate) fn leaf(&mut self, value: T) -> (NodeKey, Tree) {
        let key = self.alloc(value);
        (key, Tree { root: Some(key) })
    }

    /// Build a tree holding `values` in order, in linear time
    ///
    /// Nodes are hung off the right spine as they arrive: every spine node
    /// with a lower priority than the newcomer moves into its left subtree.
    /// On equal priorities the earlier node stays on top, as in [`Self::merge`].
    pub fn build<I: IntoIterator<Item = T>>(&mut self, values: I) -> Tree {
        let mut spine: Vec<NodeKey> = Vec::new();
        for value in values {
            let key = self.alloc(value);
            let priority = self.nodes[key].priority;
            let mut lowered = None;
            while let Some(&top) = spine.last() {
                if self.nodes[top].priority >= priority {
                    break;
                }
                lowered = spine.pop();
            }
            self.nodes[key].left = lowered;
            if let Some(&top) = spine.last() {
                self.nodes[top].right = Some(key);
            }
            spine.push(key);
        }
        let root = spine.first().copied();
        let count = self.recompute_subtree(root);
        trace!("built a tree of {count} nodes");
        Tree { root }
    }

    /// Split `tree` after its first `k` elements
    ///
    /// `k == 0` and `k >= len` are valid and hand back an empty tree on one
    /// side.
    pub fn split(&mut self, tree: Tree, k: usize) -> (Tree, Tree) {
        let len = self.len(&tree);
        let (left, right) = self.split_link(tree.root, k);
        debug_assert_eq!(self.len_of(left), k.min(len));
        debug_assert_eq!(self.len_of(right), len - k.min(len));
        (Tree { root: left }, Tree { root: right })
    }

    /// Concatenate `left` and `right`, keeping every element of `left` first
    pub fn merge(&mut self, left: Tree, right: Tree) -> Tree {
        let root = self.merge_link(left.root, right.root);
        Tree {
            root: self.detach(root),
        }
    }

    /// Add `delta` to every element of `tree`, in constant time
    pub fn add_all(&mut self, tree: &Tree, delta: T) {
        if let Some(root) = tree.root {
            self.nodes[root].apply_add(delta);
        }
    }

    /// Reverse the order of `tree`, in constant time
    ///
    /// Only the root is tagged; children are swapped level by level as later
    /// operations walk through them.
    pub fn reverse_all(&mut self, tree: &Tree) {
        if let Some(root) = tree.root {
            self.nodes[root].toggle_reverse();
        }
    }

    /// The handle and current value of the `k`-th element of `tree`,
    /// counting from 1
    pub fn kth(&mut self, tree: &Tree, mut k: usize) -> Option<(NodeKey, T)> {
        if k == 0 || k > self.len(tree) {
            return None;
        }
        let mut cur = tree.root?;
        loop {
            self.push_down(cur);
            let node = &self.nodes[cur];
            let left_len = self.len_of(node.left);
            if k <= left_len {
                cur = node.left?;
            } else if k == left_len + 1 {
                return Some((cur, node.value));
            } else {
                k -= left_len + 1;
                cur = node.right?;
            }
        }
    }

    /// The position of `key` in `tree`, counting from 1
    ///
    /// Returns `None` if `key` was erased or lives in a different tree.
    pub fn rank(&mut self, tree: &Tree, key: NodeKey) -> Option<usize> {
        let path = self.settle_path(tree, key)?;
        let mut rank = self.len_of(self.nodes[key].left) + 1;
        for step in path.windows(2) {
            let (parent, child) = (step[0], step[1]);
            let node = &self.nodes[parent];
            if node.right == Some(child) {
                rank += self.len_of(node.left) + 1;
            }
        }
        Some(rank)
    }

    /// The current value of the element behind `key`
    pub fn value(&mut self, tree: &Tree, key: NodeKey) -> Option<T> {
        self.settle_path(tree, key)?;
        Some(self.nodes[key].value)
    }

    /// Iterate over `tree` in sequence order without restructuring it
    pub fn iter<'a>(&'a self, tree: &Tree) -> Iter<'a, T> {
        let stack = tree
            .root
            .map(|key| Frame::Visit {
                key,
                add: T::ZERO,
                flip: false,
            })
            .into_iter()
            .collect();
        Iter {
            nodes: &self.nodes,
            stack,
            remaining: self.len(tree),
        }
    }

    pub fn to_vec(&self, tree: &Tree) -> Vec<T> {
        self.iter(tree).collect()
    }

    /// Remove every element of `tree` from the arena, returning them in order
    pub fn drain(&mut self, tree: Tree) -> Vec<T> {
        let values = self.to_vec(&tree);
        self.dispose(tree);
        values
    }

    /// Remove every element of `tree` from the arena
    pub fn dispose(&mut self, tree: Tree) {
        let mut stack: Vec<NodeKey> = tree.root.into_iter().collect();
        let mut freed = 0usize;
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.remove(key) {
                stack.extend(node.left);
                stack.extend(node.right);
                freed += 1;
            }
        }
        trace!("released {freed} nodes");
    }

    /// Number of nodes on the longest root-to-leaf path of `tree`
    pub fn height(&self, tree: &Tree) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeKey, usize)> =
            tree.root.map(|key| (key, 1)).into_iter().collect();
        while let Some((key, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[key];
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        height
    }

    /// Check every structural invariant of `tree`, panicking on the first
    /// violation
    ///
    /// Checks sizes and summaries (allowing for pending add tags), heap order
    /// on priorities, and parent links. Takes `O(n)` time.
    pub fn assert_invariants(&self, tree: &Tree) {
        let Some(root) = tree.root else { return };
        assert_eq!(self.nodes[root].parent, None, "root {root:?} has a parent");
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            let mut expected = Summary::EMPTY;
            if let Some(left) = node.left {
                expected = self.nodes[left].summary.shifted(node.pending_add);
            }
            expected = expected.join(Summary::of(node.value));
            if let Some(right) = node.right {
                expected = expected.join(self.nodes[right].summary.shifted(node.pending_add));
            }
            assert_eq!(node.summary, expected, "stale summary at {key:?}");
            for child in [node.left, node.right].into_iter().flatten() {
                let child_node = &self.nodes[child];
                assert_eq!(child_node.parent, Some(key), "broken parent link below {key:?}");
                assert!(
                    node.priority >= child_node.priority,
                    "heap order violated below {key:?}"
                );
                stack.push(child);
            }
        }
    }

    fn alloc(&mut self, value: T) -> NodeKey {
        let priority = self.rng.gen();
        self.nodes.insert(Node::new(value, priority))
    }

    fn len_of(&self, link: Link) -> usize {
        link.map_or(0, |key| self.nodes[key].summary.len)
    }

    fn detach(&mut self, link: Link) -> Link {
        if let Some(key) = link {
            self.nodes[key].parent = None;
        }
        link
    }

    // Point `child` at `parent` and hand back its summary
    fn adopt(&mut self, child: Link, parent: NodeKey) -> Summary<T> {
        match child {
            Some(child) => {
                let node = &mut self.nodes[child];
                node.parent = Some(parent);
                node.summary
            }
            None => Summary::EMPTY,
        }
    }

    // Rebuild size and aggregates of `key` from its children, which must
    // already be up to date
    fn recompute(&mut self, key: NodeKey) {
        let (left, right, value) = {
            let node = &self.nodes[key];
            (node.left, node.right, node.value)
        };
        let left = self.adopt(left, key);
        let right = self.adopt(right, key);
        self.nodes[key].summary = left.join(Summary::of(value)).join(right);
    }

    // Recompute a whole subtree bottom-up, returning its node count
    fn recompute_subtree(&mut self, root: Link) -> usize {
        let mut order = Vec::new();
        let mut stack: Vec<NodeKey> = root.into_iter().collect();
        while let Some(key) = stack.pop() {
            order.push(key);
            let node = &self.nodes[key];
            stack.extend(node.left);
            stack.extend(node.right);
        }
        let count = order.len();
        for key in order.into_iter().rev() {
            self.recompute(key);
        }
        count
    }

    // Hand the tags of `key` down to its children
    fn push_down(&mut self, key: NodeKey) {
        let node = &mut self.nodes[key];
        let reverse = std::mem::take(&mut node.pending_reverse);
        let add = std::mem::replace(&mut node.pending_add, T::ZERO);
        if !reverse && add == T::ZERO {
            return;
        }
        if reverse {
            std::mem::swap(&mut node.left, &mut node.right);
        }
        for child in [node.left, node.right].into_iter().flatten() {
            let child = &mut self.nodes[child];
            if reverse {
                child.toggle_reverse();
            }
            if add != T::ZERO {
                child.apply_add(add);
            }
        }
    }

    // Root-to-`key` path, with every tag on it pushed down so that sides and
    // values along the path are final. `None` unless `key` lives in `tree`.
    fn settle_path(&mut self, tree: &Tree, key: NodeKey) -> Option<Vec<NodeKey>> {
        self.nodes.get(key)?;
        let mut path = vec![key];
        let mut cur = key;
        while let Some(parent) = self.nodes[cur].parent {
            path.push(parent);
            cur = parent;
        }
        if tree.root != Some(cur) {
            return None;
        }
        path.reverse();
        for &step in &path {
            self.push_down(step);
        }
        Some(path)
    }

    // Both returned fragments come back with no parent
    fn split_link(&mut self, link: Link, k: usize) -> (Link, Link) {
        let Some(key) = link else {
            return (None, None);
        };
        if k == 0 {
            return (None, self.detach(link));
        }
        if k >= self.nodes[key].summary.len {
            return (self.detach(link), None);
        }
        self.push_down(key);
        let left_len = self.len_of(self.nodes[key].left);
        if left_len < k {
            let right = self.nodes[key].right.take();
            let (mid, rest) = self.split_link(right, k - left_len - 1);
            self.nodes[key].right = mid;
            self.recompute(key);
            (self.detach(link), rest)
        } else {
            let left = self.nodes[key].left.take();
            let (rest, mid) = self.split_link(left, k);
            self.nodes[key].left = mid;
            self.recompute(key);
            (rest, self.detach(link))
        }
    }

    fn merge_link(&mut self, left: Link, right: Link) -> Link {
        match (left, right) {
            (None, right) => right,
            (left, None) => left,
            (Some(l), Some(r)) => {
                if self.nodes[l].priority >= self.nodes[r].priority {
                    self.push_down(l);
                    let inner = self.nodes[l].right.take();
                    let merged = self.merge_link(inner, right);
                    self.nodes[l].right = merged;
                    self.recompute(l);
                    left
                } else {
                    self.push_down(r);
                    let inner = self.nodes[r].left.take();
                    let merged = self.merge_link(left, inner);
                    self.nodes[r].left = merged;
                    self.recompute(r);
                    right
                }
            }
        }
    }
}

impl<T: Scalar> Default for Forest<T> {
    fn default() -> Self {
        Self::new()
    }
}

enum Frame<T> {
    // `add` and `flip` are the tags the ancestors have not handed down yet
    Visit { key: NodeKey, add: T, flip: bool },
    Yield(T),
}

/// In-order iterator over one tree, resolving pending tags on the fly
pub struct Iter<'a, T> {
    nodes: &'a SlotMap<NodeKey, Node<T>>,
    stack: Vec<Frame<T>>,
    remaining: usize,
}

impl<'a, T: Scalar> Iterator for Iter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Yield(value) => {
                    self.remaining -= 1;
                    return Some(value);
                }
                Frame::Visit { key, add, flip } => {
                    let node = &self.nodes[key];
                    let flip = flip ^ node.pending_reverse;
                    let child_add = add + node.pending_add;
                    let (first, second) = if flip {
                        (node.right, node.left)
                    } else {
                        (node.left, node.right)
                    };
                    if let Some(key) = second {
                        self.stack.push(Frame::Visit {
                            key,
                            add: child_add,
                            flip,
                        });
                    }
                    self.stack.push(Frame::Yield(node.value + add));
                    if let Some(key) = first {
                        self.stack.push(Frame::Visit {
                            key,
                            add: child_add,
                            flip,
                        });
                    }
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Scalar> ExactSizeIterator for Iter<'a, T> {}
