//! A mutable integer sequence backed by an implicit treap.
//!
//! [`ImplicitTreap`] supports, in `O(log n)` expected time per call:
//!
//! - insertion and removal at any position
//! - adding a constant to every element of a range
//! - reversing a range
//! - reading the sum, minimum or maximum of a range
//! - finding the k-th element, and the position of a previously inserted element
//!
//! Range updates are recorded as lazy tags on a subtree root and handed down
//! only when a later operation walks through that subtree. Every operation
//! isolates its range by splitting the tree, works on the middle piece, and
//! merges the pieces back together, so the structure is whole again whenever a
//! call returns. The split/merge engine itself is available as [`Forest`] for
//! callers that want several sequences sharing one arena.

mod error;
pub mod script;
mod summary;
mod treap;

use std::fmt;
use std::ops::{Bound, RangeBounds};

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use crate::error::TreapError;
pub use crate::summary::{AggregateKind, Scalar, Summary};
pub use crate::treap::{Forest, Iter, NodeKey, Tree};

/// Builder for constructing [`ImplicitTreap`]s and [`Forest`]s
///
/// # Examples
///
/// ```
/// use lazytreap::ImplicitTreap;
///
/// // Priorities from OS entropy, empty arena
/// let treap: ImplicitTreap<i64> = ImplicitTreap::<i64>::builder().build();
///
/// // Reproducible shape, arena sized up front, initial contents
/// let treap: ImplicitTreap<i32> = ImplicitTreap::<i32>::builder()
///     .seed(7)
///     .capacity(1024)
///     .build_from(1..=5);
/// assert_eq!(treap.to_vec(), vec![1, 2, 3, 4, 5]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreapBuilder {
    seed: Option<u64>,
    capacity: Option<usize>,
}

impl TreapBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the priority generator
    ///
    /// Priorities decide the shape of the tree, never its contents, so a
    /// fixed seed only makes shapes (and therefore timings) reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reserve room for this many elements up front
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Build an empty arena of implicit treaps
    pub fn build_forest<T: Scalar>(self) -> Forest<T> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Forest::from_rng(rng, self.capacity.unwrap_or(0))
    }

    /// Build an empty sequence
    pub fn build<T: Scalar>(self) -> ImplicitTreap<T> {
        ImplicitTreap {
            forest: self.build_forest(),
            tree: Tree::empty(),
        }
    }

    /// Build a sequence holding `values` in order, in linear time
    pub fn build_from<T, I>(self, values: I) -> ImplicitTreap<T>
    where
        T: Scalar,
        I: IntoIterator<Item = T>,
    {
        let mut forest = self.build_forest();
        let tree = forest.build(values);
        ImplicitTreap { forest, tree }
    }
}

/// A sequence of integers supporting positional edits and lazy range updates
///
/// Positions are 0-based. Ranges accept any [`RangeBounds`], so `1..=3`
/// covers positions 1, 2 and 3. Ranks passed to [`Self::kth_element`] are
/// 1-based.
///
/// Every method validates its indices before touching the tree: a call that
/// returns an error leaves the sequence unchanged.
///
/// # Examples
///
/// ```
/// use lazytreap::{AggregateKind, ImplicitTreap};
///
/// let mut treap: ImplicitTreap = (1..=5).collect();
/// treap.range_reverse(1..=3).unwrap();
/// assert_eq!(treap.to_vec(), vec![1, 4, 3, 2, 5]);
/// treap.range_add(.., 10).unwrap();
/// assert_eq!(treap.range_query(.., AggregateKind::Sum).unwrap(), 65);
/// assert_eq!(treap.kth_element(3).unwrap(), 13);
/// ```
pub struct ImplicitTreap<T: Scalar = i64> {
    forest: Forest<T>,
    tree: Tree,
}

impl<T: Scalar> ImplicitTreap<T> {
    /// Create a new builder for constructing sequences
    pub fn builder() -> TreapBuilder {
        TreapBuilder::new()
    }

    /// Create an empty sequence with priorities drawn from OS entropy
    pub fn new() -> Self {
        TreapBuilder::new().build()
    }

    /// Create an empty sequence with a deterministic priority stream
    pub fn with_seed(seed: u64) -> Self {
        TreapBuilder::new().seed(seed).build()
    }

    pub fn len(&self) -> usize {
        self.forest.len(&self.tree)
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Remove every element. All outstanding node handles become stale.
    pub fn clear(&mut self) {
        let tree = std::mem::take(&mut self.tree);
        self.forest.dispose(tree);
    }

    /// Length, sum, minimum and maximum of the whole sequence
    pub fn summary(&self) -> Summary<T> {
        self.forest.summary(&self.tree)
    }

    /// Insert `value` so that it ends up at position `pos`
    ///
    /// Returns a handle to the new element, usable with [`Self::rank_of`] and
    /// [`Self::value_of`] until the element is erased.
    pub fn insert_at(&mut self, pos: usize, value: T) -> Result<NodeKey, TreapError> {
        let len = self.len();
        if pos > len {
            return Err(rejected(TreapError::IndexOutOfBounds { index: pos, len }));
        }
        let tree = std::mem::take(&mut self.tree);
        let (before, after) = self.forest.split(tree, pos);
        let (key, node) = self.forest.leaf(value);
        let head = self.forest.merge(before, node);
        self.tree = self.forest.merge(head, after);
        Ok(key)
    }

    /// Append `value` at the end of the sequence
    pub fn push_back(&mut self, value: T) -> NodeKey {
        let (key, node) = self.forest.leaf(value);
        let tree = std::mem::take(&mut self.tree);
        self.tree = self.forest.merge(tree, node);
        key
    }

    /// Remove the element at position `pos` and return its value
    pub fn erase_at(&mut self, pos: usize) -> Result<T, TreapError> {
        let len = self.len();
        if pos >= len {
            return Err(rejected(TreapError::IndexOutOfBounds { index: pos, len }));
        }
        let tree = std::mem::take(&mut self.tree);
        let (before, rest) = self.forest.split(tree, pos);
        let (mid, after) = self.forest.split(rest, 1);
        self.tree = self.forest.merge(before, after);
        self.forest
            .drain(mid)
            .pop()
            .ok_or(TreapError::IndexOutOfBounds { index: pos, len })
    }

    /// Add `delta` to every element in `range`
    pub fn range_add<R>(&mut self, range: R, delta: T) -> Result<(), TreapError>
    where
        R: RangeBounds<usize>,
    {
        let (start, end) = self.check_range(range)?;
        self.with_range(start, end, |forest, target| forest.add_all(target, delta));
        Ok(())
    }

    /// Reverse the order of the elements in `range`
    pub fn range_reverse<R>(&mut self, range: R) -> Result<(), TreapError>
    where
        R: RangeBounds<usize>,
    {
        let (start, end) = self.check_range(range)?;
        self.with_range(start, end, |forest, target| forest.reverse_all(target));
        Ok(())
    }

    /// The sum, minimum or maximum of the elements in `range`
    pub fn range_query<R: RangeBounds<usize>>(
        &mut self,
        range: R,
        kind: AggregateKind,
    ) -> Result<T, TreapError> {
        Ok(self.range_summary(range)?.get(kind))
    }

    /// Length, sum, minimum and maximum of the elements in `range`
    pub fn range_summary<R>(&mut self, range: R) -> Result<Summary<T>, TreapError>
    where
        R: RangeBounds<usize>,
    {
        let (start, end) = self.check_range(range)?;
        Ok(self.with_range(start, end, |forest, target| forest.summary(target)))
    }

    /// The value of the `k`-th element, counting from 1
    pub fn kth_element(&mut self, k: usize) -> Result<T, TreapError> {
        self.kth(k).map(|(_, value)| value)
    }

    /// A handle to the `k`-th element, counting from 1
    pub fn kth_node(&mut self, k: usize) -> Result<NodeKey, TreapError> {
        self.kth(k).map(|(key, _)| key)
    }

    /// The value at position `index`, counting from 0
    pub fn get(&mut self, index: usize) -> Option<T> {
        self.forest
            .kth(&self.tree, index.checked_add(1)?)
            .map(|(_, value)| value)
    }

    /// The current rank of the element behind `node`, counting from 1
    ///
    /// This is the inverse of [`Self::kth_node`]: `kth_node(rank_of(node))`
    /// is `node` again.
    pub fn rank_of(&mut self, node: NodeKey) -> Result<usize, TreapError> {
        self.forest
            .rank(&self.tree, node)
            .ok_or_else(|| rejected(TreapError::UnknownNode))
    }

    /// The current value of the element behind `node`
    pub fn value_of(&mut self, node: NodeKey) -> Result<T, TreapError> {
        self.forest
            .value(&self.tree, node)
            .ok_or_else(|| rejected(TreapError::UnknownNode))
    }

    /// Iterate over the sequence in order
    pub fn iter(&self) -> Iter<'_, T> {
        self.forest.iter(&self.tree)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.forest.to_vec(&self.tree)
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn height(&self) -> usize {
        self.forest.height(&self.tree)
    }

    /// Check that sizes, aggregates, priorities and parent links are
    /// consistent, panicking otherwise. Takes `O(n)` time.
    pub fn assert_invariants(&self) {
        self.forest.assert_invariants(&self.tree);
    }

    fn kth(&mut self, k: usize) -> Result<(NodeKey, T), TreapError> {
        let len = self.len();
        self.forest
            .kth(&self.tree, k)
            .ok_or_else(|| rejected(TreapError::RankOutOfBounds { rank: k, len }))
    }

    // Turn `range` into a non-empty half-open `start..end` inside the sequence
    fn check_range<R>(&self, range: R) -> Result<(usize, usize), TreapError>
    where
        R: RangeBounds<usize>,
    {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        if start >= end {
            return Err(rejected(TreapError::InvalidRange { start, end }));
        }
        if end > len {
            return Err(rejected(TreapError::RangeOutOfBounds { start, end, len }));
        }
        Ok((start, end))
    }

    // Cut `start..end` out as its own tree, hand it to `f`, and glue the
    // three pieces back together
    fn with_range<F, R>(&mut self, start: usize, end: usize, f: F) -> R
    where
        F: FnOnce(&mut Forest<T>, &Tree) -> R,
    {
        let tree = std::mem::take(&mut self.tree);
        let (before, rest) = self.forest.split(tree, start);
        let (target, after) = self.forest.split(rest, end - start);
        let result = f(&mut self.forest, &target);
        let head = self.forest.merge(before, target);
        self.tree = self.forest.merge(head, after);
        result
    }
}

fn rejected(err: TreapError) -> TreapError {
    debug!("rejected request: {err}");
    err
}

impl<T: Scalar> Default for ImplicitTreap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> fmt::Debug for ImplicitTreap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Scalar> FromIterator<T> for ImplicitTreap<T> {
    /// Builds the whole sequence in `O(n)` time
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        TreapBuilder::new().build_from(iter)
    }
}

impl<T: Scalar> Extend<T> for ImplicitTreap<T> {
    /// Appends the values as one batch-built tree
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let tail = self.forest.build(iter);
        let tree = std::mem::take(&mut self.tree);
        self.tree = self.forest.merge(tree, tail);
    }
}

impl<'a, T: Scalar> IntoIterator for &'a ImplicitTreap<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
