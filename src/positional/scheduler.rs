use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fxhash::FxHashMap;

use super::aggregator::KmerNodeAggregator;
use super::node::PackedKmer;

/// Live per-k-mer aggregators, keyed by packed k-mer. Entries exist from
/// first evidence until the aggregator drains, then are removed; a recurring
/// k-mer gets a fresh entry with independent state.
pub type AggregatorRegistry = FxHashMap<PackedKmer, KmerNodeAggregator>;

/// A recorded observation of one aggregator's open-run start.
///
/// The aggregator is referenced by its k-mer handle and resolved against the
/// registry when the snapshot surfaces; there is no back-reference to live
/// state. A snapshot is current only while the aggregator still exists and
/// its revision (and therefore its start) is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Snapshot {
    /// Open-run start at the time the snapshot was taken. Ordered first so
    /// the derived ordering is start-major.
    pub start: i64,
    /// Registry handle of the observed aggregator.
    pub kmer: PackedKmer,
    /// Aggregator revision at the time the snapshot was taken.
    pub revision: u64,
}

impl Snapshot {
    /// Whether the observed aggregator still holds the recorded state.
    ///
    /// The start is compared alongside the revision so that a revision
    /// collision across an evict/re-create cycle of the same k-mer can never
    /// validate a snapshot whose recorded start is wrong.
    fn is_current(&self, registry: &AggregatorRegistry) -> bool {
        registry.get(&self.kmer).is_some_and(|aggregator| {
            aggregator.revision() == self.revision && aggregator.current_start() == self.start
        })
    }
}

/// Lazy-deletion min-priority queue over aggregator snapshots.
///
/// Answers "what is the smallest still-open run start across all live
/// aggregators". Stale snapshots are never removed eagerly; they are
/// discarded only when they reach the head, giving amortized O(log n)
/// maintenance with no invalidation pass.
#[derive(Debug, Default)]
pub struct SnapshotScheduler {
    heap: BinaryHeap<Reverse<Snapshot>>,
}

impl SnapshotScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.heap.push(Reverse(snapshot));
    }

    /// Smallest open-run start among live aggregators, or `None` when every
    /// remaining snapshot is stale or the queue is empty.
    pub fn min_open_start(&mut self, registry: &AggregatorRegistry) -> Option<i64> {
        self.discard_stale_head(registry);
        self.heap.peek().map(|Reverse(snapshot)| snapshot.start)
    }

    /// Pop the head snapshot if it is current and starts before `position`.
    pub fn pop_open_before(
        &mut self,
        position: i64,
        registry: &AggregatorRegistry,
    ) -> Option<Snapshot> {
        self.discard_stale_head(registry);
        match self.heap.peek() {
            Some(Reverse(snapshot)) if snapshot.start < position => {
                let head = *snapshot;
                self.heap.pop();
                Some(head)
            }
            _ => None,
        }
    }

    fn discard_stale_head(&mut self, registry: &AggregatorRegistry) {
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.is_current(registry) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positional::node::{KmerSupportNode, StartSortedBuffer};

    fn registry_with(nodes: &[KmerSupportNode]) -> (AggregatorRegistry, SnapshotScheduler) {
        let mut registry = AggregatorRegistry::default();
        let mut scheduler = SnapshotScheduler::new();
        let mut out = StartSortedBuffer::new();
        for &node in nodes {
            let aggregator = registry
                .entry(node.kmer)
                .or_insert_with(|| KmerNodeAggregator::new(node.kmer));
            aggregator.add(node, &mut out);
            scheduler.push(aggregator.snapshot());
        }
        (registry, scheduler)
    }

    #[test]
    fn reports_minimum_across_live_aggregators() {
        let (registry, mut scheduler) = registry_with(&[
            KmerSupportNode::new(1, 10, 40, 1, false),
            KmerSupportNode::new(2, 25, 30, 1, false),
        ]);
        assert_eq!(scheduler.min_open_start(&registry), Some(10));
    }

    #[test]
    fn stale_snapshots_are_discarded_at_the_head() {
        let (mut registry, mut scheduler) = registry_with(&[
            KmerSupportNode::new(1, 10, 12, 1, false),
            KmerSupportNode::new(2, 25, 30, 1, false),
        ]);

        // Advancing k-mer 1 bumps its revision; the snapshot taken at start
        // 10 becomes stale and must be skipped, not reported.
        let mut out = StartSortedBuffer::new();
        let aggregator = registry.get_mut(&1).unwrap();
        aggregator.advance_to(i64::MAX, &mut out);
        assert!(aggregator.is_empty());
        registry.remove(&1);

        assert_eq!(scheduler.min_open_start(&registry), Some(25));
    }

    #[test]
    fn pop_respects_the_position_bound() {
        let (registry, mut scheduler) = registry_with(&[
            KmerSupportNode::new(1, 10, 40, 1, false),
            KmerSupportNode::new(2, 25, 30, 1, false),
        ]);

        let head = scheduler.pop_open_before(20, &registry).unwrap();
        assert_eq!((head.kmer, head.start), (1, 10));
        assert!(scheduler.pop_open_before(20, &registry).is_none());
    }

    #[test]
    fn empty_scheduler_reports_no_minimum() {
        let registry = AggregatorRegistry::default();
        let mut scheduler = SnapshotScheduler::new();
        assert_eq!(scheduler.min_open_start(&registry), None);
    }
}
