use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::node::{ByEndPosition, KmerAggregateNode, KmerSupportNode, PackedKmer, StartSortedBuffer};
use super::scheduler::Snapshot;

/// Per-k-mer interval aggregation state machine.
///
/// Tracks the currently open aggregation run for one k-mer: the set of
/// support nodes whose intervals are still open, the summed weight and
/// reference count over that set, and the start of the run. Support nodes
/// must arrive in non-decreasing start order; finished runs are emitted the
/// moment no further evidence can change them.
#[derive(Debug)]
pub struct KmerNodeAggregator {
    kmer: PackedKmer,
    /// Open support nodes, minimum end position first.
    active: BinaryHeap<Reverse<ByEndPosition<KmerSupportNode>>>,
    /// Start of the currently open run.
    current_start: i64,
    /// Summed weight of the open support set.
    weight: i32,
    /// Number of reference-flagged nodes in the open support set.
    reference_count: u32,
    /// Bumped on every state change; stale scheduler snapshots are detected
    /// by comparing against this.
    revision: u64,
}

impl KmerNodeAggregator {
    pub fn new(kmer: PackedKmer) -> Self {
        Self {
            kmer,
            active: BinaryHeap::new(),
            current_start: i64::MIN,
            weight: 0,
            reference_count: 0,
            revision: 0,
        }
    }

    pub fn current_start(&self) -> i64 {
        self.current_start
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True once no support interval remains open; the registry evicts the
    /// aggregator at that point.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Record the current start for lazy staleness checking.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            start: self.current_start,
            kmer: self.kmer,
            revision: self.revision,
        }
    }

    /// Fold one support node into the open run, emitting every aggregate
    /// that the node's arrival finalizes.
    ///
    /// # Panics
    /// If the node belongs to a different k-mer or starts before
    /// `current_start`; both indicate a defect in the caller, not a
    /// recoverable condition.
    pub fn add(&mut self, node: KmerSupportNode, out: &mut StartSortedBuffer) {
        assert_eq!(
            node.kmer, self.kmer,
            "support node for k-mer {:#x} routed to aggregator for {:#x}",
            node.kmer, self.kmer
        );
        assert!(
            node.start >= self.current_start,
            "support node start {} precedes open run start {}",
            node.start,
            self.current_start
        );
        self.advance_to(node.start, out);
        if !self.active.is_empty() && self.current_start < node.start {
            // The summed weight changes at node.start, so the run covering
            // [current_start, node.start - 1] is final even though none of
            // its support intervals has ended yet.
            out.push(KmerAggregateNode::new(
                self.kmer,
                self.weight,
                self.current_start,
                node.start - 1,
                self.reference_count > 0,
            ));
        }
        self.current_start = node.start;
        if node.is_reference {
            self.reference_count += 1;
        }
        self.weight += node.weight;
        self.active.push(Reverse(ByEndPosition(node)));
        self.revision += 1;
    }

    /// Emit every aggregate that is final given that no further support can
    /// begin before `position`: while the minimum open end precedes
    /// `position`, close the run at that end and drop the entire tie class
    /// of nodes sharing it in one batch.
    pub fn advance_to(&mut self, position: i64, out: &mut StartSortedBuffer) {
        while let Some(&Reverse(ByEndPosition(head))) = self.active.peek() {
            if head.end >= position {
                break;
            }
            let end = head.end;
            out.push(KmerAggregateNode::new(
                self.kmer,
                self.weight,
                self.current_start,
                end,
                self.reference_count > 0,
            ));
            // Batch-pop the tie class; one aggregate per distinct end value.
            while let Some(&Reverse(ByEndPosition(ending))) = self.active.peek() {
                if ending.end != end {
                    break;
                }
                self.active.pop();
                self.weight -= ending.weight;
                if ending.is_reference {
                    self.reference_count -= 1;
                }
            }
            self.current_start = end + 1;
            self.revision += 1;
        }
    }
}
