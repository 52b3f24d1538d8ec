use std::iter::Peekable;

use tracing::trace;

use super::aggregator::KmerNodeAggregator;
use super::node::{KmerAggregateNode, KmerSupportNode, StartSortedBuffer};
use super::scheduler::{AggregatorRegistry, SnapshotScheduler};

/// Transforms a start-sorted sequence of support nodes into a start-sorted
/// sequence of non-overlapping aggregate nodes, in one forward pass.
///
/// The iterator is lazy, finite, forward-only and non-restartable. Memory is
/// bounded by the number of k-mers with currently open intervals plus the
/// aggregates buffered for re-ordering, which tracks local coverage depth
/// rather than genome size. Abandoning the iterator at any point is safe; no
/// state outlives it.
///
/// # Panics
/// A support node whose start precedes an earlier node's start is a contract
/// violation of the upstream source and fails immediately; a broken
/// monotonicity invariant has no safe recovery in a single-pass stream.
#[derive(Debug)]
pub struct AggregateNodeIterator<I>
where
    I: Iterator<Item = KmerSupportNode>,
{
    upstream: Peekable<I>,
    output: StartSortedBuffer,
    by_kmer: AggregatorRegistry,
    by_start: SnapshotScheduler,
    last_input_start: i64,
}

impl<I> AggregateNodeIterator<I>
where
    I: Iterator<Item = KmerSupportNode>,
{
    /// Wrap a start-sorted support node source.
    pub fn new(upstream: I) -> Self {
        Self {
            upstream: upstream.peekable(),
            output: StartSortedBuffer::new(),
            by_kmer: AggregatorRegistry::default(),
            by_start: SnapshotScheduler::new(),
            last_input_start: i64::MIN,
        }
    }

    /// Pull input until the smallest buffered aggregate can no longer be
    /// preceded or extended: every unprocessed node and every open run must
    /// start strictly after it.
    fn ensure_buffer(&mut self) {
        while let Some(&next) = self.upstream.peek() {
            let pull = match self.output.peek_start() {
                None => true,
                Some(buffered) => {
                    buffered >= next.start
                        || self
                            .by_start
                            .min_open_start(&self.by_kmer)
                            .is_some_and(|open| open <= buffered)
                }
            };
            if !pull {
                return;
            }
            self.upstream.next();
            self.process(next);
        }
        // Upstream exhausted: everything still open is final.
        if !self.by_kmer.is_empty() {
            trace!(live = self.by_kmer.len(), "terminal flush");
        }
        self.flush_before(i64::MAX);
    }

    fn process(&mut self, node: KmerSupportNode) {
        assert!(
            node.start >= self.last_input_start,
            "support node start {} violates non-decreasing input order (previous {})",
            node.start,
            self.last_input_start
        );
        self.last_input_start = node.start;

        self.flush_before(node.start);
        let aggregator = self
            .by_kmer
            .entry(node.kmer)
            .or_insert_with(|| KmerNodeAggregator::new(node.kmer));
        aggregator.add(node, &mut self.output);
        let snapshot = aggregator.snapshot();
        self.by_start.push(snapshot);
    }

    /// Advance every aggregator whose open run starts before `position`,
    /// emitting all runs that end before it. Aggregators whose open run
    /// spans `position` stay live with their start unchanged; each is
    /// visited at most once per flush.
    fn flush_before(&mut self, position: i64) {
        let mut still_open = Vec::new();
        while let Some(snapshot) = self.by_start.pop_open_before(position, &self.by_kmer) {
            let Some(aggregator) = self.by_kmer.get_mut(&snapshot.kmer) else {
                continue;
            };
            aggregator.advance_to(position, &mut self.output);
            if aggregator.is_empty() {
                trace!(kmer = snapshot.kmer, "evicting drained aggregator");
                self.by_kmer.remove(&snapshot.kmer);
            } else {
                still_open.push(aggregator.snapshot());
            }
        }
        for snapshot in still_open {
            self.by_start.push(snapshot);
        }
    }
}

impl<I> Iterator for AggregateNodeIterator<I>
where
    I: Iterator<Item = KmerSupportNode>,
{
    type Item = KmerAggregateNode;

    fn next(&mut self) -> Option<KmerAggregateNode> {
        self.ensure_buffer();
        self.output.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(nodes: Vec<KmerSupportNode>) -> Vec<KmerAggregateNode> {
        AggregateNodeIterator::new(nodes.into_iter()).collect()
    }

    #[test]
    fn recurring_kmer_gets_fresh_state() {
        let out = aggregate(vec![
            KmerSupportNode::new(5, 10, 12, 1, false),
            KmerSupportNode::new(5, 50, 60, 2, true),
        ]);
        // No bridging aggregate between the two occurrences.
        assert_eq!(
            out,
            vec![
                KmerAggregateNode::new(5, 1, 10, 12, false),
                KmerAggregateNode::new(5, 2, 50, 60, true),
            ]
        );
    }

    #[test]
    fn interleaved_kmers_emit_in_global_start_order() {
        let out = aggregate(vec![
            KmerSupportNode::new(1, 10, 100, 1, false),
            KmerSupportNode::new(2, 20, 25, 1, false),
            KmerSupportNode::new(2, 40, 45, 1, false),
            KmerSupportNode::new(1, 60, 70, 1, false),
        ]);
        let starts: Vec<i64> = out.iter().map(|n| n.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        // k-mer 2's short intervals must not wait for k-mer 1's long one.
        assert!(out.iter().any(|n| n.kmer == 2 && n.start == 20 && n.end == 25));
    }

    #[test]
    fn emission_waits_for_open_runs_at_lower_starts() {
        let mut iter = AggregateNodeIterator::new(
            vec![
                KmerSupportNode::new(1, 10, 100, 1, false),
                KmerSupportNode::new(2, 20, 25, 1, false),
            ]
            .into_iter(),
        );
        // k-mer 1 stays open through position 100, so nothing that starts
        // after 10 may be emitted before its first run is closed.
        let first = iter.next().unwrap();
        assert_eq!((first.kmer, first.start), (1, 10));
    }

    #[test]
    fn abandoning_the_iterator_is_safe() {
        let mut iter = AggregateNodeIterator::new(
            vec![
                KmerSupportNode::new(1, 10, 20, 1, false),
                KmerSupportNode::new(2, 12, 30, 1, false),
            ]
            .into_iter(),
        );
        let _ = iter.next();
        drop(iter);
    }

    #[test]
    #[should_panic(expected = "non-decreasing input order")]
    fn unsorted_input_is_a_contract_violation() {
        let _ = aggregate(vec![
            KmerSupportNode::new(1, 20, 25, 1, false),
            KmerSupportNode::new(2, 10, 15, 1, false),
        ]);
    }
}
