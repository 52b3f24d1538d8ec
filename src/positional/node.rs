use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Fixed-width 2-bit-packed encoding of a k-length genomic sequence.
///
/// The k-mer width and packing scheme are decided by the upstream evidence
/// extractor; this crate only ever compares packed k-mers for equality and
/// uses them as registry keys.
pub type PackedKmer = u64;

/// Capability shared by support (input) and aggregate (output) evidence.
///
/// Positions are inclusive linear genomic coordinates (see
/// [`crate::coords::LinearGenomicCoordinate`]), so interval comparisons are
/// oblivious to contig boundaries.
pub trait KmerNode {
    /// Packed k-mer this evidence belongs to.
    fn kmer(&self) -> PackedKmer;
    /// First genomic position covered (inclusive).
    fn start_position(&self) -> i64;
    /// Last genomic position covered (inclusive).
    fn end_position(&self) -> i64;
    /// Signed evidence weight. Negative weights occur when upstream scoring
    /// subtracts previously-counted evidence; they are passed through
    /// unclamped.
    fn weight(&self) -> i32;
    /// Whether this evidence represents reference-matching support.
    fn is_reference(&self) -> bool;
}

/// One raw piece of per-read k-mer evidence.
///
/// Many support nodes may share a k-mer and overlap in position. The only
/// ordering guarantee an input stream carries is non-decreasing
/// `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct KmerSupportNode {
    /// Packed k-mer.
    pub kmer: PackedKmer,
    /// First covered position (inclusive).
    pub start: i64,
    /// Last covered position (inclusive).
    pub end: i64,
    /// Signed evidence weight.
    pub weight: i32,
    /// Reference-support flag.
    pub is_reference: bool,
}

impl KmerSupportNode {
    /// Construct a support node covering `[start, end]`.
    ///
    /// # Panics
    /// If `start > end`.
    pub fn new(kmer: PackedKmer, start: i64, end: i64, weight: i32, is_reference: bool) -> Self {
        assert!(
            start <= end,
            "support node interval is inverted: [{start}, {end}]"
        );
        Self {
            kmer,
            start,
            end,
            weight,
            is_reference,
        }
    }
}

impl KmerNode for KmerSupportNode {
    fn kmer(&self) -> PackedKmer {
        self.kmer
    }
    fn start_position(&self) -> i64 {
        self.start
    }
    fn end_position(&self) -> i64 {
        self.end
    }
    fn weight(&self) -> i32 {
        self.weight
    }
    fn is_reference(&self) -> bool {
        self.is_reference
    }
}

/// A maximal run of positions over which the summed weight and reference
/// membership of all overlapping support nodes for one k-mer is constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct KmerAggregateNode {
    /// Packed k-mer.
    pub kmer: PackedKmer,
    /// Sum of the weights of every support node covering this run.
    pub weight: i32,
    /// First covered position (inclusive).
    pub start: i64,
    /// Last covered position (inclusive).
    pub end: i64,
    /// True iff at least one reference-flagged support node covers this run.
    pub contains_reference: bool,
}

impl KmerAggregateNode {
    pub(crate) fn new(
        kmer: PackedKmer,
        weight: i32,
        start: i64,
        end: i64,
        contains_reference: bool,
    ) -> Self {
        debug_assert!(start <= end, "aggregate interval is inverted: [{start}, {end}]");
        Self {
            kmer,
            weight,
            start,
            end,
            contains_reference,
        }
    }
}

impl KmerNode for KmerAggregateNode {
    fn kmer(&self) -> PackedKmer {
        self.kmer
    }
    fn start_position(&self) -> i64 {
        self.start
    }
    fn end_position(&self) -> i64 {
        self.end
    }
    fn weight(&self) -> i32 {
        self.weight
    }
    fn is_reference(&self) -> bool {
        self.contains_reference
    }
}

/// Orders nodes by start position only; ties compare equal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ByStartPosition<N>(pub N);

impl<N: KmerNode> PartialEq for ByStartPosition<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0.start_position() == other.0.start_position()
    }
}

impl<N: KmerNode> Eq for ByStartPosition<N> {}

impl<N: KmerNode> PartialOrd for ByStartPosition<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N: KmerNode> Ord for ByStartPosition<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.start_position().cmp(&other.0.start_position())
    }
}

/// Orders nodes by end position only; ties compare equal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ByEndPosition<N>(pub N);

impl<N: KmerNode> PartialEq for ByEndPosition<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0.end_position() == other.0.end_position()
    }
}

impl<N: KmerNode> Eq for ByEndPosition<N> {}

impl<N: KmerNode> PartialOrd for ByEndPosition<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N: KmerNode> Ord for ByEndPosition<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.end_position().cmp(&other.0.end_position())
    }
}

/// Min-by-start heap re-ordering aggregates emitted by independent per-k-mer
/// aggregators into the globally sorted output sequence.
///
/// Aggregates of distinct k-mers sharing a start pop in unspecified order.
#[derive(Debug, Default)]
pub(crate) struct StartSortedBuffer {
    heap: BinaryHeap<Reverse<ByStartPosition<KmerAggregateNode>>>,
}

impl StartSortedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: KmerAggregateNode) {
        self.heap.push(Reverse(ByStartPosition(node)));
    }

    /// Start position of the smallest buffered aggregate, if any.
    pub fn peek_start(&self) -> Option<i64> {
        self.heap.peek().map(|Reverse(ByStartPosition(node))| node.start)
    }

    pub fn pop(&mut self) -> Option<KmerAggregateNode> {
        self.heap.pop().map(|Reverse(ByStartPosition(node))| node)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_pops_in_start_order() {
        let mut buffer = StartSortedBuffer::new();
        buffer.push(KmerAggregateNode::new(1, 2, 30, 35, false));
        buffer.push(KmerAggregateNode::new(1, 1, 10, 15, false));
        buffer.push(KmerAggregateNode::new(2, 4, 20, 25, true));

        assert_eq!(buffer.peek_start(), Some(10));
        let starts: Vec<i64> = std::iter::from_fn(|| buffer.pop()).map(|n| n.start).collect();
        assert_eq!(starts, vec![10, 20, 30]);
    }

    #[test]
    #[should_panic(expected = "inverted")]
    fn inverted_support_interval_is_rejected() {
        let _ = KmerSupportNode::new(0, 20, 10, 1, false);
    }
}
