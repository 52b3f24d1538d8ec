//! Streaming positional aggregation of k-mer evidence.
//!
//! Converts a start-sorted stream of overlapping per-read support intervals
//! into the minimal start-sorted sequence of constant-weight,
//! non-overlapping aggregate intervals, one forward pass, no whole-genome
//! state. This is the substrate the positional de Bruijn graph builder
//! consumes.

mod aggregator;
mod iterator;
mod node;
mod scheduler;

pub use iterator::AggregateNodeIterator;
pub use node::{KmerAggregateNode, KmerNode, KmerSupportNode, PackedKmer};
