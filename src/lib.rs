//! # breva
//!
//! Streaming positional k-mer evidence aggregation for structural-variant
//! assembly.
//!
//! The core of this crate is [`AggregateNodeIterator`]: a single forward
//! pass that turns many overlapping, per-read pieces of k-mer evidence into
//! the minimal start-sorted sequence of constant-weight, non-overlapping
//! consensus intervals. Downstream positional de Bruijn graph construction
//! relies on the output ordering to itself run in bounded memory.
//!
//! ## Usage
//!
//! ```
//! use breva::{AggregateNodeIterator, KmerSupportNode};
//!
//! let evidence = vec![
//!     KmerSupportNode::new(0x1b, 10, 15, 3, false),
//!     KmerSupportNode::new(0x1b, 12, 20, 2, true),
//! ];
//! let aggregates: Vec<_> = AggregateNodeIterator::new(evidence.into_iter()).collect();
//! assert_eq!(aggregates.len(), 3);
//! assert_eq!((aggregates[1].start, aggregates[1].end, aggregates[1].weight), (12, 15, 5));
//! ```
//!
//! Evidence extraction from reads, breakpoint scoring, and graph assembly
//! are external collaborators; this crate begins at a start-sorted evidence
//! stream and ends at a start-sorted aggregate stream.

#![warn(missing_docs, missing_debug_implementations)]

pub mod coords;
pub mod positional;

pub use coords::{CoordinateError, LinearGenomicCoordinate};
pub use positional::{
    AggregateNodeIterator, KmerAggregateNode, KmerNode, KmerSupportNode, PackedKmer,
};
