//! Linear genomic coordinates.
//!
//! Maps `(contig, 1-based position)` pairs onto a single monotonically
//! increasing `i64` axis covering every contig in dictionary order, so that
//! interval comparisons in the aggregation engine ignore contig boundaries.
//! An optional per-contig padding leaves unmapped space between contigs
//! (useful when upstream evidence may overhang contig ends).

use fxhash::FxHashMap;
use thiserror::Error;

/// Errors raised when building or querying a coordinate mapping.
#[derive(Debug, Error)]
pub enum CoordinateError {
    /// A contig was declared without a usable length.
    #[error("contig {0} has no usable length")]
    MissingLength(String),
    /// The same contig name was declared twice.
    #[error("duplicate contig {0}")]
    DuplicateContig(String),
    /// A name lookup did not match any declared contig.
    #[error("unknown contig {0}")]
    UnknownContig(String),
}

/// Bidirectional mapping between per-contig and linear genomic coordinates.
#[derive(Debug, Clone)]
pub struct LinearGenomicCoordinate {
    names: Vec<String>,
    lengths: Vec<i64>,
    /// Linear coordinate of position 1 of each contig, minus one.
    offsets: Vec<i64>,
    by_name: FxHashMap<String, usize>,
    padding: i64,
}

impl LinearGenomicCoordinate {
    /// Build a mapping from an ordered contig dictionary with no padding.
    pub fn new<S: Into<String>>(
        contigs: impl IntoIterator<Item = (S, i64)>,
    ) -> Result<Self, CoordinateError> {
        Self::with_padding(contigs, 0)
    }

    /// Build a mapping that reserves `padding` unmapped positions before
    /// each contig on the linear axis.
    pub fn with_padding<S: Into<String>>(
        contigs: impl IntoIterator<Item = (S, i64)>,
        padding: i64,
    ) -> Result<Self, CoordinateError> {
        let mut names = Vec::new();
        let mut lengths = Vec::new();
        let mut offsets = Vec::new();
        let mut by_name = FxHashMap::default();

        let mut offset = 0i64;
        for (name, length) in contigs {
            let name = name.into();
            if length <= 0 {
                return Err(CoordinateError::MissingLength(name));
            }
            if by_name.insert(name.clone(), names.len()).is_some() {
                return Err(CoordinateError::DuplicateContig(name));
            }
            offset += padding;
            names.push(name);
            lengths.push(length);
            offsets.push(offset);
            offset += length;
        }

        Ok(Self {
            names,
            lengths,
            offsets,
            by_name,
            padding,
        })
    }

    /// Number of contigs in the dictionary.
    pub fn contig_count(&self) -> usize {
        self.names.len()
    }

    /// Padding reserved before each contig.
    pub fn padding(&self) -> i64 {
        self.padding
    }

    /// Linear coordinate of a 1-based position on the contig at `index`.
    ///
    /// # Panics
    /// If `index` is out of range; routing a position to an undeclared
    /// contig is a defect in the caller.
    pub fn linear(&self, index: usize, position: i64) -> i64 {
        assert!(
            index < self.offsets.len(),
            "contig index {index} out of range ({} contigs)",
            self.offsets.len()
        );
        self.offsets[index] + position
    }

    /// Linear coordinate of a 1-based position on a named contig.
    pub fn linear_by_name(&self, name: &str, position: i64) -> Result<i64, CoordinateError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| CoordinateError::UnknownContig(name.to_string()))?;
        Ok(self.linear(index, position))
    }

    /// Contig index containing a linear coordinate, or `None` for
    /// coordinates falling in padding or outside the covered axis.
    pub fn contig_index(&self, linear: i64) -> Option<usize> {
        let following = self.offsets.partition_point(|&offset| offset < linear);
        let index = following.checked_sub(1)?;
        (linear <= self.offsets[index] + self.lengths[index]).then_some(index)
    }

    /// Name of the contig containing a linear coordinate.
    pub fn contig_name(&self, linear: i64) -> Option<&str> {
        self.contig_index(linear).map(|i| self.names[i].as_str())
    }

    /// 1-based per-contig position of a linear coordinate.
    pub fn position(&self, linear: i64) -> Option<i64> {
        self.contig_index(linear)
            .map(|index| linear - self.offsets[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_contigs() -> LinearGenomicCoordinate {
        LinearGenomicCoordinate::new([("contig1", 10), ("contig2", 20)]).unwrap()
    }

    #[test]
    fn linear_coordinate_by_index() {
        let coords = two_contigs();
        assert_eq!(coords.linear(0, 1), 1);
        assert_eq!(coords.linear(1, 1), 11);
    }

    #[test]
    fn linear_coordinate_by_name() {
        let coords = two_contigs();
        assert_eq!(coords.linear_by_name("contig1", 1).unwrap(), 1);
        assert_eq!(coords.linear_by_name("contig2", 1).unwrap(), 11);
    }

    #[test]
    fn padding_shifts_every_contig() {
        let coords =
            LinearGenomicCoordinate::with_padding([("contig1", 10), ("contig2", 20)], 2).unwrap();
        // Padding before the first contig.
        assert_eq!(coords.linear_by_name("contig1", 1).unwrap(), 3);
        // 2 + 10 + 2 ahead of contig2's first base.
        assert_eq!(coords.linear_by_name("contig2", 1).unwrap(), 15);
    }

    #[test]
    fn contig_lengths_are_required() {
        let result = LinearGenomicCoordinate::new([("contig1", 0)]);
        assert!(matches!(result, Err(CoordinateError::MissingLength(_))));
    }

    #[test]
    fn duplicate_contigs_are_rejected() {
        let result = LinearGenomicCoordinate::new([("contig1", 10), ("contig1", 20)]);
        assert!(matches!(result, Err(CoordinateError::DuplicateContig(_))));
    }

    #[test]
    fn unknown_contig_lookup_fails() {
        let coords = two_contigs();
        assert!(matches!(
            coords.linear_by_name("contigX", 1),
            Err(CoordinateError::UnknownContig(_))
        ));
    }

    #[test]
    fn contig_index_round_trips() {
        let coords = LinearGenomicCoordinate::with_padding(
            [("contig1", 10), ("contig2", 20), ("contig3", 30)],
            1,
        )
        .unwrap();
        assert_eq!(coords.contig_index(coords.linear(0, 1)), Some(0));
        assert_eq!(coords.contig_index(coords.linear(1, 1)), Some(1));
    }

    #[test]
    fn position_round_trips_for_any_padding() {
        for padding in 0..3 {
            let coords = LinearGenomicCoordinate::with_padding(
                [("contig1", 10), ("contig2", 20), ("contig3", 30)],
                padding,
            )
            .unwrap();
            assert_eq!(coords.position(coords.linear(0, 1)), Some(1));
            assert_eq!(coords.position(coords.linear(1, 2)), Some(2));
            assert_eq!(coords.position(coords.linear(0, 3)), Some(3));
            assert_eq!(coords.position(coords.linear(1, 4)), Some(4));
            assert_eq!(coords.position(coords.linear(2, 5)), Some(5));
        }
    }

    #[test]
    fn padding_gaps_map_to_no_contig() {
        let coords =
            LinearGenomicCoordinate::with_padding([("contig1", 10), ("contig2", 20)], 2).unwrap();
        // Linear 1 and 2 fall in the leading pad, 13 and 14 between contigs.
        assert_eq!(coords.contig_index(1), None);
        assert_eq!(coords.contig_index(13), None);
        assert_eq!(coords.contig_name(coords.linear(1, 1)), Some("contig2"));
    }
}
