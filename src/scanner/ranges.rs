// src/scanner/ranges.rs
//! Partitioning of the log index space into fetch batches

/// Inclusive range of log indices fetched as one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: u64,
    pub end: u64,
}

impl BatchRange {
    /// Number of indices covered
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Lazy sequence of contiguous batches covering `[start_index, tree_size)`.
///
/// Cloning yields an independent iterator from the same position.
#[derive(Debug, Clone)]
pub struct BatchRanges {
    next_start: u64,
    tree_size: u64,
    batch_size: u64,
}

/// Split `[start_index, tree_size)` into batches of at most `batch_size` indices
pub fn batch_ranges(start_index: u64, tree_size: u64, batch_size: u64) -> BatchRanges {
    BatchRanges {
        next_start: start_index,
        tree_size,
        // zero would never advance
        batch_size: batch_size.max(1),
    }
}

impl Iterator for BatchRanges {
    type Item = BatchRange;

    fn next(&mut self) -> Option<BatchRange> {
        if self.next_start >= self.tree_size {
            return None;
        }

        let start = self.next_start;
        let end = start
            .saturating_add(self.batch_size - 1)
            .min(self.tree_size - 1);
        self.next_start = end + 1;

        Some(BatchRange { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tree_size.saturating_sub(self.next_start);
        let batches = remaining.div_ceil(self.batch_size) as usize;
        (batches, Some(batches))
    }
}

impl ExactSizeIterator for BatchRanges {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(start_index: u64, tree_size: u64, batch_size: u64) {
        let batches: Vec<_> = batch_ranges(start_index, tree_size, batch_size).collect();

        assert_eq!(batches.first().unwrap().start, start_index);
        assert_eq!(batches.last().unwrap().end, tree_size - 1);

        for pair in batches.windows(2) {
            // contiguous: no gap, no overlap
            assert_eq!(pair[0].end + 1, pair[1].start);
        }

        for batch in &batches {
            assert!(batch.start <= batch.end);
            assert!(batch.size() <= batch_size);
            assert!(batch.end <= tree_size - 1);
        }

        let covered: u64 = batches.iter().map(BatchRange::size).sum();
        assert_eq!(covered, tree_size - start_index);
    }

    #[test]
    fn test_coverage_across_shapes() {
        for &(start, size, batch) in &[
            (0, 1, 1),
            (0, 10, 3),
            (0, 10, 10),
            (0, 10, 11),
            (5, 6, 1000),
            (7, 1000, 64),
            (999, 1000, 1),
            (123, 4567, 89),
        ] {
            assert_covers(start, size, batch);
        }
    }

    #[test]
    fn test_last_batch_clamped() {
        let batches: Vec<_> = batch_ranges(0, 25, 10).collect();
        assert_eq!(
            batches,
            vec![
                BatchRange { start: 0, end: 9 },
                BatchRange { start: 10, end: 19 },
                BatchRange { start: 20, end: 24 },
            ]
        );
    }

    #[test]
    fn test_start_at_or_past_tree_size_is_empty() {
        assert_eq!(batch_ranges(10, 10, 5).count(), 0);
        assert_eq!(batch_ranges(11, 10, 5).count(), 0);
        assert_eq!(batch_ranges(0, 0, 5).count(), 0);
    }

    #[test]
    fn test_restartable_and_sized() {
        let ranges = batch_ranges(3, 50, 7);
        assert_eq!(ranges.len(), 7);

        let first: Vec<_> = ranges.clone().collect();
        let second: Vec<_> = ranges.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_huge_indices_do_not_overflow() {
        let batches: Vec<_> = batch_ranges(u64::MAX - 3, u64::MAX, u64::MAX).collect();
        assert_eq!(
            batches,
            vec![BatchRange {
                start: u64::MAX - 3,
                end: u64::MAX - 1
            }]
        );
    }
}
