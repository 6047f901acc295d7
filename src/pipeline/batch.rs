//! # Batch Scheduler
//!
//! ## Purpose
//! Partitions the ordered citation sequence into fixed-size batches. Batch
//! size B controls reporting granularity only; the concurrency ceiling C is
//! an independent knob owned by the pipeline.
//!
//! ## Input/Output Specification
//! - **Input**: Ordered citation sequence, batch size B
//! - **Output**: Lazy sequence of batches, each of size <= B, preserving
//!   original order within and across batches

use crate::ExtractedCitation;

/// Partitions citations into batches of a fixed maximum size
pub struct BatchScheduler {
    batch_size: usize,
}

/// One batch of citations, in original order
#[derive(Debug)]
pub struct Batch {
    /// 0-based batch number
    pub id: usize,
    pub citations: Vec<ExtractedCitation>,
}

/// Lazy iterator over batches
pub struct Batches {
    remaining: std::vec::IntoIter<ExtractedCitation>,
    batch_size: usize,
    next_id: usize,
}

impl BatchScheduler {
    /// Create a scheduler; `batch_size` must be validated as non-zero by the
    /// caller
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Number of batches a sequence of `total` citations will produce
    pub fn total_batches(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    /// Partition citations into a lazy batch sequence
    pub fn partition(&self, citations: Vec<ExtractedCitation>) -> Batches {
        Batches {
            remaining: citations.into_iter(),
            batch_size: self.batch_size,
            next_id: 0,
        }
    }
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let citations: Vec<ExtractedCitation> =
            self.remaining.by_ref().take(self.batch_size).collect();
        if citations.is_empty() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(Batch { id, citations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citations(n: usize) -> Vec<ExtractedCitation> {
        (0..n)
            .map(|index| ExtractedCitation {
                index,
                text: format!("{} U.S. {} (1973)", index + 1, index + 100),
                normalized: format!("{} U.S. {} (1973)", index + 1, index + 100),
                case_name: None,
                volume: None,
                reporter: None,
                page: None,
                year: Some(1973),
                position: index * 40,
                context: None,
            })
            .collect()
    }

    #[test]
    fn test_partition_preserves_order_across_batches() {
        let scheduler = BatchScheduler::new(3);
        let batches: Vec<Batch> = scheduler.partition(citations(8)).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].citations.len(), 3);
        assert_eq!(batches[1].citations.len(), 3);
        assert_eq!(batches[2].citations.len(), 2);

        let flattened: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.citations.iter().map(|c| c.index))
            .collect();
        assert_eq!(flattened, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_ids_are_sequential() {
        let scheduler = BatchScheduler::new(2);
        let ids: Vec<usize> = scheduler.partition(citations(5)).map(|b| b.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let scheduler = BatchScheduler::new(4);
        assert_eq!(scheduler.partition(Vec::new()).count(), 0);
        assert_eq!(scheduler.total_batches(0), 0);
    }

    #[test]
    fn test_total_batches_rounds_up() {
        let scheduler = BatchScheduler::new(5);
        assert_eq!(scheduler.total_batches(10), 2);
        assert_eq!(scheduler.total_batches(11), 3);
        assert_eq!(scheduler.total_batches(1), 1);
    }
}
