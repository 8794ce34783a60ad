//! Per-request outcome records and the fixed-size buffer that holds them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::error::RequestError;

/// Outcome of one work item.
///
/// Instants are seconds since the benchmark clock started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkItemRecord {
    pub start_instant: f64,
    pub end_instant: f64,
    /// Bytes read from the response body, 0 if the request failed first.
    pub content_length: u64,
    /// `None` on success.
    pub failure: Option<RequestError>,
}

impl WorkItemRecord {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Wall-clock duration of the request in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_instant - self.start_instant
    }
}

/// Preallocated arena of records addressed by work-item index.
///
/// Each slot is written at most once, by the worker that claimed its index,
/// so slots never contend with each other. A record becomes visible to
/// readers only once [`publish`](Self::publish) has stored the whole record;
/// the processed counter is bumped afterwards with release ordering, so a
/// reader that observes `processed == n` also observes at least `n` filled
/// slots.
#[derive(Debug)]
pub struct ResultBuffer {
    slots: Box<[OnceLock<WorkItemRecord>]>,
    processed: AtomicUsize,
}

impl ResultBuffer {
    /// Allocate `len` empty slots. The buffer is never resized afterwards.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
            processed: AtomicUsize::new(0),
        }
    }

    /// Number of slots, equal to the planned request count.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the finalized record for `index` and count it as processed.
    ///
    /// Returns `false` if the index is out of range or already published.
    pub fn publish(&self, index: usize, record: WorkItemRecord) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        if slot.set(record).is_err() {
            return false;
        }
        self.processed.fetch_add(1, Ordering::Release);
        true
    }

    /// Number of finalized records.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    /// Finalized record for `index`, if any.
    pub fn get(&self, index: usize) -> Option<&WorkItemRecord> {
        self.slots.get(index).and_then(OnceLock::get)
    }

    /// Every finalized record with its index, in index order.
    pub fn iter_finalized(&self) -> impl Iterator<Item = (usize, &WorkItemRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.get().map(|r| (i, r)))
    }

    /// Snapshot of finalized records.
    ///
    /// The length of the returned view equals the processed count observed at
    /// the start of the call. Records published while the view is being built
    /// are left for the next query.
    pub fn processed_view(&self) -> Vec<&WorkItemRecord> {
        let processed = self.processed();
        self.iter_finalized()
            .map(|(_, record)| record)
            .take(processed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: f64, end: f64) -> WorkItemRecord {
        WorkItemRecord {
            start_instant: start,
            end_instant: end,
            content_length: 10,
            failure: None,
        }
    }

    #[test]
    fn test_new_buffer_has_no_finalized_records() {
        let buffer = ResultBuffer::new(4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.processed(), 0);
        assert!(buffer.processed_view().is_empty());
        assert!(buffer.get(0).is_none());
    }

    #[test]
    fn test_publish_out_of_order() {
        let buffer = ResultBuffer::new(3);
        assert!(buffer.publish(2, record(0.2, 0.3)));
        assert!(buffer.publish(0, record(0.0, 0.1)));

        assert_eq!(buffer.processed(), 2);
        let indices: Vec<usize> = buffer.iter_finalized().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(buffer.processed_view().len(), 2);
        assert!(buffer.get(1).is_none());
    }

    #[test]
    fn test_publish_twice_is_rejected() {
        let buffer = ResultBuffer::new(1);
        assert!(buffer.publish(0, record(0.0, 0.1)));
        assert!(!buffer.publish(0, record(5.0, 6.0)));
        assert_eq!(buffer.processed(), 1);
        assert_eq!(buffer.get(0).unwrap().start_instant, 0.0);
    }

    #[test]
    fn test_publish_out_of_range_is_rejected() {
        let buffer = ResultBuffer::new(1);
        assert!(!buffer.publish(1, record(0.0, 0.1)));
        assert_eq!(buffer.processed(), 0);
    }

    #[test]
    fn test_processed_view_is_stable_between_queries() {
        let buffer = ResultBuffer::new(2);
        buffer.publish(1, record(0.5, 0.7));
        let first = buffer.processed_view();
        let second = buffer.processed_view();
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_duration() {
        let r = record(1.25, 2.0);
        assert!(r.is_success());
        assert_eq!(r.duration_secs(), 0.75);
    }
}
