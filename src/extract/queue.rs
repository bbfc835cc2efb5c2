//! Deduplicated, insertion-ordered candidate set.

use std::collections::HashSet;

use crate::models::ResultRecord;

/// Candidates collected during extraction, deduplicated by locator.
///
/// Grows only while the feed is being paged; [`drain`](Self::drain) consumes it,
/// so offering after the download phase started is impossible.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    records: Vec<ResultRecord>,
    seen: HashSet<String>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record unless its locator was already seen. Returns whether it was added.
    pub fn offer(&mut self, record: ResultRecord) -> bool {
        if !self.seen.insert(record.locator().to_string()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Offer every record, returning how many were new
    pub fn extend<I: IntoIterator<Item = ResultRecord>>(&mut self, records: I) -> usize {
        let mut added = 0;
        for record in records {
            if self.offer(record) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look at the candidates without consuming them
    pub fn iter(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter()
    }

    /// Consume the queue into a single-use, ordered sequence
    pub fn drain(self) -> std::vec::IntoIter<ResultRecord> {
        self.records.into_iter()
    }
}

impl FromIterator<ResultRecord> for CandidateQueue {
    fn from_iter<I: IntoIterator<Item = ResultRecord>>(iter: I) -> Self {
        let mut queue = CandidateQueue::new();
        queue.extend(iter);
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(locator: &str) -> ResultRecord {
        ResultRecord::from_locator(locator).unwrap()
    }

    #[test]
    fn test_offer_dedups_by_locator() {
        let mut queue = CandidateQueue::new();
        assert!(queue.offer(record("https://a.example/1.jpg")));
        assert!(queue.offer(record("https://a.example/2.jpg")));
        assert!(!queue.offer(record("https://a.example/1.jpg")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_keeps_insertion_order() {
        let mut queue = CandidateQueue::new();
        let added = queue.extend(
            ["c", "a", "b", "a", "c"]
                .iter()
                .map(|s| record(&format!("https://x.example/{}", s))),
        );
        assert_eq!(added, 3);

        let locators: Vec<String> = queue.drain().map(|r| r.locator().to_string()).collect();
        assert_eq!(
            locators,
            vec![
                "https://x.example/c",
                "https://x.example/a",
                "https://x.example/b"
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_never_holds_duplicate_locators(passes in prop::collection::vec(
            prop::collection::vec(0u8..20, 0..30), 1..6)
        ) {
            let mut queue = CandidateQueue::new();
            for pass in &passes {
                queue.extend(pass.iter().map(|n| record(&format!("https://x.example/{}", n))));
            }

            let mut seen = HashSet::new();
            for r in queue.iter() {
                prop_assert!(seen.insert(r.locator().to_string()));
            }

            let distinct: HashSet<u8> = passes.iter().flatten().copied().collect();
            prop_assert_eq!(queue.len(), distinct.len());
        }
    }
}
