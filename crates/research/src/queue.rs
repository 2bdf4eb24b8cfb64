//! Priority queue of pending searches plus the completed-query ledger.

use std::collections::{HashSet, VecDeque};

use crate::types::{QueryKey, SearchQuery};

/// Pending queries ordered by importance (highest first, ties in insertion
/// order) and the set of query keys already executed.
#[derive(Debug, Default)]
pub struct QueryQueue {
    pending: VecDeque<SearchQuery>,
    completed: HashSet<QueryKey>,
}

impl QueryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append queries and restore importance order.
    ///
    /// Queries whose key is already completed are dropped. Returns how many
    /// were actually queued.
    pub fn enqueue_many(&mut self, queries: impl IntoIterator<Item = SearchQuery>) -> usize {
        let before = self.pending.len();
        for query in queries {
            if self.completed.contains(&query.key()) {
                tracing::trace!(query = %query.text, "Dropping already completed query");
                continue;
            }
            self.pending.push_back(query);
        }
        // Stable: equal importance keeps insertion order.
        self.pending
            .make_contiguous()
            .sort_by(|a, b| b.importance.cmp(&a.importance));
        self.pending.len() - before
    }

    /// Remove and return the most important pending query.
    pub fn pop_highest(&mut self) -> Option<SearchQuery> {
        self.pending.pop_front()
    }

    pub fn is_completed(&self, key: &QueryKey) -> bool {
        self.completed.contains(key)
    }

    /// Record a query as executed. The completed set never shrinks.
    pub fn mark_completed(&mut self, key: QueryKey) {
        self.completed.insert(key);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Pending queries in pop order.
    pub fn pending(&self) -> impl Iterator<Item = &SearchQuery> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(queue: &QueryQueue) -> bool {
        let importances: Vec<u8> = queue.pending().map(|q| q.importance).collect();
        importances.windows(2).all(|w| w[0] >= w[1])
    }

    #[test]
    fn test_pop_returns_highest_importance() {
        let mut queue = QueryQueue::new();
        queue.enqueue_many(vec![
            SearchQuery::new("low", 1),
            SearchQuery::new("high", 5),
            SearchQuery::new("mid", 3),
        ]);

        assert_eq!(queue.pop_highest().unwrap().text, "high");
        assert_eq!(queue.pop_highest().unwrap().text, "mid");
        assert_eq!(queue.pop_highest().unwrap().text, "low");
        assert!(queue.pop_highest().is_none());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut queue = QueryQueue::new();
        queue.enqueue_many(vec![
            SearchQuery::new("a", 3),
            SearchQuery::new("b", 4),
            SearchQuery::new("c", 3),
        ]);
        queue.enqueue_many(vec![SearchQuery::new("d", 3), SearchQuery::new("e", 4)]);

        let order: Vec<_> = queue.pending().map(|q| q.text.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn test_sorted_after_every_enqueue() {
        let mut queue = QueryQueue::new();
        for batch in [vec![2, 5, 1], vec![4], vec![], vec![5, 3, 3, 1]] {
            queue.enqueue_many(batch.into_iter().enumerate().map(|(i, imp)| {
                SearchQuery::new(format!("q{i}-{imp}"), imp)
            }));
            assert!(is_sorted(&queue));
        }
    }

    #[test]
    fn test_completed_queries_are_not_requeued() {
        let mut queue = QueryQueue::new();
        let done = SearchQuery::new("rust", 5);
        queue.mark_completed(done.key());

        let added = queue.enqueue_many(vec![
            SearchQuery::new("rust", 2),
            SearchQuery::new("rust", 2).with_site("site:rust-lang.org"),
        ]);

        assert_eq!(added, 1);
        assert!(queue.is_completed(&done.key()));
        assert_eq!(
            queue.pop_highest().unwrap().site_restriction.as_deref(),
            Some("site:rust-lang.org")
        );
    }

    #[test]
    fn test_duplicate_pending_keys_are_both_queued() {
        // Dedup of pending duplicates happens at pop time, by key.
        let mut queue = QueryQueue::new();
        queue.enqueue_many(vec![SearchQuery::new("q1", 5), SearchQuery::new("q1", 3)]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.completed_count(), 0);
    }
}
