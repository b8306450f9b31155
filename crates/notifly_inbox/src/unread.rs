//! In-memory notification list and unread counter.
//!
//! The counter is a `u64` and every decrement saturates, so it cannot go
//! negative whatever order operations arrive in.

use notifly_common::{HistoryResponse, Notification};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Counts observed while loading history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub server_count: Option<u64>,
    pub local_count: u64,
}

impl LoadSummary {
    /// True when the server sent a count that disagrees with its own records.
    pub fn diverges(&self) -> bool {
        self.server_count.is_some_and(|server| server != self.local_count)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnreadReconciler {
    records: Vec<Notification>,
    unread: u64,
    // ids applied live since the last load
    live: HashSet<i64>,
}

impl UnreadReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list with fetched history. The server's `unread_count`
    /// is used verbatim when present; otherwise unread records are counted.
    ///
    /// Records applied live since the previous load that the history does
    /// not contain stay at the front of the list, and their unread ones are
    /// added to the count.
    pub fn load(&mut self, history: HistoryResponse) -> LoadSummary {
        let (server_count, records) = history.into_parts();
        let local_count = records.iter().filter(|n| !n.is_read).count() as u64;
        let summary = LoadSummary {
            server_count,
            local_count,
        };
        if summary.diverges() {
            warn!(
                server = ?server_count,
                local = local_count,
                "server unread_count disagrees with returned records"
            );
        }

        let fetched: HashSet<i64> = records.iter().map(|n| n.id).collect();
        let live = &self.live;
        let mut kept: Vec<Notification> = std::mem::take(&mut self.records)
            .into_iter()
            .filter(|n| live.contains(&n.id) && !fetched.contains(&n.id))
            .collect();
        let pending = kept.iter().filter(|n| !n.is_read).count() as u64;
        if !kept.is_empty() {
            debug!(kept = kept.len(), pending, "live notifications missing from history kept");
        }

        kept.extend(records);
        self.records = kept;
        self.unread = server_count.unwrap_or(local_count) + pending;
        self.live.clear();
        summary
    }

    /// Applies a live notification: prepends it and counts it if unread.
    /// A record whose id is already listed is ignored.
    pub fn apply_live(&mut self, notification: Notification) -> bool {
        if self.records.iter().any(|n| n.id == notification.id) {
            debug!(id = notification.id, "duplicate live notification ignored");
            return false;
        }
        if !notification.is_read {
            self.unread += 1;
        }
        self.live.insert(notification.id);
        self.records.insert(0, notification);
        true
    }

    /// Flags one record read. The counter drops by one unless the record is
    /// listed and was already read.
    pub fn mark_read(&mut self, id: i64) {
        match self.records.iter_mut().find(|n| n.id == id) {
            Some(record) if record.is_read => {}
            Some(record) => {
                record.is_read = true;
                self.unread = self.unread.saturating_sub(1);
            }
            None => self.unread = self.unread.saturating_sub(1),
        }
    }

    pub fn mark_all_read(&mut self) {
        for record in &mut self.records {
            record.is_read = true;
        }
        self.unread = 0;
    }

    /// Drops a record, uncounting it if it was unread.
    pub fn remove(&mut self, id: i64) -> Option<Notification> {
        let index = self.records.iter().position(|n| n.id == id)?;
        let removed = self.records.remove(index);
        if !removed.is_read {
            self.unread = self.unread.saturating_sub(1);
        }
        Some(removed)
    }

    pub fn unread_count(&self) -> u64 {
        self.unread
    }

    pub fn records(&self) -> &[Notification] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: i64, is_read: bool) -> Notification {
        serde_json::from_value(json!({
            "id": id,
            "user_id": 1,
            "actor_id": 2,
            "type": "like",
            "post_id": 5,
            "is_read": is_read,
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap()
    }

    fn loaded(records: Vec<Notification>) -> UnreadReconciler {
        let mut reconciler = UnreadReconciler::new();
        reconciler.load(HistoryResponse::List(records));
        reconciler
    }

    #[test]
    fn test_server_count_is_trusted() {
        let mut reconciler = UnreadReconciler::new();
        let records = vec![
            record(1, false),
            record(2, true),
            record(3, false),
            record(4, true),
            record(5, false),
        ];
        let summary = reconciler.load(HistoryResponse::Envelope {
            unread_count: Some(3),
            notifications: Some(records),
            items: None,
        });
        assert_eq!(reconciler.unread_count(), 3);
        assert_eq!(reconciler.records().len(), 5);
        assert!(!summary.diverges());
    }

    #[test]
    fn test_divergent_server_count_is_kept_and_reported() {
        let mut reconciler = UnreadReconciler::new();
        let summary = reconciler.load(HistoryResponse::Envelope {
            unread_count: Some(9),
            notifications: None,
            items: Some(vec![record(1, false)]),
        });
        assert_eq!(reconciler.unread_count(), 9);
        assert!(summary.diverges());
        assert_eq!(summary.local_count, 1);
    }

    #[test]
    fn test_bare_list_is_counted_locally() {
        let reconciler = loaded(vec![record(1, false), record(2, true), record(3, false)]);
        assert_eq!(reconciler.unread_count(), 2);
    }

    #[test]
    fn test_live_unread_is_prepended_and_counted() {
        let mut reconciler = loaded(vec![record(1, false), record(2, false)]);
        assert_eq!(reconciler.unread_count(), 2);

        assert!(reconciler.apply_live(record(3, false)));
        assert_eq!(reconciler.unread_count(), 3);
        assert_eq!(reconciler.records()[0].id, 3);

        assert!(reconciler.apply_live(record(4, true)));
        assert_eq!(reconciler.unread_count(), 3);
    }

    #[test]
    fn test_live_duplicate_is_ignored() {
        let mut reconciler = loaded(vec![record(1, false)]);
        assert!(!reconciler.apply_live(record(1, false)));
        assert_eq!(reconciler.unread_count(), 1);
        assert_eq!(reconciler.records().len(), 1);
    }

    #[test]
    fn test_load_keeps_live_records_missing_from_history() {
        let mut reconciler = UnreadReconciler::new();
        assert!(reconciler.apply_live(record(2, false)));
        assert!(reconciler.apply_live(record(3, true)));

        reconciler.load(HistoryResponse::Envelope {
            unread_count: Some(1),
            notifications: Some(vec![record(1, false)]),
            items: None,
        });
        let ids: Vec<i64> = reconciler.records().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(reconciler.unread_count(), 2);
    }

    #[test]
    fn test_load_prefers_history_copy_of_live_record() {
        let mut reconciler = UnreadReconciler::new();
        reconciler.apply_live(record(2, false));

        reconciler.load(HistoryResponse::List(vec![record(2, false), record(1, true)]));
        let ids: Vec<i64> = reconciler.records().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(reconciler.unread_count(), 1);

        // loaded records are not carried into the next load
        reconciler.load(HistoryResponse::List(vec![record(1, true)]));
        assert_eq!(reconciler.records().len(), 1);
        assert_eq!(reconciler.unread_count(), 0);
    }

    #[test]
    fn test_load_drops_live_records_removed_meanwhile() {
        let mut reconciler = UnreadReconciler::new();
        reconciler.apply_live(record(2, false));
        reconciler.remove(2);

        reconciler.load(HistoryResponse::List(vec![record(1, false)]));
        assert_eq!(reconciler.records().len(), 1);
        assert_eq!(reconciler.unread_count(), 1);
    }

    #[test]
    fn test_mark_read_on_read_record_changes_nothing() {
        let mut reconciler = loaded(vec![record(1, true), record(2, false)]);
        reconciler.mark_read(1);
        assert_eq!(reconciler.unread_count(), 1);
        assert!(reconciler.records()[0].is_read);

        reconciler.mark_read(2);
        reconciler.mark_read(2);
        assert_eq!(reconciler.unread_count(), 0);
    }

    #[test]
    fn test_mark_read_is_floored() {
        let mut reconciler = UnreadReconciler::new();
        reconciler.mark_read(99);
        assert_eq!(reconciler.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_and_remove() {
        let mut reconciler = loaded(vec![record(1, false), record(2, false), record(3, true)]);
        assert_eq!(reconciler.remove(3).map(|n| n.id), Some(3));
        assert_eq!(reconciler.unread_count(), 2);
        assert_eq!(reconciler.remove(1).map(|n| n.id), Some(1));
        assert_eq!(reconciler.unread_count(), 1);
        assert!(reconciler.remove(42).is_none());

        reconciler.mark_all_read();
        assert_eq!(reconciler.unread_count(), 0);
        assert!(reconciler.records().iter().all(|n| n.is_read));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Live(i64, bool),
        MarkRead(i64),
        MarkAll,
        Remove(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i64..8, any::<bool>()).prop_map(|(id, read)| Op::Live(id, read)),
            (0i64..8).prop_map(Op::MarkRead),
            Just(Op::MarkAll),
            (0i64..8).prop_map(Op::Remove),
        ]
    }

    proptest! {
        // With a locally counted load, the counter always equals the
        // number of unread records.
        #[test]
        fn counter_matches_unread_records(ops in proptest::collection::vec(op(), 0..64)) {
            let mut reconciler = UnreadReconciler::new();
            for op in ops {
                match op {
                    Op::Live(id, read) => { reconciler.apply_live(record(id, read)); }
                    Op::MarkRead(id) => {
                        // only ids that are listed, so no blind decrement
                        if reconciler.records().iter().any(|n| n.id == id) {
                            reconciler.mark_read(id);
                        }
                    }
                    Op::MarkAll => reconciler.mark_all_read(),
                    Op::Remove(id) => { reconciler.remove(id); }
                }
                let unread = reconciler.records().iter().filter(|n| !n.is_read).count() as u64;
                prop_assert_eq!(reconciler.unread_count(), unread);
            }
        }

        #[test]
        fn counter_never_underflows(ops in proptest::collection::vec(op(), 0..64), start in 0u64..4) {
            let mut reconciler = UnreadReconciler::new();
            reconciler.load(HistoryResponse::Envelope { unread_count: Some(start), notifications: None, items: None });
            for op in ops {
                match op {
                    Op::Live(id, read) => { reconciler.apply_live(record(id, read)); }
                    Op::MarkRead(id) => reconciler.mark_read(id),
                    Op::MarkAll => reconciler.mark_all_read(),
                    Op::Remove(id) => { reconciler.remove(id); }
                }
                // u64 arithmetic would panic on underflow in debug builds
                prop_assert!(reconciler.unread_count() <= 64 + start);
            }
        }
    }
}
