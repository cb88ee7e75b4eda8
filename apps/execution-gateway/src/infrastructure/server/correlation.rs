//! Correlation index: message id to reply address.
//!
//! Each entry is consumed exactly once. The index is shared between the
//! decode path that records and the send path that takes.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

use crate::domain::shared::MessageId;
use crate::infrastructure::transport::peer_label;

/// Maps inbound message ids to the peer that should receive the reply.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIndex {
    entries: Arc<DashMap<MessageId, Bytes>>,
}

impl CorrelationIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember where the reply to `message_id` goes.
    ///
    /// A reused id replaces the older address.
    pub fn record(&self, message_id: MessageId, peer: Bytes) {
        let label = peer_label(&peer);
        if let Some(previous) = self.entries.insert(message_id.clone(), peer) {
            tracing::warn!(
                message_id = %message_id,
                previous_peer = %peer_label(&previous),
                peer = %label,
                "Message id reused before its reply was sent"
            );
        }
    }

    /// Remove and return the reply address for `message_id`.
    #[must_use]
    pub fn take(&self, message_id: &MessageId) -> Option<Bytes> {
        self.entries.remove(message_id).map(|(_, peer)| peer)
    }

    /// Returns true if a reply to `message_id` is still owed.
    #[must_use]
    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.entries.contains_key(message_id)
    }

    /// Number of replies still owed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no replies are owed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_consumed_once() {
        let index = CorrelationIndex::new();
        let id = MessageId::new("M-1");
        index.record(id.clone(), Bytes::from_static(b"peer-a"));

        assert!(index.contains(&id));
        assert_eq!(index.take(&id), Some(Bytes::from_static(b"peer-a")));
        assert_eq!(index.take(&id), None);
        assert!(index.is_empty());
    }

    #[test]
    fn reused_id_keeps_latest_peer() {
        let index = CorrelationIndex::new();
        let id = MessageId::new("M-1");
        index.record(id.clone(), Bytes::from_static(b"peer-a"));
        index.record(id.clone(), Bytes::from_static(b"peer-b"));

        assert_eq!(index.len(), 1);
        assert_eq!(index.take(&id), Some(Bytes::from_static(b"peer-b")));
    }

    #[test]
    fn concurrent_takers_see_each_entry_once() {
        let index = CorrelationIndex::new();
        let ids: Vec<MessageId> = (0..500).map(|i| MessageId::new(format!("M-{i}"))).collect();
        for id in &ids {
            index.record(id.clone(), Bytes::from_static(b"peer"));
        }

        let taken: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let index = index.clone();
                    let ids = &ids;
                    scope.spawn(move || ids.iter().filter(|id| index.take(id).is_some()).count())
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });

        assert_eq!(taken, ids.len());
        assert!(index.is_empty());
    }
}
