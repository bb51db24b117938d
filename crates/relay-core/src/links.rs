use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, MessageId};

/// Where a forwarded copy in the admin chat came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub user_id: ChatId,
    pub user_msg_id: MessageId,
}

/// Admin-side forwarded message id -> origin, bounded with FIFO eviction.
///
/// Eviction follows insertion order only; lookups never refresh an entry.
#[derive(Clone, Debug)]
pub struct LinkTable {
    capacity: usize,
    order: VecDeque<MessageId>,
    records: HashMap<MessageId, LinkRecord>,
}

impl LinkTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            records: HashMap::new(),
        }
    }

    /// Rebuild from persisted entries given oldest first; only the newest
    /// `capacity` survive.
    pub fn from_entries(
        capacity: usize,
        entries: impl IntoIterator<Item = (MessageId, LinkRecord)>,
    ) -> Self {
        let mut table = Self::new(capacity);
        for (id, record) in entries {
            table.insert(id, record);
        }
        table
    }

    /// Record a link and return the evicted entries (oldest first).
    ///
    /// Re-inserting a known id updates its record in place without moving it.
    pub fn insert(&mut self, id: MessageId, record: LinkRecord) -> Vec<MessageId> {
        if let Some(existing) = self.records.get_mut(&id) {
            *existing = record;
            return Vec::new();
        }

        self.order.push_back(id);
        self.records.insert(id, record);

        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.records.remove(&old);
                evicted.push(old);
            }
        }
        evicted
    }

    pub fn get(&self, id: MessageId) -> Option<&LinkRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (MessageId, &LinkRecord)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.records.get(id).map(|r| (*id, r)))
    }
}
