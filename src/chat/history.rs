//! Bounded, paginated message history.
//!
//! Global messages live in a FIFO of at most [`HISTORY_CAPACITY`] records.
//! Private messages are minted with the same id sequence but never stored.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::ConnId;

pub const HISTORY_CAPACITY: usize = 200;
pub const PAGE_SIZE: usize = 20;

/// Message identifier: wall-clock milliseconds, bumped past the previous id
/// whenever two messages land in the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    fn next_at(&mut self, now_ms: u64) -> MessageId {
        self.last = now_ms.max(self.last.saturating_add(1));
        MessageId(self.last)
    }
}

fn unix_millis(at: OffsetDateTime) -> u64 {
    u64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: String,
    pub sender_id: ConnId,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub read_by: Vec<ConnId>,
    pub reactions: BTreeMap<ConnId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub id: MessageId,
    pub sender: String,
    pub sender_id: ConnId,
    pub receiver_id: ConnId,
    pub message: String,
    pub is_private: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug)]
pub struct MessageLog {
    messages: VecDeque<Message>,
    capacity: usize,
    ids: IdGenerator,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl MessageLog {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
            ids: IdGenerator::default(),
        }
    }

    fn mint(&mut self) -> (MessageId, OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        (self.ids.next_at(unix_millis(now)), now)
    }

    /// Appends a new global message, evicting the oldest one past capacity.
    pub fn append(&mut self, sender_id: ConnId, sender: &str, body: String) -> Message {
        let (id, timestamp) = self.mint();
        let message = Message {
            id,
            sender: sender.to_owned(),
            sender_id,
            message: body,
            timestamp,
            read_by: Vec::new(),
            reactions: BTreeMap::new(),
        };
        self.messages.push_back(message.clone());
        if self.messages.len() > self.capacity {
            self.messages.pop_front();
        }

        message
    }

    /// Builds a transient private message. It shares the id sequence but is
    /// not kept.
    pub fn private(
        &mut self,
        sender_id: ConnId,
        sender: &str,
        receiver_id: ConnId,
        body: String,
    ) -> PrivateMessage {
        let (id, timestamp) = self.mint();
        PrivateMessage {
            id,
            sender: sender.to_owned(),
            sender_id,
            receiver_id,
            message: body,
            is_private: true,
            timestamp,
        }
    }

    /// Returns `page` (1-based, 0 treated as 1) counted back from the newest
    /// message, newest first. Past the end of history this is empty.
    pub fn paginate(&self, page: usize, page_size: usize) -> Vec<Message> {
        let skip = page.max(1).saturating_sub(1).saturating_mul(page_size);
        let Some(end) = self.messages.len().checked_sub(skip) else {
            return Vec::new();
        };
        let start = end.saturating_sub(page_size);

        self.messages
            .range(start..end)
            .rev()
            .cloned()
            .collect()
    }

    fn find_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let index = self
            .messages
            .binary_search_by_key(&id, |message| message.id)
            .ok()?;
        self.messages.get_mut(index)
    }

    /// Sets `reactor`'s reaction, replacing any earlier one. Returns the full
    /// reaction map, or `None` when the message is unknown or evicted.
    pub fn react(
        &mut self,
        id: MessageId,
        reactor: ConnId,
        reaction: String,
    ) -> Option<&BTreeMap<ConnId, String>> {
        let message = self.find_mut(id)?;
        message.reactions.insert(reactor, reaction);
        Some(&message.reactions)
    }

    /// Records `reader` on every known message in `ids`. Unknown ids and
    /// repeats are ignored.
    pub fn mark_read(&mut self, ids: &[MessageId], reader: ConnId) {
        for &id in ids {
            if let Some(message) = self.find_mut(id) {
                if !message.read_by.contains(&reader) {
                    message.read_by.push(reader);
                }
            }
        }
    }

    /// Oldest-first copy of everything stored.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }
}
