//! # Query Cache
//!
//! Holds one [`QueryEntry`] per [`QueryKey`] together with the tag index:
//! `tag → keys currently tagged with it`. A successful mutation hands its
//! invalidated tags to [`QueryCache::invalidate`], which marks every indexed
//! entry stale. Stale entries are refetched on their next observation, or
//! right away when somebody is subscribed.
//!
//! Entries are reference-counted by subscribers. Once the last subscriber
//! leaves, the entry survives for `keep_unused_for` and is then evicted by
//! [`QueryCache::collect_garbage`], which the API runs when the window runs
//! out. A zero duration evicts on unsubscribe.
//!
//! Data is only ever replaced on success. A failed fetch records its error
//! and leaves whatever data was cached before in place.

use crate::endpoints::Tag;
use crate::error::RequestError;
use crate::lifecycle::RequestStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Operation name plus canonical JSON of the argument.
///
/// `serde_json` maps keep their keys sorted, so two arguments that serialize
/// to the same object produce the same key regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey {
    pub endpoint: &'static str,
    pub arg: String,
}

impl QueryKey {
    pub fn new(endpoint: &'static str, arg: &Value) -> Self {
        Self {
            endpoint,
            arg: arg.to_string(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.arg)
    }
}

#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub arg: Value,
    pub data: Option<Value>,
    pub status: RequestStatus,
    pub error: Option<RequestError>,
    pub tags: BTreeSet<Tag>,
    pub stale: bool,
    pub subscribers: usize,
    pub request_id: Option<Uuid>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    unused_since: Option<Instant>,
}

impl QueryEntry {
    fn new(arg: Value) -> Self {
        Self {
            arg,
            data: None,
            status: RequestStatus::Idle,
            error: None,
            tags: BTreeSet::new(),
            stale: false,
            subscribers: 0,
            request_id: None,
            fulfilled_at: None,
            unused_since: Some(Instant::now()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryEntry>,
    index: HashMap<Tag, BTreeSet<QueryKey>>,
    keep_unused_for: Duration,
}

impl QueryCache {
    pub fn new(keep_unused_for: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            index: HashMap::new(),
            keep_unused_for,
        }
    }

    pub fn keep_unused_for(&self) -> Duration {
        self.keep_unused_for
    }

    pub fn get(&self, key: &QueryKey) -> Option<&QueryEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.keys()
    }

    /// Keys currently tagged with `tag`.
    pub fn keys_for(&self, tag: &Tag) -> Vec<QueryKey> {
        self.index
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.stale)
    }

    pub fn is_observed(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.subscribers > 0)
    }

    /// Whether observing `key` now has to go to the network.
    pub fn needs_fetch(&self, key: &QueryKey) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) if entry.is_pending() => false,
            Some(entry) => entry.stale || entry.data.is_none(),
        }
    }

    pub fn subscribe(&mut self, key: &QueryKey, arg: &Value) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(arg.clone()));
        entry.subscribers += 1;
        entry.unused_since = None;
    }

    /// Drops one subscriber. Returns `true` when the entry is now unused and
    /// kept, so its keep window has started.
    pub fn unsubscribe(&mut self, key: &QueryKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return false;
        }
        entry.unused_since = Some(Instant::now());
        if self.keep_unused_for.is_zero() && !entry.is_pending() {
            self.remove(key);
            return false;
        }
        true
    }

    /// Records a request going out for `key`.
    ///
    /// Clears the stale flag: the response will reflect everything
    /// invalidated up to this point. An invalidation arriving while the
    /// request is in flight sets it again.
    pub fn begin(&mut self, key: &QueryKey, arg: &Value, request_id: Uuid) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(arg.clone()));
        entry.status = RequestStatus::Pending;
        entry.request_id = Some(request_id);
        entry.stale = false;
    }

    /// Stores fetched data and re-indexes the entry under `tags`.
    ///
    /// Returns `false` when the result was discarded because nobody observes
    /// the key any more and unused entries are not kept.
    pub fn settle_success(&mut self, key: &QueryKey, data: Value, tags: Vec<Tag>) -> bool {
        let discard = match self.entries.get(key) {
            None => return false,
            Some(entry) => entry.subscribers == 0 && self.keep_unused_for.is_zero(),
        };
        if discard {
            debug!(%key, "discarding result for unobserved query");
            self.remove(key);
            return false;
        }

        let new_tags: BTreeSet<Tag> = tags.into_iter().collect();
        let old_tags = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.data = Some(data);
                entry.status = RequestStatus::Fulfilled;
                entry.error = None;
                entry.fulfilled_at = Some(Utc::now());
                std::mem::replace(&mut entry.tags, new_tags.clone())
            }
            None => return false,
        };
        self.unindex(key, &old_tags);
        for tag in new_tags {
            self.index.entry(tag).or_default().insert(key.clone());
        }
        true
    }

    /// Records a failed fetch. Cached data and tags are left alone; if data
    /// exists it is now known to be out of date, so the entry stays stale.
    pub fn settle_failure(&mut self, key: &QueryKey, error: RequestError) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.status = RequestStatus::Rejected;
        entry.error = Some(error);
        entry.stale = entry.data.is_some();
        if entry.subscribers == 0 && self.keep_unused_for.is_zero() {
            self.remove(key);
            return false;
        }
        true
    }

    /// Marks every entry tagged with any of `tags` stale.
    ///
    /// Returns the affected keys, sorted and without duplicates.
    pub fn invalidate(&mut self, tags: &[Tag]) -> Vec<QueryKey> {
        let mut affected = BTreeSet::new();
        for tag in tags {
            if let Some(keys) = self.index.get(tag) {
                affected.extend(keys.iter().cloned());
            }
        }
        for key in &affected {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.stale = true;
            }
        }
        if !affected.is_empty() {
            debug!(
                tags = %tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(","),
                count = affected.len(),
                "invalidated cached queries"
            );
        }
        affected.into_iter().collect()
    }

    /// Evicts entries nobody has observed for `keep_unused_for`.
    /// Pending entries are never evicted.
    pub fn collect_garbage(&mut self, now: Instant) -> Vec<QueryKey> {
        let expired: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.subscribers == 0 && !entry.is_pending())
            .filter(|(_, entry)| {
                entry
                    .unused_since
                    .is_some_and(|since| now.saturating_duration_since(since) >= self.keep_unused_for)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired
    }

    fn remove(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.unindex(key, &entry.tags);
        }
    }

    fn unindex(&mut self, key: &QueryKey, tags: &BTreeSet<Tag>) {
        for tag in tags {
            if let Some(keys) = self.index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.index.remove(tag);
                }
            }
        }
    }
}
