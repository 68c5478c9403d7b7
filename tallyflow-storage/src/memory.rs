// Copyright 2025 Tallyflow (https://github.com/tallyflow)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! In-memory store.
//!
//! Reference implementation of [`TransactionalStore`] over a `BTreeMap`,
//! matching the contract a production keyed store provides: all-or-nothing
//! transactions, per-key additive updates, conditional creates, TTL-style
//! expiry (expired records are invisible and reclaimable), and paginated
//! range reads. Used by tests and local runs.

use std::collections::BTreeMap;
use std::ops::Bound::Included;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tallyflow_core::error::StoreError;

use crate::store::{Page, PageToken, SortKeyRange, TransactionalStore, WriteOp};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct StoredRecord {
    count: u64,
    expires_at: u64,
}

/// In-memory transactional keyed store.
pub struct InMemoryStore {
    records: RwLock<BTreeMap<(String, String), StoredRecord>>,
    next_failure: Mutex<Option<StoreError>>,
    page_size: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Smaller pages force the engines through their pagination loops.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_failure: Mutex::new(None),
            page_size: page_size.max(1),
        }
    }

    /// Test hook: the next store call (write or read) fails with `error`
    /// instead of executing.
    pub fn inject_failure(&self, error: StoreError) {
        *self.next_failure.lock() = Some(error);
    }

    /// Raw count for one key, ignoring pagination. Test helper.
    pub fn record_count(&self, partition_key: &str, sort_key: &str) -> Option<u64> {
        let now = now_epoch_secs();
        self.records
            .read()
            .get(&(partition_key.to_string(), sort_key.to_string()))
            .filter(|record| record.expires_at > now)
            .map(|record| record.count)
    }

    fn take_injected_failure(&self) -> Option<StoreError> {
        self.next_failure.lock().take()
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }

        let now = now_epoch_secs();
        let mut records = self.records.write();

        // Validate every condition before touching anything, so a failure
        // leaves the map exactly as it was.
        for (op_index, op) in ops.iter().enumerate() {
            if let WriteOp::ConditionalPut {
                partition_key,
                sort_key,
                ..
            } = op
            {
                let exists = records
                    .get(&(partition_key.clone(), sort_key.clone()))
                    .is_some_and(|record| record.expires_at > now);

                if exists {
                    return Err(StoreError::ConditionFailed { op_index });
                }
            }
        }

        for op in ops {
            match op {
                WriteOp::Add {
                    partition_key,
                    sort_key,
                    delta,
                    expires_at,
                } => {
                    let entry = records
                        .entry((partition_key, sort_key))
                        .or_insert(StoredRecord {
                            count: 0,
                            expires_at,
                        });
                    // A record past its expiry is gone; the write recreates it.
                    if entry.expires_at <= now {
                        entry.count = 0;
                    }
                    entry.count += delta;
                    entry.expires_at = expires_at;
                }
                WriteOp::ConditionalPut {
                    partition_key,
                    sort_key,
                    expires_at,
                } => {
                    records.insert(
                        (partition_key, sort_key),
                        StoredRecord {
                            count: 0,
                            expires_at,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    async fn range_read(
        &self,
        partition_key: &str,
        range: &SortKeyRange,
        page: Option<PageToken>,
    ) -> Result<Page, StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }

        let now = now_epoch_secs();
        let start = match &page {
            Some(PageToken(last_seen)) => last_seen.clone(),
            None => range.from.clone(),
        };

        let records = self.records.read();
        let mut items = Vec::new();
        let mut next = None;

        let bounds = (
            Included((partition_key.to_string(), start)),
            Included((partition_key.to_string(), range.to.clone())),
        );

        for ((_, sort_key), record) in records.range(bounds) {
            // The page token names the last sort key already returned.
            if page
                .as_ref()
                .is_some_and(|PageToken(last_seen)| sort_key == last_seen)
            {
                continue;
            }

            if record.expires_at <= now {
                continue;
            }

            if items.len() == self.page_size {
                next = items
                    .last()
                    .map(|(sort_key, _): &(String, u64)| PageToken(sort_key.clone()));
                break;
            }

            items.push((sort_key.clone(), record.count));
        }

        Ok(Page { items, next })
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyflow_core::error::ServiceErrorKind;

    fn add(pk: &str, sk: &str, delta: u64) -> WriteOp {
        WriteOp::Add {
            partition_key: pk.to_string(),
            sort_key: sk.to_string(),
            delta,
            expires_at: now_epoch_secs() + 3600,
        }
    }

    fn put(pk: &str, sk: &str, expires_at: u64) -> WriteOp {
        WriteOp::ConditionalPut {
            partition_key: pk.to_string(),
            sort_key: sk.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn add_creates_then_accumulates() {
        let store = InMemoryStore::new();

        store.transact_write(vec![add("p", "s", 2)]).await.unwrap();
        store.transact_write(vec![add("p", "s", 3)]).await.unwrap();

        assert_eq!(store.record_count("p", "s"), Some(5));
    }

    #[tokio::test]
    async fn conditional_put_fails_on_live_record() {
        let store = InMemoryStore::new();
        let live = now_epoch_secs() + 3600;

        store.transact_write(vec![put("p", "s", live)]).await.unwrap();

        let err = store
            .transact_write(vec![put("p", "s", live)])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::ConditionFailed { op_index: 0 });
    }

    #[tokio::test]
    async fn conditional_put_succeeds_over_expired_record() {
        let store = InMemoryStore::new();

        store.transact_write(vec![put("p", "s", 1)]).await.unwrap();

        // Expiry in the past: the key is reclaimable.
        store
            .transact_write(vec![put("p", "s", now_epoch_secs() + 3600)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_condition_rolls_back_the_whole_transaction() {
        let store = InMemoryStore::new();
        let live = now_epoch_secs() + 3600;

        store.transact_write(vec![put("p", "marker", live)]).await.unwrap();

        let err = store
            .transact_write(vec![put("p", "marker", live), add("p", "counter", 7)])
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::ConditionFailed { op_index: 0 });
        assert_eq!(store.record_count("p", "counter"), None);
    }

    #[tokio::test]
    async fn range_read_is_inclusive_and_partition_scoped() {
        let store = InMemoryStore::new();

        store
            .transact_write(vec![
                add("p", "H#2024-06-15T05", 1),
                add("p", "H#2024-06-15T06", 2),
                add("p", "H#2024-06-15T07", 4),
                add("other", "H#2024-06-15T06", 100),
            ])
            .await
            .unwrap();

        let page = store
            .range_read(
                "p",
                &SortKeyRange {
                    from: "H#2024-06-15T05".into(),
                    to: "H#2024-06-15T06".into(),
                },
                None,
            )
            .await
            .unwrap();

        let counts: Vec<u64> = page.items.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![1, 2]);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn range_read_paginates_until_exhausted() {
        let store = InMemoryStore::with_page_size(2);

        store
            .transact_write(vec![
                add("p", "H#2024-06-15T00", 1),
                add("p", "H#2024-06-15T01", 1),
                add("p", "H#2024-06-15T02", 1),
                add("p", "H#2024-06-15T03", 1),
                add("p", "H#2024-06-15T04", 1),
            ])
            .await
            .unwrap();

        let range = SortKeyRange {
            from: "H#2024-06-15T00".into(),
            to: "H#2024-06-15T23".into(),
        };

        let mut total = 0;
        let mut pages = 0;
        let mut token = None;
        loop {
            let page = store.range_read("p", &range, token).await.unwrap();
            total += page.items.iter().map(|(_, c)| *c).sum::<u64>();
            pages += 1;
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        assert_eq!(total, 5);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = InMemoryStore::new();
        store.inject_failure(StoreError::service(ServiceErrorKind::Throttling, "busy"));

        let err = store.transact_write(vec![add("p", "s", 1)]).await.unwrap_err();
        assert!(matches!(err, StoreError::Service { .. }));

        // Next call goes through.
        store.transact_write(vec![add("p", "s", 1)]).await.unwrap();
        assert_eq!(store.record_count("p", "s"), Some(1));
    }
}
