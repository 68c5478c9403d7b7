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

//! Abstract transactional keyed store.
//!
//! Everything the engines need from a backing store: an all-or-nothing
//! multi-key write with additive upserts and conditional creates, and a
//! paginated range read under one partition key. Concrete backends map their
//! own error shapes onto [`StoreError`]; the engines never see backend types.

use async_trait::async_trait;
use tallyflow_core::error::StoreError;

/// One operation inside a transactional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Add `delta` to the record's count, creating it at `delta` if absent,
    /// and (re)set its expiry.
    Add {
        partition_key: String,
        sort_key: String,
        delta: u64,
        expires_at: u64,
    },
    /// Create the record, failing the whole transaction with
    /// [`StoreError::ConditionFailed`] if a live record already exists.
    ConditionalPut {
        partition_key: String,
        sort_key: String,
        expires_at: u64,
    },
}

/// Inclusive sort-key bounds for a range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeyRange {
    pub from: String,
    pub to: String,
}

/// Opaque continuation token returned by a paginated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(pub String);

/// One page of `(sort key, count)` items.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<(String, u64)>,
    pub next: Option<PageToken>,
}

/// Transactional keyed store the engines are written against.
///
/// Constructed once at process start and injected; per-call timeouts and
/// connection management are the backend's concern and surface only as
/// [`StoreError`] values.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Apply all `ops` atomically: either every operation commits or none
    /// does. A failed existence condition cancels the transaction with
    /// `ConditionFailed { op_index }` naming the offending operation.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Read `(sort key, count)` items in `range` under `partition_key`,
    /// one page at a time. Pass the previous page's token to continue.
    async fn range_read(
        &self,
        partition_key: &str,
        range: &SortKeyRange,
        page: Option<PageToken>,
    ) -> Result<Page, StoreError>;
}
