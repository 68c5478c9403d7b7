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

//! Count queries over the segmented key space.

use std::sync::Arc;

use futures::future;
use tracing::debug;

use tallyflow_core::error::StoreError;
use tallyflow_core::key::{partition_key, sort_key, ScopeKind};
use tallyflow_core::message::MetricQuery;
use tallyflow_core::segment::{plan_segments, QuerySegment};
use tallyflow_storage::store::{PageToken, SortKeyRange, TransactionalStore};

/// Read-only engine answering total-count queries.
pub struct QueryEngine {
    store: Arc<dyn TransactionalStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn TransactionalStore>) -> Self {
        Self { store }
    }

    /// Total count for one scope and metric over an inclusive hour range.
    ///
    /// All planned segments are read concurrently and each is paginated to
    /// exhaustion. Every segment contributes to the exact sum, so there are
    /// no partial results: any unrecovered read failure fails the query.
    pub async fn query_count(&self, query: &MetricQuery) -> Result<u64, StoreError> {
        let pk = match &query.user_id {
            Some(user_id) => partition_key(ScopeKind::User, user_id, &query.metric_id),
            None => partition_key(ScopeKind::Workspace, &query.workspace_id, &query.metric_id),
        };

        let segments = plan_segments(query.from_date, query.to_date);
        debug!(
            metric_id = %query.metric_id,
            segments = segments.len(),
            "query planned"
        );

        let totals = future::try_join_all(
            segments
                .iter()
                .map(|segment| self.sum_segment(&pk, segment)),
        )
        .await?;

        Ok(totals.into_iter().sum())
    }

    async fn sum_segment(&self, pk: &str, segment: &QuerySegment) -> Result<u64, StoreError> {
        let range = SortKeyRange {
            from: sort_key(segment.granularity, segment.from),
            to: sort_key(segment.granularity, segment.to),
        };

        let mut total: u64 = 0;
        let mut token: Option<PageToken> = None;

        loop {
            let page = self.store.range_read(pk, &range, token).await?;
            total += page.items.iter().map(|(_, count)| *count).sum::<u64>();

            match page.next {
                Some(next) => token = Some(next),
                None => return Ok(total),
            }
        }
    }
}
