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

//! Idempotent counter increments.
//!
//! One inbound message becomes one transactional write: a dedup marker
//! conditioned on non-existence, plus an hourly and a daily additive upsert
//! for each applicable scope (workspace, and user when present). The marker
//! rides in the same transaction, so "was this message counted" and "is the
//! counter incremented" can never disagree, and a partial apply (say,
//! workspace-hourly without user-daily) is impossible by construction.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use tallyflow_core::config::MetricsConfig;
use tallyflow_core::error::StoreError;
use tallyflow_core::key::{dedup_key, partition_key, sort_key, Granularity, ScopeKind};
use tallyflow_core::message::MetricUpdate;

use crate::store::{TransactionalStore, WriteOp};

/// Dedup marker lifetime. Must exceed the delivery channel's maximum
/// redelivery window (default queue policy: 3 retries * 60s visibility);
/// 24 hours leaves a wide margin. Redeliveries beyond it would be counted
/// again, an accepted bound of the upstream redelivery contract.
pub const DEDUP_TTL_SECS: u64 = 24 * 60 * 60;

/// Result of processing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Counters were incremented.
    Applied,
    /// The message id was already counted; nothing was mutated.
    Duplicate,
}

impl IncrementOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Sole writer of counter records and dedup markers.
pub struct IncrementEngine {
    store: Arc<dyn TransactionalStore>,
    config: MetricsConfig,
}

impl IncrementEngine {
    pub fn new(store: Arc<dyn TransactionalStore>, config: MetricsConfig) -> Self {
        Self { store, config }
    }

    /// Apply one update message under the given delivery-unique message id.
    ///
    /// Returns [`IncrementOutcome::Duplicate`] when the message id was
    /// already counted. Every other store failure propagates unchanged;
    /// retry classification happens at the ingestion boundary.
    pub async fn increment(
        &self,
        update: &MetricUpdate,
        message_id: &str,
    ) -> Result<IncrementOutcome, StoreError> {
        let now = now_epoch_secs();
        let ops = self.build_ops(update, message_id, now);

        match self.store.transact_write(ops).await {
            Ok(()) => {
                debug!(
                    message_id,
                    workspace_id = %update.workspace_id,
                    metric_id = %update.metric_id,
                    count = update.count,
                    "increment applied"
                );
                Ok(IncrementOutcome::Applied)
            }
            // The dedup marker is op 0; its failed condition means this
            // message id was already counted.
            Err(StoreError::ConditionFailed { op_index: 0 }) => Ok(IncrementOutcome::Duplicate),
            Err(error) => Err(error),
        }
    }

    fn build_ops(&self, update: &MetricUpdate, message_id: &str, now: u64) -> Vec<WriteOp> {
        let expires_at = now + self.config.retention_secs();

        let mut scopes = vec![(ScopeKind::Workspace, update.workspace_id.as_str())];
        if let Some(user_id) = &update.user_id {
            scopes.push((ScopeKind::User, user_id.as_str()));
        }

        let marker_key = dedup_key(message_id);
        let mut ops = Vec::with_capacity(1 + scopes.len() * 2);
        ops.push(WriteOp::ConditionalPut {
            partition_key: marker_key.clone(),
            sort_key: marker_key,
            expires_at: now + DEDUP_TTL_SECS,
        });

        for (kind, scope_id) in scopes {
            let pk = partition_key(kind, scope_id, &update.metric_id);

            for granularity in [Granularity::Hourly, Granularity::Daily] {
                ops.push(WriteOp::Add {
                    partition_key: pk.clone(),
                    sort_key: sort_key(granularity, update.date),
                    delta: update.count,
                    expires_at,
                });
            }
        }

        ops
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
