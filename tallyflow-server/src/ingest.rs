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

//! Batch ingestion driver.
//!
//! Each record in an inbound batch is processed independently and
//! concurrently; one record's failure never blocks or fails its siblings.
//! Outcomes feed a [`BatchReport`]: records that failed transiently (or
//! unclassifiably) are listed for redelivery, invalid or permanently failed
//! ones are dropped after logging, and duplicates count as successes.

use futures::future;
use tracing::{debug, error, info, warn};

use tallyflow_core::error::{classify, FailureClass};
use tallyflow_storage::increment::{IncrementEngine, IncrementOutcome};

use crate::validate::parse_update_message;

/// One raw record as handed over by the delivery channel.
#[derive(Debug, Clone)]
pub struct QueueRecord {
    /// Delivery-attempt-unique message id; also the dedup key.
    pub message_id: String,
    /// Raw JSON body.
    pub body: String,
}

/// What happened to a batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Message ids the delivery channel should redeliver.
    pub retryable: Vec<String>,
    /// Newly counted records.
    pub processed: usize,
    /// Records whose message id was already counted.
    pub duplicates: usize,
    /// Records dropped for validation or permanent failures.
    pub rejected: usize,
}

enum RecordOutcome {
    Processed,
    Duplicate,
    Rejected,
    Retry(String),
}

/// Process one inbound batch.
pub async fn process_batch(engine: &IncrementEngine, records: &[QueueRecord]) -> BatchReport {
    let outcomes = future::join_all(
        records
            .iter()
            .map(|record| process_record(engine, record)),
    )
    .await;

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            RecordOutcome::Processed => report.processed += 1,
            RecordOutcome::Duplicate => report.duplicates += 1,
            RecordOutcome::Rejected => report.rejected += 1,
            RecordOutcome::Retry(message_id) => report.retryable.push(message_id),
        }
    }

    if !report.retryable.is_empty() {
        warn!(
            total = records.len(),
            failed = report.retryable.len(),
            "batch partially failed"
        );
    }

    report
}

async fn process_record(engine: &IncrementEngine, record: &QueueRecord) -> RecordOutcome {
    let message_id = record.message_id.as_str();

    let update = match parse_update_message(&record.body) {
        Ok(update) => update,
        Err(err) => {
            warn!(message_id, error = %err, permanent = true, "record rejected: invalid input");
            return RecordOutcome::Rejected;
        }
    };

    match engine.increment(&update, message_id).await {
        Ok(IncrementOutcome::Duplicate) => {
            debug!(
                message_id,
                workspace_id = %update.workspace_id,
                "duplicate message skipped"
            );
            RecordOutcome::Duplicate
        }
        Ok(IncrementOutcome::Applied) => {
            info!(
                message_id,
                workspace_id = %update.workspace_id,
                "record processed"
            );
            RecordOutcome::Processed
        }
        Err(err) => match classify(&err) {
            FailureClass::Permanent => {
                error!(message_id, error = %err, permanent = true, "record failed: permanent error");
                RecordOutcome::Rejected
            }
            FailureClass::Transient => {
                warn!(message_id, error = %err, transient = true, "record failed: transient error, will retry");
                RecordOutcome::Retry(record.message_id.clone())
            }
            FailureClass::Unclassified => {
                warn!(
                    message_id,
                    error = %err,
                    transient = true,
                    "record failed: unclassified error, treating as transient"
                );
                RecordOutcome::Retry(record.message_id.clone())
            }
        },
    }
}
