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

//! End-to-end tests across the ingestion and query drivers.

use std::sync::Arc;

use serde_json::json;

use tallyflow_core::config::MetricsConfig;
use tallyflow_query::QueryEngine;
use tallyflow_server::ingest::{process_batch, QueueRecord};
use tallyflow_server::query::{handle_query, QueryReply};
use tallyflow_storage::increment::IncrementEngine;
use tallyflow_storage::memory::InMemoryStore;

fn rig() -> (Arc<InMemoryStore>, IncrementEngine, QueryEngine) {
    let store = Arc::new(InMemoryStore::with_page_size(4));
    let writer = IncrementEngine::new(store.clone(), MetricsConfig::default());
    let reader = QueryEngine::new(store.clone());
    (store, writer, reader)
}

fn record(message_id: &str, body: serde_json::Value) -> QueueRecord {
    QueueRecord {
        message_id: message_id.to_string(),
        body: body.to_string(),
    }
}

async fn count(reader: &QueryEngine, request: serde_json::Value) -> u64 {
    match handle_query(reader, &MetricsConfig::default(), request, "test").await {
        QueryReply::Success(response) => response.count,
        QueryReply::Failure(failure) => panic!("query failed: {:?}", failure.error),
    }
}

#[tokio::test]
async fn ingested_batches_are_queryable_per_scope() {
    let (_, writer, reader) = rig();

    let batch = vec![
        record("m-1", json!({
            "workspaceId": "acme", "userId": "u_1", "metricId": "report-export",
            "count": 2, "date": "2024-06-15T05"
        })),
        record("m-2", json!({
            "workspaceId": "acme", "userId": "u_2", "metricId": "report-export",
            "count": 3, "date": "2024-06-15T09"
        })),
        record("m-3", json!({
            "workspaceId": "acme", "metricId": "report-export",
            "count": 5, "date": "2024-06-16T00"
        })),
    ];

    let report = process_batch(&writer, &batch).await;
    assert_eq!(report.processed, 3);
    assert!(report.retryable.is_empty());

    let workspace_total = count(
        &reader,
        json!({
            "workspaceId": "acme", "metricId": "report-export",
            "fromDate": "2024-06-15T00", "toDate": "2024-06-16T23"
        }),
    )
    .await;
    assert_eq!(workspace_total, 10);

    let user_total = count(
        &reader,
        json!({
            "workspaceId": "acme", "userId": "u_1", "metricId": "report-export",
            "fromDate": "2024-06-15T00", "toDate": "2024-06-16T23"
        }),
    )
    .await;
    assert_eq!(user_total, 2);
}

#[tokio::test]
async fn redelivered_records_do_not_double_count() {
    let (_, writer, reader) = rig();

    let batch = vec![record("m-1", json!({
        "workspaceId": "acme", "metricId": "m", "count": 7, "date": "2024-06-15T05"
    }))];

    process_batch(&writer, &batch).await;
    // Simulated redelivery of the same message id.
    let second = process_batch(&writer, &batch).await;
    assert_eq!(second.duplicates, 1);

    let total = count(
        &reader,
        json!({
            "workspaceId": "acme", "metricId": "m",
            "fromDate": "2024-06-15T00", "toDate": "2024-06-15T23"
        }),
    )
    .await;
    assert_eq!(total, 7);
}

#[tokio::test]
async fn one_bad_record_does_not_poison_the_batch() {
    let (_, writer, reader) = rig();

    let batch = vec![
        record("m-1", json!({
            "workspaceId": "acme", "metricId": "m", "count": 1, "date": "2024-06-15T05"
        })),
        record("m-2", json!({
            "workspaceId": "acme", "metricId": "m", "count": 0, "date": "2024-06-15T05"
        })),
        record("m-3", json!({
            "workspaceId": "acme", "metricId": "m", "count": 2, "date": "2024-06-15T06"
        })),
    ];

    let report = process_batch(&writer, &batch).await;
    assert_eq!(report.processed, 2);
    assert_eq!(report.rejected, 1);
    assert!(report.retryable.is_empty());

    let total = count(
        &reader,
        json!({
            "workspaceId": "acme", "metricId": "m",
            "fromDate": "2024-06-15T00", "toDate": "2024-06-15T23"
        }),
    )
    .await;
    assert_eq!(total, 3);
}

#[tokio::test]
async fn leap_day_range_spans_correctly() {
    let (_, writer, reader) = rig();

    let batch = vec![
        record("m-1", json!({
            "workspaceId": "acme", "metricId": "m", "count": 1, "date": "2024-02-28T23"
        })),
        record("m-2", json!({
            "workspaceId": "acme", "metricId": "m", "count": 2, "date": "2024-02-29T12"
        })),
        record("m-3", json!({
            "workspaceId": "acme", "metricId": "m", "count": 4, "date": "2024-03-01T00"
        })),
        record("m-4", json!({
            "workspaceId": "acme", "metricId": "m", "count": 8, "date": "2024-03-02T19"
        })),
    ];
    let report = process_batch(&writer, &batch).await;
    assert_eq!(report.processed, 4);

    let total = count(
        &reader,
        json!({
            "workspaceId": "acme", "metricId": "m",
            "fromDate": "2024-02-28T12", "toDate": "2024-03-02T18"
        }),
    )
    .await;
    // Excludes only the T19 increment on 03-02.
    assert_eq!(total, 1 + 2 + 4);
}

#[tokio::test]
async fn range_span_cap_is_enforced_at_the_driver() {
    let (_, _, reader) = rig();

    let config = MetricsConfig {
        retention_days: 90,
        max_query_range_days: 30,
    };

    let reply = handle_query(
        &reader,
        &config,
        json!({
            "workspaceId": "acme", "metricId": "m",
            "fromDate": "2024-01-01T00", "toDate": "2024-03-01T23"
        }),
        "req-cap",
    )
    .await;

    let QueryReply::Failure(failure) = reply else {
        panic!("expected failure payload");
    };
    assert_eq!(failure.error.code, "VALIDATION_ERROR");
}
