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

//! Query driver.
//!
//! Adapts one raw request into a [`QueryEngine`] call and shapes the result
//! into either a success payload (the request echoed back with the count) or
//! a structured error payload telling the caller whether a retry can help.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use tallyflow_core::config::MetricsConfig;
use tallyflow_core::error::{classify, FailureClass};
use tallyflow_core::time::DateHour;
use tallyflow_query::QueryEngine;

use crate::validate::parse_query_request;

/// Successful query payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub metric_id: String,
    pub from_date: DateHour,
    pub to_date: DateHour,
    pub count: u64,
}

/// Error payload body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// Error payload wrapper.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryErrorResponse {
    pub error: ErrorBody,
}

/// Either outcome, serialized as the corresponding payload shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueryReply {
    Success(QueryResponse),
    Failure(QueryErrorResponse),
}

impl QueryReply {
    fn failure(code: &str, message: impl Into<String>, request_id: &str, retryable: Option<bool>) -> Self {
        Self::Failure(QueryErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                request_id: request_id.to_string(),
                retryable,
            },
        })
    }
}

/// Run one query request end to end.
pub async fn handle_query(
    engine: &QueryEngine,
    config: &MetricsConfig,
    request: Value,
    request_id: &str,
) -> QueryReply {
    let query = match parse_query_request(request, config.max_query_range_days) {
        Ok(query) => query,
        Err(err) => {
            warn!(request_id, error = %err, "validation failed");
            return QueryReply::failure("VALIDATION_ERROR", err.to_string(), request_id, None);
        }
    };

    match engine.query_count(&query).await {
        Ok(count) => {
            info!(request_id, metric_id = %query.metric_id, count, "query completed");
            QueryReply::Success(QueryResponse {
                workspace_id: query.workspace_id,
                user_id: query.user_id,
                metric_id: query.metric_id,
                from_date: query.from_date,
                to_date: query.to_date,
                count,
            })
        }
        Err(err) => {
            let retryable = classify(&err) == FailureClass::Transient;
            error!(
                request_id,
                error = %err,
                retryable,
                metric_id = %query.metric_id,
                workspace_id = %query.workspace_id,
                "query failed"
            );

            let code = if retryable { "TRANSIENT_ERROR" } else { "INTERNAL_ERROR" };
            QueryReply::failure(code, "query failed", request_id, Some(retryable))
        }
    }
}
