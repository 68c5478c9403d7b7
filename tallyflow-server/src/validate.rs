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

//! Payload validation.
//!
//! Everything crossing the process boundary is checked here, so the engines
//! can assume well-formed input. The identifier alphabet is what makes the
//! `#`-delimited key encoding collision-free, so it is enforced strictly.

use serde_json::Value;
use thiserror::Error;

use tallyflow_core::message::{MetricQuery, MetricUpdate};

/// Longest accepted workspace/user/metric id.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Largest accepted per-message count.
pub const MAX_COUNT: u64 = 1_000_000;

/// Rejected input. Always permanent: validation failures are dropped, never
/// retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Parse and validate one queue message body.
pub fn parse_update_message(body: &str) -> Result<MetricUpdate, ValidationError> {
    let update: MetricUpdate = serde_json::from_str(body)
        .map_err(|err| ValidationError(format!("malformed message body: {err}")))?;

    check_identifier(&update.workspace_id, "workspaceId")?;
    check_identifier(&update.metric_id, "metricId")?;
    if let Some(user_id) = &update.user_id {
        check_identifier(user_id, "userId")?;
    }

    if update.count == 0 {
        return Err(ValidationError("count must be a positive integer".into()));
    }
    if update.count > MAX_COUNT {
        return Err(ValidationError(format!("count must be at most {MAX_COUNT}")));
    }
    if update.schema_version == 0 {
        return Err(ValidationError("schemaVersion must be positive".into()));
    }

    Ok(update)
}

/// Parse and validate one query request.
pub fn parse_query_request(
    request: Value,
    max_range_days: u32,
) -> Result<MetricQuery, ValidationError> {
    let query: MetricQuery = serde_json::from_value(request)
        .map_err(|err| ValidationError(format!("malformed request: {err}")))?;

    check_identifier(&query.workspace_id, "workspaceId")?;
    check_identifier(&query.metric_id, "metricId")?;
    if let Some(user_id) = &query.user_id {
        check_identifier(user_id, "userId")?;
    }

    if query.to_date < query.from_date {
        return Err(ValidationError("toDate must not be before fromDate".into()));
    }

    let span_days = query.from_date.days_until(&query.to_date);
    if span_days > i64::from(max_range_days) {
        return Err(ValidationError(format!(
            "date range exceeds maximum of {max_range_days} days"
        )));
    }

    Ok(query)
}

fn check_identifier(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError(format!(
            "{field} is required and must be a non-empty string"
        )));
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError(format!(
            "{field} must be at most {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }

    let allowed = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !allowed {
        return Err(ValidationError(format!(
            "{field} must contain only alphanumeric characters, hyphens, and underscores"
        )));
    }

    Ok(())
}
