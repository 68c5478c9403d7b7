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

//! Inbound message and query types.
//!
//! Field-level bounds (identifier alphabet, count cap, range span) are
//! enforced by the server-side validators; the engines assume instances of
//! these types are already well-formed.

use serde::{Deserialize, Serialize};

use crate::time::DateHour;

/// Current wire schema version for update messages.
pub const UPDATE_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    UPDATE_SCHEMA_VERSION
}

/// One "increment metric X by N at hour T for workspace/user Y" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricUpdate {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub workspace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub metric_id: String,
    pub count: u64,
    pub date: DateHour,
}

/// A total-count question over an inclusive hour range.
///
/// With `user_id` present the query reads the user-scoped counters; without
/// it, the workspace-scoped ones. The two are disjoint views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub workspace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub metric_id: String,
    pub from_date: DateHour,
    pub to_date: DateHour,
}
