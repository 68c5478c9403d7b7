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

//! Storage key construction.
//!
//! # Key Encoding
//!
//! ```text
//! partition key:  WSP#{workspace_id}#MET#{metric_id}
//!                 USR#{user_id}#MET#{metric_id}
//! sort key:       H#YYYY-MM-DDThh   (hourly counter)
//!                 D#YYYY-MM-DD      (daily rollup)
//! dedup marker:   DEDUP#{message_id}   (partition key == sort key)
//! ```
//!
//! Workspace and user counters live in disjoint partition namespaces, so a
//! user-scoped query can never read workspace totals and vice versa. The
//! granularity prefix on the sort key keeps hourly and daily records range-
//! scannable independently under one partition. Scope and metric ids are
//! restricted upstream to `[A-Za-z0-9_-]`, so the `#` delimiters cannot be
//! forged from inside an id.

use crate::time::DateHour;

const WORKSPACE_PREFIX: &str = "WSP#";
const USER_PREFIX: &str = "USR#";
const METRIC_INFIX: &str = "#MET#";
const HOURLY_PREFIX: &str = "H#";
const DAILY_PREFIX: &str = "D#";
const DEDUP_PREFIX: &str = "DEDUP#";

/// Which namespace a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Workspace,
    User,
}

/// Time resolution of a stored counter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
}

/// Partition key for a (scope, metric) counter family.
pub fn partition_key(kind: ScopeKind, scope_id: &str, metric_id: &str) -> String {
    let prefix = match kind {
        ScopeKind::Workspace => WORKSPACE_PREFIX,
        ScopeKind::User => USER_PREFIX,
    };

    format!("{prefix}{scope_id}{METRIC_INFIX}{metric_id}")
}

/// Sort key for one time bucket. Hourly keys keep full hour resolution;
/// daily keys truncate to the calendar date.
pub fn sort_key(granularity: Granularity, at: DateHour) -> String {
    match granularity {
        Granularity::Hourly => format!("{HOURLY_PREFIX}{at}"),
        Granularity::Daily => format!("{DAILY_PREFIX}{}", at.date().format("%Y-%m-%d")),
    }
}

/// Key of the deduplication marker for one delivery attempt.
pub fn dedup_key(message_id: &str) -> String {
    format!("{DEDUP_PREFIX}{message_id}")
}
