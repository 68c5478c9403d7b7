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

//! Tallyflow Core
//!
//! Domain types for time-bucketed usage-metric aggregation: hour-resolution
//! timestamps, storage key construction, range segmentation, and the store
//! failure taxonomy. Everything in this crate is pure; all I/O lives in the
//! storage and query crates.

pub mod config;
pub mod error;
pub mod key;
pub mod message;
pub mod segment;
pub mod time;

pub use config::{MetricsConfig, DEFAULT_MAX_QUERY_RANGE_DAYS, DEFAULT_RETENTION_DAYS};
pub use error::{classify, FailureClass, ServiceErrorKind, StoreError};
pub use key::{dedup_key, partition_key, sort_key, Granularity, ScopeKind};
pub use message::{MetricQuery, MetricUpdate, UPDATE_SCHEMA_VERSION};
pub use segment::{plan_segments, QuerySegment};
pub use time::{DateHour, DateHourParseError};
