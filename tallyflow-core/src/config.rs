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

//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Default counter retention in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Default cap on a query's whole-day span.
pub const DEFAULT_MAX_QUERY_RANGE_DAYS: u32 = 1825;

/// Engine configuration, constructed once at process start and shared
/// immutably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Counter records expire this many days after their last increment.
    pub retention_days: u32,
    /// Queries spanning more whole days than this are rejected upstream.
    pub max_query_range_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            max_query_range_days: DEFAULT_MAX_QUERY_RANGE_DAYS,
        }
    }
}

impl MetricsConfig {
    /// Read config from `RETENTION_DAYS` and `MAX_QUERY_RANGE_DAYS`.
    /// Missing, non-numeric, or non-positive values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            retention_days: env_u32("RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
            max_query_range_days: env_u32("MAX_QUERY_RANGE_DAYS", DEFAULT_MAX_QUERY_RANGE_DAYS),
        }
    }

    /// Retention window in seconds, for expiry timestamps.
    pub fn retention_secs(&self) -> u64 {
        u64::from(self.retention_days) * 24 * 60 * 60
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
