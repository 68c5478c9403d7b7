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

//! Tallyflow Drivers
//!
//! Thin adapters between delivery channels and the engines: validate raw
//! payloads, process inbound batches with per-record failure isolation, and
//! shape query results into response/error payloads.

pub mod ingest;
pub mod query;
pub mod telemetry;
pub mod validate;

pub use ingest::{process_batch, BatchReport, QueueRecord};
pub use query::{handle_query, ErrorBody, QueryErrorResponse, QueryReply, QueryResponse};
pub use telemetry::init_tracing;
pub use validate::{parse_query_request, parse_update_message, ValidationError};
