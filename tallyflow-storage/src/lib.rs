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

//! Tallyflow Storage Layer
//!
//! The transactional keyed-store contract the engines are written against,
//! an in-memory reference implementation, and the increment engine, which is
//! the sole writer of counter records and dedup markers.

pub mod increment;
pub mod memory;
pub mod store;

pub use increment::{IncrementEngine, IncrementOutcome, DEDUP_TTL_SECS};
pub use memory::InMemoryStore;
pub use store::{Page, PageToken, SortKeyRange, TransactionalStore, WriteOp};
