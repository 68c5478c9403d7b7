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

//! Range segmentation for count queries.
//!
//! A query range is decomposed into at most three segments: a leading hourly
//! segment for a partial start day, one daily segment for the maximal run of
//! fully-covered calendar days, and a trailing hourly segment for a partial
//! end day. Every fully-covered day is then read as a single daily rollup
//! instead of 24 hourly records. Summing all segments at their own
//! granularity equals the exact hourly sum over the range.

use chrono::NaiveDate;

use crate::key::Granularity;
use crate::time::DateHour;

/// A sub-range of a query, read at a single granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySegment {
    pub granularity: Granularity,
    pub from: DateHour,
    pub to: DateHour,
}

/// Split `[from, to]` (inclusive, hour resolution, `from <= to`) into
/// segments covering it exactly, with no gap and no overlap.
pub fn plan_segments(from: DateHour, to: DateHour) -> Vec<QuerySegment> {
    debug_assert!(from <= to);

    if from.date() == to.date() {
        let granularity = if from.is_day_start() && to.is_day_end() {
            Granularity::Daily
        } else {
            Granularity::Hourly
        };

        return vec![QuerySegment {
            granularity,
            from,
            to,
        }];
    }

    // First and last calendar days wholly inside the range. When the two
    // endpoints sit on adjacent partial days, full_from > full_to and no
    // daily segment is emitted.
    let full_from = if from.is_day_start() {
        from.date()
    } else {
        next_day(from.date())
    };
    let full_to = if to.is_day_end() {
        to.date()
    } else {
        prev_day(to.date())
    };

    let mut segments = Vec::with_capacity(3);

    if !from.is_day_start() {
        segments.push(QuerySegment {
            granularity: Granularity::Hourly,
            from,
            to: from.end_of_day(),
        });
    }

    if full_from <= full_to {
        segments.push(QuerySegment {
            granularity: Granularity::Daily,
            from: DateHour::day_start(full_from),
            to: DateHour::day_end(full_to),
        });
    }

    if !to.is_day_end() {
        segments.push(QuerySegment {
            granularity: Granularity::Hourly,
            from: to.start_of_day(),
            to,
        });
    }

    segments
}

// Saturating at the ends of chrono's calendar; unreachable for any range a
// driver will accept.
fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dh(s: &str) -> DateHour {
        s.parse().unwrap()
    }

    fn hourly(from: &str, to: &str) -> QuerySegment {
        QuerySegment {
            granularity: Granularity::Hourly,
            from: dh(from),
            to: dh(to),
        }
    }

    fn daily(from: &str, to: &str) -> QuerySegment {
        QuerySegment {
            granularity: Granularity::Daily,
            from: dh(from),
            to: dh(to),
        }
    }

    #[test]
    fn full_single_day_is_one_daily_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T00"), dh("2024-06-15T23")),
            vec![daily("2024-06-15T00", "2024-06-15T23")]
        );
    }

    #[test]
    fn partial_single_day_is_one_hourly_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T05"), dh("2024-06-15T18")),
            vec![hourly("2024-06-15T05", "2024-06-15T18")]
        );
    }

    #[test]
    fn single_hour_is_one_hourly_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T14"), dh("2024-06-15T14")),
            vec![hourly("2024-06-15T14", "2024-06-15T14")]
        );
    }

    #[test]
    fn aligned_multi_day_is_one_daily_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T00"), dh("2024-06-20T23")),
            vec![daily("2024-06-15T00", "2024-06-20T23")]
        );
    }

    #[test]
    fn partial_start_gets_leading_hourly_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T05"), dh("2024-06-20T23")),
            vec![
                hourly("2024-06-15T05", "2024-06-15T23"),
                daily("2024-06-16T00", "2024-06-20T23"),
            ]
        );
    }

    #[test]
    fn partial_end_gets_trailing_hourly_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T00"), dh("2024-06-20T18")),
            vec![
                daily("2024-06-15T00", "2024-06-19T23"),
                hourly("2024-06-20T00", "2024-06-20T18"),
            ]
        );
    }

    #[test]
    fn partial_both_ends_gives_three_segments() {
        assert_eq!(
            plan_segments(dh("2024-06-15T05"), dh("2024-06-20T18")),
            vec![
                hourly("2024-06-15T05", "2024-06-15T23"),
                daily("2024-06-16T00", "2024-06-19T23"),
                hourly("2024-06-20T00", "2024-06-20T18"),
            ]
        );
    }

    #[test]
    fn adjacent_partial_days_have_no_daily_segment() {
        assert_eq!(
            plan_segments(dh("2024-06-15T05"), dh("2024-06-16T18")),
            vec![
                hourly("2024-06-15T05", "2024-06-15T23"),
                hourly("2024-06-16T00", "2024-06-16T18"),
            ]
        );
    }

    #[test]
    fn month_boundary_uses_calendar_arithmetic() {
        assert_eq!(
            plan_segments(dh("2024-01-31T05"), dh("2024-02-02T18")),
            vec![
                hourly("2024-01-31T05", "2024-01-31T23"),
                daily("2024-02-01T00", "2024-02-01T23"),
                hourly("2024-02-02T00", "2024-02-02T18"),
            ]
        );
    }

    #[test]
    fn leap_day_is_covered_by_the_daily_run() {
        assert_eq!(
            plan_segments(dh("2024-02-28T12"), dh("2024-03-02T18")),
            vec![
                hourly("2024-02-28T12", "2024-02-28T23"),
                daily("2024-02-29T00", "2024-03-01T23"),
                hourly("2024-03-02T00", "2024-03-02T18"),
            ]
        );
    }

    proptest! {
        /// Segments tile the range: the first starts at `from`, the last ends
        /// at `to`, each segment begins exactly one hour after its
        /// predecessor ends, and daily segments are whole-day aligned.
        #[test]
        fn segments_tile_the_range_exactly(
            from_offset in 0u32..(3 * 365 * 24),
            span in 0u32..(2 * 365 * 24),
        ) {
            let origin = dh("2023-01-01T00");
            let from = advance(origin, from_offset);
            let to = advance(from, span);

            let segments = plan_segments(from, to);

            prop_assert!(!segments.is_empty());
            prop_assert_eq!(segments[0].from, from);
            prop_assert_eq!(segments[segments.len() - 1].to, to);

            for segment in &segments {
                prop_assert!(segment.from <= segment.to);
                if segment.granularity == Granularity::Daily {
                    prop_assert!(segment.from.is_day_start());
                    prop_assert!(segment.to.is_day_end());
                }
            }

            for pair in segments.windows(2) {
                prop_assert_eq!(Some(pair[1].from), pair[0].to.succ());
            }
        }
    }

    fn advance(start: DateHour, hours: u32) -> DateHour {
        let total = u64::from(start.hour()) + u64::from(hours);
        let date = start
            .date()
            .checked_add_days(chrono::Days::new(total / 24))
            .unwrap();
        DateHour::new(date, (total % 24) as u8).unwrap()
    }
}
