use chrono::{NaiveDate, NaiveTime};
use crewplan_core::PatternId;

use crate::types::JobInstance;

/// One instance per date, in the order given.
///
/// With a pattern id, instance ids are derived from `(pattern, date)` so a
/// regenerated set reuses them. Without one, each date becomes a one-off job
/// with a fresh id.
pub fn materialize(
    dates: &[NaiveDate],
    time: Option<NaiveTime>,
    duration_minutes: u32,
    pattern: Option<&PatternId>,
) -> Vec<JobInstance> {
    dates
        .iter()
        .map(|&date| match pattern {
            Some(pattern) => JobInstance::occurrence(pattern, date, time, duration_minutes),
            None => JobInstance::one_off(date, time, duration_minutes),
        })
        .collect()
}
