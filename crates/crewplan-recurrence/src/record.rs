//! External shape of a recurrence pattern.
//!
//! Stored job rows carry each pattern field under two names: a short one
//! (`frequency`) and a prefixed legacy one (`recurrenceFrequency`). Both are
//! accepted here and collapsed into one validated [`RecurrencePattern`];
//! serialization always writes the short names.
//!
//! Rows keep every field regardless of frequency, so `daysOfWeek` on a
//! monthly job or `dayOfMonth` on a weekly one is range-checked and then
//! dropped. [`PatternBuilder`](crate::PatternBuilder) still rejects them.

use chrono::NaiveDate;
use crewplan_core::MonthOverflow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecurrenceError, Result};
use crate::types::{EndCondition, Frequency, RecurrencePattern, WeekdaySet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    #[serde(alias = "recurrenceFrequency")]
    pub frequency: String,

    #[serde(
        default,
        alias = "recurrenceDaysOfWeek",
        skip_serializing_if = "Option::is_none"
    )]
    pub days_of_week: Option<Vec<i64>>,

    #[serde(
        default,
        alias = "recurrenceDayOfMonth",
        skip_serializing_if = "Option::is_none"
    )]
    pub day_of_month: Option<i64>,

    #[serde(
        default,
        alias = "recurrenceEndDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,

    #[serde(
        default,
        alias = "recurrenceCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub occurrence_count: Option<i64>,

    #[serde(
        default,
        alias = "recurrenceMonthOverflow",
        skip_serializing_if = "Option::is_none"
    )]
    pub month_overflow: Option<MonthOverflow>,
}

impl PatternRecord {
    /// Validate into a pattern, using `default_overflow` when the record does
    /// not name a policy.
    pub fn into_pattern(self, default_overflow: MonthOverflow) -> Result<RecurrencePattern> {
        let frequency: Frequency = self.frequency.trim().to_ascii_lowercase().parse()?;

        let end = match (self.end_date, self.occurrence_count) {
            (Some(_), Some(_)) => {
                return Err(RecurrenceError::invalid(
                    "both endDate and occurrenceCount are set; a pattern has one end condition",
                ))
            }
            (Some(date), None) => EndCondition::Until { date },
            (None, Some(count)) => {
                let count = u32::try_from(count).map_err(|_| {
                    RecurrenceError::invalid(format!("occurrenceCount {count} is out of range"))
                })?;
                EndCondition::Count { count }
            }
            (None, None) => EndCondition::Never,
        };

        let mut builder = RecurrencePattern::builder(frequency)
            .month_overflow(self.month_overflow.unwrap_or(default_overflow))
            .end(end);

        if let Some(days) = self.days_of_week {
            let days = days
                .into_iter()
                .map(|d| {
                    u8::try_from(d).map_err(|_| {
                        RecurrenceError::invalid(format!("weekday index {d} is out of range 0-6"))
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            if frequency == Frequency::Weekly {
                builder = builder.days_of_week(days);
            } else {
                WeekdaySet::from_indices(days.iter().copied())?;
                debug!(%frequency, "ignoring daysOfWeek on a non-weekly pattern");
            }
        }

        if let Some(day) = self.day_of_month {
            let day = u8::try_from(day)
                .ok()
                .filter(|d| (1..=31).contains(d))
                .ok_or_else(|| {
                    RecurrenceError::invalid(format!("day_of_month {day} is out of range 1-31"))
                })?;
            if frequency.month_step().is_some() {
                builder = builder.day_of_month(day);
            } else {
                debug!(%frequency, "ignoring dayOfMonth on a day-based pattern");
            }
        }

        builder.build()
    }
}

impl TryFrom<PatternRecord> for RecurrencePattern {
    type Error = RecurrenceError;

    fn try_from(record: PatternRecord) -> Result<Self> {
        record.into_pattern(MonthOverflow::default())
    }
}

impl From<RecurrencePattern> for PatternRecord {
    fn from(pattern: RecurrencePattern) -> Self {
        let (end_date, occurrence_count) = match pattern.end() {
            EndCondition::Never => (None, None),
            EndCondition::Until { date } => (Some(date), None),
            EndCondition::Count { count } => (None, Some(i64::from(count))),
        };
        Self {
            frequency: pattern.frequency().to_string(),
            days_of_week: pattern
                .days_of_week()
                .map(|set| set.indices().map(i64::from).collect()),
            day_of_month: pattern.day_of_month().map(i64::from),
            end_date,
            occurrence_count,
            month_overflow: Some(pattern.month_overflow()),
        }
    }
}
