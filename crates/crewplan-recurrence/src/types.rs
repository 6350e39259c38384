use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};
use crewplan_core::{InstanceId, MonthOverflow, PatternId};
use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};
use crate::record::PatternRecord;

/// The calendar cadence a job repeats on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every 7 days, or every listed weekday when `days_of_week` is set.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every calendar month on a pinned day.
    Monthly,
    /// Every third calendar month on a pinned day.
    Quarterly,
}

impl Frequency {
    /// Month stride for month-based cadences, `None` for day-based ones.
    pub fn month_step(self) -> Option<u32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Weekly | Frequency::Biweekly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            other => Err(RecurrenceError::invalid(format!("unknown frequency: {other}"))),
        }
    }
}

/// Set of weekdays, indexed 0 = Sunday … 6 = Saturday.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Build a set from Sunday-based indices. Duplicates are ignored.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self> {
        let mut bits = 0u8;
        for index in indices {
            if index > 6 {
                return Err(RecurrenceError::invalid(format!(
                    "weekday index {index} is out of range 0-6"
                )));
            }
            bits |= 1 << index;
        }
        Ok(Self(bits))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << index_of(day)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members as ascending Sunday-based indices.
    pub fn indices(self) -> impl Iterator<Item = u8> {
        (0u8..7).filter(move |i| self.0 & (1 << i) != 0)
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.indices()).finish()
    }
}

fn index_of(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// How an otherwise infinite occurrence sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndCondition {
    /// Repeats forever; consumers must supply their own cap.
    Never,
    /// Last possible occurrence date, inclusive.
    Until { date: NaiveDate },
    /// Total number of occurrences.
    Count { count: u32 },
}

impl EndCondition {
    pub fn is_bounded(&self) -> bool {
        !matches!(self, EndCondition::Never)
    }
}

/// Immutable description of how a job repeats.
///
/// Only obtainable through [`RecurrencePattern::builder`] or a
/// [`PatternRecord`], which both validate eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PatternRecord", into = "PatternRecord")]
pub struct RecurrencePattern {
    frequency: Frequency,
    days_of_week: Option<WeekdaySet>,
    day_of_month: Option<u8>,
    month_overflow: MonthOverflow,
    end: EndCondition,
}

impl RecurrencePattern {
    pub fn builder(frequency: Frequency) -> PatternBuilder {
        PatternBuilder {
            frequency,
            days_of_week: None,
            day_of_month: None,
            month_overflow: MonthOverflow::default(),
            end: EndCondition::Never,
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn days_of_week(&self) -> Option<WeekdaySet> {
        self.days_of_week
    }

    pub fn day_of_month(&self) -> Option<u8> {
        self.day_of_month
    }

    pub fn month_overflow(&self) -> MonthOverflow {
        self.month_overflow
    }

    pub fn end(&self) -> EndCondition {
        self.end
    }

    /// Same cadence and constraints with a different end condition.
    pub fn with_end(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }
}

/// Collects pattern fields and validates them in [`PatternBuilder::build`].
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    frequency: Frequency,
    days_of_week: Option<Vec<u8>>,
    day_of_month: Option<u8>,
    month_overflow: MonthOverflow,
    end: EndCondition,
}

impl PatternBuilder {
    pub fn days_of_week(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn month_overflow(mut self, policy: MonthOverflow) -> Self {
        self.month_overflow = policy;
        self
    }

    pub fn end(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }

    pub fn build(self) -> Result<RecurrencePattern> {
        let days_of_week = match self.days_of_week {
            Some(days) => {
                if self.frequency != Frequency::Weekly {
                    return Err(RecurrenceError::invalid(format!(
                        "days_of_week only applies to weekly patterns, not {}",
                        self.frequency
                    )));
                }
                Some(WeekdaySet::from_indices(days)?)
            }
            None => None,
        };

        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(RecurrenceError::invalid(format!(
                    "day_of_month {day} is out of range 1-31"
                )));
            }
            if self.frequency.month_step().is_none() {
                return Err(RecurrenceError::invalid(format!(
                    "day_of_month only applies to monthly or quarterly patterns, not {}",
                    self.frequency
                )));
            }
        }

        Ok(RecurrencePattern {
            frequency: self.frequency,
            days_of_week,
            day_of_month: self.day_of_month,
            month_overflow: self.month_overflow,
            end: self.end,
        })
    }
}

/// A dated job, either materialized from a pattern or created as a one-off.
///
/// Instances are never edited: a pattern change discards and regenerates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobInstance {
    id: InstanceId,
    date: NaiveDate,
    #[serde(default)]
    time: Option<NaiveTime>,
    #[serde(default)]
    duration_minutes: u32,
    #[serde(default)]
    source_pattern: Option<PatternId>,
}

impl JobInstance {
    /// A job that belongs to no pattern.
    pub fn one_off(date: NaiveDate, time: Option<NaiveTime>, duration_minutes: u32) -> Self {
        Self {
            id: InstanceId::new(),
            date,
            time,
            duration_minutes,
            source_pattern: None,
        }
    }

    /// The occurrence of `pattern` on `date`, with an id derived from both.
    pub(crate) fn occurrence(
        pattern: &PatternId,
        date: NaiveDate,
        time: Option<NaiveTime>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: InstanceId::derived(pattern, &date.to_string()),
            date,
            time,
            duration_minutes,
            source_pattern: Some(pattern.clone()),
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn source_pattern(&self) -> Option<&PatternId> {
        self.source_pattern.as_ref()
    }

    /// Half-open `[start, end)` window in minutes from midnight, or `None`
    /// for unscheduled (all-day) jobs. `end` may pass 1440; the window is not
    /// carried into the next date.
    pub fn window(&self) -> Option<(u64, u64)> {
        let start = u64::from(self.time?.num_seconds_from_midnight() / 60);
        Some((start, start + u64::from(self.duration_minutes)))
    }
}
