use std::iter::Chain;
use std::option;

use chrono::NaiveDate;
use crewplan_core::RecurrenceConfig;

use crate::error::{RecurrenceError, Result};
use crate::occurrence::Occurrences;
use crate::types::{EndCondition, RecurrencePattern};

/// Occurrence dates of a pattern: the optional anchor followed by the
/// generated sequence, cut off by the pattern's end condition.
pub type Dates = Terminated<Chain<option::IntoIter<NaiveDate>, Occurrences>>;

/// Applies an [`EndCondition`] to an increasing date sequence.
///
/// `Never` passes the sequence through unchanged, so the result may still be
/// infinite; use [`expand`] to obtain a finite `Vec`.
#[derive(Debug, Clone)]
pub struct Terminated<I> {
    inner: I,
    end: EndCondition,
    yielded: u32,
    done: bool,
}

/// Wrap `dates` so it stops according to `end`.
pub fn terminate<I>(dates: I, end: EndCondition) -> Terminated<I::IntoIter>
where
    I: IntoIterator<Item = NaiveDate>,
{
    Terminated {
        inner: dates.into_iter(),
        end,
        yielded: 0,
        done: false,
    }
}

impl<I> Terminated<I> {
    pub fn end(&self) -> EndCondition {
        self.end
    }

    /// `false` when the sequence may never end.
    pub fn is_bounded(&self) -> bool {
        self.end.is_bounded()
    }
}

impl<I: Iterator<Item = NaiveDate>> Iterator for Terminated<I> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.done {
            return None;
        }
        let next = match self.end {
            EndCondition::Never => self.inner.next(),
            // Input is increasing: the first date past the end closes the sequence.
            EndCondition::Until { date } => self.inner.next().filter(|d| *d <= date),
            EndCondition::Count { count } if self.yielded >= count => None,
            EndCondition::Count { .. } => self.inner.next(),
        };
        match next {
            Some(date) => {
                self.yielded = self.yielded.saturating_add(1);
                Some(date)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl RecurrencePattern {
    /// Lazy occurrence dates for this pattern.
    ///
    /// With `include_anchor`, the anchor is yielded first when it satisfies
    /// the pattern's constraints, and it counts towards `Count` and is
    /// subject to `Until` like any other occurrence.
    pub fn dates(&self, anchor: NaiveDate, include_anchor: bool) -> Dates {
        let first = (include_anchor && self.accepts(anchor)).then_some(anchor);
        terminate(first.into_iter().chain(self.occurrences(anchor)), self.end())
    }
}

/// Caller choices for a finite expansion. There is no `Default`: whether the
/// anchor counts is always an explicit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Count the anchor date as the first occurrence when it matches.
    pub include_anchor: bool,
    /// Return at most this many dates. Required for never-ending patterns.
    pub limit: Option<usize>,
    /// Fail instead of returning more than this many dates.
    pub ceiling: usize,
}

impl ExpandOptions {
    pub fn new(include_anchor: bool) -> Self {
        Self {
            include_anchor,
            limit: None,
            ceiling: crewplan_core::config::DEFAULT_MAX_OCCURRENCES,
        }
    }

    /// Anchor flag and ceiling taken from configuration, no limit.
    pub fn from_config(config: &RecurrenceConfig) -> Self {
        Self {
            include_anchor: config.include_anchor,
            limit: None,
            ceiling: config.max_occurrences,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }
}

/// Finite, ordered occurrence dates of `pattern` from `anchor`.
///
/// Returns [`RecurrenceError::UnboundedRequest`] for a `Never` pattern
/// without a limit, and [`RecurrenceError::LimitExceeded`] when more than
/// `options.ceiling` dates would be produced. An empty `Vec` is a valid
/// result (e.g. an empty weekday set or an end date before the anchor).
pub fn expand(
    pattern: &RecurrencePattern,
    anchor: NaiveDate,
    options: &ExpandOptions,
) -> Result<Vec<NaiveDate>> {
    if !pattern.end().is_bounded() && options.limit.is_none() {
        return Err(RecurrenceError::UnboundedRequest);
    }

    let take = options.limit.unwrap_or(usize::MAX);
    let mut dates = Vec::new();
    for date in pattern.dates(anchor, options.include_anchor).take(take) {
        if dates.len() == options.ceiling {
            return Err(RecurrenceError::LimitExceeded {
                limit: options.ceiling,
            });
        }
        dates.push(date);
    }
    Ok(dates)
}
