use chrono::{Datelike, Days, Months, NaiveDate};
use crewplan_core::MonthOverflow;

use crate::types::{Frequency, RecurrencePattern, WeekdaySet};

/// Lazy, strictly increasing sequence of candidate dates after an anchor.
///
/// The anchor itself is never yielded; see [`RecurrencePattern::dates`] for
/// explicit anchor inclusion. The sequence never ends on its own, except for
/// an empty weekday set or when chrono's representable date range runs out.
#[derive(Debug, Clone)]
pub struct Occurrences {
    pattern: RecurrencePattern,
    anchor: NaiveDate,
    /// Days advanced (weekday walk), strides taken, or months visited.
    step: u64,
    exhausted: bool,
}

impl RecurrencePattern {
    /// Candidate dates strictly after `anchor`. Calling this again restarts
    /// the sequence from the beginning.
    pub fn occurrences(&self, anchor: NaiveDate) -> Occurrences {
        Occurrences {
            pattern: *self,
            anchor,
            step: 0,
            exhausted: false,
        }
    }

    /// Whether `date` satisfies the pattern's selectivity constraints
    /// (weekday membership or the pinned day-of-month with its overflow
    /// policy). Cadence alignment is not checked.
    pub fn accepts(&self, date: NaiveDate) -> bool {
        match self.frequency() {
            Frequency::Weekly => self
                .days_of_week()
                .map_or(true, |days| days.contains(date.weekday())),
            Frequency::Biweekly => true,
            Frequency::Monthly | Frequency::Quarterly => match self.day_of_month() {
                None => true,
                Some(day) => first_of_month(date.year(), date.month())
                    .and_then(|first| pin_day(first, u32::from(day), self.month_overflow()))
                    == Some(date),
            },
        }
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.exhausted {
            return None;
        }
        let next = match self.pattern.frequency() {
            Frequency::Weekly => match self.pattern.days_of_week() {
                Some(days) => self.next_listed_weekday(days),
                None => self.next_stride(7),
            },
            Frequency::Biweekly => self.next_stride(14),
            Frequency::Monthly | Frequency::Quarterly => self.next_pinned_day(),
        };
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }
}

impl Occurrences {
    fn next_stride(&mut self, days: u64) -> Option<NaiveDate> {
        self.step += 1;
        self.anchor
            .checked_add_days(Days::new(days.checked_mul(self.step)?))
    }

    /// Walk day by day so every listed weekday of each 7-day cycle is yielded.
    fn next_listed_weekday(&mut self, days: WeekdaySet) -> Option<NaiveDate> {
        if days.is_empty() {
            return None;
        }
        loop {
            self.step += 1;
            let candidate = self.anchor.checked_add_days(Days::new(self.step))?;
            if days.contains(candidate.weekday()) {
                return Some(candidate);
            }
        }
    }

    /// Visit months anchor+0, anchor+s, anchor+2s… and pin the target day in
    /// each. The cursor does not step a month before the first candidate: the
    /// anchor's own month counts when the pinned day falls after the anchor
    /// (Jan 10 pinned to the 15th yields Jan 15, not Feb 15).
    fn next_pinned_day(&mut self) -> Option<NaiveDate> {
        let stride = u64::from(self.pattern.frequency().month_step()?);
        let target = self
            .pattern
            .day_of_month()
            .map(u32::from)
            .unwrap_or_else(|| self.anchor.day());
        let policy = self.pattern.month_overflow();

        // Every residue class of months holds a 31-day month within a year,
        // so skipping terminates.
        loop {
            let offset = self.step.checked_mul(stride)?;
            self.step += 1;
            let first = shift_months(self.anchor, offset)?;
            let Some(candidate) = pin_day(first, target, policy) else {
                continue;
            };
            if candidate > self.anchor {
                return Some(candidate);
            }
        }
    }
}

/// First day of the month `offset` months after `anchor`'s month.
fn shift_months(anchor: NaiveDate, offset: u64) -> Option<NaiveDate> {
    let offset = u32::try_from(offset).ok()?;
    first_of_month(anchor.year(), anchor.month())?.checked_add_months(Months::new(offset))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn days_in_month(first: NaiveDate) -> Option<u32> {
    first
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|last| last.day())
}

/// Day `day` of the month starting at `first`, or `None` when the month is
/// too short and the policy is [`MonthOverflow::Skip`].
fn pin_day(first: NaiveDate, day: u32, policy: MonthOverflow) -> Option<NaiveDate> {
    let last = days_in_month(first)?;
    let day = if day <= last {
        day
    } else {
        match policy {
            MonthOverflow::Skip => return None,
            MonthOverflow::Clamp => last,
        }
    };
    first.with_day(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EndCondition;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(day: Option<u8>, policy: MonthOverflow) -> RecurrencePattern {
        let mut builder = RecurrencePattern::builder(Frequency::Monthly).month_overflow(policy);
        if let Some(day) = day {
            builder = builder.day_of_month(day);
        }
        builder.build().unwrap()
    }

    #[test]
    fn weekly_listed_days_yield_every_match_in_each_cycle() {
        let pattern = RecurrencePattern::builder(Frequency::Weekly)
            .days_of_week([1, 3, 5])
            .build()
            .unwrap();
        // 2024-01-01 is a Monday.
        let dates: Vec<_> = pattern.occurrences(d(2024, 1, 1)).take(5).collect();
        assert_eq!(
            dates,
            vec![d(2024, 1, 3), d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 10), d(2024, 1, 12)]
        );
    }

    #[test]
    fn weekly_without_days_keeps_anchor_weekday() {
        let pattern = RecurrencePattern::builder(Frequency::Weekly).build().unwrap();
        let dates: Vec<_> = pattern.occurrences(d(2024, 2, 22)).take(3).collect();
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 7), d(2024, 3, 14)]);
        assert!(dates.iter().all(|date| date.weekday() == Weekday::Thu));
    }

    #[test]
    fn biweekly_strides_fourteen_days() {
        let pattern = RecurrencePattern::builder(Frequency::Biweekly).build().unwrap();
        let dates: Vec<_> = pattern.occurrences(d(2024, 12, 20)).take(3).collect();
        assert_eq!(dates, vec![d(2025, 1, 3), d(2025, 1, 17), d(2025, 1, 31)]);
    }

    #[test]
    fn empty_weekday_set_yields_nothing() {
        let pattern = RecurrencePattern::builder(Frequency::Weekly)
            .days_of_week([])
            .build()
            .unwrap();
        let mut occurrences = pattern.occurrences(d(2024, 1, 1));
        assert_eq!(occurrences.next(), None);
        assert_eq!(occurrences.next(), None);
    }

    #[test]
    fn monthly_day_later_in_anchor_month_counts() {
        let pattern = monthly(Some(15), MonthOverflow::Skip);
        let dates: Vec<_> = pattern.occurrences(d(2024, 1, 10)).take(3).collect();
        assert_eq!(dates, vec![d(2024, 1, 15), d(2024, 2, 15), d(2024, 3, 15)]);
    }

    #[test]
    fn monthly_day_earlier_in_anchor_month_starts_next_month() {
        let pattern = monthly(Some(5), MonthOverflow::Skip);
        let first = pattern.occurrences(d(2024, 1, 10)).next();
        assert_eq!(first, Some(d(2024, 2, 5)));
    }

    #[test]
    fn monthly_day_31_skip_drops_short_months() {
        let pattern = monthly(Some(31), MonthOverflow::Skip);
        let dates: Vec<_> = pattern.occurrences(d(2024, 1, 31)).take(4).collect();
        assert_eq!(dates, vec![d(2024, 3, 31), d(2024, 5, 31), d(2024, 7, 31), d(2024, 8, 31)]);
    }

    #[test]
    fn monthly_day_31_clamp_uses_last_day_without_drifting() {
        let pattern = monthly(Some(31), MonthOverflow::Clamp);
        let dates: Vec<_> = pattern.occurrences(d(2024, 1, 31)).take(4).collect();
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30), d(2024, 5, 31)]);

        let non_leap: Vec<_> = pattern.occurrences(d(2023, 1, 31)).take(1).collect();
        assert_eq!(non_leap, vec![d(2023, 2, 28)]);
    }

    #[test]
    fn monthly_without_day_pins_anchor_day() {
        let pattern = monthly(None, MonthOverflow::Skip);
        let dates: Vec<_> = pattern.occurrences(d(2024, 1, 30)).take(3).collect();
        assert_eq!(dates, vec![d(2024, 3, 30), d(2024, 4, 30), d(2024, 5, 30)]);
    }

    #[test]
    fn leap_day_skips_to_next_leap_year_february() {
        let pattern = monthly(Some(29), MonthOverflow::Skip);
        assert_eq!(pattern.occurrences(d(2023, 1, 29)).next(), Some(d(2023, 3, 29)));
        let febs: Vec<_> = pattern
            .occurrences(d(2023, 1, 29))
            .filter(|date| date.month() == 2)
            .take(2)
            .collect();
        assert_eq!(febs, vec![d(2024, 2, 29), d(2028, 2, 29)]);
    }

    #[test]
    fn quarterly_strides_three_months() {
        let skip = RecurrencePattern::builder(Frequency::Quarterly).build().unwrap();
        let dates: Vec<_> = skip.occurrences(d(2024, 1, 31)).take(3).collect();
        assert_eq!(dates, vec![d(2024, 7, 31), d(2024, 10, 31), d(2025, 1, 31)]);

        let clamp = RecurrencePattern::builder(Frequency::Quarterly)
            .month_overflow(MonthOverflow::Clamp)
            .build()
            .unwrap();
        let dates: Vec<_> = clamp.occurrences(d(2024, 1, 31)).take(3).collect();
        assert_eq!(dates, vec![d(2024, 4, 30), d(2024, 7, 31), d(2024, 10, 31)]);
    }

    #[test]
    fn quarterly_day_of_month_pins_each_quarter() {
        let pattern = RecurrencePattern::builder(Frequency::Quarterly)
            .day_of_month(1)
            .build()
            .unwrap();
        let dates: Vec<_> = pattern.occurrences(d(2024, 11, 20)).take(3).collect();
        assert_eq!(dates, vec![d(2025, 2, 1), d(2025, 5, 1), d(2025, 8, 1)]);
    }

    #[test]
    fn sequences_are_restartable_and_identical() {
        let pattern = RecurrencePattern::builder(Frequency::Weekly)
            .days_of_week([0, 6])
            .end(EndCondition::Never)
            .build()
            .unwrap();
        let a: Vec<_> = pattern.occurrences(d(2024, 5, 1)).take(20).collect();
        let b: Vec<_> = pattern.occurrences(d(2024, 5, 1)).take(20).collect();
        assert_eq!(a, b);

        let mut iter = pattern.occurrences(d(2024, 5, 1));
        let fork = iter.clone();
        iter.next();
        assert_eq!(fork.take(20).collect::<Vec<_>>(), a);
    }

    #[test]
    fn every_pattern_is_strictly_increasing_after_anchor() {
        let anchor = d(2024, 1, 31);
        let patterns = [
            RecurrencePattern::builder(Frequency::Weekly).days_of_week([2, 4]).build().unwrap(),
            RecurrencePattern::builder(Frequency::Biweekly).build().unwrap(),
            monthly(Some(30), MonthOverflow::Skip),
            monthly(Some(30), MonthOverflow::Clamp),
            RecurrencePattern::builder(Frequency::Quarterly).day_of_month(31).build().unwrap(),
        ];
        for pattern in patterns {
            let dates: Vec<_> = pattern.occurrences(anchor).take(50).collect();
            assert_eq!(dates.len(), 50);
            assert!(dates[0] > anchor);
            assert!(dates.windows(2).all(|w| w[0] < w[1]), "{pattern:?}");
        }
    }

    #[test]
    fn accepts_checks_selectivity_only() {
        let weekly = RecurrencePattern::builder(Frequency::Weekly)
            .days_of_week([1])
            .build()
            .unwrap();
        assert!(weekly.accepts(d(2024, 1, 1)));
        assert!(!weekly.accepts(d(2024, 1, 2)));

        let skip = monthly(Some(31), MonthOverflow::Skip);
        assert!(skip.accepts(d(2024, 1, 31)));
        assert!(!skip.accepts(d(2024, 2, 29)));

        let clamp = monthly(Some(31), MonthOverflow::Clamp);
        assert!(clamp.accepts(d(2024, 2, 29)));
        assert!(!clamp.accepts(d(2024, 2, 28)));

        assert!(monthly(None, MonthOverflow::Skip).accepts(d(2024, 2, 12)));
    }

    #[test]
    fn iteration_stops_at_calendar_range_end() {
        let pattern = RecurrencePattern::builder(Frequency::Weekly).build().unwrap();
        let near_end = NaiveDate::MAX - Days::new(20);
        assert_eq!(pattern.occurrences(near_end).count(), 2);
    }
}
