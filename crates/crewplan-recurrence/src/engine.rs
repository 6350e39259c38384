use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use crewplan_core::{InstanceId, PatternId, RecurrenceConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    conflict::{detect_conflicts, ConflictReport},
    error::Result,
    materialize::materialize,
    store::InstanceStore,
    termination::{expand, ExpandOptions},
    types::{JobInstance, RecurrencePattern},
};

/// A repeating job as submitted by the presentation layer.
///
/// Deserializing `pattern` goes through [`PatternRecord`](crate::PatternRecord)
/// with [`MonthOverflow::Skip`](crewplan_core::MonthOverflow::Skip) as the
/// fallback policy. Callers honouring `recurrence.month_overflow` build the
/// pattern with [`PatternRecord::into_pattern`](crate::PatternRecord::into_pattern)
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub pattern: RecurrencePattern,
    /// Start date the pattern is expanded from.
    pub anchor: NaiveDate,
    /// Time of day; `None` schedules all-day jobs that never conflict.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: u32,
}

/// Dates a template would produce and the conflicts they would cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub dates: Vec<NaiveDate>,
    pub instances: Vec<JobInstance>,
    pub conflicts: ConflictReport,
}

/// Outcome of storing a pattern's instance set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scheduled {
    pub instances: Vec<JobInstance>,
    /// Instances of the previous set that were discarded.
    pub replaced: usize,
    /// Conflicts involving at least one of the new instances.
    pub conflicts: ConflictReport,
}

/// Drives generate → terminate → materialize → store → conflict scan.
///
/// Holds no state of its own besides the store; a pattern edit always
/// replaces the pattern's complete instance set.
pub struct Planner<S> {
    store: S,
    config: RecurrenceConfig,
}

impl<S: InstanceStore> Planner<S> {
    pub fn new(store: S, config: RecurrenceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RecurrenceConfig {
        &self.config
    }

    /// The first `limit` (default `preview_limit`) occurrences of `template`
    /// with the conflicts they would have against what is stored. The
    /// pattern's own stored instances are ignored since scheduling would
    /// replace them. Nothing is written.
    pub fn preview(
        &self,
        pattern_id: &PatternId,
        template: &JobTemplate,
        limit: Option<usize>,
    ) -> Result<Preview> {
        let limit = limit.unwrap_or(self.config.preview_limit);
        let options = ExpandOptions::from_config(&self.config).limit(limit);
        let dates = expand(&template.pattern, template.anchor, &options)?;
        let instances = materialize(
            &dates,
            template.time,
            template.duration_minutes,
            Some(pattern_id),
        );

        let mut combined: Vec<JobInstance> = self
            .store
            .snapshot()?
            .into_iter()
            .filter(|i| i.source_pattern() != Some(pattern_id))
            .collect();
        combined.extend(instances.iter().cloned());
        let conflicts = conflicts_touching(&combined, &instances);

        debug!(
            pattern_id = %pattern_id,
            dates = dates.len(),
            conflicts = conflicts.len(),
            "pattern previewed"
        );
        Ok(Preview {
            dates,
            instances,
            conflicts,
        })
    }

    /// Expand `template`, replace the pattern's stored instances with the
    /// result and report the conflicts the new set takes part in.
    ///
    /// Never-ending patterns need `limit` or `open_ended_limit` in the
    /// configuration; otherwise [`crate::RecurrenceError::UnboundedRequest`].
    pub fn schedule(
        &self,
        pattern_id: &PatternId,
        template: &JobTemplate,
        limit: Option<usize>,
    ) -> Result<Scheduled> {
        let limit = match limit {
            Some(n) => Some(n),
            None if !template.pattern.end().is_bounded() => self.config.open_ended_limit,
            None => None,
        };
        let mut options = ExpandOptions::from_config(&self.config);
        options.limit = limit;

        let dates = expand(&template.pattern, template.anchor, &options)?;
        let instances = materialize(
            &dates,
            template.time,
            template.duration_minutes,
            Some(pattern_id),
        );
        let replaced = self.store.replace_pattern(pattern_id, instances.clone())?;

        let conflicts = conflicts_touching(&self.store.snapshot()?, &instances);
        info!(
            pattern_id = %pattern_id,
            frequency = %template.pattern.frequency(),
            instances = instances.len(),
            replaced,
            "pattern scheduled"
        );
        if !conflicts.is_empty() {
            warn!(pattern_id = %pattern_id, conflicts = conflicts.len(), "schedule has conflicts");
        }
        Ok(Scheduled {
            instances,
            replaced,
            conflicts,
        })
    }

    /// Store a single job that belongs to no pattern.
    pub fn add_one_off(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
        duration_minutes: u32,
    ) -> Result<JobInstance> {
        let instance = JobInstance::one_off(date, time, duration_minutes);
        self.store.insert(instance.clone())?;
        info!(instance_id = %instance.id(), %date, "one-off job added");
        Ok(instance)
    }

    /// Drop every instance of a pattern. Returns how many were removed.
    pub fn remove_pattern(&self, pattern_id: &PatternId) -> Result<usize> {
        let removed = self.store.remove_pattern(pattern_id)?;
        info!(pattern_id = %pattern_id, removed, "pattern removed");
        Ok(removed)
    }

    pub fn remove_one_off(&self, id: &InstanceId) -> Result<()> {
        self.store.remove_instance(id)?;
        info!(instance_id = %id, "one-off job removed");
        Ok(())
    }

    /// All stored instances ordered by date, then time (untimed first), then id.
    pub fn instances(&self) -> Result<Vec<JobInstance>> {
        let mut all = self.store.snapshot()?;
        all.sort_by(|a, b| (a.date(), a.time(), a.id()).cmp(&(b.date(), b.time(), b.id())));
        Ok(all)
    }

    /// Conflicts across everything currently stored.
    pub fn conflicts(&self) -> Result<ConflictReport> {
        let report = detect_conflicts(&self.store.snapshot()?);
        debug!(conflicts = report.len(), "conflict scan finished");
        Ok(report)
    }
}

/// Conflicts in `all` that include at least one of `subset`.
fn conflicts_touching(all: &[JobInstance], subset: &[JobInstance]) -> ConflictReport {
    let ids: HashSet<&InstanceId> = subset.iter().map(|i| i.id()).collect();
    let mut report = detect_conflicts(all);
    report.retain(|c| ids.contains(&c.first) || ids.contains(&c.second));
    report
}
