use dashmap::DashMap;
use tracing::debug;

use crewplan_core::{InstanceId, PatternId};

use crate::error::{RecurrenceError, Result};
use crate::types::JobInstance;

/// Persistence seam for materialized instances.
///
/// The engine only needs a flat read of everything and a whole-set replace
/// per pattern; implementations backed by a real database live outside this
/// crate and report failures as [`RecurrenceError::Store`].
pub trait InstanceStore: Send + Sync {
    /// Every stored instance, in no particular order.
    fn snapshot(&self) -> Result<Vec<JobInstance>>;

    /// Discard all instances generated by `pattern` and store `instances`
    /// in their place. Returns how many instances were discarded.
    fn replace_pattern(&self, pattern: &PatternId, instances: Vec<JobInstance>) -> Result<usize>;

    /// Store a one-off instance.
    fn insert(&self, instance: JobInstance) -> Result<()>;

    /// Discard all instances generated by `pattern`.
    fn remove_pattern(&self, pattern: &PatternId) -> Result<usize>;

    /// Discard a one-off instance by id.
    fn remove_instance(&self, id: &InstanceId) -> Result<()>;
}

/// In-memory [`InstanceStore`].
///
/// Thread-safe: pattern sets and one-off jobs live in sharded `DashMap`s, so a
/// replace touches a single entry and readers never see half a set.
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_pattern: DashMap<PatternId, Vec<JobInstance>>,
    one_offs: DashMap<InstanceId, JobInstance>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances currently stored for `pattern`.
    pub fn pattern_instances(&self, pattern: &PatternId) -> Vec<JobInstance> {
        self.by_pattern
            .get(pattern)
            .map(|set| set.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_pattern.iter().map(|set| set.value().len()).sum::<usize>() + self.one_offs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InstanceStore for MemoryStore {
    fn snapshot(&self) -> Result<Vec<JobInstance>> {
        let mut all: Vec<JobInstance> = self
            .by_pattern
            .iter()
            .flat_map(|set| set.value().clone())
            .collect();
        all.extend(self.one_offs.iter().map(|job| job.value().clone()));
        Ok(all)
    }

    fn replace_pattern(&self, pattern: &PatternId, instances: Vec<JobInstance>) -> Result<usize> {
        if let Some(stray) = instances
            .iter()
            .find(|i| i.source_pattern() != Some(pattern))
        {
            return Err(RecurrenceError::Store(format!(
                "instance {} does not belong to pattern {pattern}",
                stray.id()
            )));
        }
        let added = instances.len();
        let previous = if instances.is_empty() {
            self.by_pattern.remove(pattern).map(|(_, old)| old)
        } else {
            self.by_pattern.insert(pattern.clone(), instances)
        };
        let replaced = previous.map_or(0, |old| old.len());
        debug!(pattern_id = %pattern, replaced, added, "pattern instances replaced");
        Ok(replaced)
    }

    fn insert(&self, instance: JobInstance) -> Result<()> {
        if let Some(pattern) = instance.source_pattern() {
            return Err(RecurrenceError::Store(format!(
                "instance {} belongs to pattern {pattern}; use replace_pattern",
                instance.id()
            )));
        }
        self.one_offs.insert(instance.id().clone(), instance);
        Ok(())
    }

    fn remove_pattern(&self, pattern: &PatternId) -> Result<usize> {
        self.by_pattern
            .remove(pattern)
            .map(|(_, old)| old.len())
            .ok_or_else(|| RecurrenceError::PatternNotFound {
                id: pattern.to_string(),
            })
    }

    fn remove_instance(&self, id: &InstanceId) -> Result<()> {
        self.one_offs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RecurrenceError::InstanceNotFound { id: id.to_string() })
    }
}
