//! Detect overlapping job instances.
//!
//! Two instances conflict when they share a calendar date, both have a time
//! of day, and their half-open windows overlap: `a.start < b.end && b.start < a.end`.
//! Touching windows (one ends as the other starts) are not conflicts.
//! Untimed instances never conflict.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use chrono::NaiveDate;
use crewplan_core::InstanceId;
use serde::{Deserialize, Serialize};

use crate::types::JobInstance;

/// Two instances whose windows overlap on `date`.
///
/// `first` starts no later than `second`; on equal starts ids are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflict {
    pub date: NaiveDate,
    pub first: InstanceId,
    pub second: InstanceId,
    pub overlap_minutes: u64,
}

impl Conflict {
    pub fn involves(&self, id: &InstanceId) -> bool {
        self.first == *id || self.second == *id
    }

    /// The other side of the pair, if `id` is part of it.
    pub fn other(&self, id: &InstanceId) -> Option<&InstanceId> {
        if self.first == *id {
            Some(&self.second)
        } else if self.second == *id {
            Some(&self.first)
        } else {
            None
        }
    }
}

/// Instances on one date linked by a chain of conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub date: NaiveDate,
    /// Sorted member ids.
    pub members: Vec<InstanceId>,
}

/// Every overlapping pair in a set of instances, ordered by date, then by
/// the start of `first`, then by the start of `second`.
///
/// Transient: recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Conflict> {
        self.conflicts.iter()
    }

    /// Conflicts that include `id`.
    pub fn involving<'a>(&'a self, id: &'a InstanceId) -> impl Iterator<Item = &'a Conflict> + 'a {
        self.conflicts.iter().filter(move |c| c.involves(id))
    }

    /// Whether `a` and `b` were reported as a pair, in either order.
    pub fn conflicts_between(&self, a: &InstanceId, b: &InstanceId) -> bool {
        self.conflicts
            .iter()
            .any(|c| (c.first == *a && c.second == *b) || (c.first == *b && c.second == *a))
    }

    /// Ids that appear in at least one conflict, sorted and deduplicated.
    pub fn involved(&self) -> Vec<&InstanceId> {
        let mut ids: Vec<&InstanceId> = self
            .conflicts
            .iter()
            .flat_map(|c| [&c.first, &c.second])
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Keep only conflicts for which `keep` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&Conflict) -> bool) {
        self.conflicts.retain(|c| keep(c));
    }

    /// Connected clusters of conflicting instances, ordered by date and then
    /// by smallest member id.
    pub fn groups(&self) -> Vec<ConflictGroup> {
        let mut index: HashMap<&InstanceId, usize> = HashMap::new();
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut parent: Vec<usize> = Vec::new();

        for conflict in &self.conflicts {
            let mut ids = [0usize; 2];
            for (n, id) in [&conflict.first, &conflict.second].into_iter().enumerate() {
                ids[n] = *index.entry(id).or_insert_with(|| {
                    parent.push(parent.len());
                    dates.push(conflict.date);
                    parent.len() - 1
                });
            }
            let (a, b) = (find(&mut parent, ids[0]), find(&mut parent, ids[1]));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        let mut clusters: BTreeMap<usize, Vec<InstanceId>> = BTreeMap::new();
        for (id, &i) in &index {
            let root = find(&mut parent, i);
            clusters.entry(root).or_default().push((*id).clone());
        }

        let mut groups: Vec<ConflictGroup> = clusters
            .into_iter()
            .map(|(root, mut members)| {
                members.sort();
                ConflictGroup {
                    date: dates[root],
                    members,
                }
            })
            .collect();
        groups.sort_by(|a, b| (a.date, &a.members[0]).cmp(&(b.date, &b.members[0])));
        groups
    }
}

impl IntoIterator for ConflictReport {
    type Item = Conflict;
    type IntoIter = std::vec::IntoIter<Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConflictReport {
    type Item = &'a Conflict;
    type IntoIter = std::slice::Iter<'a, Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.iter()
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// A timed instance reduced to what the sweep needs.
struct Window<'a> {
    start: u64,
    end: u64,
    id: &'a InstanceId,
}

/// Report every pair of overlapping instances.
///
/// Groups by date, sorts each day by start time and sweeps with a min-heap of
/// active end times, so a day with `m` jobs and `k` overlaps costs
/// O(m log m + k) rather than a pairwise scan. The input is not modified.
pub fn detect_conflicts(instances: &[JobInstance]) -> ConflictReport {
    let mut by_date: BTreeMap<NaiveDate, Vec<Window<'_>>> = BTreeMap::new();
    for instance in instances {
        if let Some((start, end)) = instance.window() {
            by_date.entry(instance.date()).or_default().push(Window {
                start,
                end,
                id: instance.id(),
            });
        }
    }

    let mut conflicts = Vec::new();
    for (date, mut day) in by_date {
        day.sort_by(|a, b| (a.start, a.id).cmp(&(b.start, b.id)));
        for (i, j) in sweep(&day) {
            let (a, b) = (&day[i], &day[j]);
            conflicts.push(Conflict {
                date,
                first: a.id.clone(),
                second: b.id.clone(),
                overlap_minutes: a.end.min(b.end) - b.start,
            });
        }
    }
    ConflictReport { conflicts }
}

/// Overlapping index pairs `(i, j)` with `i < j` in a day sorted by start.
fn sweep(day: &[Window<'_>]) -> Vec<(usize, usize)> {
    let mut active: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
    let mut pairs = Vec::new();

    for (j, current) in day.iter().enumerate() {
        // Anything that ended at or before this start can no longer overlap.
        while active
            .peek()
            .is_some_and(|Reverse((end, _))| *end <= current.start)
        {
            active.pop();
        }
        // Active windows started no later than `current` and end after its
        // start; a zero-length `current` still needs a strictly earlier start.
        pairs.extend(
            active
                .iter()
                .map(|Reverse((_, i))| *i)
                .filter(|&i| day[i].start < current.end && day[i].id != current.id)
                .map(|i| (i, j)),
        );
        active.push(Reverse((current.end, j)));
    }

    pairs.sort_unstable();
    pairs
}
