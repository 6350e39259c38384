//! `crewplan-recurrence`: recurrence expansion and conflict detection for
//! repeating service jobs.
//!
//! # Overview
//!
//! A [`RecurrencePattern`] plus an anchor date expands into a lazy sequence
//! of dates ([`occurrence`]), which its end condition cuts into a finite
//! prefix ([`termination`]). Dates combined with a time of day and duration
//! become [`JobInstance`]s ([`materialize`]), and [`conflict`] reports
//! overlapping instances. [`engine::Planner`] ties the stages to an
//! [`store::InstanceStore`].
//!
//! # Frequencies
//!
//! | Variant     | Behaviour                                                   |
//! |-------------|-------------------------------------------------------------|
//! | `Weekly`    | Every 7 days, or every listed weekday of each week          |
//! | `Biweekly`  | Every 14 days                                               |
//! | `Monthly`   | Pinned day each month; overflow skipped or clamped          |
//! | `Quarterly` | Pinned day every third month; same overflow policy          |
//!
//! Everything here is pure and synchronous. Stopping iteration is the only
//! cancellation there is.

pub mod conflict;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod occurrence;
pub mod record;
pub mod store;
pub mod termination;
pub mod types;

pub use conflict::{detect_conflicts, Conflict, ConflictGroup, ConflictReport};
pub use crewplan_core::{InstanceId, MonthOverflow, PatternId};
pub use engine::{JobTemplate, Planner, Preview, Scheduled};
pub use error::{RecurrenceError, Result};
pub use materialize::materialize;
pub use occurrence::Occurrences;
pub use record::PatternRecord;
pub use store::{InstanceStore, MemoryStore};
pub use termination::{expand, terminate, Dates, ExpandOptions, Terminated};
pub use types::{EndCondition, Frequency, JobInstance, PatternBuilder, RecurrencePattern, WeekdaySet};
