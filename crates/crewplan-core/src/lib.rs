//! `crewplan-core`: shared identifiers, calendar policies and configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CrewplanConfig, LoggingConfig, RecurrenceConfig};
pub use error::{CrewplanError, Result};
pub use types::{InstanceId, MonthOverflow, PatternId};
