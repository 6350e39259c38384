use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for deterministic instance ids (UUIDv5 over `pattern:date`).
const INSTANCE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_94a2_3b7e_4d05_9a61_c2e8_0b4f_7d13);

/// Identifies a recurrence pattern (UUIDv7, time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub String);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for PatternId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies a single materialized job instance.
///
/// Pattern-generated instances use [`InstanceId::derived`], so regenerating the
/// same pattern yields the same ids. One-off jobs use [`InstanceId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Stable id for the occurrence of `pattern` identified by `key`
    /// (the ISO calendar date of the occurrence).
    pub fn derived(pattern: &PatternId, key: &str) -> Self {
        let name = format!("{}:{}", pattern.as_str(), key);
        Self(Uuid::new_v5(&INSTANCE_NAMESPACE, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What to do when a pinned day-of-month does not exist in a target month
/// (e.g. day 31 in April).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthOverflow {
    /// Produce no occurrence for that month.
    #[default]
    Skip,
    /// Use the last day of that month instead.
    Clamp,
}

impl fmt::Display for MonthOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthOverflow::Skip => write!(f, "skip"),
            MonthOverflow::Clamp => write!(f, "clamp"),
        }
    }
}

impl std::str::FromStr for MonthOverflow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip" => Ok(MonthOverflow::Skip),
            "clamp" => Ok(MonthOverflow::Clamp),
            other => Err(format!("unknown month overflow policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable() {
        let pattern = PatternId::from("p-1");
        let a = InstanceId::derived(&pattern, "2024-01-01");
        let b = InstanceId::derived(&pattern, "2024-01-01");
        assert_eq!(a, b);
        assert_ne!(a, InstanceId::derived(&pattern, "2024-01-02"));
        assert_ne!(a, InstanceId::derived(&PatternId::from("p-2"), "2024-01-01"));
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
        assert_ne!(PatternId::new(), PatternId::new());
    }

    #[test]
    fn month_overflow_wire_names() {
        assert_eq!(serde_json::to_string(&MonthOverflow::Clamp).unwrap(), r#""clamp""#);
        let parsed: MonthOverflow = serde_json::from_str(r#""skip""#).unwrap();
        assert_eq!(parsed, MonthOverflow::Skip);
        assert_eq!("clamp".parse::<MonthOverflow>().unwrap(), MonthOverflow::Clamp);
        assert!("round".parse::<MonthOverflow>().is_err());
    }
}
