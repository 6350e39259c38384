use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveTime};
use crewplan_core::{CrewplanConfig, PatternId};
use crewplan_recurrence::{
    detect_conflicts, expand, ConflictReport, ExpandOptions, JobInstance, JobTemplate,
    MemoryStore, PatternRecord, Planner, RecurrencePattern,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::cli::{Command, Format};

/// A repeating job in a plan file.
#[derive(Debug, Deserialize)]
pub struct PlannedPattern {
    pub id: PatternId,
    pub pattern: PatternRecord,
    pub anchor: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: u32,
    /// Cap for never-ending patterns; falls back to `recurrence.open_ended_limit`.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// A single job in a plan file.
#[derive(Debug, Deserialize)]
pub struct PlannedOneOff {
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub patterns: Vec<PlannedPattern>,
    #[serde(default)]
    pub one_offs: Vec<PlannedOneOff>,
}

#[derive(Debug, Serialize)]
struct PreviewOutput {
    dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ConflictOutput<'a> {
    conflicts: &'a ConflictReport,
    groups: Vec<crewplan_recurrence::ConflictGroup>,
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    instances: &'a [JobInstance],
    conflicts: &'a ConflictReport,
}

/// Run `command` and render its result in `format`.
pub fn run(command: Command, config: &CrewplanConfig, format: Format) -> Result<String> {
    match command {
        Command::Preview {
            pattern,
            anchor,
            limit,
            exclude_anchor,
        } => preview(config, &pattern, anchor, limit, exclude_anchor, format),
        Command::Conflicts { instances } => {
            let instances: Vec<JobInstance> = read_json(&instances)?;
            conflicts(&instances, format)
        }
        Command::Plan { jobs } => {
            let plan: PlanFile = read_json(&jobs)?;
            plan_jobs(config, plan, format)
        }
    }
}

fn preview(
    config: &CrewplanConfig,
    pattern: &str,
    anchor: NaiveDate,
    limit: Option<usize>,
    exclude_anchor: bool,
    format: Format,
) -> Result<String> {
    let pattern = parse_pattern(config, pattern)?;
    let mut options = ExpandOptions::from_config(&config.recurrence)
        .limit(limit.unwrap_or(config.recurrence.preview_limit));
    if exclude_anchor {
        options.include_anchor = false;
    }
    let dates = expand(&pattern, anchor, &options).context("expanding pattern")?;
    debug!(dates = dates.len(), "preview expanded");

    match format {
        Format::Json => render_json(&PreviewOutput { dates }),
        Format::Text if dates.is_empty() => Ok("no occurrences match this pattern\n".to_string()),
        Format::Text => {
            let mut out = String::new();
            for date in dates {
                writeln!(out, "{date} {}", date.weekday())?;
            }
            Ok(out)
        }
    }
}

fn conflicts(instances: &[JobInstance], format: Format) -> Result<String> {
    let report = detect_conflicts(instances);
    info!(
        instances = instances.len(),
        conflicts = report.len(),
        "conflict scan finished"
    );
    match format {
        Format::Json => render_json(&ConflictOutput {
            groups: report.groups(),
            conflicts: &report,
        }),
        Format::Text => Ok(render_conflicts(&report)),
    }
}

fn plan_jobs(config: &CrewplanConfig, plan: PlanFile, format: Format) -> Result<String> {
    let planner = Planner::new(MemoryStore::new(), config.recurrence.clone());

    for entry in plan.patterns {
        let pattern = entry
            .pattern
            .into_pattern(config.recurrence.month_overflow)
            .with_context(|| format!("invalid pattern {}", entry.id))?;
        let template = JobTemplate {
            pattern,
            anchor: entry.anchor,
            time: entry.time,
            duration_minutes: entry.duration_minutes,
        };
        planner
            .schedule(&entry.id, &template, entry.limit)
            .with_context(|| format!("scheduling pattern {}", entry.id))?;
    }
    for job in plan.one_offs {
        planner.add_one_off(job.date, job.time, job.duration_minutes)?;
    }

    let instances = planner.instances()?;
    let report = planner.conflicts()?;
    match format {
        Format::Json => render_json(&PlanOutput {
            instances: &instances,
            conflicts: &report,
        }),
        Format::Text => {
            let mut out = String::new();
            for instance in &instances {
                let time = instance
                    .time()
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_else(|| "all-day".to_string());
                let source = instance
                    .source_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "one-off".to_string());
                writeln!(
                    out,
                    "{} {:>7} {:>4}m  {}  {}",
                    instance.date(),
                    time,
                    instance.duration_minutes(),
                    source,
                    instance.id()
                )?;
            }
            out.push_str(&render_conflicts(&report));
            Ok(out)
        }
    }
}

/// Inline JSON when the argument looks like an object, otherwise a file path.
fn parse_pattern(config: &CrewplanConfig, arg: &str) -> Result<RecurrencePattern> {
    let record: PatternRecord = if arg.trim_start().starts_with('{') {
        serde_json::from_str(arg).context("parsing inline pattern")?
    } else {
        read_json(arg)?
    };
    Ok(record.into_pattern(config.recurrence.month_overflow)?)
}

fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))
}

fn render_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn render_conflicts(report: &ConflictReport) -> String {
    if report.is_empty() {
        return "no conflicts\n".to_string();
    }
    let mut out = format!("{} conflict(s)\n", report.len());
    for conflict in report {
        out.push_str(&format!(
            "{}  {} <-> {}  ({} min overlap)\n",
            conflict.date, conflict.first, conflict.second, conflict.overlap_minutes
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CrewplanConfig {
        CrewplanConfig::default()
    }

    #[test]
    fn preview_text_lists_dates_with_weekdays() {
        let out = preview(
            &config(),
            r#"{"frequency":"weekly","daysOfWeek":[1,3,5],"occurrenceCount":6}"#,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Some(3),
            false,
            Format::Text,
        )
        .unwrap();
        assert_eq!(out, "2024-01-01 Mon\n2024-01-03 Wed\n2024-01-05 Fri\n");
    }

    #[test]
    fn preview_reports_empty_selection() {
        let out = preview(
            &config(),
            r#"{"frequency":"weekly","daysOfWeek":[]}"#,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            None,
            false,
            Format::Text,
        )
        .unwrap();
        assert_eq!(out, "no occurrences match this pattern\n");
    }

    #[test]
    fn preview_uses_configured_overflow_policy() {
        let mut config = config();
        config.recurrence.month_overflow = crewplan_core::MonthOverflow::Clamp;
        let out = preview(
            &config,
            r#"{"frequency":"monthly","dayOfMonth":31}"#,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Some(2),
            true,
            Format::Json,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["dates"], serde_json::json!(["2024-02-29", "2024-03-31"]));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = preview(
            &config(),
            r#"{"frequency":"monthly","dayOfMonth":0}"#,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            None,
            false,
            Format::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("day_of_month 0"));
    }

    #[test]
    fn plan_reports_cross_pattern_conflicts() {
        let plan: PlanFile = serde_json::from_str(
            r#"{
                "patterns": [
                    {"id": "mowing", "pattern": {"frequency": "weekly", "occurrenceCount": 2},
                     "anchor": "2024-01-01", "time": "09:00:00", "duration_minutes": 60},
                    {"id": "edging", "pattern": {"recurrenceFrequency": "biweekly",
                     "recurrenceCount": 1}, "anchor": "2024-01-01", "time": "09:30:00",
                     "duration_minutes": 30}
                ],
                "one_offs": [{"date": "2024-01-08", "duration_minutes": 90}]
            }"#,
        )
        .unwrap();
        let out = plan_jobs(&config(), plan, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["instances"].as_array().unwrap().len(), 4);
        assert_eq!(value["conflicts"]["conflicts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn plan_without_cap_for_open_ended_pattern_fails() {
        let plan: PlanFile = serde_json::from_str(
            r#"{"patterns": [{"id": "forever", "pattern": {"frequency": "weekly"},
                "anchor": "2024-01-01"}]}"#,
        )
        .unwrap();
        let err = plan_jobs(&config(), plan, Format::Text).unwrap_err();
        assert!(format!("{err:#}").contains("Unbounded request"));
    }

    #[test]
    fn conflict_text_output() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let jobs = [
            JobInstance::one_off(day, NaiveTime::from_hms_opt(9, 0, 0), 60),
            JobInstance::one_off(day, NaiveTime::from_hms_opt(10, 0, 0), 60),
        ];
        assert_eq!(conflicts(&jobs, Format::Text).unwrap(), "no conflicts\n");
    }
}
