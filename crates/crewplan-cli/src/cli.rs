use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Expand repeating service jobs and check them for schedule conflicts.
#[derive(Debug, Parser)]
#[command(name = "crewplan", version)]
pub struct Cli {
    /// Path to crewplan.toml (default: ~/.crewplan/crewplan.toml).
    #[arg(long, global = true, env = "CREWPLAN_CONFIG")]
    pub config: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the next occurrences of a pattern.
    Preview {
        /// Pattern as inline JSON or a path to a JSON file.
        #[arg(long)]
        pattern: String,
        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        anchor: NaiveDate,
        /// Number of dates to show (default: recurrence.preview_limit).
        #[arg(long)]
        limit: Option<usize>,
        /// Do not count the anchor date as the first occurrence.
        #[arg(long)]
        exclude_anchor: bool,
    },
    /// Report overlapping jobs in a JSON list of instances.
    Conflicts {
        /// Path to a JSON array of job instances.
        #[arg(long)]
        instances: String,
    },
    /// Schedule a plan file and report every instance and conflict.
    Plan {
        /// Path to a JSON plan with `patterns` and `one_offs`.
        #[arg(long)]
        jobs: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_args_parse() {
        let cli = Cli::try_parse_from([
            "crewplan",
            "preview",
            "--pattern",
            r#"{"frequency":"weekly"}"#,
            "--anchor",
            "2024-01-01",
            "--limit",
            "3",
            "--exclude-anchor",
        ])
        .unwrap();
        match cli.command {
            Command::Preview {
                anchor,
                limit,
                exclude_anchor,
                ..
            } => {
                assert_eq!(anchor, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(limit, Some(3));
                assert!(exclude_anchor);
            }
            other => panic!("expected preview, got {other:?}"),
        }
        assert_eq!(cli.format, Format::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["crewplan", "conflicts", "--instances", "x.json", "--format", "json"])
                .unwrap();
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn bad_anchor_rejected() {
        assert!(Cli::try_parse_from([
            "crewplan", "preview", "--pattern", "{}", "--anchor", "2024-02-30"
        ])
        .is_err());
    }
}
