//! CLI command definitions and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Visor - dependency-graph pipeline engine for AI-assisted code review
#[derive(Parser)]
#[command(name = "visor", about = "Dependency-graph pipeline engine for AI-assisted code review and automation checks")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to the pipeline config file")]
    pub config: Option<PathBuf>,

    /// Project root providers execute against (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan and execute the pipeline
    Run {
        /// Triggering event (pr_opened, pr_updated, issue_opened, issue_comment, manual, or a custom name)
        #[arg(long, default_value = "manual")]
        event: String,

        /// Only run checks tagged with one of these (OR-matched)
        #[arg(long = "tag", value_name = "TAG")]
        include_tags: Vec<String>,

        /// Exclude checks tagged with one of these (overrides --tag)
        #[arg(long = "exclude-tag", value_name = "TAG")]
        exclude_tags: Vec<String>,

        /// Output format for the execution report
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Load and validate a config file without executing it
    Validate,

    /// Print the resolved dependency plan (levels and ANY-OF groups)
    Explain {
        #[arg(long, default_value = "manual")]
        event: String,

        #[arg(long = "tag", value_name = "TAG")]
        include_tags: Vec<String>,

        #[arg(long = "exclude-tag", value_name = "TAG")]
        exclude_tags: Vec<String>,
    },
}

/// Output format for the `run` subcommand's execution report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "plain" => Ok(Self::Text),
            other => Err(format!("unknown report format '{other}', use: json or text")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_defaults() {
        let cli = Cli::parse_from(["visor", "run"]);
        match cli.command {
            Command::Run { event, format, include_tags, exclude_tags } => {
                assert_eq!(event, "manual");
                assert_eq!(format, OutputFormat::Json);
                assert!(include_tags.is_empty());
                assert!(exclude_tags.is_empty());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parses_run_with_tags_and_event() {
        let cli = Cli::parse_from(["visor", "run", "--event", "pr_opened", "--tag", "fast", "--tag", "security"]);
        match cli.command {
            Command::Run { event, include_tags, .. } => {
                assert_eq!(event, "pr_opened");
                assert_eq!(include_tags, vec!["fast".to_string(), "security".to_string()]);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parses_validate() {
        let cli = Cli::parse_from(["visor", "validate"]);
        assert!(matches!(cli.command, Command::Validate));
    }

    #[test]
    fn parses_explain() {
        let cli = Cli::parse_from(["visor", "explain", "--exclude-tag", "slow"]);
        match cli.command {
            Command::Explain { exclude_tags, .. } => assert_eq!(exclude_tags, vec!["slow".to_string()]),
            _ => panic!("expected Explain command"),
        }
    }

    #[test]
    fn report_format_from_str() {
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn parses_config_and_project_root() {
        let cli = Cli::parse_from(["visor", "-c", "visor.yaml", "--project-root", "/tmp/proj", "validate"]);
        assert_eq!(cli.config, Some(PathBuf::from("visor.yaml")));
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp/proj")));
    }
}
