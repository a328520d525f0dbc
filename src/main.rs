//! Visor CLI entry point.

use std::path::PathBuf;

use eyre::{Context, Result};
use tracing::info;

use visor::cli::{Cli, Command, OutputFormat};
use visor::config::{load_file, Config};
use visor::planner::{build_plan, ResolvedDependency, TagFilter};
use visor::providers::{PrInfo, ProviderRegistry};
use visor::scheduler::RunRequest;
use visor::{run_pipeline, TriggerEvent};

use clap::Parser;

fn setup_logging() {
    let debug = std::env::var("VISOR_DEBUG").map(|v| v == "1").unwrap_or(false);
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_env("VISOR_LOG_LEVEL")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn tag_filter(include: Vec<String>, exclude: Vec<String>) -> TagFilter {
    TagFilter {
        include: if include.is_empty() { None } else { Some(include) },
        exclude: if exclude.is_empty() { None } else { Some(exclude) },
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("visor.yaml"));
    load_file(&path).with_context(|| format!("loading config from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let project_root = cli.project_root.clone().unwrap_or_else(|| PathBuf::from("."));

    let exit_code = match &cli.command {
        Command::Validate => {
            let config = load_config(&cli)?;
            info!(checks = config.checks.len(), "config is valid");
            println!("OK: {} checks configured", config.checks.len());
            0
        }

        Command::Explain { event, include_tags, exclude_tags } => {
            let config = load_config(&cli)?;
            let event: TriggerEvent = event.parse().unwrap();
            let filter = tag_filter(include_tags.clone(), exclude_tags.clone());
            let plan = build_plan(&config, &event, &filter).context("building dependency plan")?;
            for (level_idx, level) in plan.levels.iter().enumerate() {
                println!("level {level_idx}:");
                for check_id in level {
                    let deps: Vec<String> = plan
                        .direct_dependencies(check_id)
                        .iter()
                        .map(|d| match d {
                            ResolvedDependency::Single(s) => s.clone(),
                            ResolvedDependency::AnyOf(members) => format!("any({})", members.join("|")),
                        })
                        .collect();
                    if deps.is_empty() {
                        println!("  {check_id}");
                    } else {
                        println!("  {check_id} <- [{}]", deps.join(", "));
                    }
                }
            }
            0
        }

        Command::Run { event, include_tags, exclude_tags, format } => {
            let config = load_config(&cli)?;
            let event: TriggerEvent = event.parse().unwrap();
            let request = RunRequest {
                event,
                tag_filter: tag_filter(include_tags.clone(), exclude_tags.clone()),
                pr_info: PrInfo::default(),
            };
            let report = run_pipeline(config, ProviderRegistry::standard(), project_root, request)
                .await
                .context("running pipeline")?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => {
                    println!(
                        "run {}: {} issues, {} checks run, {} failed",
                        report.execution_statistics.run_id,
                        report.review_summary.issues.len(),
                        report.execution_statistics.total_executions,
                        report.execution_statistics.failed_executions
                    );
                    for condition in &report.failure_conditions {
                        println!("  [{}] {} -> {}", condition.condition_name, condition.expression, condition.message);
                    }
                }
            }
            report.exit_code()
        }
    };

    std::process::exit(exit_code);
}
