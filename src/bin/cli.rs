//! routecheck CLI - cross-check HTTP routes against client call sites.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routecheck::config::HostPolicy;
use routecheck::parser::scan_roots;
use routecheck::recommend::{collect_handler_logs, recommend};
use routecheck::{Analyzer, Report, RouteCheckConfig, RuntimeUsage};

#[derive(Parser)]
#[command(name = "routecheck")]
#[command(about = "Cross-check declared HTTP routes against client call sites", long_about = None)]
struct Cli {
    /// Directory to scan (repeatable; default: roots from the config)
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Config file (default: ./routecheck.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Whether scheme/host prefixes take part in matching
    #[arg(long, value_enum)]
    host_policy: Option<HostPolicy>,

    /// Per-route deprecation recommendations, with handler log templates
    #[arg(long)]
    recommend: bool,

    /// JSON object of runtime occurrences per route ("GET /api/x": 12); implies --recommend
    #[arg(long, value_name = "FILE")]
    runtime_usage: Option<PathBuf>,

    /// Exit with status 2 when unmatched calls, mismatches, duplicates or diagnostics are found
    #[arg(long)]
    strict: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "routecheck=debug" } else { "routecheck=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<(RouteCheckConfig, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = RouteCheckConfig::try_load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((config, base))
        }
        None => {
            let base = PathBuf::from(".");
            Ok((RouteCheckConfig::load(&base.join(RouteCheckConfig::FILE_NAME)), base))
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let (mut config, base) = load_config(cli.config.as_deref())?;
    if let Some(policy) = cli.host_policy {
        config.matching.host_policy = policy;
    }

    let roots = if cli.roots.is_empty() {
        config.resolve_roots(&base)
    } else {
        cli.roots.clone()
    };
    for root in &roots {
        if !root.is_dir() {
            anyhow::bail!("not a directory: {}", root.display());
        }
    }
    debug!(roots = ?roots, "scanning");

    let classes = scan_roots(&roots, &config.scan.extra_ignores);
    let host_policy = config.matching.host_policy;
    let analysis = Analyzer::new(config).analyze(&classes);

    let recommendations = if cli.recommend || cli.runtime_usage.is_some() {
        let runtime = cli
            .runtime_usage
            .as_deref()
            .map(|path| {
                RuntimeUsage::load(path)
                    .with_context(|| format!("loading runtime usage {}", path.display()))
            })
            .transpose()?;
        let logs = collect_handler_logs(&analysis.routes);
        debug!(logs = logs.len(), "handler log templates");
        recommend(&analysis, &logs, runtime.as_ref())
    } else {
        Vec::new()
    };

    let root_names: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
    let report = Report::new(analysis, &root_names, host_policy).with_recommendations(recommendations);

    match cli.format {
        Format::Text => println!("{}", report.render_text()),
        Format::Json => println!("{}", report.to_json().context("serializing report")?),
    }

    Ok(if cli.strict && report.has_findings() { 2 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_policy_flag() {
        let cli = Cli::try_parse_from(["routecheck", "--host-policy", "keep"]).unwrap();
        assert_eq!(cli.host_policy, Some(HostPolicy::Keep));
        assert!(Cli::try_parse_from(["routecheck", "--host-policy", "drop"]).is_err());
    }

    #[test]
    fn test_recommend_flags() {
        let cli = Cli::try_parse_from(["routecheck", "--runtime-usage", "usage.json"]).unwrap();
        assert!(!cli.recommend);
        assert_eq!(cli.runtime_usage.as_deref(), Some(Path::new("usage.json")));
        let cli = Cli::try_parse_from(["routecheck", "--recommend"]).unwrap();
        assert!(cli.recommend);
    }
}
