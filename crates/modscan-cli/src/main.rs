use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use modscan_analyze::{AssemblyScanner, ScanResult};
use modscan_core::{ScanConfig, Severity};

#[derive(Parser)]
#[command(name = "modscan")]
#[command(about = "Static analyzer for malicious behaviors in compiled .NET mod assemblies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one assembly for suspicious behaviors
    Scan {
        /// Path to the assembly (.dll) to scan
        path: PathBuf,

        /// Attach developer remediation guidance to each finding
        #[arg(long)]
        developer: bool,

        /// Enable the deep-behavior correlation pass
        #[arg(long)]
        deep: bool,

        /// Emit results as JSON instead of the colored summary
        #[arg(long)]
        json: bool,

        /// Load a ScanConfig override from a YAML or JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "modscan=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Scan { path, developer, deep, json, config } => {
            run_scan(&path, developer, deep, json, config.as_deref())
        }
    }
}

fn load_config(override_path: Option<&std::path::Path>, developer: bool, deep: bool) -> Result<ScanConfig> {
    let mut scan_config = if let Some(path) = override_path {
        let loaded = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .with_context(|| format!("failed to load config override from {}", path.display()))?;
        loaded
            .try_deserialize::<ScanConfig>()
            .with_context(|| format!("invalid ScanConfig in {}", path.display()))?
    } else {
        ScanConfig::default()
    };

    if developer {
        scan_config.developer_mode = true;
    }
    if deep {
        scan_config.deep_analysis.enable = true;
    }

    Ok(scan_config)
}

fn run_scan(path: &std::path::Path, developer: bool, deep: bool, json: bool, config_path: Option<&std::path::Path>) -> Result<ExitCode> {
    let scan_config = load_config(config_path, developer, deep)?;
    let rules = modscan_rules::default_rules();

    let reader = build_reader()?;
    let scanner = AssemblyScanner::new(reader);

    let path_str = path.to_str().context("scan path must be valid UTF-8")?;
    tracing::info!(path = %path_str, "starting scan");

    let result = scanner
        .scan_path(path_str, &scan_config, &rules)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to scan {}", path.display()))?;

    if json {
        print_json(&result)?;
    } else {
        print_summary(&result);
    }

    if result.findings.is_empty() {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(2))
    }
}

#[cfg(feature = "real-assemblies")]
fn build_reader() -> Result<Box<dyn modscan_analyze::MetadataReader>> {
    Ok(Box::new(modscan_analyze::dotnetdll_adapter::DotnetDllMetadataReader))
}

#[cfg(not(feature = "real-assemblies"))]
fn build_reader() -> Result<Box<dyn modscan_analyze::MetadataReader>> {
    anyhow::bail!("this build was compiled without the `real-assemblies` feature; rebuild with --features real-assemblies to scan real .dll files")
}

fn print_json(result: &ScanResult) -> Result<()> {
    let payload = serde_json::json!({
        "findings": result.findings,
        "callChains": result.call_chains,
        "dataFlows": result.data_flows,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_summary(result: &ScanResult) {
    if result.findings.is_empty() {
        println!("{}", "No findings.".green().bold());
        return;
    }

    println!("{} {}", "Findings:".cyan().bold(), result.findings.len());
    for finding in &result.findings {
        let severity = colorize_severity(finding.severity);
        println!("  {} [{}] {} — {}", severity, finding.rule_id.yellow(), finding.location, finding.description);
        if let Some(guidance) = &finding.developer_guidance {
            println!("    {} {}", "fix:".cyan(), guidance.recommendation);
        }
    }

    if !result.call_chains.is_empty() {
        println!("\n{} {}", "Call chains:".cyan().bold(), result.call_chains.len());
    }
    if !result.data_flows.is_empty() {
        println!("{} {}", "Data-flow chains:".cyan().bold(), result.data_flows.len());
    }
}

fn colorize_severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".normal(),
    }
}
