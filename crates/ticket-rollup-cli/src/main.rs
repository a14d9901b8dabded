use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use ticket_rollup_core::{
    load_and_plan, run, ArtifactSpec, OutputInventory, RollupConfig, RollupError, METADATA_FILE,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "rollup.v1";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "rollup")]
#[command(about = "Pre-aggregate a support-ticket export into weekly and monthly JSON summaries")]
struct Cli {
    /// YAML file with configuration defaults; flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// tracing filter directive; falls back to `RUST_LOG`, then `info`.
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild every artifact from the export, then verify the output directory.
    Generate(SourceArgs),
    /// List the artifact file names the export would produce.
    Plan(SourceArgs),
    /// Check an existing output directory.
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(long, env = "ROLLUP_INPUT")]
    input: Option<PathBuf>,
    #[arg(long, env = "ROLLUP_OUTPUT_DIR")]
    out: Option<PathBuf>,
    #[arg(long)]
    ranking_year: Option<i32>,
    #[arg(long = "ranking-quarter")]
    ranking_quarters: Vec<u8>,
    #[arg(long)]
    link_base_url: Option<String>,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long, env = "ROLLUP_OUTPUT_DIR")]
    out: Option<PathBuf>,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
            .context("failed to build default log filter")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref())?;
    let base = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => run_generate(&apply_source_args(base, args)),
        Command::Plan(args) => run_plan(&apply_source_args(base, args)),
        Command::Verify(args) => {
            let out_dir = args.out.unwrap_or(base.output_dir);
            let inventory = verify_output(&out_dir)?;
            emit_json(serde_json::json!({
                "output_dir": out_dir,
                "verification": inventory
            }))
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RollupConfig> {
    let Some(path) = path else {
        return Ok(RollupConfig::default());
    };
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = serde_yaml::from_str::<RollupConfig>(&body)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    tracing::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

fn apply_source_args(mut config: RollupConfig, args: SourceArgs) -> RollupConfig {
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(out) = args.out {
        config.output_dir = out;
    }
    if let Some(year) = args.ranking_year {
        config.ranking.year = year;
    }
    if !args.ranking_quarters.is_empty() {
        config.ranking.quarters = args.ranking_quarters;
    }
    if let Some(url) = args.link_base_url {
        config.link_base_url = url;
    }
    config
}

#[allow(clippy::cast_precision_loss)]
fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::error!("CSV file not found: {}", path.display());
        return Err(RollupError::InputMissing { path: path.to_path_buf() }.into());
    }
    let metadata = fs::metadata(path).with_context(|| format!("cannot stat {}", path.display()))?;
    tracing::info!("CSV file found: {}", path.display());
    tracing::info!("  file size: {:.2} MB", metadata.len() as f64 / (1024.0 * 1024.0));
    if let Ok(modified) = metadata.modified() {
        if let Ok(stamp) = OffsetDateTime::from(modified).format(&Rfc3339) {
            tracing::info!("  last modified: {}", stamp);
        }
    }
    Ok(())
}

fn check_output_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create output directory {}", path.display()))?;
        tracing::info!("created output directory: {}", path.display());
        return Ok(());
    }
    let existing = OutputInventory::scan(path)?;
    tracing::info!("output directory exists: {}", path.display());
    tracing::info!("  existing JSON files: {}", existing.json_files);
    if existing.json_files > 0 {
        tracing::warn!("existing JSON files will be overwritten");
    }
    Ok(())
}

fn verify_output(out_dir: &Path) -> Result<OutputInventory> {
    let inventory = OutputInventory::scan(out_dir)?;
    if !inventory.has_metadata {
        return Err(anyhow!("{METADATA_FILE} not found in {}", out_dir.display()));
    }
    tracing::info!("{} found", METADATA_FILE);
    tracing::info!("total JSON files: {}", inventory.json_files);
    tracing::info!("weekly aggregation files: {}", inventory.weekly_files);
    tracing::info!("monthly aggregation files: {}", inventory.monthly_files);
    Ok(inventory)
}

fn run_generate(config: &RollupConfig) -> Result<()> {
    config.validate()?;
    check_input(&config.input)?;
    check_output_dir(&config.output_dir)?;

    let summary = run(config).context("failed to generate aggregations")?;
    let inventory = verify_output(&config.output_dir).context("output verification failed")?;

    tracing::info!("aggregation complete: {} files generated", summary.artifacts.files_written);
    emit_json(serde_json::json!({
        "input": config.input,
        "output_dir": config.output_dir,
        "summary": summary,
        "verification": inventory
    }))
}

fn run_plan(config: &RollupConfig) -> Result<()> {
    config.validate()?;
    let (set, _, plan) = load_and_plan(config).context("failed to plan artifacts")?;
    let mut artifacts = vec![METADATA_FILE.to_string()];
    artifacts.extend(plan.iter().map(ArtifactSpec::file_name));
    emit_json(serde_json::json!({
        "input": config.input,
        "tickets": set.tickets.len(),
        "years": set.years,
        "artifact_count": artifacts.len(),
        "artifacts": artifacts
    }))
}
