use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use serde_json::{json, Value};
use tracing::warn;

use cdc_bus::{EventBus, JsonLinesEventBus};
use cdc_diff::diff_images;
use cdc_pipeline::{BatchCoordinator, BatchReport, CdcConfig, KeyFilter, RecordOutcome};
use cdc_store::{BlobStore, FsBlobStore, UrlSigner};
use cdc_types::{unmarshall, Image, StreamEvent};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Process(args) => cmd_process(args, &format).await,
        Command::Diff(args) => cmd_diff(args, &format),
        Command::Filter(args) => cmd_filter(args, &format),
        Command::Purge(args) => cmd_purge(args, &format).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CdcConfig> {
    match path {
        Some(path) => CdcConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => CdcConfig::from_env().context("loading config from the environment"),
    }
}

fn signer_for(config: &CdcConfig, blob_dir: &Path) -> UrlSigner {
    let endpoint = format!("file://{}", blob_dir.display());
    match &config.signing_secret {
        Some(secret) => UrlSigner::from_secret(secret, endpoint),
        None => {
            warn!("no signing secret configured; references will not verify outside this run");
            UrlSigner::random(endpoint)
        }
    }
}

async fn open_store(config: &CdcConfig, blob_dir: &Path) -> anyhow::Result<FsBlobStore> {
    let bucket = config
        .bucket()
        .context("set BUCKET_NAME or `bucket_name` in the config file")?;
    let root = absolute(blob_dir)?;
    let store = FsBlobStore::open(&root, bucket, signer_for(config, &root))
        .await
        .with_context(|| format!("opening blob directory {}", root.display()))?
        .with_retention(config.offload_ttl());
    Ok(store)
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn cmd_process(args: ProcessArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let raw = tokio::fs::read_to_string(&args.batch)
        .await
        .with_context(|| format!("reading {}", args.batch.display()))?;
    let event: StreamEvent = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {} as a stream batch", args.batch.display()))?;

    let store: Arc<dyn BlobStore> = Arc::new(open_store(&config, &args.blob_dir).await?);
    let bus: Arc<dyn EventBus> = match &args.events {
        Some(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Arc::new(JsonLinesEventBus::new(file))
        }
        None => Arc::new(JsonLinesEventBus::stdout()),
    };

    let coordinator = BatchCoordinator::new(&config, store, bus)?;
    let report = coordinator.process_event(event).await;

    // Keep stdout clean for the event stream when no events file is given.
    let mut out: Box<dyn Write> = if args.events.is_some() {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::io::stderr())
    };
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report_json(&report))?)?,
        OutputFormat::Text => print_report(&mut out, &report)?,
    }
    Ok(())
}

fn report_json(report: &BatchReport) -> Value {
    let records: Vec<Value> = report
        .records
        .iter()
        .map(|r| {
            let mut entry = json!({ "eventId": r.event_id });
            match &r.outcome {
                RecordOutcome::Published { entry_id, offloaded, changed } => {
                    entry["outcome"] = json!("published");
                    entry["entryId"] = json!(entry_id.to_string());
                    entry["offloaded"] = json!(offloaded);
                    entry["attributesChanged"] = json!(changed);
                }
                RecordOutcome::Skipped(reason) => {
                    entry["outcome"] = json!("skipped");
                    entry["reason"] = json!(reason.to_string());
                }
                RecordOutcome::Failed(e) => {
                    entry["outcome"] = json!("failed");
                    entry["kind"] = json!(e.kind());
                    entry["error"] = json!(e.to_string());
                }
                RecordOutcome::Panicked(message) => {
                    entry["outcome"] = json!("failed");
                    entry["kind"] = json!("Panicked");
                    entry["error"] = json!(message);
                }
            }
            entry
        })
        .collect();

    json!({
        "published": report.published(),
        "skipped": report.skipped(),
        "failed": report.failed(),
        "elapsedMs": report.elapsed.as_millis() as u64,
        "records": records,
    })
}

fn print_report(out: &mut dyn Write, report: &BatchReport) -> anyhow::Result<()> {
    for r in &report.records {
        let id = r.event_id.as_deref().unwrap_or("<none>");
        match &r.outcome {
            RecordOutcome::Published { entry_id, offloaded, changed } => {
                let route = if *offloaded { "offloaded".cyan() } else { "inline".normal() };
                writeln!(
                    out,
                    "{} {} → {} ({}, {} changed)",
                    "✓".green(),
                    id.bold(),
                    entry_id.short_id().yellow(),
                    route,
                    changed.len()
                )?;
            }
            RecordOutcome::Skipped(reason) => {
                writeln!(out, "{} {} skipped: {}", "-".dimmed(), id.bold(), reason.to_string().dimmed())?;
            }
            RecordOutcome::Failed(e) => {
                writeln!(out, "{} {} {}: {}", "✗".red(), id.bold(), e.kind().red(), e)?;
            }
            RecordOutcome::Panicked(message) => {
                writeln!(out, "{} {} {}: {}", "✗".red(), id.bold(), "Panicked".red(), message)?;
            }
        }
    }
    writeln!(
        out,
        "\n{} published, {} skipped, {} failed in {:?}",
        report.published().to_string().green().bold(),
        report.skipped().to_string().bold(),
        report.failed().to_string().red().bold(),
        report.elapsed
    )?;
    Ok(())
}

fn read_image(path: &Path, typed: bool) -> anyhow::Result<Image> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let Value::Object(map) = value else {
        anyhow::bail!("{} does not hold a JSON object", path.display());
    };
    if typed {
        unmarshall(&map).with_context(|| format!("decoding {}", path.display()))
    } else {
        Ok(map)
    }
}

fn cmd_diff(args: DiffArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let old = read_image(&args.old, args.typed)?;
    let new = read_image(&args.new, args.typed)?;
    let diff = diff_images(Some(&new), Some(&old))?;

    match format {
        OutputFormat::Json => {
            let doc = json!({
                "attributesChanged": diff.changed,
                "before": diff.before,
                "after": diff.after,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            if diff.is_empty() {
                println!("No changes.");
                return Ok(());
            }
            for path in &diff.changed {
                println!("  {} {}", "changed:".yellow(), path);
            }
            println!("\n{}", "before".red().bold());
            println!("{}", serde_json::to_string_pretty(&diff.before)?);
            println!("{}", "after".green().bold());
            println!("{}", serde_json::to_string_pretty(&diff.after)?);
        }
    }
    Ok(())
}

fn cmd_filter(args: FilterArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let filter = KeyFilter::compile(&args.patterns)?;
    let criteria = filter.to_filter_criteria(&args.key);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&criteria)?),
        OutputFormat::Text => {
            for rule in filter.rules() {
                println!("  {} {:?}", "✓".green(), rule);
            }
            println!("{}", serde_json::to_string_pretty(&criteria)?);
        }
    }
    Ok(())
}

async fn cmd_purge(args: PurgeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = open_store(&config, &args.blob_dir).await?;
    let removed = store.purge_expired(Utc::now()).await?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "removed": removed })),
        OutputFormat::Text => println!("{} Purge: {} blobs removed.", "✓".green(), removed),
    }
    Ok(())
}
