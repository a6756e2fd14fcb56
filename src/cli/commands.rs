//! Command implementations for the cropwatch CLI
//!
//! This module contains command execution, upstream wiring, progress
//! reporting and result rendering for the CLI interface.

use crate::cache::ZoneCache;
use crate::cli::args::{Args, ClassifyArgs, Commands, OutputFormat, StandardsAction, UpdateArgs};
use crate::config::MonitorConfig;
use crate::constants::ALL_ATTRIBUTES;
use crate::error::CropwatchError;
use crate::models::{Attribute, ClassifiedRecord, Outcome, OutcomeTally, StandardProfile};
use crate::pipeline::{AttributeAverages, BatchSummary, PipelineRun, ProfileStatus, ZoneMonitor};
use crate::registry::{JsonFileStandardStore, StandardRegistry, StandardStore};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Main command runner
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;

    info!("Starting cropwatch");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = load_configuration(&args)?;

    match &args.command {
        Commands::Classify(classify) => run_classify(&args, classify, &config).await,
        Commands::Averages(_) => run_averages(&args, &config).await,
        Commands::Standards { action } => run_standards(&args, action, &config).await,
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cropwatch={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
fn load_configuration(args: &Args) -> Result<MonitorConfig> {
    match &args.config_file {
        Some(path) => info!("Using config file: {}", path.display()),
        None => debug!("No config file given, trying default location"),
    }

    let mut config = MonitorConfig::load_layered(args.config_file.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Build the zone cache from the configured upstream
async fn open_cache(config: &MonitorConfig) -> Result<ZoneCache> {
    if let Some(dir) = &config.data_dir {
        return Ok(ZoneCache::load_dir(dir).await);
    }

    #[cfg(feature = "http")]
    if let Some(base_url) = &config.base_url {
        let client = reqwest::Client::new();
        return Ok(ZoneCache::fetch_all(&client, base_url).await);
    }

    Err(no_upstream_error().into())
}

/// Build the standard store from the configured upstream
fn open_store(config: &MonitorConfig) -> Result<Arc<dyn StandardStore>> {
    if let Some(dir) = &config.data_dir {
        return Ok(Arc::new(JsonFileStandardStore::new(dir)));
    }

    #[cfg(feature = "http")]
    if let Some(base_url) = &config.base_url {
        return Ok(Arc::new(crate::registry::HttpStandardStore::new(
            reqwest::Client::new(),
            base_url.clone(),
        )));
    }

    Err(no_upstream_error().into())
}

fn no_upstream_error() -> CropwatchError {
    if cfg!(feature = "http") {
        CropwatchError::configuration("no upstream configured: set --data-dir or --base-url")
    } else {
        CropwatchError::configuration("no upstream configured: set --data-dir")
    }
}

async fn load_registry(config: &MonitorConfig) -> Result<StandardRegistry> {
    let mut registry = StandardRegistry::new(open_store(config)?);
    registry
        .fetch_active()
        .await
        .context("Failed to fetch standard profiles")?;
    Ok(registry)
}

async fn run_classify(args: &Args, classify: &ClassifyArgs, config: &MonitorConfig) -> Result<()> {
    let start_time = Instant::now();

    let (cache, registry) = tokio::join!(open_cache(config), load_registry(config));
    let cache = cache?;
    let mut registry = registry?;
    if classify.use_defaults {
        registry.show_defaults().await?;
    }

    let monitor = ZoneMonitor::from_config(config)?;
    let PipelineRun {
        selection,
        filter_stats,
        averages,
        profile,
        status,
        batch,
    } = monitor.run(&cache, &registry)?;

    let progress_bar = if args.show_progress() && filter_stats.retained > 0 {
        let pb = ProgressBar::new(filter_stats.retained as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("Classifying {} {}", selection.zone, selection.period));
        Some(pb)
    } else {
        None
    };

    let mut classified: Vec<ClassifiedRecord> = Vec::new();
    let summary = batch
        .for_each_chunk(|chunk| {
            if let Some(pb) = &progress_bar {
                pb.inc(chunk.classified.len() as u64);
                pb.set_message(format!("chunk {}", chunk.index + 1));
            }
            if classify.records {
                classified.extend(chunk.classified.iter().cloned());
            }
        })
        .await;

    if let Some(pb) = &progress_bar {
        pb.finish_with_message("Classification complete");
    }

    if summary.superseded {
        warn!("Run {} was superseded before completion", summary.generation);
    }

    match args.format {
        OutputFormat::Json => {
            let report = json!({
                "selection": selection,
                "filter": {
                    "total": filter_stats.total,
                    "retained": filter_stats.retained,
                    "wrong_year": filter_stats.wrong_year,
                    "outside_window": filter_stats.outside_window,
                    "sentinel": filter_stats.sentinel,
                    "unparseable_date": filter_stats.unparseable_date,
                },
                "averages": averages_json(&averages),
                "profile_status": status,
                "profile": profile,
                "summary": summary,
                "percentages": percentages_json(&summary.tally),
                "records": classify.records.then_some(&classified),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "\n{} {} {} {}",
                "Zone".bright_green().bold(),
                selection.zone.to_string().bright_cyan(),
                selection.period.describe(),
                selection.year
            );
            println!("Attributes: {}", selection.attributes);
            println!("Records: {}", filter_stats.summary());
            print_averages(&averages);
            match (&status, &profile) {
                (ProfileStatus::Resolved, Some(profile)) => print_profile(profile),
                _ => println!(
                    "{}",
                    format!("No standard profile for {}", selection.period).yellow()
                ),
            }
            print_summary(&summary);
            if classify.records {
                for record in &classified {
                    println!(
                        "  {:>8}  {}  {:<13} {}",
                        record.record.id,
                        record.record.date,
                        record.outcome,
                        record.marker_color()
                    );
                }
            }
            println!(
                "Finished in {}",
                HumanDuration(start_time.elapsed()).to_string().bright_black()
            );
        }
    }

    Ok(())
}

async fn run_averages(args: &Args, config: &MonitorConfig) -> Result<()> {
    let cache = open_cache(config).await?;
    let monitor = ZoneMonitor::from_config(config)?;
    let averages = monitor.averages(&cache)?;
    let selection = monitor.selection();

    match args.format {
        OutputFormat::Json => {
            let report = json!({
                "zone": selection.zone,
                "period": selection.period,
                "year": selection.year,
                "averages": averages_json(&averages),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} {}",
                selection.zone.to_string().bright_cyan(),
                selection.period.describe(),
                selection.year
            );
            print_averages(&averages);
        }
    }
    Ok(())
}

async fn run_standards(
    args: &Args,
    action: &StandardsAction,
    config: &MonitorConfig,
) -> Result<()> {
    let mut registry = load_registry(config).await?;

    match action {
        StandardsAction::Show { defaults } => {
            if *defaults {
                registry.show_defaults().await?;
            }
            render_profiles(args.format, registry.profiles())?;
        }
        StandardsAction::Update(update) => {
            let mut profile = registry
                .resolve(update.period)
                .cloned()
                .with_context(|| format!("No standard profile for {}", update.period))?;
            apply_thresholds(&mut profile, update);
            let updated = registry.update(&profile).await?;
            render_profiles(args.format, std::slice::from_ref(&updated))?;
        }
        StandardsAction::Reset => match registry.reset_all_to_default().await {
            Ok(count) => match args.format {
                OutputFormat::Json => println!("{}", json!({ "reset": count })),
                OutputFormat::Text => println!(
                    "{}",
                    format!("Standard has been reset to default values ({count} profiles)")
                        .green()
                ),
            },
            Err(CropwatchError::PartialReset {
                applied,
                total,
                source,
            }) => {
                anyhow::bail!(
                    "Reset to default stopped after {applied} of {total} profiles: {source}"
                );
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn apply_thresholds(profile: &mut StandardProfile, update: &UpdateArgs) {
    let changes = [
        (Attribute::Ndvi, update.ndvi),
        (Attribute::Ndwi, update.ndwi),
        (Attribute::Gli, update.gli),
        (Attribute::Precipitation, update.precipitation),
        (Attribute::SoilMoisture, update.soil_moisture),
    ];
    for (attribute, value) in changes {
        if let Some(value) = value {
            profile.set_threshold(attribute, value);
        }
    }
}

fn averages_json(averages: &AttributeAverages) -> serde_json::Value {
    averages
        .attributes()
        .map(|attr| (attr.wire_name().to_string(), json!(averages.get(attr))))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn percentages_json(tally: &OutcomeTally) -> serde_json::Value {
    json!({
        "exceeds": tally.percentage(Outcome::Exceeds),
        "below": tally.percentage(Outcome::Below),
        "matches": tally.percentage(Outcome::Matches),
    })
}

fn print_averages(averages: &AttributeAverages) {
    println!("{}", "Averages:".bright_white().bold());
    for attr in averages.attributes() {
        let value = averages
            .get(attr)
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "undefined".to_string());
        println!("   {:<14} {}", attr.label(), value);
    }
}

fn print_profile(profile: &StandardProfile) {
    println!(
        "{} {} (id {})",
        "Standard:".bright_white().bold(),
        profile.standard_zone,
        profile.id
    );
    for attr in ALL_ATTRIBUTES {
        println!("   {:<14} {}", attr.label(), profile.threshold(attr));
    }
}

fn print_summary(summary: &BatchSummary) {
    let tally = &summary.tally;
    let pct = |outcome| {
        tally
            .percentage(outcome)
            .map(|p| format!("{p:.2}%"))
            .unwrap_or_else(|| "undefined".to_string())
    };

    println!("{}", "Classification:".bright_white().bold());
    println!(
        "   {:<14} {:>8}  {}",
        "Exceeds".green(),
        tally.exceeds,
        pct(Outcome::Exceeds)
    );
    println!(
        "   {:<14} {:>8}  {}",
        "Below".red(),
        tally.below,
        pct(Outcome::Below)
    );
    println!(
        "   {:<14} {:>8}  {}",
        "Matches".yellow(),
        tally.matches,
        pct(Outcome::Matches)
    );
    println!(
        "   {:<14} {:>8}",
        "Indeterminate".bright_black(),
        tally.indeterminate()
    );
    println!(
        "   {} records in {} chunks",
        tally.total, summary.chunks_delivered
    );
}

fn render_profiles(format: OutputFormat, profiles: &[StandardProfile]) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(profiles)?),
        OutputFormat::Text => {
            if profiles.is_empty() {
                println!("{}", "No standard profiles".yellow());
            }
            for profile in profiles {
                print_profile(profile);
            }
        }
    }
    Ok(())
}
