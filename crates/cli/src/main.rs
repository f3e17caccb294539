//! `metaprop`: import meta property records into a target model.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metaprop_core::ItemId;
use metaprop_engine::{FixedInput, ImportConfig, ImportOutcome, Importer, InputSelector};
use metaprop_storage::{FieldSource, Host, SqliteHost};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "metaprop")]
#[command(about = "Import meta property records into a target model")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV or JSON file of property records
    Import {
        /// Target model database
        #[arg(short, long)]
        model: PathBuf,

        /// Input file; prompted for on stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long, env = "METAPROP_CONFIG")]
        config: Option<PathBuf>,

        /// Run log, appended to
        #[arg(long)]
        log: Option<PathBuf>,

        /// Private schema store used while creating fields
        #[arg(long)]
        scratch_store: Option<PathBuf>,

        /// Abort the whole run on an unparsable numeric value
        #[arg(long)]
        strict_values: bool,
    },
    /// List the fields an item carries
    Fields {
        #[arg(short, long)]
        model: PathBuf,

        item: String,
    },
}

/// Asks for the input path on stdin. An empty line cancels.
struct PromptInput;

impl InputSelector for PromptInput {
    fn select(&mut self, default_folder: Option<&Path>) -> Option<PathBuf> {
        let mut stderr = io::stderr();
        match default_folder {
            Some(folder) => eprint!("Input file [{}]: ", folder.display()),
            None => eprint!("Input file: "),
        }
        stderr.flush().ok()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        FixedInput(Some(PathBuf::from(line))).select(default_folder)
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metaprop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Import {
            model,
            input,
            config,
            log,
            scratch_store,
            strict_values,
        } => {
            let mut config = match config {
                Some(path) => ImportConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ImportConfig::default(),
            };
            if let Some(log) = log {
                config.log_file = log;
            }
            if let Some(scratch_store) = scratch_store {
                config.scratch_store = scratch_store;
            }
            config.strict_values |= strict_values;

            import(&model, input, config)
        }
        Command::Fields { model, item } => {
            list_fields(&model, &item)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_model(path: &Path) -> Result<SqliteHost> {
    SqliteHost::open(path).with_context(|| format!("Failed to open model {}", path.display()))
}

fn import(model: &Path, input: Option<PathBuf>, config: ImportConfig) -> Result<ExitCode> {
    let mut host = open_model(model)?;
    info!(model = %model.display(), "model opened");

    let mut importer = Importer::new(config);
    let outcome = match input {
        Some(path) => importer.run(&mut host, &mut FixedInput(Some(path))),
        None => importer.run(&mut host, &mut PromptInput),
    };

    match outcome {
        ImportOutcome::Succeeded(report) => {
            println!(
                "{} parsed, {} model properties, {} missing targets, {} rejected",
                report.parsed,
                report.model_properties,
                report.missing_targets.len(),
                report.rejections.len()
            );
            println!(
                "{} fields created, {} binding failures, {} applied, {} skipped",
                report.fields_created.len(),
                report.binding_failures.len(),
                report.applied,
                report.skipped
            );
            Ok(ExitCode::SUCCESS)
        }
        ImportOutcome::Cancelled => {
            println!("Import cancelled");
            Ok(ExitCode::SUCCESS)
        }
        ImportOutcome::Failed(message) => {
            eprintln!("Import failed: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn list_fields(model: &Path, item_id: &str) -> Result<()> {
    let host = open_model(model)?;
    let item = host
        .lookup_item(&ItemId::new(item_id))?
        .with_context(|| format!("No item {item_id} in {}", model.display()))?;

    println!("{} ({})", item.item_id, item.category);
    for field in host.all_fields(&item)? {
        let value = host
            .field_value(&field)?
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<unset>".to_string());
        let source = match field.source {
            FieldSource::Intrinsic(_) => "intrinsic",
            FieldSource::Bound(_) => "bound",
        };
        let access = if field.read_only { ", read-only" } else { "" };
        println!(
            "  {} : {} = {value} [{source}{access}]",
            field.name, field.field_type
        );
    }
    Ok(())
}
