// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use folio::{
    collect::{CollectionResult, Collector},
    config::Configuration,
    document::DocumentKind,
    path::default_config_path,
    reconcile::{apply, plan_collection},
    record::file::FileRecord,
    store::{RecordStore, TomlStore},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the error log written to the record store on failed collection.
const ERROR_LOG: &str = "file_errors.log";

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "folio [options] <folio-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(&self.global)?;
        match self.command {
            Command::Check(opts) => run_check(&config, opts),
            Command::Collect(opts) => run_collect(&config, opts),
            Command::List(opts) => run_list(&config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Validate notes tree without touching the record store.
    #[command(override_usage = "folio check [options] [<location>]")]
    Check(CheckOptions),

    /// Validate notes tree and reconcile record store with it.
    #[command(override_usage = "folio collect [options] [<location>]")]
    Collect(CollectOptions),

    /// List records in record store.
    #[command(override_usage = "folio list [options]")]
    List(ListOptions),
}

#[derive(Args, Clone, Debug)]
struct GlobalOptions {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Path to notes tree, overriding configuration.
    #[arg(short, long, global = true, value_name = "path")]
    pub notes: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CheckOptions {
    /// Directory of notes tree to check instead of the whole tree.
    #[arg(value_name = "location")]
    pub location: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CollectOptions {
    /// Directory of notes tree to collect instead of the whole tree.
    #[arg(value_name = "location")]
    pub location: Option<PathBuf>,

    /// Delete stale records without asking.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Only list records of document kind.
    #[arg(short, long, value_name = "kind")]
    pub kind: Option<DocumentKind>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(opts: &GlobalOptions) -> Result<Configuration> {
    let path = match &opts.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    let mut config = if path.exists() {
        read_to_string(&path)
            .with_context(|| format!("failed to read configuration {:?}", path.display()))?
            .parse::<Configuration>()
            .with_context(|| format!("failed to parse configuration {:?}", path.display()))?
    } else if let Some(notes) = &opts.notes {
        Configuration::new(notes)
    } else {
        bail!("no configuration at {:?}, and no notes directory given", path.display());
    };

    if let Some(notes) = &opts.notes {
        config.settings.notes_directory = notes.clone();
    }

    Ok(config)
}

/// Canonical notes root and collection location.
fn locate(config: &Configuration, location: Option<PathBuf>) -> Result<(PathBuf, PathBuf)> {
    let notes = &config.settings.notes_directory;
    let root = notes
        .canonicalize()
        .with_context(|| format!("notes directory {:?} is not accessible", notes.display()))?;
    let location = match location {
        Some(location) => location
            .canonicalize()
            .with_context(|| format!("location {:?} is not accessible", location.display()))?,
        None => root.clone(),
    };

    Ok((root, location))
}

fn collect(
    config: &Configuration,
    root: &Path,
    location: &Path,
) -> Result<(Collector, CollectionResult)> {
    let collector = Collector::new(root)
        .rules(config.rule_book())
        .noise(config.noise_patterns()?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("collecting {}", location.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = collector.collect(location);
    spinner.finish_and_clear();

    Ok((collector, result?))
}

fn numbered_errors(errors: &[String]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(index, error)| format!("{}. {error}\n–––\n", index + 1))
        .collect()
}

fn run_check(config: &Configuration, opts: CheckOptions) -> Result<()> {
    let (root, location) = locate(config, opts.location)?;
    let (_, result) = collect(config, &root, &location)?;
    if result.is_clean() {
        info!("no errors in {:?}", location.display());
        return Ok(());
    }

    print!("{}", numbered_errors(result.errors()));
    bail!("found {} errors", result.errors().len());
}

fn run_collect(config: &Configuration, opts: CollectOptions) -> Result<()> {
    let (root, location) = locate(config, opts.location)?;
    let store_dir = config.store_directory()?;
    let (collector, result) = collect(config, &root, &location)?;

    if !result.is_clean() {
        mkdirp::mkdirp(&store_dir).with_context(|| {
            format!("failed to create record store at {:?}", store_dir.display())
        })?;
        let log = store_dir.join(ERROR_LOG);
        write(&log, numbered_errors(result.errors()))
            .with_context(|| format!("failed to write error log {:?}", log.display()))?;
        bail!(
            "found {} errors, nothing was saved; see {:?}",
            result.errors().len(),
            log.display()
        );
    }

    let mut store = TomlStore::<FileRecord>::open(&store_dir)?;
    let plan = plan_collection(&store, result.into_records(), &root, &location)?;

    if !plan.has_changes() {
        info!("all {} records are up to date", plan.unchanged.len());
        return Ok(());
    }

    if !plan.deleted.is_empty() && !opts.yes {
        let confirmed = Confirm::new(&format!("Delete {} stale records?", plan.deleted.len()))
            .with_default(false)
            .prompt()?;
        if !confirmed {
            warn!("collection cancelled, nothing was saved");
            return Ok(());
        }
    }

    apply(&mut store, &plan)?;

    let describe = |record: &FileRecord| {
        let path = collector
            .relative_to_root(record.path())
            .unwrap_or_else(|_| record.path().to_path_buf());
        format!("{:?} ({})", record.title(), path.display())
    };
    for record in &plan.created {
        info!("saved {}", describe(record));
    }
    for record in &plan.updated {
        info!("updated {}", describe(record));
    }
    for record in &plan.deleted {
        info!("deleted {}", describe(record));
    }
    info!("{} records unchanged", plan.unchanged.len());

    Ok(())
}

fn run_list(config: &Configuration, opts: ListOptions) -> Result<()> {
    let store = TomlStore::<FileRecord>::open(config.store_directory()?)?;
    let mut records = store
        .find_all()?
        .into_iter()
        .filter(|record| opts.kind.map_or(true, |kind| record.kind() == kind))
        .collect::<Vec<_>>();
    records.sort_by_key(|record| record.created_at());

    let notes = &config.settings.notes_directory;
    let root = notes.canonicalize().unwrap_or_else(|_| notes.clone());
    for record in &records {
        let path = record.path().strip_prefix(&root).unwrap_or(record.path());
        println!(
            "{}  {:<14} {}  ({})",
            record.created_at().format("%Y-%m-%d"),
            record.kind().tag(),
            record.title(),
            path.display()
        );
    }

    Ok(())
}
