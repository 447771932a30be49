use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use seedbed_core::key::{from_key, host_of_key};
use seedbed_core::seeds::{SeedLine, parse_metadata_pair, parse_seed_list};
use seedbed_core::{
    Document, FrontierStore, Injector, InjectorConfig, Metadata, SqliteStore,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use url::Url;

pub const DB_FILE_NAME: &str = "frontier.db";

// Helper functions for the seeding handlers

/// Load seeds from either a seed list or a single URL argument.
/// `extra` metadata is merged into every seed, seed list entries win.
pub fn load_seeds_from_source(
    url: Option<&Url>,
    seeds_file: Option<&PathBuf>,
    extra: &Metadata,
) -> Result<Vec<SeedLine>> {
    let mut seeds = if let Some(seeds_file_path) = seeds_file {
        load_seeds_from_file(seeds_file_path)?
    } else if let Some(url) = url {
        vec![SeedLine {
            url: url.as_str().to_string(),
            metadata: Metadata::new(),
        }]
    } else {
        bail!("Either --url or --seeds-file must be provided");
    };

    for seed in &mut seeds {
        for (key, value) in extra {
            seed.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
    Ok(seeds)
}

/// Load and parse a seed list file.
pub fn load_seeds_from_file(path: &Path) -> Result<Vec<SeedLine>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seeds file {}", path.display()))?;

    let seeds = parse_seed_list(&content);
    if seeds.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }
    Ok(seeds)
}

/// Parse repeated `key=value` arguments.
pub fn parse_metadata_args<'a>(values: impl IntoIterator<Item = &'a String>) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for value in values {
        let (key, val) = parse_metadata_pair(value)
            .with_context(|| format!("Expected key=value, got '{}'", value))?;
        metadata.insert(key, val);
    }
    Ok(metadata)
}

/// Expand `~` and point directories at the database file inside them.
pub fn resolve_db_path(raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if raw.ends_with('/') || expanded.is_dir() {
        expanded.join(DB_FILE_NAME)
    } else {
        expanded
    }
}

/// Injector settings from `--config`, with command line defaults on top.
pub fn load_config(
    config_file: Option<&PathBuf>,
    score: Option<f32>,
    interval: Option<i32>,
) -> Result<InjectorConfig> {
    let mut config = match config_file {
        Some(path) => InjectorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => InjectorConfig::default(),
    };
    if let Some(score) = score {
        config = config.with_default_score(score);
    }
    if let Some(interval) = interval {
        config = config.with_default_fetch_interval(interval);
    }
    Ok(config)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Inject every seed, ticking `progress` once per URL.
pub fn seed_all<S: FrontierStore>(
    injector: &Injector<S>,
    seeds: &[SeedLine],
    progress: Option<&ProgressBar>,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    for seed in seeds {
        if injector.inject(&seed.url, &seed.metadata)? {
            summary.inserted += 1;
        } else {
            summary.skipped += 1;
        }
        if let Some(pb) = progress {
            pb.set_message(seed.url.clone());
            pb.inc(1);
        }
    }
    Ok(summary)
}

fn open_injector(args: &ArgMatches, config: InjectorConfig) -> Result<Injector<SqliteStore>> {
    let db_path = resolve_db_path(args.get_one::<String>("db").context("missing --db")?);
    if !SqliteStore::file_exists(&db_path) {
        bail!(
            "No frontier database at {} (run `seedbed init` first)",
            db_path.display()
        );
    }
    Ok(Injector::open_sqlite(&db_path, config)?)
}

fn config_from_args(args: &ArgMatches) -> Result<InjectorConfig> {
    load_config(args.get_one::<PathBuf>("config"), None, None)
}

fn metadata_from_args(args: &ArgMatches, id: &str) -> Result<Metadata> {
    match args.get_many::<String>(id) {
        Some(values) => parse_metadata_args(values),
        None => Ok(Metadata::new()),
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  SEEDBED INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let target = args.get_one::<String>("PATH").context("missing PATH")?;
    let force = args.get_flag("force");
    let expanded_dir = shellexpand::tilde(target);
    let config_dir = Path::new(expanded_dir.as_ref());
    let db_path = config_dir.join(DB_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if SqliteStore::file_exists(&db_path) {
        let replace = if force {
            true
        } else {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();
            let response = print_prompt("Would you like to replace it? [y/N]:")?;
            println!();
            response == "y" || response == "yes"
        };

        if replace {
            SqliteStore::remove(&db_path)?;
            println!("{} Existing database removed", "✓".green().bold());
        } else {
            println!("{} Keeping existing database", "→".blue());
        }
    }

    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    if !SqliteStore::file_exists(&db_path) {
        println!("{} Creating database...", "→".blue());
        SqliteStore::open(&db_path)?;
    }

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_inject(args: &ArgMatches) -> Result<()> {
    let config = load_config(
        args.get_one::<PathBuf>("config"),
        args.get_one::<f32>("score").copied(),
        args.get_one::<i32>("interval").copied(),
    )?;
    let extra = metadata_from_args(args, "meta")?;
    let seeds = load_seeds_from_source(
        args.get_one::<Url>("url"),
        args.get_one::<PathBuf>("seeds-file"),
        &extra,
    )?;
    let injector = open_injector(args, config)?;

    let progress = if seeds.len() > 1 {
        let pb = ProgressBar::new(seeds.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );
        Some(pb)
    } else {
        None
    };

    let summary = seed_all(&injector, &seeds, progress.as_ref())?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    println!(
        "{} {} injected, {} already present",
        "✓".green().bold(),
        summary.inserted.to_string().cyan(),
        summary.skipped.to_string().cyan()
    );
    Ok(())
}

pub fn handle_redirect(args: &ArgMatches) -> Result<()> {
    let from = args.get_one::<Url>("from").context("missing --from")?;
    let to = args.get_one::<Url>("to").context("missing --to")?;
    let mut chain = vec![from.as_str()];
    if let Some(via) = args.get_many::<Url>("via") {
        chain.extend(via.map(Url::as_str));
    }
    chain.push(to.as_str());

    let metadata = metadata_from_args(args, "meta")?;
    let injector = open_injector(args, config_from_args(args)?)?;

    if injector.add_redirect_chain(&chain, &metadata)? {
        println!(
            "{} {}",
            "✓".green().bold(),
            chain.join(" → ").bright_white()
        );
    } else {
        println!(
            "{} {} is already stored, nothing written",
            "→".yellow().bold(),
            from.as_str().bright_white()
        );
    }
    Ok(())
}

pub fn handle_document(args: &ArgMatches) -> Result<()> {
    let url = args.get_one::<Url>("url").context("missing --url")?;
    let batch_id = args.get_one::<String>("batch-id").context("missing --batch-id")?;

    let mut document = Document::new(url.as_str());
    if let Some(path) = args.get_one::<PathBuf>("content") {
        let content =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let content_type = args
            .get_one::<String>("content-type")
            .map_or("text/html", String::as_str);
        document = document.with_content(content, content_type);
    }
    for (name, value) in metadata_from_args(args, "header")? {
        document = document.with_header(name, value);
    }

    let metadata = metadata_from_args(args, "meta")?;
    let injector = open_injector(args, config_from_args(args)?)?;

    if injector.write_document(&document, &metadata, batch_id)? {
        println!("{} Stored {}", "✓".green().bold(), url.as_str().bright_white());
    } else {
        println!(
            "{} {} is already stored",
            "→".yellow().bold(),
            url.as_str().bright_white()
        );
    }
    Ok(())
}

/// Returns whether the URL is stored.
pub fn handle_has(args: &ArgMatches) -> Result<bool> {
    let url = args.get_one::<Url>("url").context("missing --url")?;
    let injector = open_injector(args, config_from_args(args)?)?;
    let present = injector.has_url(url.as_str())?;
    if present {
        println!("{} {}", "present".green().bold(), url);
    } else {
        println!("{} {}", "absent".red().bold(), url);
    }
    Ok(present)
}

pub fn handle_show(args: &ArgMatches) -> Result<()> {
    let url = args.get_one::<Url>("url").context("missing --url")?;
    let injector = open_injector(args, config_from_args(args)?)?;
    match injector.get(url.as_str())? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => bail!("{} is not in the frontier", url),
    }
    Ok(())
}

pub fn handle_list(args: &ArgMatches) -> Result<()> {
    let injector = open_injector(args, config_from_args(args)?)?;
    let keys = injector.store().keys()?;
    let mut last_host = "";
    for key in &keys {
        let host = host_of_key(key);
        if host != last_host {
            println!("{}", host.bright_blue().bold());
            last_host = host;
        }
        let url = from_key(key).unwrap_or_else(|_| key.clone());
        println!("  {}", url);
    }
    println!();
    println!("{} {} records", "✓".green().bold(), keys.len().to_string().cyan());
    Ok(())
}
