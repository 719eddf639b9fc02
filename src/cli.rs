//! CLI parsing and orchestration. Loads an article from a URL or file, exports it through the
//! format registry, and maps errors to exit codes.

use crate::config::{self, Config, ConfigError};
use crate::export::{ExportError, ExportOptions, Exporter, Format, Registry, Sink};
use crate::model::Article;
use crate::providers::Provider;
use crate::source::{
    default_output_path, load_article, read_source_list, ArticleSource, Fetcher, SourceError,
};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONCURRENCY: usize = 4;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{failed} of {total} articles failed to convert")]
    BatchFailed { failed: usize, total: usize },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Config(_) => 1,
            CliRunError::Source(_) => 2,
            CliRunError::Export(_) => 3,
            CliRunError::BatchFailed { .. } => 4,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mediumconv", version)]
#[command(about = "Convert Medium articles to Markdown, DOCX, HTML, LaTeX, EPUB, text, or JSON")]
#[command(
    after_help = "Config file keys (output_dir, default_format, concurrency, user_agent, timeout_secs, cookie, html_template, latex_template, epub_ncx, llm_provider) can be set with `mediumconv config set`. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging and the full error chain on failure.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert one article (URL, saved HTML page, or article JSON).
    Convert(ConvertArgs),
    /// Convert every source listed in a file, one per line.
    Batch(BatchArgs),
    /// Show or edit the user config file.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List output formats and whether this build can produce them.
    ListFormats,
    /// List LLM providers and whether their API key is set.
    ListProviders,
    /// Show version, config locations, and available formats.
    Info,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Article URL, HTML file, or JSON article file.
    pub source: String,

    /// Output format (markdown, docx, html, latex, epub, text, json). Default: config or markdown.
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<Format>,

    /// Output path, or `-` for stdout. Default: {output-dir}/{title}_{host}.{ext}.
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for the default output filename (overrides config).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// File listing one source per line; blank lines and # comments are ignored.
    pub file: PathBuf,

    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<Format>,

    /// Output directory (overrides config; default: current directory).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Articles converted in parallel (overrides config; default 4).
    #[arg(long)]
    pub concurrent: Option<usize>,

    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(clap::Args, Debug, Default)]
pub struct HttpArgs {
    /// Cookie header for member-only articles (overrides config).
    #[arg(long)]
    pub cookie: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config in effect and where it came from.
    Show,
    /// Set a key in the user config file.
    Set { key: String, value: String },
    /// Print the effective value of a key.
    Get { key: String },
    /// Remove a key from the user config file.
    Reset { key: String },
}

fn parse_format(s: &str) -> Result<Format, String> {
    Format::from_id(s).ok_or_else(|| {
        format!(
            "Invalid --format value: '{}'. Use markdown, docx, html, latex, epub, text, or json.",
            s
        )
    })
}

/// Install env_logger. `RUST_LOG` wins over the --quiet/--verbose defaults.
pub fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    match &args.command {
        Command::Convert(convert) => run_convert(convert, &effective_config()?, args.quiet),
        Command::Batch(batch) => run_batch(batch, &effective_config()?, args.quiet),
        Command::Config(cmd) => run_config(cmd),
        Command::ListFormats => {
            print!("{}", format_listing(Registry::global()));
            Ok(())
        }
        Command::ListProviders => {
            let preferred = effective_config()?
                .llm_provider
                .and_then(|p| Provider::from_id(&p));
            print!("{}", provider_listing(preferred, Provider::is_configured));
            Ok(())
        }
        Command::Info => {
            print!("{}", info_text()?);
            Ok(())
        }
    }
}

fn effective_config() -> Result<Config, CliRunError> {
    Ok(config::load_config()?
        .map(|(_, c)| c)
        .unwrap_or_default())
}

fn resolve_format(flag: Option<Format>, config: &Config) -> Result<Format, CliRunError> {
    if let Some(format) = flag {
        return Ok(format);
    }
    match &config.default_format {
        Some(id) => Format::from_id(id).ok_or_else(|| {
            CliRunError::InvalidInput(format!("Invalid default_format in config: '{}'", id))
        }),
        None => Ok(Format::Markdown),
    }
}

fn read_template(path: &Option<PathBuf>) -> Result<Option<String>, CliRunError> {
    match path {
        Some(p) => std::fs::read_to_string(p).map(Some).map_err(|e| {
            CliRunError::InvalidInput(format!("Cannot read template {}: {}", p.display(), e))
        }),
        None => Ok(None),
    }
}

fn export_options(config: &Config) -> Result<ExportOptions, CliRunError> {
    Ok(ExportOptions {
        html_template: read_template(&config.html_template)?,
        latex_template: read_template(&config.latex_template)?,
        epub_ncx: config.epub_ncx.unwrap_or(true),
    })
}

fn build_fetcher(http: &HttpArgs, config: &Config) -> Result<Fetcher, CliRunError> {
    let mut builder = Fetcher::builder().timeout_secs(
        http.timeout
            .or(config.timeout_secs)
            .unwrap_or(crate::source::DEFAULT_TIMEOUT_SECS),
    );
    if let Some(ua) = http.user_agent.clone().or_else(|| config.user_agent.clone()) {
        builder = builder.user_agent(ua);
    }
    if let Some(cookie) = http.cookie.clone().or_else(|| config.cookie.clone()) {
        builder = builder.cookie(cookie);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn detect_source(input: &str) -> Result<ArticleSource, CliRunError> {
    ArticleSource::detect(input).map_err(|e| match &e {
        SourceError::InvalidUrl { input, reason } => CliRunError::InvalidInput(format!(
            "Expected an article URL or file. Example: https://medium.com/@user/some-article-123abc. Invalid: {}: {}",
            input, reason
        )),
        _ => CliRunError::Source(e),
    })
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<(), CliRunError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Cannot create output directory {}: {}",
            dir.display(),
            e
        ))
    })
}

fn run_convert(args: &ConvertArgs, config: &Config, quiet: bool) -> Result<(), CliRunError> {
    let format = resolve_format(args.format, config)?;
    let exporter = Registry::global().exporter_for(format, &export_options(config)?)?;
    let source = detect_source(&args.source)?;
    let fetcher = build_fetcher(&args.http, config)?;
    let article = load_article(&source, &fetcher)?;

    if args.output.as_deref() == Some(Path::new("-")) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        exporter.export(&article, Some(Sink::Writer(&mut lock)))?;
        return Ok(());
    }

    let output_path = match &args.output {
        Some(p) => p.clone(),
        None => {
            let dir = args
                .output_dir
                .clone()
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            ensure_dir(&dir)?;
            default_output_path(&dir, &article.title, source.url(), format)
        }
    };
    validate_output_path(&output_path)?;
    exporter.export(&article, Some(Sink::Path(&output_path)))?;

    if !quiet {
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

fn load_one(input: &str, fetcher: &Fetcher) -> Result<(Article, Option<String>), CliRunError> {
    let source = detect_source(input)?;
    let article = load_article(&source, fetcher)?;
    Ok((article, source.url().map(str::to_string)))
}

/// `path`, or `<stem>_2.<ext>`, `<stem>_3.<ext>`... when an earlier item already claimed it.
fn claim_output_path(claimed: &mut HashSet<PathBuf>, path: PathBuf) -> PathBuf {
    if claimed.insert(path.clone()) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut n = 2;
    loop {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = path.with_file_name(name);
        if claimed.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn progress_bar(len: usize, quiet: bool) -> Option<indicatif::ProgressBar> {
    if quiet {
        return None;
    }
    let bar = indicatif::ProgressBar::new(len as u64);
    if let Ok(style) = indicatif::ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

fn run_batch(args: &BatchArgs, config: &Config, quiet: bool) -> Result<(), CliRunError> {
    let sources = read_source_list(&args.file)?;
    if sources.is_empty() {
        return Err(CliRunError::InvalidInput(format!(
            "No sources listed in {}",
            args.file.display()
        )));
    }
    let format = resolve_format(args.format, config)?;
    let exporter: Box<dyn Exporter> =
        Registry::global().exporter_for(format, &export_options(config)?)?;
    let fetcher = build_fetcher(&args.http, config)?;
    let dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    ensure_dir(&dir)?;

    let workers = args
        .concurrent
        .or(config.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY)
        .max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Cannot start worker pool: {}", e)))?;
    log::debug!("converting {} sources with {} workers", sources.len(), workers);

    let bar = progress_bar(sources.len(), quiet);
    let loaded: Vec<Result<(Article, Option<String>), CliRunError>> = pool.install(|| {
        sources
            .par_iter()
            .map(|input| {
                let result = load_one(input, &fetcher);
                if let Some(bar) = &bar {
                    bar.inc(1);
                    bar.set_message(input.clone());
                }
                result
            })
            .collect()
    });
    if let Some(bar) = bar {
        bar.disable_steady_tick();
        bar.finish_and_clear();
    }

    // Names are claimed in list order so the first of several same-titled sources keeps the
    // plain name.
    let mut claimed = HashSet::new();
    let jobs: Vec<Result<(Article, PathBuf), CliRunError>> = loaded
        .into_iter()
        .map(|loaded| {
            loaded.map(|(article, url)| {
                let path = default_output_path(&dir, &article.title, url.as_deref(), format);
                let path = claim_output_path(&mut claimed, path);
                (article, path)
            })
        })
        .collect();
    let results: Vec<Result<PathBuf, CliRunError>> = pool.install(|| {
        jobs.into_par_iter()
            .map(|job| -> Result<PathBuf, CliRunError> {
                let (article, path) = job?;
                exporter.export(&article, Some(Sink::Path(&path)))?;
                Ok(path)
            })
            .collect()
    });

    let mut failed = 0;
    for (input, result) in sources.iter().zip(&results) {
        match result {
            Ok(path) if !quiet => eprintln!("Wrote {}", path.display()),
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                eprintln!("Failed {}: {}", input, e);
            }
        }
    }
    if failed > 0 {
        return Err(CliRunError::BatchFailed {
            failed,
            total: sources.len(),
        });
    }
    Ok(())
}

fn run_config(cmd: &ConfigCommand) -> Result<(), CliRunError> {
    match cmd {
        ConfigCommand::Show => match config::load_config()? {
            Some((path, c)) => {
                println!("# {}", path.display());
                print!("{}", c.to_toml()?);
            }
            None => println!("# no config file; built-in defaults in effect"),
        },
        ConfigCommand::Get { key } => match effective_config()?.get(key)? {
            Some(value) => println!("{}", value),
            None => println!("(unset)"),
        },
        ConfigCommand::Set { key, value } => {
            let path = config::user_config_path()?;
            let mut c = Config::load_from(&path)?;
            c.set(key, value)?;
            c.save_to(&path)?;
            eprintln!("Set {} in {}", key, path.display());
        }
        ConfigCommand::Reset { key } => {
            let path = config::user_config_path()?;
            let mut c = Config::load_from(&path)?;
            c.reset(key)?;
            c.save_to(&path)?;
            eprintln!("Reset {} in {}", key, path.display());
        }
    }
    Ok(())
}

fn format_listing(registry: &Registry) -> String {
    let mut out = String::new();
    for status in registry.statuses() {
        let state = match &status.availability {
            crate::export::Availability::Present => "available".to_string(),
            crate::export::Availability::Absent { reason } => format!("unavailable ({})", reason),
        };
        let _ = writeln!(
            out,
            "{:<10} .{:<6} {}",
            status.format.id(),
            status.format.extension(),
            state
        );
    }
    out
}

fn provider_listing(preferred: Option<Provider>, configured: impl Fn(Provider) -> bool) -> String {
    let mut out = String::new();
    for provider in Provider::ALL {
        let state = if configured(provider) {
            "configured"
        } else {
            "missing key"
        };
        let marker = if preferred == Some(provider) { " *" } else { "" };
        let _ = writeln!(
            out,
            "{:<10} {:<18} {}{}",
            provider.id(),
            provider.env_var().unwrap_or("-"),
            state,
            marker
        );
    }
    out.push_str("LLM enhancement is not available in this build; keys are only reported.\n");
    out
}

fn info_text() -> Result<String, CliRunError> {
    let mut out = String::new();
    let _ = writeln!(out, "mediumconv {}", env!("CARGO_PKG_VERSION"));
    match config::load_config()? {
        Some((path, _)) => {
            let _ = writeln!(out, "config in use: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "config in use: none");
        }
    }
    if let Ok(path) = config::user_config_path() {
        let _ = writeln!(out, "user config: {}", path.display());
    }
    let formats: Vec<&str> = Registry::global()
        .available()
        .into_iter()
        .map(Format::id)
        .collect();
    let _ = writeln!(out, "formats: {}", formats.join(", "));
    Ok(out)
}
