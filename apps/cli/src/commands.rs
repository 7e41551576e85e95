//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use copydesk_core::generator::{
    DescriptionGenerator, GenerationOutcome, GenerationProgress, GeneratorConfig,
};
use copydesk_directory::{WebsiteValidator, load_companies};
use copydesk_shared::{AppConfig, fields, init_config, load_config, resolve_api_key};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Copydesk — marketing copy and SEO metadata for company directories.
#[derive(Parser)]
#[command(
    name = "copydesk",
    version,
    about = "Generate marketing descriptions and SEO metadata for a company directory CSV.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate descriptions for every company in a directory CSV.
    Generate {
        /// Directory CSV with a `listing_title` column.
        input: PathBuf,

        /// Output CSV (defaults to the configured output file).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only process the first N companies.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the configured model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List rows whose `website` value is not a usable URL.
    Validate {
        /// Directory CSV with a `website` column.
        input: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "copydesk=info",
        1 => "copydesk=debug",
        _ => "copydesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            input,
            out,
            limit,
            model,
        } => cmd_generate(&input, out, limit, model).await,
        Command::Validate { input } => cmd_validate(&input),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_generate(
    input: &Path,
    out: Option<PathBuf>,
    limit: Option<usize>,
    model: Option<String>,
) -> Result<()> {
    // Resolve the API key before reading anything
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;

    let mut directory = load_companies(input)?;
    if let Some(limit) = limit {
        directory.truncate(limit);
    }
    if directory.is_empty() {
        warn!(
            input = %input.display(),
            column = fields::LISTING_TITLE,
            "no companies found, writing header only"
        );
    }

    let mut generator_config = GeneratorConfig::from(&config);
    if let Some(model) = model {
        generator_config.model = model;
    }
    let output = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_file));

    info!(
        input = %input.display(),
        output = %output.display(),
        companies = directory.len(),
        model = %generator_config.model,
        "generating descriptions"
    );

    let reporter = CliProgress::new(directory.len());
    let mut generator = DescriptionGenerator::new(directory, api_key, generator_config)?;
    let summary = generator
        .generate_all_descriptions(&output, &reporter)
        .await?;

    println!();
    println!("  Descriptions generated!");
    println!("  Companies: {}", summary.processed);
    println!("  Parsed:    {}", summary.succeeded);
    println!("  Failed:    {}", summary.failed);
    println!("  Output:    {}", summary.output.display());
    println!();

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<()> {
    let mut validator = WebsiteValidator::new(input);
    validator.load_csv()?;
    let invalid = validator.validate_websites()?;

    if invalid.is_empty() {
        println!("All websites appear to be correctly formatted.");
        return Ok(());
    }

    println!("Rows with invalid website URLs:");
    println!("  {:<6} {:<40} {}", fields::RANK, fields::LISTING_TITLE, fields::WEBSITE);
    for row in &invalid {
        println!(
            "  {:<6} {:<40} {}",
            row.record.get(fields::RANK),
            row.record.company_name(),
            row.website()
        );
    }
    println!();
    println!("  {} of {} rows invalid", invalid.len(), validator.rows().len());

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl GenerationProgress for CliProgress {
    fn company_started(&self, name: &str, _current: usize, _total: usize) {
        self.bar.set_message(format!("Generating: {name}"));
    }

    fn company_finished(&self, name: &str, outcome: GenerationOutcome) {
        if outcome == GenerationOutcome::Sentinel {
            self.bar.println(format!("  placeholder used for {name}"));
        }
        self.bar.inc(1);
    }

    fn saved(&self, _path: &Path, _rows: usize) {
        self.bar.finish_and_clear();
    }
}
