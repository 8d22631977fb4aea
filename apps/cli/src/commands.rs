//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lakeport_core::batch::convert_directory;
use lakeport_core::pipeline::{
    ConvertConfig, ConvertReport, ProgressReporter, convert_lakebook,
};
use lakeport_shared::{AppConfig, ConvertOptions, config_file_path, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lakeport — turn Yuque exports into portable Markdown.
#[derive(Parser)]
#[command(
    name = "lakeport",
    version,
    about = "Convert Yuque .lakebook exports into Markdown trees with local images.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Shared conversion flags for `convert` and `batch`.
#[derive(Debug, clap::Args)]
pub(crate) struct ConvertFlags {
    /// Output directory (hierarchy and assets/ are created under it).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Keep remote image URLs instead of downloading into assets/.
    #[arg(long)]
    pub no_images: bool,

    /// Skip the YAML frontmatter (title) block.
    #[arg(long)]
    pub no_frontmatter: bool,

    /// Disambiguate file names with an identifier suffix instead of _1, _2.
    #[arg(long)]
    pub unique_suffix: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert a single .lakebook file.
    Convert {
        /// Path to the .lakebook file.
        lakebook: String,

        #[command(flatten)]
        flags: ConvertFlags,
    },

    /// Convert every .lakebook found under a directory.
    Batch {
        /// Directory to scan recursively for .lakebook files.
        dir: String,

        #[command(flatten)]
        flags: ConvertFlags,
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
        0 => "lakeport=info",
        1 => "lakeport=debug",
        _ => "lakeport=trace",
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
        Command::Convert { lakebook, flags } => cmd_convert(&lakebook, &flags).await,
        Command::Batch { dir, flags } => cmd_batch(&dir, &flags).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Merge the config file with CLI flags (flags win).
fn resolve_options(config: &AppConfig, flags: &ConvertFlags) -> ConvertOptions {
    let mut options = ConvertOptions::from(config);
    if flags.no_images {
        options.download_images = false;
    }
    if flags.no_frontmatter {
        options.frontmatter = false;
    }
    if flags.unique_suffix {
        options.unique_suffix = true;
    }
    options
}

fn resolve_output(config: &AppConfig, flags: &ConvertFlags) -> PathBuf {
    flags
        .output
        .as_deref()
        .unwrap_or(&config.defaults.output_dir)
        .into()
}

async fn cmd_convert(lakebook: &str, flags: &ConvertFlags) -> Result<()> {
    let config = load_config()?;
    let options = resolve_options(&config, flags);
    let output_dir = resolve_output(&config, flags);

    info!(lakebook, output = %output_dir.display(), "converting lakebook");

    let convert_config = ConvertConfig {
        lakebook: PathBuf::from(lakebook),
        output_dir: output_dir.clone(),
        options,
    };

    let reporter = CliProgress::new();
    let report = convert_lakebook(&convert_config, &reporter).await?;

    print_summary(&report, &output_dir);
    Ok(())
}

async fn cmd_batch(dir: &str, flags: &ConvertFlags) -> Result<()> {
    let config = load_config()?;
    let options = resolve_options(&config, flags);
    let output_root = resolve_output(&config, flags);

    info!(dir, output = %output_root.display(), "converting directory");

    let reporter = CliProgress::new();
    let report = convert_directory(Path::new(dir), &output_root, &options, &reporter).await?;
    reporter.clear();

    if report.packages.is_empty() {
        println!("No .lakebook files found under {dir}.");
        return Ok(());
    }

    println!();
    for (lakebook, package_report) in &report.packages {
        println!(
            "  {} -> {} documents ({} images skipped)",
            lakebook.display(),
            package_report.written.len(),
            package_report.skipped_images.len(),
        );
    }
    println!();
    println!("  Done: {} packages -> {}", report.packages.len(), output_root.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| eyre!("render config: {e}"))?;

    println!("# {}", path.display());
    println!("{rendered}");
    Ok(())
}

/// Print the single-package summary: counts, skipped images, first paths.
fn print_summary(report: &ConvertReport, output_dir: &Path) {
    const MAX_LISTED: usize = 20;

    println!();
    println!(
        "  Converted {} documents -> {} in {:.1}s",
        report.written.len(),
        output_dir.display(),
        report.elapsed.as_secs_f64(),
    );

    for path in report.written.iter().take(MAX_LISTED) {
        let shown = path.strip_prefix(output_dir).unwrap_or(path);
        println!("  - {}", shown.display());
    }
    if report.written.len() > MAX_LISTED {
        println!("  ... {} files total", report.written.len());
    }

    if !report.skipped_images.is_empty() {
        println!();
        println!(
            "  {} images could not be downloaded and keep their remote URL:",
            report.skipped_images.len()
        );
        for skipped in &report.skipped_images {
            println!("  ! {} ({})", skipped.url, skipped.reason);
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn doc_written(&self, stem: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {stem}"));
    }

    fn done(&self, _report: &ConvertReport) {
        self.spinner.finish_and_clear();
    }
}
