//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use whguide_core::{ProgressReporter, RunReport, SystemClock};
use whguide_sheet::{OutputSink, SheetStore};
use whguide_shared::{
    AppConfig, RegionId, init_config, init_config_at, load_config, load_config_from, workbook_path,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// whguide: refresh the wormhole guide workbook.
#[derive(Parser)]
#[command(
    name = "whguide",
    version,
    about = "Refresh dogma attributes and market prices in the wormhole guide workbook.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.whguide/whguide.toml).
    #[arg(long, env = "WHGUIDE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Workbook database (overrides [workbook] path).
    #[arg(long, env = "WHGUIDE_DB", global = true)]
    pub db: Option<PathBuf>,

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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Refresh every dogma sheet, then stamp the time.
    UpdateDogma,

    /// Refresh every market category, then stamp the time.
    UpdatePrices {
        /// Market region to query instead of the configured one.
        #[arg(long)]
        region: Option<u32>,
    },

    /// Print a range from the workbook as tab-separated text.
    Show {
        /// Range name, e.g. gasTab.
        range: String,
    },

    /// List the ranges stored in the workbook.
    Ranges,

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
        0 => "whguide=info",
        1 => "whguide=debug",
        _ => "whguide=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    // Init must work even when the existing config no longer parses.
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init(cli.config.as_deref());
    }

    let config = resolve_config(&cli)?;
    let db = match &cli.db {
        Some(path) => path.clone(),
        None => workbook_path(&config)?,
    };

    match cli.command {
        Command::UpdateDogma => cmd_update_dogma(&config, &db).await,
        Command::UpdatePrices { region } => {
            cmd_update_prices(&config, &db, region.map(RegionId)).await
        }
        Command::Show { range } => cmd_show(&db, &range).await,
        Command::Ranges => cmd_ranges(&db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(cli.config.as_deref()),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                return Err(eyre!("config file '{}' does not exist", path.display()));
            }
            load_config_from(path)?
        }
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update_dogma(config: &AppConfig, db: &Path) -> Result<()> {
    info!(db = %db.display(), sheets = config.dogma_sheets.len(), "updating dogma sheets");

    let store = SheetStore::open(db).await?;
    let reporter = CliProgress::new();
    let report = whguide_core::update_dogma(config, &store, &SystemClock, &reporter).await?;

    println!();
    println!("  Dogma sheets updated.");
    for sheet in &report.dogma {
        println!(
            "  {:<16} {} written, {} skipped",
            sheet.range,
            sheet.written,
            sheet.failed.len()
        );
        for (type_id, error) in &sheet.failed {
            println!("    - {type_id}: {error}");
        }
    }
    print_footer(&report);
    Ok(())
}

async fn cmd_update_prices(config: &AppConfig, db: &Path, region: Option<RegionId>) -> Result<()> {
    let region_id = region.unwrap_or(config.market.region_id);
    info!(db = %db.display(), region = %region_id, "updating market prices");

    let store = SheetStore::open(db).await?;
    let reporter = CliProgress::new();
    let report =
        whguide_core::update_prices(config, &store, region, &SystemClock, &reporter).await?;

    println!();
    println!("  Market prices updated (region {region_id}).");
    for category in &report.prices {
        println!(
            "  {:<10} {:<8} {} rows, {} gaps",
            category.name,
            category.range,
            category.rows,
            category.errors.len()
        );
        for batch_error in &category.errors {
            println!(
                "    - batch {} ({} ids): {}",
                batch_error.batch,
                batch_error.type_ids.len(),
                batch_error.error
            );
        }
    }
    print_footer(&report);
    Ok(())
}

fn print_footer(report: &RunReport) {
    println!("  Stamped: {}", report.stamped_at);
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

async fn cmd_show(db: &Path, range: &str) -> Result<()> {
    let store = SheetStore::open_readonly(db).await?;
    let grid = store.read_range(range).await?;
    if grid.is_empty() {
        return Err(eyre!("range '{range}' is empty or does not exist"));
    }
    for row in grid {
        let line = row
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\t");
        println!("{line}");
    }
    Ok(())
}

async fn cmd_ranges(db: &Path) -> Result<()> {
    let store = SheetStore::open_readonly(db).await?;
    for name in store.list_ranges().await? {
        println!("{name}");
    }
    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => {
            init_config_at(path)?;
            path.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_done(&self, range: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Updating {range} [{current}/{total}]"));
    }

    fn batch_done(&self, category: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Updating {category} prices [batch {current}/{total}]"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_update_prices_with_region() {
        let cli = Cli::try_parse_from(["whguide", "update-prices", "--region", "10000043"]).unwrap();
        match cli.command {
            Command::UpdatePrices { region } => assert_eq!(region, Some(10000043)),
            _ => panic!("expected update-prices"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["whguide", "update-dogma", "-vv", "--db", "/tmp/wb.db"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/wb.db")));
        assert!(matches!(cli.command, Command::UpdateDogma));
    }

    #[test]
    fn show_requires_range() {
        assert!(Cli::try_parse_from(["whguide", "show"]).is_err());
    }

    #[tokio::test]
    async fn config_init_replaces_unparseable_file() {
        let path = std::env::temp_dir().join(format!("whguide_test_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[market\nbatch_size = ").unwrap();
        assert!(load_config_from(&path).is_err());

        let arg = path.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["whguide", "config", "init", "--config", arg.as_str()]).unwrap();
        run(cli).await.unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.categories.len(), 3);
        let _ = std::fs::remove_file(&path);
    }
}
