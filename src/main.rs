use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitepulse::pipeline::default_period;
use sitepulse::{
    Config, ConfigLoader, MemorySheetStore, MetricSource, NarrativeSource, Orchestrator,
    PeriodLabel, SheetStore, SiteOutcome,
};

#[derive(Parser)]
#[command(name = "sitepulse")]
#[command(
    version,
    about = "Daily web-analytics snapshot logger: GA4 metrics plus an AI narrative, appended to a shared spreadsheet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file (overrides the resolution chain)")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch metrics and append one column per site
    Run {
        #[arg(long, help = "Report period as YYYY-MM-DD (default: yesterday)")]
        date: Option<String>,
        #[arg(long = "dry-run", help = "Run against an in-memory store and print the grids")]
        dry_run: bool,
    },

    /// Verify credentials, spreadsheet access, and per-site GA4 access
    Check,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize project configuration
    Init {
        #[arg(long, short, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n{}", style("━━━ PANIC ━━━").red().bold());
        eprintln!("{}", style("sitepulse encountered an unexpected error:").red());
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "{}",
                style(format!(
                    "Location: {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ))
                .dim()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { date, dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_run(&config, date, dry_run)?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            cmd_check(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                ConfigLoader::show_config(json)?;
            }
            ConfigAction::Path => {
                ConfigLoader::show_path();
            }
            ConfigAction::Init { force } => {
                let dir = ConfigLoader::init_project(force)?;
                println!("Initialized: {}", dir.display());
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    })
}

fn parse_period(date: Option<String>) -> anyhow::Result<PeriodLabel> {
    match date {
        Some(raw) => {
            let parsed = chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("invalid --date '{}': {}", raw, e))?;
            Ok(PeriodLabel::from(parsed))
        }
        None => Ok(default_period()),
    }
}

fn cmd_run(config: &Config, date: Option<String>, dry_run: bool) -> anyhow::Result<()> {
    let period = parse_period(date)?;
    let rt = Runtime::new()?;

    let report = if dry_run {
        let store = Arc::new(MemorySheetStore::new());
        let orchestrator = Orchestrator::from_config_with_store(config, store.clone())?;
        let report = rt.block_on(orchestrator.run(&period));
        rt.block_on(print_dry_run_grids(&store));
        report
    } else {
        let orchestrator = Orchestrator::from_config(config)?;
        rt.block_on(orchestrator.run(&period))
    };

    println!();
    println!(
        "{} period {}",
        style("Run summary").bold(),
        style(&period).cyan()
    );
    for (site, outcome) in &report.outcomes {
        match outcome {
            SiteOutcome::Written {
                column,
                new_labels,
                rows,
            } => println!(
                "  {} {:<24} column {} ({} rows, {} new labels)",
                style("✓").green(),
                site.name,
                column,
                rows,
                new_labels
            ),
            SiteOutcome::SkippedNoData => println!(
                "  {} {:<24} skipped (no data)",
                style("-").yellow(),
                site.name
            ),
            SiteOutcome::Failed { stage, message } => println!(
                "  {} {:<24} failed at {}: {}",
                style("✗").red(),
                site.name,
                stage,
                message
            ),
        }
    }

    if report.all_failed() {
        anyhow::bail!("every site failed");
    }
    Ok(())
}

async fn print_dry_run_grids(store: &MemorySheetStore) {
    for name in store.sheet_names().await {
        println!();
        println!("{}", style(format!("── {} ──", name)).bold());
        if let Some(matrix) = store.grid(&name).await {
            for row in matrix.iter().filter(|r| r.iter().any(|c| !c.is_empty())) {
                println!("  {}", row.join(" | "));
            }
        }
    }
}

fn cmd_check(config: &Config) -> anyhow::Result<()> {
    config.validate_for_run()?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mark = |ok: bool| {
            if ok {
                style("✓").green()
            } else {
                style("✗").red()
            }
        };

        let store = sitepulse::GoogleSheetStore::new(&config.store, &config.google)?;
        let store_ok = store.health_check().await?;
        println!(
            "  {} spreadsheet {}",
            mark(store_ok),
            config.store.spreadsheet_id
        );

        let narrator = sitepulse::narrative::create_narrative_source(&config.narrative)?;
        let narrator_ok = narrator.health_check().await?;
        println!("  {} narrative provider ({})", mark(narrator_ok), narrator.name());

        let metrics = sitepulse::metrics::create_metric_source(&config.analytics, &config.google)?;
        let mut sites_ok = true;
        for site in &config.sites {
            let ok = metrics.health_check(site).await?;
            sites_ok &= ok;
            println!(
                "  {} {} (property {})",
                mark(ok),
                site.name,
                site.property_id
            );
        }

        if store_ok && narrator_ok && sites_ok {
            println!("\n{}", style("All checks passed.").green());
            Ok(())
        } else {
            anyhow::bail!("one or more checks failed")
        }
    })
}
