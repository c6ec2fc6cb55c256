use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use televendas_dashboard::config::{self, Config};
use televendas_dashboard::filter::{self, Selection};
use televendas_dashboard::models::{DateSelection, ALL_DATES_LABEL};
use televendas_dashboard::pipeline::Dataset;
use televendas_dashboard::report::{self, HighlightRule};
use televendas_dashboard::{highlight, logging};

#[derive(Parser)]
#[command(name = "televendas-dashboard")]
#[command(about = "Filter and aggregate televendas actions and hourly CRM activity", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./dashboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Actions CSV, overrides the configured path
    #[arg(long, global = true, env = "DASHBOARD_ACTIONS")]
    actions: Option<PathBuf>,
    /// Hourly activity CSV, overrides the configured path
    #[arg(long, global = true, env = "DASHBOARD_ACTIVITY")]
    activity: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// `all` or a date as YYYY-MM-DD
    #[arg(long, default_value = ALL_DATES_LABEL)]
    date: DateSelection,
    /// Supervisor to keep; repeat for several. Matched against uppercased names.
    #[arg(long = "supervisor")]
    supervisors: Vec<String>,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        Selection::new(self.date, self.supervisors.iter().cloned())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    InitConfig {
        #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
        out: PathBuf,
    },
    /// List selectable dates, most recent first
    Dates,
    /// List selectable supervisors
    Supervisors,
    /// Show the filtered actions and aggregated activity
    Show {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the filtered actions and aggregated activity as CSV
    Export {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Classify a single value against the highlight threshold
    Classify { value: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    if let Commands::InitConfig { out } = &cli.command {
        if out.exists() {
            anyhow::bail!("{} already exists", out.display());
        }
        let content = Config::default_toml().context("failed to render default config")?;
        std::fs::write(out, content)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("Config written to {}.", out.display());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(path) = cli.actions {
        config.sources.actions = path;
    }
    if let Some(path) = cli.activity {
        config.sources.activity = path;
    }

    if let Commands::Classify { value } = &cli.command {
        let highlight = highlight::classify_with(value.as_str(), config.highlight.threshold);
        println!("{highlight}");
        return Ok(());
    }

    let dataset = Dataset::load(&config).context("failed to prepare dashboard data")?;
    debug!(
        actions = ?dataset.actions_stats(),
        activity = ?dataset.activity_stats(),
        "normalization summary"
    );

    match cli.command {
        Commands::InitConfig { .. } | Commands::Classify { .. } => {}
        Commands::Dates => {
            let today = chrono::Local::now().date_naive();
            println!("{ALL_DATES_LABEL}");
            for date in filter::available_dates(&dataset, today) {
                println!("{}", date.format("%Y-%m-%d"));
            }
        }
        Commands::Supervisors => {
            for supervisor in filter::available_supervisors(&dataset) {
                println!("{supervisor}");
            }
        }
        Commands::Show { selection, format } => {
            let view = dataset.view(&selection.selection());
            let rule = HighlightRule::new(&view, dataset.columns(), config.highlight.threshold);
            match format {
                OutputFormat::Text => print!("{}", report::render_text(&view, &rule)),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&report::to_json(&view, &rule))?
                ),
            }
        }
        Commands::Report { selection, out } => {
            let view = dataset.view(&selection.selection());
            let rule = HighlightRule::new(&view, dataset.columns(), config.highlight.threshold);
            std::fs::write(&out, report::build_report(&view, &rule))
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(actions = view.actions.len(), groups = view.activity.len(), "report built");
            println!("Report written to {}.", out.display());
        }
        Commands::Export { selection, dir } => {
            let view = dataset.view(&selection.selection());
            let (actions, activity) = report::export_csv(&view, &dir)?;
            println!(
                "Exported {} actions to {} and {} groups to {}.",
                view.actions.len(),
                actions.display(),
                view.activity.len(),
                activity.display()
            );
        }
    }

    Ok(())
}
