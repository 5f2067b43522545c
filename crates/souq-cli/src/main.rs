//! souq CLI - retail analytics over generated or loaded UAE sales data.

mod colors;
mod commands;
mod config;
mod output;
mod source;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use souq_core::AppState;
use souq_io::ExportFormat;

use commands::data::ExportTable;
use commands::plan::{ForecastArgs, PromotionArgs, ReorderArgs};
use commands::report::BreakdownView;
use config::AppConfig;
use source::{FilterArgs, GenerateArgs, SourceArgs};

#[derive(Parser)]
#[command(name = "souq")]
#[command(about = "Retail analytics: synthetic data, cleaning, KPIs and promotion what-ifs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write this run's activity log as CSV
    #[arg(long, global = true, value_name = "FILE")]
    log_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic dataset with injected data-quality defects
    Generate {
        #[command(flatten)]
        args: GenerateArgs,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        /// Write cleaned tables instead of raw ones
        #[arg(long)]
        cleaned: bool,
    },

    /// Clean a dataset and write the cleaned tables plus quality.json
    Clean {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Drop flagged outlier sales and anomalous stock rows
        #[arg(long)]
        remove_outliers: bool,
    },

    /// Show the data-quality report
    Quality {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        json: bool,
    },

    /// Show headline KPIs for a segment
    Kpis {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Show a breakdown of sales, stock or campaigns
    Breakdown {
        #[arg(value_enum)]
        view: BreakdownView,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Rows to show
        #[arg(long, default_value = "10")]
        top: usize,

        #[arg(long)]
        json: bool,
    },

    /// Project a promotion against the segment's historical baseline
    Simulate {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        promotion: PromotionArgs,

        #[arg(long)]
        json: bool,
    },

    /// Suggest reorder quantities from sales velocity and lead times
    Reorder {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        reorder: ReorderArgs,

        #[arg(long)]
        json: bool,
    },

    /// Forecast daily demand with a trend-adjusted moving average
    Forecast {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        forecast: ForecastArgs,

        #[arg(long)]
        json: bool,
    },

    /// Export the filtered view of one table (to a file) or all tables (to a directory)
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value = "all")]
        table: ExportTable,

        /// Output file (.csv or .json) for one table, or directory for all
        #[arg(short, long)]
        output: PathBuf,

        /// Format of a directory export
        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Attach recovery hints to library errors
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<souq_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else if let Some(hint) = err.downcast_ref::<souq_io::DataError>().and_then(|e| e.hint()) {
            anyhow::anyhow!("{err}\n  hint: {hint}")
        } else {
            err
        }
    };

    let mut config = AppConfig::load(cli.config.as_deref()).map_err(|e| format_error(e.into()))?;
    if let Commands::Clean {
        remove_outliers: true,
        ..
    } = cli.command
    {
        config.cleaning.remove_outliers = true;
    }
    let mut state = AppState::new(config.cleaning.clone(), config.cache.clone());

    let result = run(&mut state, &config, cli.command);

    if let Some(path) = &cli.log_out {
        let written = souq_io::write_log_csv(path, state.log())?;
        tracing::info!(entries = written, path = %path.display(), "wrote activity log");
    }

    result.map_err(format_error)
}

fn run(state: &mut AppState, config: &AppConfig, command: Commands) -> anyhow::Result<()> {
    use commands::{data, plan, report};

    match command {
        Commands::Generate {
            args,
            output,
            cleaned,
        } => data::generate(state, config, &args, &output, cleaned),

        Commands::Clean {
            source,
            output,
            format,
            ..
        } => data::clean(state, config, &source, &output, format.into()),

        Commands::Quality { source, json } => data::quality(state, config, &source, json),

        Commands::Kpis {
            source,
            filter,
            json,
        } => report::kpis(state, config, &source, &filter, json),

        Commands::Breakdown {
            view,
            source,
            filter,
            top,
            json,
        } => report::breakdown(state, config, &source, &filter, view, top, json),

        Commands::Simulate {
            source,
            filter,
            promotion,
            json,
        } => plan::simulate(state, config, &source, &filter, &promotion, json),

        Commands::Reorder {
            source,
            filter,
            reorder,
            json,
        } => plan::reorder(state, config, &source, &filter, &reorder, json),

        Commands::Forecast {
            source,
            filter,
            forecast,
            json,
        } => plan::forecast(state, config, &source, &filter, &forecast, json),

        Commands::Export {
            source,
            filter,
            table,
            output,
            format,
        } => data::export(state, config, &source, &filter, table, &output, format.into()),
    }
}
