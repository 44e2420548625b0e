use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use vantedjo_forecast::config::{AppConfig, ConfigLoader};
use vantedjo_forecast::core::{Calendar, SalesSeries};
use vantedjo_forecast::data::{
    load_calendar, write_evaluation_csv, write_forecast_csv, write_summary_csv,
};
use vantedjo_forecast::pipeline::{period_label, CategoryPipeline};
use vantedjo_forecast::server::ApiServer;

#[derive(Parser)]
#[command(name = "vantedjo")]
#[command(about = "Daily poultry demand forecasting", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = ConfigLoader::DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast every configured category and write one CSV per category
    Forecast {
        /// Days to forecast (defaults to the configured horizon)
        #[arg(short, long)]
        days: Option<usize>,
        /// Output directory (defaults to data.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Hold out the most recent days and report accuracy per category
    Evaluate {
        /// Output directory (defaults to data.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Start the dashboard API server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::Forecast { days, output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.data.output_dir.clone());
            run_forecast(&config, days.unwrap_or(config.model.horizon), &output_dir)?;
        }
        Commands::Evaluate { output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.data.output_dir.clone());
            run_evaluate(&config, &output_dir)?;
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid server address {host}:{port}"))?;
            ApiServer::new(config).serve(addr).await?;
        }
    }

    Ok(())
}

fn calendar(config: &AppConfig) -> anyhow::Result<Calendar> {
    match config.data.calendar_path() {
        Some(path) => load_calendar(&path, config.data.calendar_date_format)
            .context("failed to load calendar"),
        None => Ok(Calendar::new()),
    }
}

fn load_series(config: &AppConfig, calendar: &Calendar) -> Vec<(String, vantedjo_forecast::Result<SalesSeries>)> {
    config
        .resolved_categories()
        .into_iter()
        .map(|c| {
            let series = c.source.load().map(|mut s| {
                s.apply_calendar(calendar);
                s
            });
            (c.name, series)
        })
        .collect()
}

fn run_forecast(config: &AppConfig, days: usize, output_dir: &Path) -> anyhow::Result<()> {
    let calendar = calendar(config)?;
    let pipeline = CategoryPipeline::new(config.model.clone(), config.model.estimator());
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let (names, series): (Vec<String>, Vec<_>) = load_series(config, &calendar).into_iter().unzip();
    let report = pipeline.forecast_all(names.iter().map(String::as_str).zip(series), &calendar, days);

    let mut written = 0;
    for forecast in report.successes() {
        let path = output_dir.join(format!("forecast_{}.csv", forecast.category));
        if let Err(err) = write_forecast_csv(&path, &forecast.points) {
            tracing::error!(category = %forecast.category, error = %err, "failed to write forecast");
            continue;
        }
        written += 1;
        println!(
            "{}: {} -> {}",
            forecast.category,
            period_label(&forecast.points).unwrap_or_else(|| "empty".into()),
            path.display()
        );
        for point in &forecast.points {
            println!("  {}  {:>10.2}", point.date, point.predicted_quantity);
        }
    }

    println!("\n{report}");
    if written == 0 {
        anyhow::bail!("no category could be forecast");
    }
    Ok(())
}

fn run_evaluate(config: &AppConfig, output_dir: &Path) -> anyhow::Result<()> {
    let calendar = calendar(config)?;
    let pipeline = CategoryPipeline::new(config.model.clone(), config.model.estimator());
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let (names, series): (Vec<String>, Vec<_>) = load_series(config, &calendar).into_iter().unzip();
    let report = pipeline.evaluate_all(names.iter().map(String::as_str).zip(series));

    for (name, evaluation) in report.successes() {
        write_evaluation_csv(output_dir.join(format!("eval_{name}.csv")), evaluation)?;
    }
    write_summary_csv(output_dir.join("evaluation_summary.csv"), report.successes())?;

    println!("{report}");
    if report.successes().next().is_none() {
        anyhow::bail!("no category could be evaluated");
    }
    Ok(())
}
