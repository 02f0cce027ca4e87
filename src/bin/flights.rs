use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use flight_schedule::{
    api::{FlightInfoResource, ResponseStatus},
    DataSourceConfig, EngineRepository, FlightQueryEngine, HeaderPolicy, RepositoryService,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Prints the flights operating on a date as JSON, the way the results endpoint would
#[derive(Debug, Parser)]
struct Args {
    /// Travel date, YYYY-MM-DD. Prints the whole schedule when omitted.
    date: Option<String>,

    /// Dataset file name, resolved against --data-dir
    #[clap(long)]
    location: Option<String>,

    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// auto, present or absent
    #[clap(long)]
    header: Option<HeaderPolicy>,

    /// Retry a failed dataset load on the next query instead of giving up
    #[clap(long)]
    retry_failed_load: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

// Command line flags win over the environment
fn apply_flags(args: &Args, config: &mut DataSourceConfig) {
    if let Some(location) = &args.location {
        config.csv_location = location.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.base_dir = dir.clone();
    }
    if let Some(header) = args.header {
        config.header = header;
    }
    if args.retry_failed_load {
        config.retry_failed_load = true;
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = DataSourceConfig::from_env().context("invalid FLIGHTS_* environment")?;
    apply_flags(&args, &mut config);
    info!(?config, "using data source");

    let engine = Arc::new(FlightQueryEngine::from_config(&config));

    let Some(date) = args.date else {
        let table = engine
            .table()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("could not load flight dataset")?;
        println!("{}", serde_json::to_string_pretty(&table.to_vec())?);
        return Ok(());
    };

    let resource = FlightInfoResource::new(RepositoryService::new(EngineRepository::new(
        engine.clone(),
    )));
    let response = resource.get_results(&date).await;
    info!(status = response.status.code(), "results ready");

    match response.status {
        ResponseStatus::Ok => {
            if let Some(body) = response.body_json()? {
                println!("{body}");
            }
        }
        ResponseStatus::NoContent => {
            if let Some(err) = engine.load_error() {
                bail!("no flights available: {err}");
            }
            println!("[]");
        }
        ResponseStatus::BadRequest => {
            bail!("{}", response.body_json()?.unwrap_or_default());
        }
    }

    Ok(())
}
