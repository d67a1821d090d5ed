use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use geo_pubmap::config::{ConfigLoader, ResolvedConfig};
use geo_pubmap::domain::parse_pmid_list;
use geo_pubmap::error::GeoMapError;
use geo_pubmap::eutils::EutilsClient;
use geo_pubmap::events::TracingSink;
use geo_pubmap::fetcher::{FetchOrchestrator, FetchOutcome};
use geo_pubmap::http::{ReqwestTransport, RetryingFetcher};
use geo_pubmap::output::{FetchSummary, JsonOutput};
use geo_pubmap::points::PointBuilder;

#[derive(Parser)]
#[command(name = "geo-pubmap")]
#[command(about = "Map PubMed ids to linked GEO datasets and lay them out in 2D")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve linked GEO datasets for the configured publications")]
    Fetch(CommonArgs),
    #[command(about = "Print 2D points for a set of publications")]
    Points(PointsArgs),
}

#[derive(Args, Clone)]
struct CommonArgs {
    #[arg(long)]
    config: Option<String>,

    /// Snapshot file; overrides `snapshot_path` from the config.
    #[arg(long)]
    snapshot: Option<Utf8PathBuf>,

    #[arg(long, conflicts_with = "snapshot")]
    no_snapshot: bool,
}

#[derive(Args, Clone)]
struct PointsArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Comma-separated PubMed ids; defaults to every id in the pmids file.
    #[arg(long)]
    pmids: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GeoMapError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GeoMapError) -> u8 {
    match error {
        GeoMapError::ConfigRead(_) | GeoMapError::ConfigParse(_) | GeoMapError::PmidList(_) => 2,
        GeoMapError::Snapshot { .. }
        | GeoMapError::SnapshotFormat { .. }
        | GeoMapError::SnapshotVersion { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let common = match &cli.command {
        Commands::Fetch(args) => args,
        Commands::Points(args) => &args.common,
    };
    let config = ConfigLoader::resolve(common.config.as_deref())?;
    init_logging(&config)?;

    match cli.command {
        Commands::Fetch(args) => {
            let outcome = fetch(&config, &args)?;
            JsonOutput::print_fetch(&FetchSummary::from(&outcome)).into_diagnostic()
        }
        Commands::Points(args) => {
            let outcome = fetch(&config, &args.common)?;
            let requested = match args.pmids.as_deref() {
                Some(list) => parse_pmid_list(list)?,
                None => config.read_pmids()?,
            };
            let points = PointBuilder::default().build_points(
                &requested,
                &outcome.associations,
                &TracingSink,
            )?;
            JsonOutput::print_points(&points).into_diagnostic()
        }
    }
}

fn init_logging(config: &ResolvedConfig) -> miette::Result<()> {
    let writer = match &config.log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path.as_std_path())
                .map_err(|err| GeoMapError::Filesystem(format!("open log {path}: {err}")))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(config.log_path.is_none())
        .with_writer(writer)
        .init();
    Ok(())
}

fn fetch(config: &ResolvedConfig, args: &CommonArgs) -> miette::Result<FetchOutcome> {
    let snapshot = if args.no_snapshot {
        None
    } else {
        args.snapshot.clone().or_else(|| config.snapshot_path.clone())
    };
    let pmids = config.read_pmids()?;

    let transport = ReqwestTransport::new()?;
    let client = EutilsClient::new(
        RetryingFetcher::new(transport, config.retry),
        config.endpoints.clone(),
    );
    let orchestrator = FetchOrchestrator::new(&client, &client);
    let outcome = orchestrator.fetch(&pmids, snapshot.as_deref(), &TracingSink)?;
    Ok(outcome)
}
