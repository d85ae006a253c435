//! Point d'entrée CLI pour zillow-neighborhoods

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use zillow_neighborhoods::store::pool::{connect, DatabaseConfig};
use zillow_neighborhoods::{run, Fetcher, ImportConfig, LayerMapping, PostgresStore, US_STATES};

/// Code de sortie quand un téléchargement a interrompu l'import
const EXIT_ABORTED: u8 = 2;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Importer les quartiers Zillow de tous les États vers PostGIS
#[derive(Parser)]
#[command(name = "zillow-neighborhoods")]
#[command(author, version)]
#[command(about = "Importer les contours de quartiers Zillow vers PostGIS")]
#[command(long_about = "Vide la table des quartiers puis importe le shapefile Zillow de chaque État.\n\nConfiguration par variables d'environnement (PG*, ZILLOW_*), fichier .env accepté.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = ImportConfig::from_env();
    config.validate()?;

    let mapping = config.mapping()?;
    let table = config.table_name(&mapping)?;
    let layer = LayerMapping::new(&mapping.fields, config.text_encoding()?)
        .context("Invalid field mapping")?;
    let fetcher = Fetcher::new(&config.url_template).context("Failed to build HTTP client")?;

    let db = DatabaseConfig::from_env();
    info!(target_db = %db.target(), schema = %config.schema, table = %table, "Connecting to PostgreSQL");
    let pool = connect(&db).await?;

    let store = PostgresStore::new(pool, &config.schema, &table, config.srid);
    store.ensure_table().await?;

    let mut stdout = std::io::stdout();
    let report = run(
        US_STATES,
        &fetcher,
        &layer,
        &config.shapefile_pattern,
        &store,
        &mut stdout,
    )
    .await?;

    // stdout ne porte que les lignes de progression
    report
        .write_to(&mut std::io::stderr())
        .context("Failed to write report")?;
    if let Some(path) = &config.report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    if report.is_aborted() {
        return Ok(ExitCode::from(EXIT_ABORTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout reste réservé aux lignes de progression
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
