//! Orchestration d'un import complet

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::extract;
use crate::fetch::Fetcher;
use crate::mapping::LayerMapping;
use crate::regions::Region;
use crate::report::RunReport;
use crate::store::NeighborhoodStore;

/// Préfixe du répertoire de travail temporaire
pub const WORKDIR_PREFIX: &str = "zillow-neighborhoods-";

/// Vide le store puis importe chaque région dans l'ordre.
///
/// Un échec de téléchargement est signalé sur `out` et arrête la boucle; le rapport
/// est alors `Aborted` et les régions déjà importées sont conservées. Toute autre
/// erreur (archive, mapping, store) est propagée. Le répertoire de travail est
/// supprimé dans tous les cas.
pub async fn run<S, W>(
    regions: &[Region],
    fetcher: &Fetcher,
    layer: &LayerMapping,
    shapefile_pattern: &str,
    store: &S,
    out: &mut W,
) -> Result<RunReport>
where
    S: NeighborhoodStore + ?Sized,
    W: Write,
{
    run_in(
        &std::env::temp_dir(),
        regions,
        fetcher,
        layer,
        shapefile_pattern,
        store,
        out,
    )
    .await
}

/// Comme [`run`], avec le répertoire de travail créé sous `root`
pub async fn run_in<S, W>(
    root: &Path,
    regions: &[Region],
    fetcher: &Fetcher,
    layer: &LayerMapping,
    shapefile_pattern: &str,
    store: &S,
    out: &mut W,
) -> Result<RunReport>
where
    S: NeighborhoodStore + ?Sized,
    W: Write,
{
    let start = Instant::now();

    // Supprimé au drop si une erreur est propagée
    let workdir = tempfile::Builder::new()
        .prefix(WORKDIR_PREFIX)
        .tempdir_in(root)
        .with_context(|| format!("Failed to create working directory in {}", root.display()))?;
    let mut report = RunReport::new(workdir.path());

    report.cleared = store
        .clear()
        .await
        .context("Failed to clear existing neighborhoods")?;
    info!(deleted = report.cleared, "Existing neighborhoods removed");

    for region in regions {
        writeln!(out, "Importing {} neighborhoods", region.abbrev)?;
        out.flush()?;

        let archive = match fetcher.download(region.abbrev).await {
            Ok(file) => file,
            Err(e) => {
                writeln!(out, "Could not download {} {}", region.abbrev, e)?;
                out.flush()?;
                warn!(region = region.abbrev, error = %e, "Download failed, stopping run");
                report.abort(region.abbrev, e.to_string());
                break;
            }
        };

        extract::extract_all(archive, workdir.path())
            .with_context(|| format!("Failed to extract archive for {}", region.abbrev))?;
        let shp = extract::shapefile_path(workdir.path(), shapefile_pattern, region.abbrev)?;

        let imported = crate::import::import_shapefile(&shp, layer, store)
            .await
            .with_context(|| format!("Failed to import {} neighborhoods", region.abbrev))?;
        report.record_region(region.abbrev, region.name, imported);
    }

    workdir
        .close()
        .context("Failed to remove working directory")?;

    report.set_duration(start.elapsed());
    info!(
        regions = report.regions.len(),
        imported = report.total_imported(),
        aborted = report.is_aborted(),
        "Run finished"
    );
    Ok(report)
}
