//! Import d'un shapefile dans le store

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::mapping::LayerMapping;
use crate::store::NeighborhoodStore;

/// Lit le shapefile, applique le mapping strict et insère tous les quartiers en un lot.
///
/// Une seule ligne invalide fait échouer le fichier entier: rien n'est inséré.
pub async fn import_shapefile<S>(path: &Path, layer: &LayerMapping, store: &S) -> Result<usize>
where
    S: NeighborhoodStore + ?Sized,
{
    let shapefile = esri_shp::read(path, layer.encoding())
        .with_context(|| format!("Failed to read shapefile {}", path.display()))?;

    let records = layer
        .map_all(&shapefile)
        .with_context(|| format!("Failed to map {}", path.display()))?;

    let inserted = store
        .insert(&records)
        .await
        .with_context(|| format!("Failed to store records from {}", path.display()))?;

    info!(
        file = %path.display(),
        records = records.len(),
        inserted,
        "Shapefile imported"
    );
    Ok(records.len())
}
