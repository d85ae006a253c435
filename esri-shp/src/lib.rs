//! # esri-shp
//!
//! Lecteur de shapefiles ESRI: géométries (.shp) et attributs (.dbf).
//!
//! ## Features
//!
//! - Formes Point, PolyLine, Polygon, MultiPoint (et variantes Z/M, lues en 2D)
//! - Assemblage des anneaux en `MultiPolygon` selon la convention ESRI
//! - Décodage des attributs avec l'encodage choisi (`encoding_rs`)
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//! - Écriture de shapefiles polygonaux (fixtures, tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use esri_shp::read;
//! use std::path::Path;
//!
//! let shp = read(Path::new("ZillowNeighborhoods-DE.shp"), encoding_rs::WINDOWS_1252)?;
//! for record in &shp.records {
//!     println!("{:?}: {:?}", record.attribute("NAME"), record.geometry);
//! }
//! ```

pub mod error;
pub mod parser;
pub mod rings;
pub mod types;
pub mod writer;

pub use error::ShpError;
pub use types::{FieldDescriptor, FieldKind, Record, ShapeType, Shapefile};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

/// Lit un shapefile (.shp + .dbf voisin) et apparie formes et attributs.
///
/// Les enregistrements marqués supprimés dans le .dbf sont ignorés.
///
/// # Errors
///
/// Retourne `ShpError` si un fichier est absent, illisible, ou si les deux
/// fichiers n'ont pas le même nombre d'enregistrements.
pub fn read(shp_path: &Path, encoding: &'static Encoding) -> Result<Shapefile, ShpError> {
    let dbf_path = companion(shp_path, "dbf")
        .ok_or_else(|| ShpError::MissingFile(shp_path.with_extension("dbf").display().to_string()))?;

    let shp_bytes = std::fs::read(shp_path)?;
    let dbf_bytes = std::fs::read(&dbf_path)?;

    let shp = parser::shp::parse(&shp_bytes)?;
    let dbf = parser::dbf::parse(&dbf_bytes, encoding)?;

    if shp.shapes.len() != dbf.rows.len() {
        return Err(ShpError::RecordCountMismatch {
            shapes: shp.shapes.len(),
            rows: dbf.rows.len(),
        });
    }

    let names: Vec<&str> = dbf.fields.iter().map(|f| f.name.as_str()).collect();
    let mut deleted = 0usize;

    let records: Vec<Record> = shp
        .shapes
        .into_iter()
        .zip(dbf.rows)
        .filter_map(|((number, geometry), row)| {
            let Some(values) = row else {
                deleted += 1;
                return None;
            };
            let attributes: HashMap<String, String> = names
                .iter()
                .map(|n| n.to_string())
                .zip(values)
                .collect();
            Some(Record {
                number,
                geometry,
                attributes,
            })
        })
        .collect();

    tracing::debug!(
        path = %shp_path.display(),
        records = records.len(),
        deleted,
        fields = dbf.fields.len(),
        "Shapefile read"
    );

    Ok(Shapefile {
        shape_type: shp.shape_type,
        bbox: shp.bbox,
        fields: dbf.fields,
        records,
    })
}

/// Cherche un fichier compagnon (extension en minuscules puis majuscules)
fn companion(shp_path: &Path, ext: &str) -> Option<PathBuf> {
    [ext.to_lowercase(), ext.to_uppercase()]
        .into_iter()
        .map(|e| shp_path.with_extension(e))
        .find(|p| p.exists())
}
