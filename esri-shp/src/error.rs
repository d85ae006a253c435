//! Types d'erreurs pour le crate esri-shp

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'un shapefile
#[derive(Debug, Error)]
pub enum ShpError {
    /// Erreur d'I/O lors de la lecture des fichiers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fichier compagnon manquant (.dbf)
    #[error("Missing companion file: {0}")]
    MissingFile(String),

    /// En-tête .shp invalide
    #[error("Invalid shapefile header: {0}")]
    InvalidHeader(String),

    /// Type de forme non supporté
    #[error("Unsupported shape type {0}")]
    UnsupportedShapeType(i32),

    /// Enregistrement tronqué ou incohérent
    #[error("Truncated record #{record} in {file}: {reason}")]
    Truncated {
        file: &'static str,
        record: u32,
        reason: String,
    },

    /// En-tête .dbf invalide
    #[error("Invalid dBase table: {0}")]
    InvalidTable(String),

    /// Nombre d'enregistrements différent entre .shp et .dbf
    #[error("Record count mismatch: {shapes} shapes, {rows} attribute rows")]
    RecordCountMismatch { shapes: usize, rows: usize },
}

impl ShpError {
    /// Crée une erreur d'enregistrement tronqué
    pub fn truncated(file: &'static str, record: u32, reason: impl Into<String>) -> Self {
        Self::Truncated {
            file,
            record,
            reason: reason.into(),
        }
    }
}
