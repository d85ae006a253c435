//! Rapport d'exécution

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Issue de l'exécution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les régions ont été traitées
    Completed,
    /// Arrêt sur échec de téléchargement; les régions précédentes restent importées
    Aborted { region: String, reason: String },
}

/// Résultat d'une région importée
#[derive(Debug, Clone, Serialize)]
pub struct RegionReport {
    pub abbrev: String,
    pub name: String,
    pub imported: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Lignes supprimées avant import
    pub cleared: u64,
    pub regions: Vec<RegionReport>,
    /// Répertoire de travail (supprimé en fin d'exécution)
    pub workdir: PathBuf,
    pub duration_secs: f64,
}

impl RunReport {
    pub fn new(workdir: &Path) -> Self {
        Self {
            status: RunStatus::Completed,
            cleared: 0,
            regions: Vec::new(),
            workdir: workdir.to_path_buf(),
            duration_secs: 0.0,
        }
    }

    /// Enregistre une région importée
    pub fn record_region(&mut self, abbrev: &str, name: &str, imported: usize) {
        self.regions.push(RegionReport {
            abbrev: abbrev.to_string(),
            name: name.to_string(),
            imported,
        });
    }

    /// Marque l'exécution comme interrompue
    pub fn abort(&mut self, region: &str, reason: impl Into<String>) {
        self.status = RunStatus::Aborted {
            region: region.to_string(),
            reason: reason.into(),
        };
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Nombre total de quartiers importés
    pub fn total_imported(&self) -> usize {
        self.regions.iter().map(|r| r.imported).sum()
    }

    /// Écrit le rapport lisible
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "\n{}", "=".repeat(60))?;
        writeln!(out, "ZILLOW NEIGHBORHOODS IMPORT REPORT")?;
        writeln!(out, "{}", "=".repeat(60))?;

        match &self.status {
            RunStatus::Completed => writeln!(out, "\nStatus: Completed")?,
            RunStatus::Aborted { region, reason } => {
                writeln!(out, "\nStatus: Aborted at {} ({})", region, reason)?
            }
        }
        writeln!(out, "Duration: {:.2}s", self.duration_secs)?;
        writeln!(out, "Cleared: {} existing rows", self.cleared)?;

        if !self.regions.is_empty() {
            writeln!(out, "\n--- BY REGION ---")?;
            for region in &self.regions {
                writeln!(out, "  {} ({}): {}", region.abbrev, region.name, region.imported)?;
            }
        }

        writeln!(out, "\n{}", self.summary())?;
        writeln!(out, "{}", "=".repeat(60))?;
        out.flush()
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let status = match &self.status {
            RunStatus::Completed => "completed".to_string(),
            RunStatus::Aborted { region, .. } => format!("aborted at {}", region),
        };
        format!(
            "{} regions, {} neighborhoods imported, {}",
            self.regions.len(),
            self.total_imported(),
            status
        )
    }
}
