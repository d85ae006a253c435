//! Extraction des archives zip dans le répertoire de travail

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::config;

/// Extrait toutes les entrées de l'archive dans `dest`.
///
/// L'archive est consommée: elle est fermée à la fin, en cas de succès comme
/// d'erreur. Les entrées dont le chemin sortirait de `dest` sont ignorées.
/// Retourne le nombre de fichiers écrits.
pub fn extract_all(archive: File, dest: &Path) -> Result<usize> {
    let mut zip = ZipArchive::new(BufReader::new(archive)).context("Failed to read zip archive")?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry at index {}", i))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping zip entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        let bytes = std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", entry.name()))?;

        debug!(file = %target.display(), bytes, "Extracted");
        written += 1;
    }

    Ok(written)
}

/// Chemin du shapefile d'une région dans le répertoire de travail
///
/// # Errors
/// Retourne une erreur si le fichier n'a pas été extrait.
pub fn shapefile_path(dir: &Path, pattern: &str, abbrev: &str) -> Result<PathBuf> {
    let path = dir.join(config::render(pattern, abbrev));
    if !path.is_file() {
        anyhow::bail!("Shapefile not found in archive: {}", path.display());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive(entries: &[(&str, &[u8])]) -> File {
        let mut file = tempfile::tempfile().unwrap();
        {
            let mut zip = ZipWriter::new(&mut file);
            for (name, data) in entries {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        file.seek(SeekFrom::Start(0)).unwrap();
        file
    }

    #[test]
    fn test_extract_all_and_locate() {
        let dir = tempfile::tempdir().unwrap();
        let file = archive(&[
            ("ZillowNeighborhoods-DE.shp", b"shp"),
            ("ZillowNeighborhoods-DE.dbf", b"dbf"),
            ("docs/readme.txt", b"hello"),
        ]);

        assert_eq!(extract_all(file, dir.path()).unwrap(), 3);
        assert!(dir.path().join("docs/readme.txt").is_file());

        let shp = shapefile_path(dir.path(), config::DEFAULT_SHAPEFILE_PATTERN, "DE").unwrap();
        assert_eq!(std::fs::read(shp).unwrap(), b"shp");
    }

    #[test]
    fn test_unsafe_entry_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("work");
        std::fs::create_dir(&inner).unwrap();

        let file = archive(&[("../escape.txt", b"nope"), ("ok.txt", b"yes")]);
        assert_eq!(extract_all(file, &inner).unwrap(), 1);
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_missing_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        assert!(shapefile_path(dir.path(), config::DEFAULT_SHAPEFILE_PATTERN, "DE").is_err());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"<html>not found</html>").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        assert!(extract_all(file, dir.path()).is_err());
    }
}
