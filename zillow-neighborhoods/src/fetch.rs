//! Téléchargement des archives par région

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::config;

/// Erreurs de téléchargement (interceptées par l'orchestrateur)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Failed to write temporary file: {0}")]
    Io(#[from] std::io::Error),
}

/// Client HTTP de téléchargement (sans retry ni timeout)
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    url_template: String,
}

impl Fetcher {
    /// Crée un fetcher pour un gabarit d'URL contenant `{abbrev}`
    pub fn new(url_template: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("zillow-neighborhoods/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    /// URL de l'archive d'une région
    pub fn url_for(&self, abbrev: &str) -> String {
        config::render(&self.url_template, abbrev)
    }

    /// Télécharge l'archive dans un fichier temporaire anonyme, rembobiné au début.
    ///
    /// La connexion est libérée dans tous les cas; le fichier temporaire est
    /// supprimé si la copie échoue.
    pub async fn download(&self, abbrev: &str) -> Result<File, FetchError> {
        let url = self.url_for(abbrev);
        debug!(url = %url, "Downloading archive");

        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status(),
            });
        }

        let mut local = tempfile::tempfile()?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            local.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        local.flush()?;
        local.seek(SeekFrom::Start(0))?;

        info!(region = abbrev, bytes = written, "Archive downloaded");
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for() {
        let fetcher = Fetcher::new(config::DEFAULT_URL_TEMPLATE).unwrap();
        assert!(fetcher
            .url_for("WY")
            .ends_with("/shp/ZillowNeighborhoods-WY.zip"));
    }

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            url: "http://host/x.zip".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "HTTP 404 Not Found for http://host/x.zip");
    }
}
