//! Configuration de l'import

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;

/// URL des archives Zillow, `{abbrev}` est remplacé par le code de l'État
pub const DEFAULT_URL_TEMPLATE: &str = "https://www.zillowstatic.com/static-neighborhood-boundaries/LATEST/static-neighborhood-boundaries/shp/ZillowNeighborhoods-{abbrev}.zip";

/// Nom du shapefile attendu dans l'archive
pub const DEFAULT_SHAPEFILE_PATTERN: &str = "ZillowNeighborhoods-{abbrev}.shp";

/// Zillow publie ses contours en NAD83 (géographique)
pub const DEFAULT_SRID: u32 = 4269;

/// Encodage des attributs .dbf
pub const DEFAULT_ENCODING: &str = "iso-8859-1";

/// Marqueur remplacé dans les gabarits
pub const ABBREV_PLACEHOLDER: &str = "{abbrev}";

/// Configuration du mapping (preset embarqué ou fichier JSON)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Nom de la table PostgreSQL cible
    pub table: String,

    /// Mapping des champs du shapefile vers les colonnes
    pub fields: Vec<FieldMapping>,
}

/// Mapping d'un champ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldMapping {
    /// Nom du champ .dbf source (ou type de géométrie pour `multipolygon`)
    pub source: String,

    /// Nom du champ cible
    pub target: String,

    /// Type de données (text, integer, multipolygon)
    #[serde(default = "default_type")]
    pub data_type: String,

    /// Valeur obligatoire (mode strict)
    #[serde(default = "default_required")]
    pub required: bool,

    /// Longueur maximale pour les champs texte
    #[serde(default)]
    pub max_length: Option<usize>,
}

fn default_type() -> String {
    "text".to_string()
}

fn default_required() -> bool {
    true
}

impl MappingConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read mapping file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse mapping JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "neighborhoods" => Self::load_embedded(include_str!("presets/neighborhoods.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: neighborhoods", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded mapping")
    }
}

/// Paramètres d'exécution, lus depuis l'environnement
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub url_template: String,
    pub shapefile_pattern: String,
    pub schema: String,
    /// Surcharge du nom de table du mapping
    pub table: Option<String>,
    pub srid: u32,
    pub encoding: String,
    /// Fichier de mapping JSON (sinon preset `neighborhoods`)
    pub mapping_path: Option<PathBuf>,
    /// Rapport JSON écrit en fin d'exécution
    pub report_path: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.into(),
            shapefile_pattern: DEFAULT_SHAPEFILE_PATTERN.into(),
            schema: "public".into(),
            table: None,
            srid: DEFAULT_SRID,
            encoding: DEFAULT_ENCODING.into(),
            mapping_path: None,
            report_path: None,
        }
    }
}

impl ImportConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url_template: std::env::var("ZILLOW_URL_TEMPLATE").unwrap_or(defaults.url_template),
            shapefile_pattern: std::env::var("ZILLOW_SHAPEFILE_PATTERN")
                .unwrap_or(defaults.shapefile_pattern),
            schema: std::env::var("ZILLOW_SCHEMA").unwrap_or(defaults.schema),
            table: std::env::var("ZILLOW_TABLE").ok(),
            srid: std::env::var("ZILLOW_SRID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.srid),
            encoding: std::env::var("ZILLOW_ENCODING").unwrap_or(defaults.encoding),
            mapping_path: std::env::var("ZILLOW_MAPPING").ok().map(PathBuf::from),
            report_path: std::env::var("ZILLOW_REPORT").ok().map(PathBuf::from),
        }
    }

    /// Vérifie les gabarits et identifiants SQL
    pub fn validate(&self) -> Result<()> {
        for (name, template) in [
            ("ZILLOW_URL_TEMPLATE", &self.url_template),
            ("ZILLOW_SHAPEFILE_PATTERN", &self.shapefile_pattern),
        ] {
            if !template.contains(ABBREV_PLACEHOLDER) {
                anyhow::bail!("{} must contain {}: {}", name, ABBREV_PLACEHOLDER, template);
            }
        }
        validate_identifier(&self.schema)?;
        if let Some(table) = &self.table {
            validate_identifier(table)?;
        }
        self.text_encoding()?;
        Ok(())
    }

    /// Charge le mapping (fichier JSON ou preset)
    pub fn mapping(&self) -> Result<MappingConfig> {
        match &self.mapping_path {
            Some(path) => MappingConfig::load(path),
            None => MappingConfig::from_preset("neighborhoods"),
        }
    }

    /// Résout l'encodage des attributs
    pub fn text_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.as_bytes())
            .with_context(|| format!("Unknown text encoding: {}", self.encoding))
    }

    /// Table cible: surcharge d'environnement ou table du mapping
    pub fn table_name(&self, mapping: &MappingConfig) -> Result<String> {
        let table = self.table.clone().unwrap_or_else(|| mapping.table.clone());
        validate_identifier(&table)?;
        Ok(table)
    }
}

/// Identifiant SQL non quoté: lettre ou `_`, puis alphanumériques ou `_`
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid || name.len() > 63 {
        anyhow::bail!("Invalid SQL identifier: {:?}", name);
    }
    Ok(())
}

/// Substitue l'abréviation dans un gabarit
pub fn render(template: &str, abbrev: &str) -> String {
    template.replace(ABBREV_PLACEHOLDER, abbrev)
}
