//! # zillow-neighborhoods
//!
//! Import des contours de quartiers Zillow (un shapefile par État) vers PostGIS.
//!
//! ## Déroulement
//!
//! - Vide la table des quartiers
//! - Pour chaque État: télécharge l'archive, l'extrait, mappe les champs en mode strict
//!   et insère les quartiers en un lot
//! - S'arrête au premier téléchargement en échec
//! - Supprime le répertoire de travail dans tous les cas
//!
//! ## Usage CLI
//!
//! ```bash
//! PGDATABASE=zillow zillow-neighborhoods -v
//! ```

pub mod config;
pub mod extract;
pub mod fetch;
pub mod import;
pub mod mapping;
pub mod model;
pub mod regions;
pub mod report;
pub mod run;
pub mod store;

pub use config::{ImportConfig, MappingConfig};
pub use fetch::{FetchError, Fetcher};
pub use mapping::{LayerMapping, MappingError};
pub use model::Neighborhood;
pub use regions::{Region, US_STATES};
pub use report::{RunReport, RunStatus};
pub use run::{run, run_in};
pub use store::pool::{connect, DatabaseConfig};
pub use store::{MemoryStore, NeighborhoodStore, PostgresStore};
