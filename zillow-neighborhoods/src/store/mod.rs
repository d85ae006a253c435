//! Persistance des quartiers (PostgreSQL/PostGIS ou mémoire)

pub mod memory;
pub mod pool;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::Neighborhood;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Destination des enregistrements importés
#[async_trait]
pub trait NeighborhoodStore: Send + Sync {
    /// Supprime tous les quartiers existants, retourne le nombre de lignes supprimées
    async fn clear(&self) -> Result<u64>;

    /// Insère un lot de quartiers.
    ///
    /// Le lot est atomique: en cas d'erreur, aucune ligne n'est conservée.
    async fn insert(&self, records: &[Neighborhood]) -> Result<u64>;

    /// Nombre de quartiers présents
    async fn count(&self) -> Result<u64>;
}
