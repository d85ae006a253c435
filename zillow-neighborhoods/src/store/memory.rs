//! Store en mémoire (tests et exécutions à blanc)

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use super::NeighborhoodStore;
use crate::model::Neighborhood;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Neighborhood>>,
}

impl MemoryStore {
    /// Store pré-rempli
    pub fn with_records(records: Vec<Neighborhood>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Copie des enregistrements, dans l'ordre d'insertion
    pub fn records(&self) -> Vec<Neighborhood> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Neighborhood>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NeighborhoodStore for MemoryStore {
    async fn clear(&self) -> Result<u64> {
        let mut records = self.lock();
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn insert(&self, records: &[Neighborhood]) -> Result<u64> {
        self.lock().extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn neighborhood(name: &str) -> Neighborhood {
        Neighborhood {
            state: "DE".into(),
            county: "New Castle".into(),
            city: "Wilmington".into(),
            name: name.into(),
            region_id: Some(1),
            geom: MultiPolygon::new(vec![]),
        }
    }

    #[tokio::test]
    async fn test_clear_insert_count() {
        let store = MemoryStore::with_records(vec![neighborhood("Old")]);
        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);

        let inserted = store
            .insert(&[neighborhood("Trolley Square"), neighborhood("Forty Acres")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.records()[1].name, "Forty Acres");
    }
}
