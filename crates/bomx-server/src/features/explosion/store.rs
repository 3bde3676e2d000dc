//! Status document persistence
//!
//! Reads and writes the per-(artifact set, version) status document in the
//! object store, including the read-normalize-mutate-write update cycle.
//! There is no optimistic lock: concurrent writers for different artifact
//! types converge because each one passes the other entries through
//! unchanged; concurrent writers for the same type are last-write-wins.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument};

use bomx_common::status::{ArtifactStatusEntry, ArtifactType, StatusDocument};

use crate::storage::ObjectStore;

/// Storage key of the status document.
pub fn status_key(artifact_set_id: &str, version: &str) -> String {
    format!("{}/status/{}.json", artifact_set_id, version)
}

/// Storage key of a generated artifact.
pub fn artifact_key(artifact_set_id: &str, file_name: &str) -> String {
    format!("{}/{}", artifact_set_id, file_name)
}

/// Listing prefix covering every object of one artifact set.
pub fn set_prefix(artifact_set_id: &str) -> String {
    format!("{}/", artifact_set_id)
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The document could not be read. Fatal for a job invocation: it must
    /// not proceed without prior state, or it would silently reset other
    /// artifact types' progress on the next write.
    #[error("failed to load status document: {0}")]
    Load(String),

    #[error("failed to save status document: {0}")]
    Save(String),
}

/// Durable status document store.
#[derive(Clone)]
pub struct StatusStore {
    store: Arc<dyn ObjectStore>,
}

impl StatusStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Load the document, normalizing whatever is stored. A missing object
    /// is not an error; it yields a fresh all-pending document.
    #[instrument(skip(self))]
    pub async fn load(
        &self,
        artifact_set_id: &str,
        version: &str,
    ) -> Result<StatusDocument, StoreError> {
        let key = status_key(artifact_set_id, version);
        match self
            .store
            .get(&key)
            .await
            .map_err(|e| StoreError::Load(e.to_string()))?
        {
            None => {
                debug!("no status document at {}, starting fresh", key);
                Ok(StatusDocument::fresh(artifact_set_id, version))
            }
            Some(bytes) => {
                let raw: serde_json::Value =
                    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
                Ok(StatusDocument::normalize(&raw, artifact_set_id, version))
            }
        }
    }

    /// Serialize and overwrite the document, bumping `lastUpdatedAt`.
    #[instrument(skip(self, doc))]
    pub async fn save(&self, doc: &mut StatusDocument) -> Result<(), StoreError> {
        doc.last_updated_at = Utc::now();
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Save(e.to_string()))?;
        self.store
            .put(
                &status_key(&doc.artifact_set_id, &doc.version),
                bytes,
                "application/json",
            )
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;
        Ok(())
    }

    /// The idempotent update cycle: load, normalize, replace exactly the
    /// entry for `artifact_type` with `mutate(entry)`, save, and return
    /// the new document. All other entries pass through as read.
    pub async fn update<F>(
        &self,
        artifact_set_id: &str,
        version: &str,
        artifact_type: ArtifactType,
        mutate: F,
    ) -> Result<StatusDocument, StoreError>
    where
        F: FnOnce(ArtifactStatusEntry) -> ArtifactStatusEntry,
    {
        let mut doc = self.load(artifact_set_id, version).await?;

        let mut mutate = Some(mutate);
        for entry in doc.files.iter_mut() {
            if entry.artifact_type == artifact_type {
                if let Some(f) = mutate.take() {
                    *entry = f(entry.clone());
                }
            }
        }

        self.save(&mut doc).await?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use bomx_common::status::ArtifactState;

    fn test_store() -> (MemoryStore, StatusStore) {
        let mem = MemoryStore::new();
        let store = StatusStore::new(Arc::new(mem.clone()));
        (mem, store)
    }

    #[test]
    fn test_key_derivation() {
        assert_eq!(status_key("B1", "v3"), "B1/status/v3.json");
        assert_eq!(artifact_key("B1", "PlanVentas.csv"), "B1/PlanVentas.csv");
        assert_eq!(set_prefix("B1"), "B1/");
    }

    #[tokio::test]
    async fn test_load_not_found_is_fresh() {
        let (_, store) = test_store();
        let doc = store.load("B1", "v3").await.unwrap();
        let fresh = StatusDocument::fresh("B1", "v3");
        assert_eq!(doc.artifact_set_id, fresh.artifact_set_id);
        assert_eq!(doc.version, fresh.version);
        assert_eq!(doc.files, fresh.files);
    }

    #[tokio::test]
    async fn test_load_tolerates_corrupt_document() {
        let (mem, store) = test_store();
        mem.put("B1/status/v3.json", b"{not json".to_vec(), "application/json")
            .await
            .unwrap();

        let doc = store.load("B1", "v3").await.unwrap();
        assert!(doc.files.iter().all(|e| e.status == ArtifactState::Pending));
    }

    #[tokio::test]
    async fn test_update_touches_only_the_target_entry() {
        let (_, store) = test_store();

        // seed one entry to a terminal state
        store
            .update("B1", "v3", ArtifactType::ProductionPlan, |mut e| {
                e.status = ArtifactState::Success;
                e.record_count = Some(3);
                e
            })
            .await
            .unwrap();

        let before = store.load("B1", "v3").await.unwrap();
        let after = store
            .update("B1", "v3", ArtifactType::SalesPlan, |mut e| {
                e.status = ArtifactState::Processing;
                e
            })
            .await
            .unwrap();

        for t in ArtifactType::ALL {
            if t == ArtifactType::SalesPlan {
                assert_eq!(after.entry(t).unwrap().status, ArtifactState::Processing);
            } else {
                assert_eq!(after.entry(t), before.entry(t));
            }
        }
    }

    #[tokio::test]
    async fn test_update_persists_round_trip() {
        let (mem, store) = test_store();
        store
            .update("B1", "v3", ArtifactType::SalesPlan, |mut e| {
                e.status = ArtifactState::Error;
                e.error = Some("query timed out".to_string());
                e
            })
            .await
            .unwrap();

        let bytes = mem.get("B1/status/v3.json").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let reloaded = store.load("B1", "v3").await.unwrap();
        assert_eq!(value["artifactSetId"], "B1");
        assert_eq!(
            reloaded.entry(ArtifactType::SalesPlan).unwrap().error.as_deref(),
            Some("query timed out")
        );
    }
}
