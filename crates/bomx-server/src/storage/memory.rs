//! In-memory object store
//!
//! Backs tests and local development runs where no S3 endpoint is
//! available. Same semantics as the S3 store at the key granularity:
//! overwrites are last-write-wins, `get` on a missing key is `Ok(None)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{calculate_sha256, ObjectStore, StorageError, UploadResult};

#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an object, returning whether it existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.objects.write().await.remove(key).is_some()
    }

    /// All stored keys, in lexicographic order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Snapshot of the full store contents.
    pub async fn contents(&self) -> BTreeMap<String, Vec<u8>> {
        self.objects.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let checksum = calculate_sha256(&data);
        let size = data.len() as i64;
        self.objects.write().await.insert(key.to_string(), data);
        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_list_by_prefix() {
        let store = MemoryStore::new();
        store.put("B1/a.csv", b"a".to_vec(), "text/csv").await.unwrap();
        store.put("B1/b.csv", b"b".to_vec(), "text/csv").await.unwrap();
        store.put("B2/c.csv", b"c".to_vec(), "text/csv").await.unwrap();

        let keys = store.list("B1/").await.unwrap();
        assert_eq!(keys, vec!["B1/a.csv".to_string(), "B1/b.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let store = MemoryStore::new();
        store.put("k", b"old".to_vec(), "text/csv").await.unwrap();
        store.put("k", b"new".to_vec(), "text/csv").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"new");
    }
}
