use anyhow::{anyhow, Context, Result};
use std::{
    collections::BTreeMap,
    path::Path,
    sync::Mutex,
};

use super::{ObjectInfo, ObjectStore};

/// In-process bucket store for tests.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store
            .buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string(), BTreeMap::new());
        store
    }

    pub fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(object).cloned())
    }
}

impl ObjectStore for MemoryStore {
    async fn fetch_bucket(&self, bucket: &str) -> Result<String> {
        if self.buckets.lock().unwrap().contains_key(bucket) {
            Ok(bucket.to_string())
        } else {
            Err(anyhow!("bucket {} not found", bucket))
        }
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| anyhow!("bucket {} not found", bucket))?;
        Ok(objects
            .iter()
            .map(|(name, data)| ObjectInfo {
                name: name.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    async fn upload_file(&self, bucket: &str, source: &Path, object: &str) -> Result<u64> {
        let data = tokio::fs::read(source)
            .await
            .with_context(|| format!("reading {}", source.display()))?;
        let len = data.len() as u64;
        let mut buckets = self.buckets.lock().unwrap();
        buckets
            .get_mut(bucket)
            .ok_or_else(|| anyhow!("bucket {} not found", bucket))?
            .insert(object.to_string(), data);
        Ok(len)
    }
}
