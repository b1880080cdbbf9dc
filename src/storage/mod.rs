pub mod gcs;
#[cfg(test)]
pub mod memory;

pub use gcs::GcsStore;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, instrument};

/// An object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
}

/// The three bucket operations the batch needs.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Resolve `bucket`, failing if it does not exist or is not accessible.
    async fn fetch_bucket(&self, bucket: &str) -> Result<String>;

    /// Every object in `bucket`, across all pages.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>>;

    /// Upload the local file `source` to `object`, returning the bytes sent.
    async fn upload_file(&self, bucket: &str, source: &Path, object: &str) -> Result<u64>;
}

/// Log the name of every object in `bucket`.
#[instrument(level = "info", skip(store))]
pub async fn list_bucket_contents<S: ObjectStore>(
    store: &S,
    bucket: &str,
) -> Result<Vec<ObjectInfo>> {
    let name = store
        .fetch_bucket(bucket)
        .await
        .with_context(|| format!("fetching bucket {}", bucket))?;
    let objects = store
        .list_objects(&name)
        .await
        .with_context(|| format!("listing bucket {}", name))?;

    info!("Contents of bucket '{}':", name);
    for obj in &objects {
        info!("- {}", obj.name);
    }
    Ok(objects)
}

/// Upload `source` to `bucket/object`.
#[instrument(level = "info", skip(store, source), fields(source = %source.display()))]
pub async fn upload<S: ObjectStore>(
    store: &S,
    bucket: &str,
    source: &Path,
    object: &str,
) -> Result<u64> {
    let bytes = store
        .upload_file(bucket, source, object)
        .await
        .with_context(|| format!("uploading {} to {}/{}", source.display(), bucket, object))?;
    info!(
        bytes,
        "File {} uploaded to {}/{}.",
        source.display(),
        bucket,
        object
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_what_was_uploaded() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("a.csv");
        std::fs::write(&source, "x\n1\n")?;

        let store = MemoryStore::with_bucket("data");
        upload(&store, "data", &source, "cleaned_data/a.csv").await?;

        let listed = list_bucket_contents(&store, "data").await?;
        assert_eq!(
            listed,
            vec![ObjectInfo {
                name: "cleaned_data/a.csv".into(),
                size: 4
            }]
        );
        assert_eq!(store.object("data", "cleaned_data/a.csv").unwrap(), b"x\n1\n");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_bucket_fails_listing() {
        let store = MemoryStore::with_bucket("data");
        assert!(list_bucket_contents(&store, "other").await.is_err());
    }

    #[tokio::test]
    async fn missing_source_fails_upload() {
        let store = MemoryStore::with_bucket("data");
        let err = upload(&store, "data", Path::new("/no/such/file.csv"), "x.csv").await;
        assert!(err.is_err());
    }
}
