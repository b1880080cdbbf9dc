use anyhow::{Context, Result};
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::{
        buckets::get::GetBucketRequest,
        objects::{
            list::ListObjectsRequest,
            upload::{Media, UploadObjectRequest, UploadType},
        },
    },
};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::{ObjectInfo, ObjectStore};

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Google Cloud Storage, authenticated with Application Default Credentials.
pub struct GcsStore {
    client: Client,
}

impl GcsStore {
    /// Authenticate and build a client. When `credentials` is given it is
    /// exported as `GOOGLE_APPLICATION_CREDENTIALS` first.
    pub async fn connect(credentials: Option<&Path>) -> Result<Self> {
        if let Some(path) = credentials {
            info!(credentials = %path.display(), "using service account key");
            std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", path);
        }

        let config = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        Ok(Self {
            client: Client::new(config),
        })
    }
}

impl ObjectStore for GcsStore {
    async fn fetch_bucket(&self, bucket: &str) -> Result<String> {
        let req = GetBucketRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };
        let found = self
            .client
            .get_bucket(&req)
            .await
            .with_context(|| format!("getting bucket {}", bucket))?;
        Ok(found.name)
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let req = ListObjectsRequest {
                bucket: bucket.to_string(),
                page_token: page_token.take(),
                ..Default::default()
            };
            let page = self
                .client
                .list_objects(&req)
                .await
                .with_context(|| format!("listing objects in {}", bucket))?;

            let items = page.items.unwrap_or_default();
            debug!(bucket, count = items.len(), "listed page");
            out.extend(items.into_iter().map(|o| ObjectInfo {
                name: o.name,
                size: u64::try_from(o.size).unwrap_or(0),
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(out)
    }

    async fn upload_file(&self, bucket: &str, source: &Path, object: &str) -> Result<u64> {
        let data = fs::read(source)
            .await
            .with_context(|| format!("reading {}", source.display()))?;
        let len = data.len() as u64;

        let mut media = Media::new(object.to_string());
        media.content_type = CSV_CONTENT_TYPE.into();
        media.content_length = Some(len);

        let req = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        self.client
            .upload_object(&req, data, &UploadType::Simple(media))
            .await
            .with_context(|| format!("uploading {} to gs://{}/{}", source.display(), bucket, object))?;

        Ok(len)
    }
}
