//! Storage locations (S3, R2, GCS, Azure, local)

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static BUCKET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9]$").expect("bucket name regex is valid")
});

/// Validate an S3 bucket name
///
/// Bucket names are 3-63 characters of lowercase letters, digits, dots and
/// hyphens, starting and ending with a letter or digit.
pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if !BUCKET_NAME.is_match(bucket) || bucket.contains("..") {
        return Err(Error::config(format!("Invalid bucket name: '{bucket}'")));
    }
    Ok(())
}

/// Whether an object under a table prefix holds data
///
/// Marker objects such as `_SUCCESS`, hidden files and `$folder$`
/// placeholders are skipped.
pub fn is_data_object(path: &ObjectPath) -> bool {
    match path.filename() {
        Some(name) => {
            !name.starts_with('_') && !name.starts_with('.') && !name.ends_with("$folder$")
        }
        None => false,
    }
}

/// Object store plus base prefix, parsed from a URL
#[derive(Debug, Clone)]
pub struct StorageLocation {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL scheme for logging
    scheme: String,
    /// Bucket, container or filesystem root for logging
    authority: String,
}

impl StorageLocation {
    /// Parse a URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file:///path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else {
            Self::parse_local(url)
        }
    }

    /// Wrap an existing store
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        scheme: impl Into<String>,
        authority: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            scheme: scheme.into(),
            authority: authority.into(),
        }
    }

    /// Split `scheme://bucket/prefix` into bucket and prefix
    fn split_bucket<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, String)> {
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in URL: {url}")));
        }

        Ok((bucket, prefix))
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let (bucket, prefix) = Self::split_bucket(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // AWS_ENDPOINT is read by from_env(); R2 also honours its own variable
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: scheme.to_string(),
            authority: bucket.to_string(),
        })
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let (bucket, prefix) = Self::split_bucket(url, "gs")?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "gs".to_string(),
            authority: bucket.to_string(),
        })
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let (container, prefix) = Self::split_bucket(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "az".to_string(),
            authority: container.to_string(),
        })
    }

    /// Parse local filesystem path
    ///
    /// The store is rooted at `/` so missing directories under the prefix
    /// are created on write rather than at parse time.
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        if path.is_empty() {
            return Err(Error::config("Empty local path"));
        }

        let absolute = std::path::absolute(path)
            .map_err(|e| Error::config(format!("Invalid local path {path}: {e}")))?;
        let prefix = absolute
            .to_str()
            .ok_or_else(|| Error::config(format!("Non UTF-8 local path: {path}")))?
            .trim_matches('/')
            .to_string();

        Ok(Self {
            store: Arc::new(LocalFileSystem::new()),
            prefix,
            scheme: "file".to_string(),
            authority: String::new(),
        })
    }

    /// Check if this is a cloud location (not local)
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file"
    }

    /// Get the scheme (s3, r2, gs, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get the base prefix within the bucket
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Path of the base prefix itself
    pub fn base_path(&self) -> ObjectPath {
        ObjectPath::from(self.prefix.as_str())
    }

    /// Path of an object relative to the base prefix
    pub fn child(&self, name: &str) -> ObjectPath {
        let name = name.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(name)
        } else {
            ObjectPath::from(format!("{}/{name}", self.prefix))
        }
    }

    /// Full URL of an object path, for logs and summaries
    pub fn url_of(&self, path: &ObjectPath) -> String {
        format!("{}://{}/{path}", self.scheme, self.authority)
    }

    /// Full URL of the base prefix
    pub fn url(&self) -> String {
        if self.prefix.is_empty() {
            format!("{}://{}/", self.scheme, self.authority)
        } else {
            format!("{}://{}/{}/", self.scheme, self.authority, self.prefix)
        }
    }

    /// Write bytes to an object below the base prefix
    ///
    /// Every put is atomic per object; failures map to `Error::Write`.
    pub async fn put(&self, name: &str, data: Bytes) -> Result<String> {
        let path = self.child(name);
        let url = self.url_of(&path);

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::write(&url, e.to_string()))?;

        Ok(url)
    }

    /// Read a whole object
    pub async fn get(&self, path: &ObjectPath) -> Result<Bytes> {
        let url = self.url_of(path);
        let result = self
            .store
            .get(path)
            .await
            .map_err(|e| Error::from_read(e, &url))?;
        result.bytes().await.map_err(|e| Error::from_read(e, &url))
    }

    /// Resolve the data objects this location points at
    ///
    /// A location naming a single object resolves to that object. Otherwise
    /// every data object under the prefix is returned in lexical order.
    /// An empty prefix is reported as not found.
    pub async fn data_objects(&self) -> Result<Vec<ObjectMeta>> {
        let base = self.base_path();
        let url = self.url();

        if !self.prefix.is_empty() {
            match self.store.head(&base).await {
                Ok(meta) => return Ok(vec![meta]),
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(Error::from_read(e, &url)),
            }
        }

        let mut objects: Vec<ObjectMeta> = self
            .store
            .list(Some(&base))
            .try_collect()
            .await
            .map_err(|e| Error::from_read(e, &url))?;

        objects.retain(|meta| is_data_object(&meta.location));
        objects.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));

        if objects.is_empty() {
            return Err(Error::not_found(format!("no data objects under {url}")));
        }

        tracing::debug!("Resolved {} object(s) under {}", objects.len(), url);
        Ok(objects)
    }
}
