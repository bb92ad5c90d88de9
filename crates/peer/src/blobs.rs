use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use iroh::{Endpoint, NodeId};
use iroh_blobs::{
    api::{
        blobs::{BlobStatus, Blobs},
        downloader::{Downloader, Shuffled},
        RequestError,
    },
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

/// Client over a local iroh-blobs store.
///  Exposes an iroh-blobs peer over the endpoint;
///  the router must handle the iroh-blobs ALPN.
#[derive(Clone, Debug)]
pub struct BlobsStore {
    pub inner: Arc<BlobsProtocol>,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobsStoreError {
    #[error("blobs store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("blob store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
}

impl BlobsStore {
    /// In-memory store. Disposable; everything is gone when the node
    /// is released.
    pub async fn memory() -> Result<Self, BlobsStoreError> {
        let store = MemStore::new();
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Filesystem-backed store at the given path.
    pub async fn fs(path: &Path) -> Result<Self, BlobsStoreError> {
        let store = FsStore::load(path).await?;
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Handle to the underlying blobs client against the store
    pub fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    /// Store a vec of bytes as a blob
    pub async fn put(&self, data: Vec<u8>) -> Result<Hash, BlobsStoreError> {
        let hash = self.blobs().add_bytes(data).into_future().await?.hash;
        Ok(hash)
    }

    /// Get a blob as bytes
    pub async fn get(&self, hash: &Hash) -> Result<Bytes, BlobsStoreError> {
        let bytes = self
            .blobs()
            .get_bytes(*hash)
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(bytes)
    }

    /// Whether the blob is fully present locally
    pub async fn stat(&self, hash: &Hash) -> Result<bool, BlobsStoreError> {
        let status = self
            .blobs()
            .status(*hash)
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(matches!(status, BlobStatus::Complete { .. }))
    }

    /// Download a single hash from candidate providers.
    ///
    /// Checks the local store first, downloads with Shuffled content
    /// discovery otherwise, and verifies the blob actually landed.
    pub async fn download(
        &self,
        hash: Hash,
        providers: Vec<NodeId>,
        endpoint: &Endpoint,
    ) -> Result<(), BlobsStoreError> {
        if self.stat(&hash).await? {
            tracing::debug!("hash {} already present locally", hash);
            return Ok(());
        }

        tracing::debug!(
            "downloading hash {} from {} candidate providers",
            hash,
            providers.len()
        );

        let downloader = Downloader::new(self.inner.store(), endpoint);
        let discovery = Shuffled::new(providers);
        downloader
            .download(hash, discovery)
            .await
            .map_err(|e| BlobsStoreError::Default(anyhow!("download of {} failed: {}", hash, e)))?;

        // a download that "succeeded" without producing the blob is
        // still a failure
        if !self.stat(&hash).await? {
            return Err(anyhow!("hash {} not found after download", hash).into());
        }

        Ok(())
    }
}
