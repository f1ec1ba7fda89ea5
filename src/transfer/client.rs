//! TransferClient - async storage operations with callback wrappers

use log::{info, warn};
use node_rpc::{NodeClient, NodeClientOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::OnceCell;

use super::types::Liveness;
use super::worker::{download_internal, upload_internal, StagedFile};
use crate::address::StorageAddress;
use crate::completion::CompletionContext;
use crate::config::TransferConfig;
use crate::error::{InitError, TransferError};
use crate::hash::ContentHash;
use crate::pool::{TaskHandle, WorkerPool};

/// Client for one storage node.
///
/// The `*_async` methods do the work. Each callback method runs its async
/// counterpart on the client's worker pool and delivers the single result
/// through the completion context.
#[derive(Clone)]
pub struct TransferClient {
    inner: Arc<Inner>,
    pool: Arc<WorkerPool>,
    completion: Arc<dyn CompletionContext>,
}

impl std::fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferClient")
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}

/// State captured by worker tasks; holds no reference to the pool
struct Inner {
    address: StorageAddress,
    config: TransferConfig,
    node: OnceCell<NodeClient>,
}

impl Inner {
    /// Return the node handle, connecting on first use. Failed attempts leave
    /// the cell empty so the next call tries again.
    async fn connect(&self) -> Result<NodeClient, InitError> {
        self.node
            .get_or_try_init(|| async {
                let options = NodeClientOptions {
                    connect_timeout: self.config.connect_timeout,
                    request_timeout: self.config.request_timeout,
                    read_timeout: self.config.read_timeout,
                };
                let node = NodeClient::new(self.address.rpc_url()?, options)
                    .map_err(|e| InitError::Unreachable(e.to_string()))?;
                match node.refs_local().await {
                    Ok(_) => {
                        info!("transfer_init: {} connected", self.address);
                        Ok(node)
                    }
                    Err(e) => {
                        warn!("transfer_init: {} failed error={}", self.address, e);
                        Err(InitError::from(e))
                    }
                }
            })
            .await
            .cloned()
    }

    /// One `refs/local` round trip: the connect check, or a re-check of a live handle
    async fn init(&self) -> Result<(), InitError> {
        match self.node.get() {
            Some(node) => node.refs_local().await.map(|_| ()).map_err(InitError::from),
            None => self.connect().await.map(|_| ()),
        }
    }

    async fn check_liveness(&self) -> Liveness {
        let timeout = self.config.liveness_timeout;
        match tokio::time::timeout(timeout, self.init()).await {
            Ok(Ok(())) => {
                info!("transfer_liveness: {} online", self.address);
                Liveness::online()
            }
            Ok(Err(e)) => {
                warn!("transfer_liveness: {} offline error={}", self.address, e);
                Liveness::offline(e.to_string())
            }
            Err(_) => {
                warn!("transfer_liveness: {} no reply in {:?}", self.address, timeout);
                Liveness::offline(format!("No response within {}ms", timeout.as_millis()))
            }
        }
    }

    async fn upload<R>(&self, source: R) -> Result<ContentHash, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let node = self.connect().await?;
        upload_internal(&node, source, self.config.spool_dir.as_deref()).await
    }

    async fn download(&self, hash: &str, destination: &Path) -> Result<u64, TransferError> {
        let hash = ContentHash::parse(hash)?;
        // Open the sink before touching the network so a bad destination never leaves a stream open
        let mut sink = StagedFile::create(destination).await?;
        let node = self.connect().await?;
        let written = download_internal(&node, &hash, sink.file_mut()).await?;
        sink.commit()?;
        Ok(written)
    }
}

impl TransferClient {
    /// Build a client with its own worker pool of `config.workers` threads.
    /// Fails only on a malformed address; no connection is made here.
    pub fn new(
        config: TransferConfig,
        completion: Arc<dyn CompletionContext>,
    ) -> Result<Self, InitError> {
        let pool = WorkerPool::new("transfer", config.workers)
            .map_err(|e| InitError::WorkerPool(e.to_string()))?;
        Self::with_pool(config, Arc::new(pool), completion)
    }

    /// Build a client that shares an existing pool
    pub fn with_pool(
        config: TransferConfig,
        pool: Arc<WorkerPool>,
        completion: Arc<dyn CompletionContext>,
    ) -> Result<Self, InitError> {
        let address = StorageAddress::parse(&config.address)?;
        Ok(Self {
            inner: Arc::new(Inner {
                address,
                config,
                node: OnceCell::new(),
            }),
            pool,
            completion,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.node.initialized()
    }

    /// Cancel everything queued or running on this client's pool
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn spawn<T, Fut, F>(
        &self,
        cancelled: T,
        on_done: F,
        operation: impl FnOnce(Arc<Inner>) -> Fut,
    ) -> TaskHandle
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let operation = operation(self.inner.clone());
        self.pool
            .submit(&self.completion, operation, cancelled, on_done)
    }

    pub fn init<F>(&self, on_done: F) -> TaskHandle
    where
        F: FnOnce(Result<(), InitError>) + Send + 'static,
    {
        self.spawn(Err(InitError::Cancelled), on_done, |inner| async move {
            inner.init().await
        })
    }

    pub fn check_liveness<F>(&self, on_done: F) -> TaskHandle
    where
        F: FnOnce(Liveness) + Send + 'static,
    {
        self.spawn(Liveness::offline("Cancelled"), on_done, |inner| async move {
            inner.check_liveness().await
        })
    }

    pub fn upload<R, F>(&self, source: R, on_done: F) -> TaskHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: FnOnce(Result<ContentHash, TransferError>) + Send + 'static,
    {
        self.spawn(Err(TransferError::Cancelled), on_done, |inner| async move {
            inner.upload(source).await
        })
    }

    pub fn download<F>(
        &self,
        hash: impl Into<String>,
        destination: impl Into<PathBuf>,
        on_done: F,
    ) -> TaskHandle
    where
        F: FnOnce(Result<u64, TransferError>) + Send + 'static,
    {
        let hash = hash.into();
        let destination = destination.into();
        self.spawn(Err(TransferError::Cancelled), on_done, |inner| async move {
            inner.download(&hash, &destination).await
        })
    }

    /// Connect if needed, otherwise re-verify the node still answers
    pub async fn init_async(&self) -> Result<(), InitError> {
        self.inner.init().await
    }

    /// Always resolves; failures and timeouts come back as `online: false`
    pub async fn check_liveness_async(&self) -> Liveness {
        self.inner.check_liveness().await
    }

    /// Spool `source` to a temp file and add it to the node as one object
    pub async fn upload_async<R>(&self, source: R) -> Result<ContentHash, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        self.inner.upload(source).await
    }

    /// Stream `hash` into `destination`, returning the byte count. The file is
    /// staged beside `destination` and only replaces it once complete.
    pub async fn download_async(
        &self,
        hash: &str,
        destination: impl AsRef<Path>,
    ) -> Result<u64, TransferError> {
        self.inner.download(hash, destination.as_ref()).await
    }
}
