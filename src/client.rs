//! The unified client
//!
//! Every operation first asks the connection manager for a usable session,
//! so a connection that dropped between two calls is re-established before
//! the next one runs.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::backend::{BackendConnector, BackendKind, RemoteFile, RemoteMetadata, RemoteReader};
use crate::config::ConnectionConfig;
use crate::connection::ConnectionManager;
use crate::error::{Error, Result};
use crate::transfer::{self, FullWrites};

/// Remote file client over SFTP or FTPS, picked by [`ConnectionConfig::tls`]
pub struct Client {
    config: Arc<ConnectionConfig>,
    connection: ConnectionManager<BackendConnector>,
}

impl Client {
    /// Validate `config` and connect right away.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let mut client = Self::lazy(config)?;
        client.connection.ensure_connected().await?;
        Ok(client)
    }

    /// Validate `config`; the first operation connects.
    pub fn lazy(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        tracing::debug!(
            "Client for {} over {}",
            config.server,
            BackendKind::for_config(&config)
        );
        Ok(Self {
            connection: ConnectionManager::new(BackendConnector::new(config.clone())),
            config,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.connection.connector().kind()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Create or truncate a remote file and return a read/write/seek handle.
    ///
    /// FTPS has no random-access handle; this fails without any network I/O.
    pub async fn create(&mut self, path: &str) -> Result<RemoteFile> {
        if self.backend_kind() == BackendKind::Ftps {
            return Err(Error::Unsupported("create"));
        }
        self.connection.ensure_connected().await?.create(path).await
    }

    /// Remove a file; over SFTP an empty directory is removed too.
    pub async fn remove(&mut self, path: &str) -> Result<()> {
        self.connection.ensure_connected().await?.remove(path).await
    }

    /// Expand a shell pattern into matching remote paths.
    pub async fn glob(&mut self, pattern: &str) -> Result<Vec<String>> {
        self.connection.ensure_connected().await?.glob(pattern).await
    }

    /// Store everything `source` yields at `path`, returning the byte count.
    pub async fn upload_file<R>(&mut self, path: &str, source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let stored = self
            .connection
            .ensure_connected()
            .await?
            .store(path, source)
            .await?;
        tracing::debug!("Uploaded {} bytes to {}", stored, path);
        Ok(stored)
    }

    /// Copy `source` into an already open destination, normally a
    /// [`RemoteFile`] from [`Client::create`], in `chunk_size` pieces.
    ///
    /// FTPS has no writable handle; this fails without any network I/O.
    pub async fn upload<R, W>(&mut self, source: &mut R, destination: &mut W, chunk_size: usize) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.backend_kind() == BackendKind::Ftps {
            return Err(Error::Unsupported("upload with writer"));
        }
        self.connection.ensure_connected().await?;
        transfer::copy_chunked(source, &mut FullWrites::new(destination), chunk_size).await
    }

    /// Open `path` for reading.
    ///
    /// Over FTPS the file is fetched in full before this returns.
    pub async fn download(&mut self, path: &str) -> Result<RemoteReader> {
        self.connection.ensure_connected().await?.open(path).await
    }

    /// Metadata for `path`; a failed stat is wrapped in [`Error::FileStats`].
    pub async fn info(&mut self, path: &str) -> Result<RemoteMetadata> {
        self.connection.ensure_connected().await?.stat(path).await
    }

    /// Release the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        self.connection.close().await;
    }
}
