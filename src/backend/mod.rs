//! Protocol adapters behind one capability set
//!
//! A [`Backend`] is either an SFTP session or an FTPS control connection. The
//! kind is fixed by [`ConnectionConfig::tls`] when the client is built and
//! never changes afterwards.

pub mod ftp;
pub mod sftp;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::config::ConnectionConfig;
use crate::connection::{Connector, Session};
use crate::error::{Error, Result};

pub use ftp::FtpBackend;
pub use sftp::SftpBackend;

/// Bidirectional, seekable remote file handle
pub type RemoteFile = russh_sftp::client::fs::File;

/// Readable remote content returned by downloads
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sftp,
    Ftps,
}

impl BackendKind {
    pub fn for_config(config: &ConnectionConfig) -> Self {
        if config.tls {
            BackendKind::Ftps
        } else {
            BackendKind::Sftp
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sftp => "sftp",
            BackendKind::Ftps => "ftps",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File metadata as reported by the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub size: u64,
    /// Unix permission bits, when the protocol reports them
    pub permissions: Option<u32>,
    pub modified: Option<DateTime<Utc>>,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// The live connection of one client
pub enum Backend {
    Sftp(SftpBackend),
    Ftp(FtpBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sftp(_) => BackendKind::Sftp,
            Backend::Ftp(_) => BackendKind::Ftps,
        }
    }

    pub async fn create(&mut self, path: &str) -> Result<RemoteFile> {
        match self {
            Backend::Sftp(sftp) => sftp.create(path).await,
            Backend::Ftp(_) => Err(Error::Unsupported("create")),
        }
    }

    pub async fn remove(&mut self, path: &str) -> Result<()> {
        match self {
            Backend::Sftp(sftp) => sftp.remove(path).await,
            Backend::Ftp(ftp) => ftp.remove(path).await,
        }
    }

    pub async fn glob(&mut self, pattern: &str) -> Result<Vec<String>> {
        match self {
            Backend::Sftp(sftp) => sftp.glob(pattern).await,
            Backend::Ftp(ftp) => ftp.glob(pattern).await,
        }
    }

    pub async fn open(&mut self, path: &str) -> Result<RemoteReader> {
        match self {
            Backend::Sftp(sftp) => Ok(Box::new(sftp.open(path).await?)),
            Backend::Ftp(ftp) => Ok(Box::new(std::io::Cursor::new(ftp.download(path).await?))),
        }
    }

    pub async fn stat(&mut self, path: &str) -> Result<RemoteMetadata> {
        let result = match self {
            Backend::Sftp(sftp) => sftp.stat(path).await,
            Backend::Ftp(ftp) => ftp.stat(path).await,
        };
        result.map_err(|e| Error::FileStats(Box::new(e)))
    }

    pub async fn store<R>(&mut self, path: &str, source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        match self {
            Backend::Sftp(sftp) => sftp.store(path, source).await,
            Backend::Ftp(ftp) => ftp.store(path, source).await,
        }
    }
}

impl Session for Backend {
    fn manages_reconnects(&self) -> bool {
        matches!(self, Backend::Ftp(_))
    }

    async fn keepalive(&mut self) -> Result<()> {
        match self {
            Backend::Sftp(sftp) => sftp.keepalive().await,
            // FTPS redials inside each command instead
            Backend::Ftp(_) => Ok(()),
        }
    }

    async fn close(self) {
        match self {
            Backend::Sftp(sftp) => sftp.close().await,
            Backend::Ftp(ftp) => ftp.close().await,
        }
    }
}

/// Dials the backend selected by the configuration
pub struct BackendConnector {
    config: Arc<ConnectionConfig>,
}

impl BackendConnector {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self { config }
    }

    pub fn kind(&self) -> BackendKind {
        BackendKind::for_config(&self.config)
    }
}

impl Connector for BackendConnector {
    type Session = Backend;

    async fn connect(&self) -> Result<Backend> {
        match self.kind() {
            BackendKind::Sftp => Ok(Backend::Sftp(SftpBackend::connect(&self.config).await?)),
            BackendKind::Ftps => Ok(Backend::Ftp(FtpBackend::connect(self.config.clone()).await?)),
        }
    }
}

/// Run `fut` under the configured dial deadline, if there is one.
pub(crate) async fn within_deadline<F>(deadline: Option<Duration>, endpoint: &str, fut: F) -> Result<F::Output>
where
    F: Future,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(endpoint.to_string())),
        None => Ok(fut.await),
    }
}

/// `host:port`, bracketing IPv6 literals
pub(crate) fn endpoint_label(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
