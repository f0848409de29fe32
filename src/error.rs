use std::path::PathBuf;

use russh_sftp::protocol::StatusCode;
use suppaftp::{FtpError, Status};
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Server address is empty")]
    MissingServer,

    #[error("Invalid server address '{0}'")]
    InvalidServer(String),

    #[error("Unknown key exchange algorithm: {0}")]
    UnknownKex(String),

    #[error("Invalid active mode listen address '{0}'")]
    InvalidListenAddr(String),
}

/// Errors returned by every client operation
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("ssh parse private key: {0}")]
    PrivateKey(String),

    #[error("ssh dial: {0}")]
    SshDial(#[source] russh::Error),

    #[error("ssh authentication failed: {0}")]
    Authentication(String),

    #[error("host key verification failed: {0}")]
    HostKey(String),

    #[error("sftp new client: {0}")]
    SftpSession(#[source] russh_sftp::client::error::Error),

    #[error("ftp dial: {0}")]
    FtpDial(#[source] FtpError),

    #[error("tls configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("timeout connecting to {0}")]
    Timeout(String),

    #[error("ssh keepalive: {0}")]
    Keepalive(String),

    #[error("russh error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("sftp: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("ftp: {0}")]
    Ftp(#[from] FtpError),

    #[error("file stats: {0}")]
    FileStats(#[source] Box<Error>),

    #[error("{0}: file does not exist")]
    NotFound(String),

    #[error("syntax error in pattern: {0}")]
    BadPattern(String),

    #[error("{0} not implemented")]
    Unsupported(&'static str),

    #[error("failed to write stream: wrote {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True for "does not exist" conditions from either backend.
    ///
    /// FTPS retrieval failures are normalized into [`Error::NotFound`], while
    /// SFTP status errors are passed through untouched, so both shapes are
    /// recognized here.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::FileStats(inner) => inner.is_not_found(),
            Error::Sftp(russh_sftp::client::error::Error::Status(status)) => {
                matches!(status.status_code, StatusCode::NoSuchFile)
            }
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// True when the failure means the transport itself is gone.
    ///
    /// suppaftp reports a control connection closed by the server as an
    /// unreadable reply, and an idle timeout as a `421` reply.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Error::Keepalive(_) | Error::Ssh(_) | Error::NotConnected | Error::Timeout(_) => true,
            Error::Ftp(FtpError::ConnectionError(_) | FtpError::BadResponse) => true,
            Error::Ftp(FtpError::UnexpectedResponse(reply)) => {
                reply.status == Status::NotAvailable
            }
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
