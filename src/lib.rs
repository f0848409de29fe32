//! remote-transfer library
//!
//! One client for pushing and pulling files over SFTP or explicit FTPS. The
//! connection is checked before every operation and re-established when it
//! has dropped.

// Public modules
pub mod backend;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod glob;
pub mod logging;
pub mod transfer;

// Internal modules
pub(crate) mod security_log;
pub(crate) mod spool;
pub(crate) mod ssh;
pub(crate) mod tls;

pub use backend::{BackendKind, RemoteFile, RemoteMetadata, RemoteReader};
pub use client::Client;
pub use config::ConnectionConfig;
pub use error::{ConfigError, Error, Result};
