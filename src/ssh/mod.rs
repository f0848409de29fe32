//! SSH transport setup shared by the SFTP backend
//!
//! Provides authentication resolution, host key checking and the russh
//! client configuration.

pub mod auth;
pub mod handler;

use std::borrow::Cow;
use std::sync::Arc;

use russh::client::Config;
use russh::{Preferred, kex};

use crate::config::ConnectionConfig;
use crate::error::ConfigError;

pub use auth::ResolvedAuth;
pub use handler::{ClientHandler, HostKeyPolicy};

/// Map configured key exchange names onto russh algorithm names.
pub fn preferred_kex(names: &[String]) -> Result<Vec<kex::Name>, ConfigError> {
    names
        .iter()
        .map(|name| {
            kex::Name::try_from(name.as_str()).map_err(|_| ConfigError::UnknownKex(name.clone()))
        })
        .collect()
}

/// Build the russh client configuration for `config`.
///
/// Liveness is checked explicitly before every operation, so the library's
/// own keepalive timer stays off.
pub fn client_config(config: &ConnectionConfig) -> Result<Arc<Config>, ConfigError> {
    let kex = preferred_kex(&config.key_exchanges)?;
    let preferred = if kex.is_empty() {
        Preferred::default()
    } else {
        Preferred {
            kex: Cow::Owned(kex),
            ..Preferred::default()
        }
    };

    Ok(Arc::new(Config {
        preferred,
        inactivity_timeout: None,
        keepalive_interval: None,
        ..Default::default()
    }))
}

pub fn host_key_policy(config: &ConnectionConfig) -> HostKeyPolicy {
    if config.insecure {
        HostKeyPolicy::AcceptAny
    } else {
        HostKeyPolicy::KnownHosts(config.known_hosts_path.clone())
    }
}
