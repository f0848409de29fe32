//! Connection parameters for a [`Client`](crate::Client).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Default SSH port when the server address carries none
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default FTP control port when the server address carries none
pub const DEFAULT_FTP_PORT: u16 = 21;

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Parameters for one remote endpoint.
///
/// `tls` picks the backend once and for all: FTPS when set, SFTP otherwise.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub username: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    /// PEM encoded private key material (SSH only)
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub private_key: Option<SecretString>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub private_key_passphrase: Option<SecretString>,
    /// `host`, `host:port` or `[v6addr]:port`
    pub server: String,
    /// SSH key exchange preferences; empty keeps the library defaults
    #[serde(default)]
    pub key_exchanges: Vec<String>,
    #[serde(default)]
    pub tls: bool,
    /// Dial and handshake deadline, zero disables it
    #[serde(default = "default_timeout", rename = "timeout_secs", deserialize_with = "deserialize_secs")]
    pub timeout: Duration,
    /// FTP active mode data connections
    #[serde(default)]
    pub active_transfers: bool,
    #[serde(default)]
    pub active_listen_addr: Option<String>,
    /// Accept any SSH host key and any TLS certificate
    #[serde(default)]
    pub insecure: bool,
    /// known_hosts file used to verify SSH host keys, `~/.ssh/known_hosts` when unset
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
    /// Directory for the FTPS download spool file, system temp dir when unset
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: None,
            private_key: None,
            private_key_passphrase: None,
            server: String::new(),
            key_exchanges: Vec::new(),
            tls: false,
            timeout: default_timeout(),
            active_transfers: false,
            active_listen_addr: None,
            insecure: false,
            known_hosts_path: None,
            spool_dir: None,
        }
    }
}

impl ConnectionConfig {
    pub fn new(server: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;
        if !self.tls {
            crate::ssh::preferred_kex(&self.key_exchanges)?;
        }
        if let Some(addr) = &self.active_listen_addr {
            addr.parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidListenAddr(addr.clone()))?;
        }
        Ok(())
    }

    /// Host and port to dial, with the backend's default port filled in.
    pub fn endpoint(&self) -> Result<(String, u16), ConfigError> {
        let default_port = if self.tls {
            DEFAULT_FTP_PORT
        } else {
            DEFAULT_SSH_PORT
        };
        split_host_port(&self.server, default_port)
    }

    /// `None` when the configured timeout is zero
    pub fn deadline(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }
}

/// Split `server` into host and port, using `default_port` when absent.
pub fn split_host_port(server: &str, default_port: u16) -> Result<(String, u16), ConfigError> {
    let server = server.trim();
    if server.is_empty() {
        return Err(ConfigError::MissingServer);
    }

    let parse_port = |port: &str| {
        port.parse::<u16>()
            .map_err(|_| ConfigError::InvalidServer(server.to_string()))
    };

    if let Some(rest) = server.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| ConfigError::InvalidServer(server.to_string()))?;
        let port = match tail {
            "" => default_port,
            tail => match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None => return Err(ConfigError::InvalidServer(server.to_string())),
            },
        };
        return Ok((host.to_string(), port));
    }

    match server.matches(':').count() {
        0 => Ok((server.to_string(), default_port)),
        1 => {
            let (host, port) = server
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidServer(server.to_string()))?;
            if host.is_empty() {
                return Err(ConfigError::InvalidServer(server.to_string()));
            }
            Ok((host.to_string(), parse_port(port)?))
        }
        // bare IPv6 literal
        _ => Ok((server.to_string(), default_port)),
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(SecretString::from))
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
