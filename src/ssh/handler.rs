use std::future::Future;
use std::path::PathBuf;

use russh::client::Handler;
use russh::keys::{HashAlg, PublicKey};

use crate::error::Error;
use crate::security_log;

/// How the server's host key is checked during the handshake
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    /// Accept every host key. Only reachable through `insecure = true`.
    AcceptAny,
    /// Require the key to be listed in a known_hosts file
    KnownHosts(Option<PathBuf>),
}

/// SSH client handler implementation
pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self { host, port, policy }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let host = self.host.clone();
        let port = self.port;
        let policy = self.policy.clone();
        let key = server_public_key.clone();

        async move {
            let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();

            let known_path = match policy {
                HostKeyPolicy::AcceptAny => {
                    security_log::log_host_key_unverified(&host, port, &fingerprint);
                    return Ok(true);
                }
                HostKeyPolicy::KnownHosts(path) => path,
            };

            let status = tokio::task::spawn_blocking({
                let host = host.clone();
                move || match known_path {
                    Some(path) => russh::keys::check_known_hosts_path(&host, port, &key, path),
                    None => russh::keys::check_known_hosts(&host, port, &key),
                }
            })
            .await
            .map_err(|e| Error::HostKey(format!("Host key check failed: {}", e)))?;

            match status {
                Ok(true) => {
                    tracing::debug!("Host key verified for {}:{}", host, port);
                    Ok(true)
                }
                Ok(false) => {
                    security_log::log_host_key_rejected(&host, port, &fingerprint, "unknown host");
                    Err(Error::HostKey(format!(
                        "{}:{} is not in known_hosts ({})",
                        host, port, fingerprint
                    )))
                }
                Err(e) => {
                    security_log::log_host_key_rejected(&host, port, &fingerprint, &e.to_string());
                    Err(Error::HostKey(e.to_string()))
                }
            }
        }
    }
}
