//! SFTP over SSH backend

use std::time::Duration;

use chrono::{TimeZone, Utc};
use russh::Disconnect;
use russh::client::{self, Handle};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::backend::{RemoteFile, RemoteMetadata, endpoint_label, within_deadline};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::glob::{self, Pattern};
use crate::security_log;
use crate::ssh::{self, ClientHandler, ResolvedAuth};
use crate::transfer::{self, FullWrites, UPLOAD_CHUNK_SIZE};

/// How long a keep-alive waits for the peer when no deadline is configured
const PING_TIMEOUT: Duration = Duration::from_secs(15);

/// An authenticated SSH transport together with its SFTP session
pub struct SftpBackend {
    handle: Handle<ClientHandler>,
    sftp: SftpSession,
    host: String,
    port: u16,
    ping_timeout: Duration,
}

impl std::fmt::Debug for SftpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpBackend")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl SftpBackend {
    /// Dial, verify the host key, authenticate and open the `sftp` subsystem.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let (host, port) = config.endpoint()?;
        let ssh_config = ssh::client_config(config)?;
        // a broken key fails this attempt before anything touches the network
        let auth = ResolvedAuth::resolve(config)?;
        let endpoint = endpoint_label(&host, port);

        let stream = within_deadline(
            config.deadline(),
            &endpoint,
            TcpStream::connect((host.as_str(), port)),
        )
        .await?
        .map_err(|e| Error::SshDial(russh::Error::IO(e)))?;

        within_deadline(config.deadline(), &endpoint, async {
            let handler = ClientHandler::new(host.clone(), port, ssh::host_key_policy(config));
            let mut handle = client::connect_stream(ssh_config, stream, handler)
                .await
                .map_err(|e| match e {
                    Error::Ssh(e) => Error::SshDial(e),
                    other => other,
                })?;

            authenticate(&mut handle, &config.username, auth, &host, port).await?;

            let channel = handle.channel_open_session().await?;
            channel.request_subsystem(true, "sftp").await?;
            let sftp = SftpSession::new(channel.into_stream())
                .await
                .map_err(Error::SftpSession)?;

            security_log::log_sftp_connect(&host, port, &config.username);

            Ok::<Self, Error>(Self {
                handle,
                sftp,
                host: host.clone(),
                port,
                ping_timeout: config.deadline().unwrap_or(PING_TIMEOUT),
            })
        })
        .await?
    }

    /// Round-trip a keep-alive request; succeeds only once the peer answered.
    pub async fn keepalive(&mut self) -> Result<()> {
        if self.handle.is_closed() {
            return Err(Error::Keepalive("transport closed".to_string()));
        }
        tokio::time::timeout(self.ping_timeout, self.handle.send_ping())
            .await
            .map_err(|_| Error::Keepalive("no reply from peer".to_string()))?
            .map_err(|e| Error::Keepalive(e.to_string()))?;
        // the reply channel is also released when the session task exits
        if self.handle.is_closed() {
            return Err(Error::Keepalive("transport closed".to_string()));
        }
        Ok(())
    }

    /// Create or truncate `path` for reading and writing.
    pub async fn create(&self, path: &str) -> Result<RemoteFile> {
        let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE | OpenFlags::READ;
        Ok(self.sftp.open_with_flags(path, flags).await?)
    }

    pub async fn open(&self, path: &str) -> Result<RemoteFile> {
        Ok(self.sftp.open(path).await?)
    }

    /// Remove a file, or an empty directory when file removal fails.
    pub async fn remove(&self, path: &str) -> Result<()> {
        let file_err = match self.sftp.remove_file(path).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        match self.sftp.remove_dir(path).await {
            Ok(()) => Ok(()),
            Err(dir_err) => {
                tracing::debug!("Directory removal of {} also failed: {}", path, dir_err);
                Err(file_err.into())
            }
        }
    }

    /// Metadata of `path` itself, without following a final symlink
    pub async fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        let metadata = self.sftp.symlink_metadata(path).await?;
        Ok(RemoteMetadata {
            size: metadata.size.unwrap_or(0),
            permissions: metadata.permissions,
            modified: metadata
                .mtime
                .and_then(|mtime| Utc.timestamp_opt(mtime as i64, 0).single()),
            is_dir: metadata.is_dir(),
            is_symlink: metadata.is_symlink(),
        })
    }

    /// Expand `pattern` one path component at a time.
    ///
    /// Entries are sorted within each directory. Missing or non-directory
    /// intermediates match nothing, while listing failures are returned.
    pub async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        // reject malformed components before the first round trip
        for component in pattern.split('/').filter(|c| glob::has_meta(c)) {
            Pattern::new(component)?;
        }

        if !glob::has_meta(pattern) {
            return Ok(self.existing(pattern).await?.into_iter().collect());
        }

        let mut candidates = vec![if pattern.starts_with('/') {
            "/".to_string()
        } else {
            String::new()
        }];
        let mut last_literal = false;

        for component in pattern.split('/').filter(|c| !c.is_empty()) {
            last_literal = !glob::has_meta(component);
            if last_literal {
                for candidate in candidates.iter_mut() {
                    *candidate = child_path(candidate, component);
                }
                continue;
            }

            let component_pattern = Pattern::new(component)?;
            let mut next = Vec::new();
            for candidate in &candidates {
                next.extend(self.match_in_dir(candidate, &component_pattern).await?);
            }
            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }

        if !last_literal {
            return Ok(candidates);
        }
        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            matches.extend(self.existing(&candidate).await?);
        }
        Ok(matches)
    }

    /// `Some(path)` when `path` exists
    async fn existing(&self, path: &str) -> Result<Option<String>> {
        match self.sftp.symlink_metadata(path).await {
            Ok(_) => Ok(Some(path.to_string())),
            Err(e) => {
                let err = Error::from(e);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn match_in_dir(&self, dir: &str, pattern: &Pattern) -> Result<Vec<String>> {
        let listed = if dir.is_empty() { "." } else { dir };
        match self.sftp.metadata(listed).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) => {
                let err = Error::from(e);
                return if err.is_not_found() { Ok(Vec::new()) } else { Err(err) };
            }
        }

        let mut names: Vec<String> = self
            .sftp
            .read_dir(listed)
            .await?
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .filter(|name| pattern.matches(name))
            .map(|name| child_path(dir, &name))
            .collect())
    }

    /// Create `path` and copy `source` into it in fixed-size chunks.
    pub async fn store<R>(&self, path: &str, mut source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut file = FullWrites::new(self.create(path).await?);
        let copied = transfer::copy_chunked(&mut source, &mut file, UPLOAD_CHUNK_SIZE).await?;
        file.shutdown().await?;
        Ok(copied)
    }

    /// Close the SFTP session, then the SSH transport. Errors are logged only.
    pub async fn close(self) {
        if let Err(e) = self.sftp.close().await {
            tracing::debug!("SFTP session close: {}", e);
        }
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
        {
            tracing::debug!("SSH disconnect: {}", e);
        }
        security_log::log_disconnect(&self.host, self.port, "sftp");
    }
}

/// Append `name` to a glob candidate; the empty candidate is the working directory.
fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    auth: ResolvedAuth,
    host: &str,
    port: u16,
) -> Result<()> {
    let method = auth.method_name();
    security_log::log_auth_attempt(host, port, username, method);

    let result = match auth {
        ResolvedAuth::Password(password) => {
            handle
                .authenticate_password(username, password.expose_secret())
                .await
        }
        ResolvedAuth::PublicKey(key) => handle.authenticate_publickey(username, key).await,
    };

    match result {
        Ok(result) if result.success() => {
            security_log::log_auth_success(host, port, username, method);
            Ok(())
        }
        Ok(_) => {
            let reason = "Authentication rejected by server";
            security_log::log_auth_failure(host, port, username, method, reason);
            Err(Error::Authentication(reason.to_string()))
        }
        Err(e) => {
            let reason = e.to_string();
            security_log::log_auth_failure(host, port, username, method, &reason);
            Err(Error::Authentication(reason))
        }
    }
}
