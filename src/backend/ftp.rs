//! Explicit FTPS backend
//!
//! suppaftp is a blocking client, so every command runs on the blocking
//! thread pool against a control stream shared through a mutex. A command
//! that fails because the control connection is gone (hang-up, reset or a
//! `421` reply) drops the stream; the next command dials a fresh one.

use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use suppaftp::list::File;
use suppaftp::types::FileType;
use suppaftp::{FtpError, RustlsConnector, RustlsFtpStream, Status};
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tokio_util::io::SyncIoBridge;

use crate::backend::{RemoteMetadata, endpoint_label};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::glob;
use crate::security_log;
use crate::spool;

/// Server reply text that marks a retrieval of a missing file
const MISSING_FILE_REPLY: &str = "Failed to open file";

/// Everything needed to (re)dial the control connection
struct Dialer {
    config: Arc<ConnectionConfig>,
    tls: Arc<rustls::ClientConfig>,
    host: String,
    port: u16,
}

impl Dialer {
    fn endpoint(&self) -> String {
        endpoint_label(&self.host, self.port)
    }

    fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::FtpDial(FtpError::ConnectionError(e)))?
            .next()
            .ok_or_else(|| {
                Error::FtpDial(FtpError::ConnectionError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address for {}", self.endpoint()),
                )))
            })
    }

    /// TCP connect, `AUTH TLS`, login and binary mode. Blocking.
    fn dial(&self) -> Result<RustlsFtpStream> {
        let config = &self.config;
        let deadline = config.deadline();
        let addr = self.resolve()?;

        let stream = match deadline {
            Some(limit) => RustlsFtpStream::connect_timeout(addr, limit),
            None => RustlsFtpStream::connect(addr),
        }
        .map_err(|e| match e {
            FtpError::ConnectionError(ref io) if io.kind() == std::io::ErrorKind::TimedOut => {
                Error::Timeout(self.endpoint())
            }
            other => Error::FtpDial(other),
        })?;

        // the deadline covers the TLS handshake and login, not transfers
        stream
            .get_ref()
            .set_read_timeout(deadline)
            .map_err(|e| Error::FtpDial(FtpError::ConnectionError(e)))?;

        if config.insecure {
            security_log::log_tls_unverified(&self.host, self.port);
        }
        let mut stream = stream
            .into_secure(RustlsConnector::from(self.tls.clone()), &self.host)
            .map_err(Error::FtpDial)?;

        if config.active_transfers {
            if let Some(listen) = &config.active_listen_addr {
                tracing::debug!(
                    "Active mode requested on {}; data listener follows the control connection address",
                    listen
                );
            }
            stream = stream.active_mode(deadline.unwrap_or(std::time::Duration::from_secs(30)));
        }

        let password = config
            .password
            .as_ref()
            .map(|p| p.expose_secret())
            .unwrap_or_default();
        security_log::log_auth_attempt(&self.host, self.port, &config.username, "password");
        if let Err(e) = stream.login(config.username.as_str(), password) {
            let reason = e.to_string();
            security_log::log_auth_failure(&self.host, self.port, &config.username, "password", &reason);
            return Err(Error::Authentication(reason));
        }
        security_log::log_auth_success(&self.host, self.port, &config.username, "password");

        stream
            .transfer_type(FileType::Binary)
            .map_err(Error::FtpDial)?;
        stream
            .get_ref()
            .set_read_timeout(None)
            .map_err(|e| Error::FtpDial(FtpError::ConnectionError(e)))?;

        security_log::log_ftps_connect(&self.host, self.port, &config.username);
        Ok(stream)
    }
}

/// FTPS control connection that redials on its own after connection loss
pub struct FtpBackend {
    stream: Arc<Mutex<Option<RustlsFtpStream>>>,
    dialer: Arc<Dialer>,
    spool_dir: Option<PathBuf>,
}

impl FtpBackend {
    pub async fn connect(config: Arc<ConnectionConfig>) -> Result<Self> {
        let (host, port) = config.endpoint()?;
        let tls = crate::tls::client_config(config.insecure)?;
        let backend = Self {
            stream: Arc::new(Mutex::new(None)),
            spool_dir: config.spool_dir.clone(),
            dialer: Arc::new(Dialer {
                config,
                tls,
                host,
                port,
            }),
        };

        // dial eagerly so the first failure surfaces here
        backend.run(|_| Ok(())).await?;
        Ok(backend)
    }

    /// Run a blocking command against the control stream, dialing first when
    /// there is none.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut RustlsFtpStream) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let stream = self.stream.clone();
        let dialer = self.dialer.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = stream.blocking_lock();
            run_on(
                &mut *guard,
                || {
                    tracing::debug!("Dialing FTPS control connection to {}", dialer.endpoint());
                    dialer.dial()
                },
                op,
            )
        })
        .await?
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |ftp| Ok(ftp.rm(&path)?)).await
    }

    /// Match `pattern` against a name listing of its directory part.
    pub async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let (dir, file) = glob::split(pattern);
        glob::Pattern::new(file)?;

        let dir = dir.to_string();
        let names = self.run(move |ftp| Ok(ftp.nlst(Some(dir.as_str()))?)).await?;
        glob::filter_listing(pattern, names)
    }

    /// Metadata from `MLST`, or from `SIZE` and `MDTM` when the server
    /// refuses `MLST` or answers with facts that cannot be parsed.
    pub async fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        let path = path.to_string();
        self.run(move |ftp| {
            match ftp.mlst(Some(path.as_str())) {
                Ok(facts) => match metadata_from_facts(&facts) {
                    Some(metadata) => return Ok(metadata),
                    None => tracing::debug!("Unusable MLST facts for {}: {}", path, facts),
                },
                Err(FtpError::UnexpectedResponse(reply)) if reply.status != Status::NotAvailable => {
                    tracing::debug!("MLST {} refused with {}", path, reply.status.code());
                }
                Err(e) => return Err(e.into()),
            }

            let size = ftp.size(&path)?;
            let modified: DateTime<Utc> = ftp.mdtm(&path)?.and_utc();
            Ok(RemoteMetadata {
                size: size as u64,
                permissions: None,
                modified: Some(modified),
                is_dir: false,
                is_symlink: false,
            })
        })
        .await
    }

    /// `STOR` fed directly from `source`
    pub async fn store<R>(&self, path: &str, source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let path = path.to_string();
        let mut reader = SyncIoBridge::new(source);
        self.run(move |ftp| Ok(ftp.put_file(&path, &mut reader)?))
            .await
    }

    /// `RETR` into a spool file, returned as an in-memory buffer.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let path = path.to_string();
        let spool_dir = self.spool_dir.clone();
        self.run(move |ftp| {
            spool::spool_to_memory(spool_dir.as_deref(), |file| {
                ftp.retr(&path, |remote| {
                    std::io::copy(remote, file).map_err(FtpError::ConnectionError)?;
                    file.flush().map_err(FtpError::ConnectionError)
                })
            })
            .map_err(|e| not_found_for(&path, e))
        })
        .await
    }

    /// Send `QUIT` if a control connection is open. Errors are logged only.
    pub async fn close(self) {
        let Some(mut ftp) = self.stream.lock().await.take() else {
            return;
        };
        let (host, port) = (self.dialer.host.clone(), self.dialer.port);
        match tokio::task::spawn_blocking(move || ftp.quit()).await {
            Ok(Err(e)) => tracing::debug!("FTP quit: {}", e),
            Err(e) => tracing::debug!("FTP quit task: {}", e),
            Ok(Ok(())) => {}
        }
        security_log::log_disconnect(&host, port, "ftps");
    }
}

/// Run `op` against the stream in `slot`, dialing first when it is empty.
///
/// A failure that means the control connection is gone empties the slot, so
/// the next call dials again. Any other failure keeps the stream.
fn run_on<S, T>(
    slot: &mut Option<S>,
    dial: impl FnOnce() -> Result<S>,
    op: impl FnOnce(&mut S) -> Result<T>,
) -> Result<T> {
    if slot.is_none() {
        *slot = Some(dial()?);
    }
    let stream = slot.as_mut().ok_or(Error::NotConnected)?;

    let result = op(stream);
    if let Err(e) = &result {
        if e.is_connection_lost() {
            tracing::info!("FTPS connection lost ({}), will redial", e);
            *slot = None;
        }
    }
    result
}

/// Build metadata from an `MLST` fact line such as
/// `type=file;size=42;modify=20240101120000;UNIX.mode=0644; name`.
///
/// The mode fact is read here since servers send it with or without a
/// leading zero. `None` when the remaining facts do not parse.
fn metadata_from_facts(facts: &str) -> Option<RemoteMetadata> {
    let mut permissions = None;
    let mut has_modify = false;
    let mut rest = Vec::new();
    for fact in facts.split(';') {
        match fact.split_once('=') {
            Some((key, mode)) if key.eq_ignore_ascii_case("unix.mode") => {
                permissions = u32::from_str_radix(mode, 8).ok();
            }
            Some((key, _)) => {
                has_modify |= key.eq_ignore_ascii_case("modify");
                rest.push(fact);
            }
            None => rest.push(fact),
        }
    }

    let entry = File::from_mlsx_line(&rest.join(";")).ok()?;
    Some(RemoteMetadata {
        size: entry.size() as u64,
        permissions,
        modified: has_modify.then(|| DateTime::<Utc>::from(entry.modified())),
        is_dir: entry.is_directory(),
        is_symlink: entry.is_symlink(),
    })
}

/// Normalize a failed retrieval of a missing file into [`Error::NotFound`].
fn not_found_for(path: &str, err: Error) -> Error {
    match err {
        Error::Ftp(ref e) if e.to_string().contains(MISSING_FILE_REPLY) => {
            Error::NotFound(path.to_string())
        }
        other => other,
    }
}
