//! Security event logging for audit trails.
//!
//! Provides structured logging functions for security-relevant events such as
//! authentication attempts, connection establishment, and host identity
//! checks.
//!
//! All security events are logged with `target: "security"` to allow filtering
//! in production environments.
//!
//! # Example
//!
//! Filter security events only:
//! ```bash
//! RUST_LOG=security=info rxfer config.toml ls '/srv/*.conf'
//! ```

use tracing::{info, warn};

/// Log an SSH authentication attempt.
///
/// Called before attempting to authenticate with a remote host.
pub fn log_auth_attempt(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_attempt",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication attempt"
    );
}

/// Log a successful SSH authentication.
pub fn log_auth_success(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_success",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication succeeded"
    );
}

/// Log a failed authentication attempt.
pub fn log_auth_failure(host: &str, port: u16, username: &str, method: &str, reason: &str) {
    warn!(
        target: "security",
        event = "auth_failure",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        reason = %reason,
        "Authentication failed"
    );
}

/// Log an SFTP connection establishment.
pub fn log_sftp_connect(host: &str, port: u16, username: &str) {
    info!(
        target: "security",
        event = "sftp_connect",
        host = %host,
        port = port,
        username = %username,
        "SFTP connection established"
    );
}

/// Log an FTPS connection establishment.
pub fn log_ftps_connect(host: &str, port: u16, username: &str) {
    info!(
        target: "security",
        event = "ftps_connect",
        host = %host,
        port = port,
        username = %username,
        "FTPS connection established"
    );
}

/// Log a host key that was accepted without verification.
pub fn log_host_key_unverified(host: &str, port: u16, fingerprint: &str) {
    warn!(
        target: "security",
        event = "host_key_unverified",
        host = %host,
        port = port,
        fingerprint = %fingerprint,
        "Accepting host key WITHOUT verification (insecure mode)"
    );
}

/// Log a host key that failed verification.
pub fn log_host_key_rejected(host: &str, port: u16, fingerprint: &str, reason: &str) {
    warn!(
        target: "security",
        event = "host_key_rejected",
        host = %host,
        port = port,
        fingerprint = %fingerprint,
        reason = %reason,
        "Host key rejected"
    );
}

/// Log a TLS session set up without certificate verification.
pub fn log_tls_unverified(host: &str, port: u16) {
    warn!(
        target: "security",
        event = "tls_unverified",
        host = %host,
        port = port,
        "TLS certificate verification DISABLED (insecure mode)"
    );
}

/// Log a closed connection.
pub fn log_disconnect(host: &str, port: u16, protocol: &str) {
    info!(
        target: "security",
        event = "disconnect",
        host = %host,
        port = port,
        protocol = %protocol,
        "Connection closed"
    );
}
