use std::sync::Arc;

use russh::keys::{HashAlg, PrivateKeyWithHashAlg};
use secrecy::{ExposeSecret, SecretString};

use crate::config::ConnectionConfig;
use crate::error::Error;

/// Resolved authentication for an SSH connection
pub enum ResolvedAuth {
    /// Password authentication with zeroized secret string
    Password(SecretString),
    /// Public key authentication with decoded key
    PublicKey(PrivateKeyWithHashAlg),
}

impl std::fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedAuth::Password(_) => f.debug_tuple("Password").field(&"[REDACTED]").finish(),
            ResolvedAuth::PublicKey(_) => f.debug_tuple("PublicKey").field(&"[KEY]").finish(),
        }
    }
}

impl ResolvedAuth {
    /// Pick the authentication method for `config`.
    ///
    /// A supplied private key always wins over the password. A key that fails
    /// to decode is fatal for this connection attempt; there is no fallback
    /// to password authentication.
    pub fn resolve(config: &ConnectionConfig) -> Result<Self, Error> {
        match &config.private_key {
            Some(key) => {
                let passphrase = config
                    .private_key_passphrase
                    .as_ref()
                    .map(|p| p.expose_secret());
                decode_key(key.expose_secret(), passphrase)
            }
            None => {
                let password = config
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret())
                    .unwrap_or_default();
                Ok(ResolvedAuth::Password(SecretString::from(password)))
            }
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            ResolvedAuth::Password(_) => "password",
            ResolvedAuth::PublicKey(_) => "publickey",
        }
    }
}

/// Decode PEM / OpenSSH private key material
fn decode_key(content: &str, passphrase: Option<&str>) -> Result<ResolvedAuth, Error> {
    let first_line = content.trim_start().lines().next().unwrap_or("");
    if first_line.starts_with("ssh-") || first_line.starts_with("ecdsa-") {
        return Err(Error::PrivateKey(
            "key material is a PUBLIC key, not a private key".to_string(),
        ));
    }

    let key = russh::keys::decode_secret_key(content, passphrase).map_err(|e| {
        let msg = e.to_string();
        let normalized = msg.to_lowercase();
        let is_passphrase_error = normalized.contains("encrypted")
            || normalized.contains("passphrase")
            || normalized.contains("cryptographic");
        if is_passphrase_error && passphrase.is_none() {
            Error::PrivateKey(format!("key is encrypted and no passphrase was given: {}", msg))
        } else {
            Error::PrivateKey(msg)
        }
    })?;

    // RSA keys sign with SHA-512, everything else uses its native algorithm
    let hash_alg = if key.algorithm().is_rsa() {
        Some(HashAlg::Sha512)
    } else {
        None
    };

    Ok(ResolvedAuth::PublicKey(PrivateKeyWithHashAlg::new(
        Arc::new(key),
        hash_alg,
    )))
}
