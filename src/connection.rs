//! Connection lifecycle: lazy dialing, liveness checks and reconnects.

use std::future::Future;

use crate::error::{Error, Result};

/// A live connection to the remote side.
pub trait Session: Send {
    /// True when the session reconnects on its own and must not be checked.
    fn manages_reconnects(&self) -> bool {
        false
    }

    /// Cheap liveness check; an error means the session is dead.
    fn keepalive(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Release every handle the session holds.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Dials and authenticates new sessions.
pub trait Connector: Send + Sync {
    type Session: Session;

    fn connect(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Owns at most one live session and guarantees one is available before
/// each operation.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    session: Option<C::Session>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Make sure a usable session exists and return it.
    ///
    /// A held session is checked first (unless it manages its own reconnects)
    /// and reused when healthy. Otherwise exactly one dial is attempted. A
    /// failed dial leaves the previous session in place so the next call
    /// retries; a successful one replaces it.
    pub async fn ensure_connected(&mut self) -> Result<&mut C::Session> {
        let healthy = match self.session.as_mut() {
            Some(session) if session.manages_reconnects() => true,
            Some(session) => match session.keepalive().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::info!("Connection lost ({}), reconnecting", e);
                    false
                }
            },
            None => false,
        };

        if !healthy {
            let fresh = self.connector.connect().await?;
            // a stale transport is already dead, so it is dropped without a goodbye
            self.session = Some(fresh);
            tracing::debug!("Connection established");
        }

        self.session.as_mut().ok_or(Error::NotConnected)
    }

    /// Close the held session, if any. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
