//! Environment driven server fixtures

use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{Mutex, MutexGuard};

use remote_transfer::ConnectionConfig;

// Tests share remote directories, so they run one at a time
static TEST_LOCK: Mutex<()> = Mutex::const_new(());

pub async fn acquire_test_lock() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().await
}

/// One configured test server
#[derive(Debug, Clone)]
pub struct TestServer {
    pub server: String,
    pub username: String,
    pub password: String,
    /// Scratch directory the tests may write into
    pub dir: String,
}

impl TestServer {
    /// Read `RXFER_TEST_<PREFIX>_*` variables; `None` when the server is unset.
    pub fn from_env(prefix: &str) -> Option<Self> {
        let var = |name: &str| std::env::var(format!("RXFER_TEST_{}_{}", prefix, name)).ok();
        Some(Self {
            server: var("SERVER")?,
            username: var("USER").unwrap_or_else(|| "testuser".to_string()),
            password: var("PASSWORD").unwrap_or_default(),
            dir: var("DIR").unwrap_or_else(|| ".".to_string()),
        })
    }

    pub fn config(&self, tls: bool) -> ConnectionConfig {
        ConnectionConfig {
            password: Some(SecretString::from(self.password.clone())),
            tls,
            insecure: true,
            timeout: Duration::from_secs(10),
            ..ConnectionConfig::new(self.server.clone(), self.username.clone())
        }
    }

    /// Path of `name` inside the scratch directory
    pub fn path(&self, name: &str) -> String {
        format!("{}/{}", self.dir.trim_end_matches('/'), name)
    }
}

pub fn sftp_server() -> Option<TestServer> {
    TestServer::from_env("SFTP")
}

pub fn ftps_server() -> Option<TestServer> {
    TestServer::from_env("FTPS")
}

/// Unique file name so reruns never see leftovers from a crashed run
pub fn unique_name(stem: &str, ext: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}-{}.{}", stem, std::process::id(), nanos, ext)
}

/// Skip the test when the named server is not configured
#[macro_export]
macro_rules! skip_if_no_server {
    ($server:expr) => {
        match $server {
            Some(server) => server,
            None => {
                eprintln!("Skipping test: test server not configured");
                return;
            }
        }
    };
}
