//! Client integration tests against live servers
//!
//! Each suite runs only when its server is configured through environment
//! variables and skips otherwise.
//!
//! ## Running the tests
//!
//! ```bash
//! export RXFER_TEST_SFTP_SERVER=127.0.0.1:2222
//! export RXFER_TEST_SFTP_USER=testuser
//! export RXFER_TEST_SFTP_PASSWORD=testpass123
//! export RXFER_TEST_SFTP_DIR=/home/testuser/upload
//!
//! export RXFER_TEST_FTPS_SERVER=127.0.0.1:2121
//! export RXFER_TEST_FTPS_USER=testuser
//! export RXFER_TEST_FTPS_PASSWORD=testpass123
//! export RXFER_TEST_FTPS_DIR=upload
//!
//! cargo test --test integration
//! ```
//!
//! Test servers usually present self-signed certificates and host keys that
//! are not in known_hosts, so the fixtures connect with `insecure = true`.

#[macro_use]
pub mod fixtures;

mod ftps_tests;
mod sftp_tests;
