//! Command line front end for the remote-transfer client
//!
//! ```text
//! rxfer <config.toml> ls <pattern>
//! rxfer <config.toml> get <remote> [local]
//! rxfer <config.toml> put <local> <remote>
//! rxfer <config.toml> rm <remote>
//! rxfer <config.toml> stat <remote>
//! ```
//!
//! Set `RXFER_LOG_DIR` to also write a daily log file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;

use remote_transfer::{Client, ConnectionConfig};

const USAGE: &str = "usage: rxfer <config.toml> <ls|get|put|rm|stat> [args...]";

#[tokio::main]
async fn main() -> Result<()> {
    let log_dir = std::env::var_os("RXFER_LOG_DIR").map(PathBuf::from);
    let _guard = remote_transfer::logging::init_logging(log_dir);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command, rest) = match args.as_slice() {
        [config, command, rest @ ..] => (Path::new(config), command.as_str(), rest),
        _ => bail!(USAGE),
    };

    let config = ConnectionConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let mut client = Client::connect(config).await.context("connecting")?;

    let result = run(&mut client, command, rest).await;
    client.close().await;
    result
}

async fn run(client: &mut Client, command: &str, args: &[String]) -> Result<()> {
    match (command, args) {
        ("ls", [pattern]) => {
            for path in client.glob(pattern).await? {
                println!("{}", path);
            }
        }
        ("get", [remote]) => {
            let mut reader = client.download(remote).await?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
        }
        ("get", [remote, local]) => {
            let mut reader = client.download(remote).await?;
            let mut file = tokio::fs::File::create(local)
                .await
                .with_context(|| format!("creating {}", local))?;
            let copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            tracing::info!("Downloaded {} bytes from {} to {}", copied, remote, local);
        }
        ("put", [local, remote]) => {
            let file = tokio::fs::File::open(local)
                .await
                .with_context(|| format!("opening {}", local))?;
            let stored = client.upload_file(remote, file).await?;
            println!("{} bytes stored at {}", stored, remote);
        }
        ("rm", [remote]) => client.remove(remote).await?,
        ("stat", [remote]) => {
            let info = client.info(remote).await?;
            println!("size:     {}", info.size);
            if let Some(permissions) = info.permissions {
                println!("mode:     {:o}", permissions);
            }
            if let Some(modified) = info.modified {
                println!("modified: {}", modified.to_rfc3339());
            }
            let kind = if info.is_symlink {
                "symlink"
            } else if info.is_dir {
                "directory"
            } else {
                "file"
            };
            println!("type:     {}", kind);
        }
        _ => bail!(USAGE),
    }
    Ok(())
}
