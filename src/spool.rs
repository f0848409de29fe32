//! Temp-file spooling for backends without a streaming read primitive

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};

const SPOOL_PREFIX: &str = ".rxfer-spool-";

/// Fill a fresh temp file through `fill`, then return its whole contents.
///
/// The temp file gets a unique name inside `dir` (or the system temp
/// directory) and is removed before this function returns, whether `fill`
/// succeeded or not. Blocking; call it from a blocking context.
pub fn spool_to_memory<F, E>(dir: Option<&Path>, fill: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut File) -> std::result::Result<(), E>,
    E: Into<Error>,
{
    let mut builder = tempfile::Builder::new();
    builder.prefix(SPOOL_PREFIX).suffix(".tmp");
    let mut spool = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    tracing::trace!(path = %spool.path().display(), "Spooling download");

    // `spool` deletes the file on drop, including on the early returns below
    fill(spool.as_file_mut()).map_err(Into::into)?;

    let file = spool.as_file_mut();
    file.seek(SeekFrom::Start(0))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    spool.close()?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn returns_contents_and_removes_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut seen: Option<PathBuf> = None;

        let contents = spool_to_memory(Some(dir.path()), |file: &mut File| {
            seen = find_spool(dir.path());
            file.write_all(b"listen 8080\n")
        })
        .unwrap();

        assert_eq!(contents, b"listen 8080\n");
        let path = seen.expect("spool file existed while filling");
        assert!(!path.exists());
        assert!(find_spool(dir.path()).is_none());
    }

    #[test]
    fn removes_file_when_fill_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut seen: Option<PathBuf> = None;

        let err = spool_to_memory(Some(dir.path()), |file: &mut File| {
            seen = find_spool(dir.path());
            file.write_all(b"partial")?;
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "transfer aborted",
            ))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset));
        assert!(!seen.expect("spool file existed while filling").exists());
        assert!(find_spool(dir.path()).is_none());
    }

    #[test]
    fn nested_spools_do_not_collide() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut files_during_inner = 0;

        let outer = spool_to_memory(Some(dir.path()), |outer: &mut File| {
            outer.write_all(b"outer")?;
            let inner = spool_to_memory(Some(dir.path()), |inner: &mut File| {
                files_during_inner = std::fs::read_dir(dir.path())?.count();
                inner.write_all(b"inner")
            })
            .map_err(|e| std::io::Error::other(e.to_string()))?;
            assert_eq!(inner, b"inner");
            Ok::<(), std::io::Error>(())
        })
        .unwrap();

        assert_eq!(outer, b"outer");
        assert_eq!(files_during_inner, 2);
        assert!(find_spool(dir.path()).is_none());
    }

    #[test]
    fn empty_download_is_empty() {
        let contents = spool_to_memory(None, |_file: &mut File| Ok::<(), std::io::Error>(())).unwrap();
        assert!(contents.is_empty());
    }

    fn find_spool(dir: &Path) -> Option<PathBuf> {
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SPOOL_PREFIX))
            })
    }
}
