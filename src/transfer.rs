//! Bounded-buffer stream copying

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Chunk size used when an upload goes through a remote write handle
pub const UPLOAD_CHUNK_SIZE: usize = 1_000_000;

/// Copy everything from `source` into `destination`, `chunk_size` bytes at a
/// time, and return the number of bytes copied.
///
/// Each chunk is handed to the destination in exactly one `write` call. A
/// destination that accepts fewer bytes than offered aborts the copy with
/// [`Error::ShortWrite`]; nothing after that chunk is read or written. Read
/// and write failures are returned as the underlying I/O error.
pub async fn copy_chunked<R, W>(source: &mut R, destination: &mut W, chunk_size: usize) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    if chunk_size == 0 {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "chunk size must be at least one byte",
        )));
    }

    let mut chunk = vec![0u8; chunk_size];
    let mut total: u64 = 0;

    loop {
        let read = source.read(&mut chunk).await?;
        if read == 0 {
            break;
        }

        let written = destination.write(&chunk[..read]).await?;
        if written != read {
            return Err(Error::ShortWrite {
                expected: read,
                written,
            });
        }
        total += read as u64;
    }

    destination.flush().await?;
    tracing::trace!(bytes = total, chunk_size, "Chunked copy finished");
    Ok(total)
}

/// Writer adapter that turns each `write` into "write the whole buffer".
///
/// Remote file handles cap the size of a single protocol write. Wrapping
/// them keeps one [`copy_chunked`] chunk equal to one logical write, and a
/// write only comes back short when the inner writer stops accepting bytes.
pub struct FullWrites<W> {
    inner: W,
    progress: usize,
}

impl<W> FullWrites<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, progress: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for FullWrites<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = &mut *self;
        while this.progress < buf.len() {
            match ready!(Pin::new(&mut this.inner).poll_write(cx, &buf[this.progress..])) {
                Ok(0) => break,
                Ok(n) => this.progress += n,
                Err(e) => {
                    this.progress = 0;
                    return Poll::Ready(Err(e));
                }
            }
        }
        Poll::Ready(Ok(std::mem::take(&mut this.progress)))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
