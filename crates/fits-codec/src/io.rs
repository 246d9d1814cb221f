//! Block-aware async stream adapters.
//!
//! [`BlockReader`] and [`BlockWriter`] track the absolute stream position so
//! that callers can align to 2880-byte boundaries, and check a cancellation
//! token before every block they move.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::block::{bytes_to_boundary, BLOCK_SIZE};
use crate::error::{Error, Result};

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Buffered reader that counts consumed bytes.
#[derive(Debug)]
pub struct BlockReader<R> {
    inner: R,
    position: u64,
    cancel: CancellationToken,
}

impl<R: AsyncBufRead + Unpin> BlockReader<R> {
    pub fn new(inner: R, cancel: CancellationToken) -> Self {
        BlockReader {
            inner,
            position: 0,
            cancel,
        }
    }

    /// Absolute number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` as far as the stream allows. Returns the number of bytes
    /// copied, which is less than `buf.len()` only at end of stream.
    async fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let n = available.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            self.inner.consume(n);
            filled += n;
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Read one block. A short count means the stream ended inside it.
    pub async fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
        check(&self.cancel)?;
        let n = self.read_up_to(block).await?;
        trace!(bytes = n, position = self.position, "read block");
        Ok(n)
    }

    /// Read exactly `len` bytes, one block at most per step. The buffer
    /// grows with the bytes that actually arrive.
    pub async fn read_region(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(BLOCK_SIZE));
        let mut block = [0u8; BLOCK_SIZE];
        while buf.len() < len {
            check(&self.cancel)?;
            let step = match bytes_to_boundary(self.position) {
                0 => BLOCK_SIZE,
                n => n,
            }
            .min(len - buf.len());
            let n = self.read_up_to(&mut block[..step]).await?;
            buf.extend_from_slice(&block[..n]);
            if n < step {
                return Err(Error::TruncatedContent {
                    expected: len,
                    actual: buf.len(),
                });
            }
        }
        Ok(buf)
    }

    /// Discard up to `len` bytes. Returns how many were actually skipped;
    /// fewer means the stream ended.
    pub async fn skip(&mut self, len: u64) -> Result<u64> {
        let mut skipped = 0u64;
        while skipped < len {
            check(&self.cancel)?;
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let n = (available.len() as u64).min(len - skipped) as usize;
            self.inner.consume(n);
            skipped += n as u64;
        }
        self.position += skipped;
        Ok(skipped)
    }

    /// Skip the padding up to the next block boundary.
    pub async fn skip_to_block_boundary(&mut self) -> Result<u64> {
        let pad = bytes_to_boundary(self.position) as u64;
        self.skip(pad).await
    }

    /// Returns `true` when no further bytes can be read.
    pub async fn is_exhausted(&mut self) -> Result<bool> {
        Ok(self.inner.fill_buf().await?.is_empty())
    }
}

/// Writer that counts produced bytes.
#[derive(Debug)]
pub struct BlockWriter<W> {
    inner: W,
    position: u64,
    cancel: CancellationToken,
}

impl<W: AsyncWrite + Unpin> BlockWriter<W> {
    pub fn new(inner: W, cancel: CancellationToken) -> Self {
        BlockWriter {
            inner,
            position: 0,
            cancel,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write all of `data`, one block per step.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(BLOCK_SIZE) {
            check(&self.cancel)?;
            self.inner.write_all(chunk).await?;
            self.position += chunk.len() as u64;
        }
        Ok(())
    }

    /// Fill the rest of the current block with `pad`.
    pub async fn pad_to_block(&mut self, pad: u8) -> Result<()> {
        let n = bytes_to_boundary(self.position);
        if n > 0 {
            self.write_all(&vec![pad; n]).await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        check(&self.cancel)?;
        self.inner.flush().await?;
        Ok(())
    }
}
