//! Write-only sink that measures response bodies without buffering them.

use std::io::{self, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Discards written bytes and remembers the furthest offset ever written.
///
/// For append-only writes the reported length equals the number of bytes
/// written. Seeking moves the write position without changing the length
/// until a write goes past it.
#[derive(Debug, Default, Clone)]
pub struct LengthCounter {
    position: u64,
    length: u64,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum byte offset ever written.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Current write position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Force the length, clamping the position if it now lies past the end.
    pub fn set_len(&mut self, len: u64) {
        self.position = self.position.min(len);
        self.length = len;
    }

    fn advance(&mut self, count: usize) -> usize {
        self.position = self.position.saturating_add(count as u64);
        self.length = self.length.max(self.position);
        count
    }
}

impl Write for LengthCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.advance(buf.len()))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for LengthCounter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.length.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of sink")
        })?;
        self.position = target;
        Ok(target)
    }
}

impl AsyncWrite for LengthCounter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(self.get_mut().advance(buf.len())))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
