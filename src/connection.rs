// ABOUTME: Line-oriented transport over the modem's byte stream (serial port or any async stream)
// ABOUTME: Frames CRLF-terminated lines and the unterminated "> " body prompt; writes raw command bytes

use crate::parser::BODY_PROMPT;
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

/// Modem connection at the line level.
///
/// The modem speaks a text protocol: responses and notifications are lines
/// ending in `\r\n`, except for the body prompt `"> "`, which is printed
/// without a terminator while the modem waits for message text. `Connection`
/// hides that difference and yields one logical line at a time.
///
/// Writes go straight through; the caller supplies complete command lines
/// (or a raw body ending in Ctrl-Z).
#[derive(Debug)]
pub struct Connection<T> {
    // The stream is decorated with a `BufWriter` so a command and its
    // terminator reach the modem in a single flush.
    stream: BufWriter<T>,

    // Bytes read from the stream that do not yet form a complete line.
    buffer: BytesMut,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new `Connection` backed by `stream`.
    pub fn new(stream: T) -> Connection<T> {
        Connection {
            stream: BufWriter::new(stream),
            // Modem responses are short; a message listing is the largest
            // burst and rarely exceeds a few kilobytes.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read the next non-blank line from the stream.
    ///
    /// Trailing `\r` and `\n` are stripped. The body prompt is returned as
    /// `"> "` as soon as it is seen at the start of a line.
    ///
    /// Returns `Ok(None)` at end of stream. Any partial line still buffered at
    /// that point is discarded.
    ///
    /// This method is cancel safe: bytes of an incomplete line stay in the
    /// internal buffer for the next call.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.parse_line() {
                return Ok(Some(line));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if !self.buffer.is_empty() {
                    debug!(
                        "Stream closed with {} bytes of an unterminated line",
                        self.buffer.len()
                    );
                    self.buffer.clear();
                }
                return Ok(None);
            }
        }
    }

    /// Take the next complete line out of the buffer, skipping blank lines.
    fn parse_line(&mut self) -> Option<String> {
        loop {
            if self.buffer.starts_with(BODY_PROMPT.as_bytes()) {
                self.buffer.advance(BODY_PROMPT.len());
                return Some(BODY_PROMPT.to_string());
            }

            let end = self.buffer.iter().position(|&b| b == b'\n')?;
            let raw = self.buffer.split_to(end + 1);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);

            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    /// Write `data` to the stream and flush it.
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Flush pending writes and shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
