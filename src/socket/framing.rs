//! JSON framing over the raw socket stream.
//!
//! The protocol has no length prefix or delimiter. Each request is one JSON
//! value written in full, and each response is one JSON value read back.
//!
//! # Read modes
//!
//! - [`ReadMode::SingleRead`]: wait `read_delay`, perform exactly one read of
//!   at most `read_buffer_size` bytes and decode those bytes. A response that
//!   is larger than the buffer or split across reads fails to decode.
//! - [`ReadMode::UntilComplete`]: keep reading until the bytes received so far
//!   contain one complete JSON object, up to `max_response_size`. Each
//!   byte is scanned once, so large responses read in linear time.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::SocketError;
use crate::response::Response;
use crate::socket::session::{ReadMode, SessionConfig};

/// Write one encoded message and flush it.
pub async fn write_message<W>(writer: &mut W, body: &[u8]) -> Result<(), SocketError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(body)
        .await
        .map_err(|e| SocketError::transport("writing request", e))?;
    writer
        .flush()
        .await
        .map_err(|e| SocketError::transport("flushing request", e))?;

    trace!(bytes = body.len(), "Request written");
    Ok(())
}

/// Read one response according to `config.read_mode`.
pub async fn read_response<R>(
    reader: &mut R,
    config: &SessionConfig,
) -> Result<Response, SocketError>
where
    R: AsyncRead + Unpin,
{
    // Give the server time to produce the reply before the first read
    tokio::time::sleep(config.read_delay).await;

    match config.read_mode {
        ReadMode::SingleRead => read_single(reader, config.read_buffer_size).await,
        ReadMode::UntilComplete => {
            read_until_complete(reader, config.read_buffer_size, config.max_response_size).await
        }
    }
}

/// Perform exactly one read and decode whatever it returned.
///
/// A `buffer_size` of zero is treated as one byte.
pub async fn read_single<R>(reader: &mut R, buffer_size: usize) -> Result<Response, SocketError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let n = reader
        .read(&mut buffer)
        .await
        .map_err(|e| SocketError::transport("reading response", e))?;

    // EOF before any data
    if n == 0 {
        return Err(connection_closed());
    }

    trace!(bytes = n, "Response read");
    decode(&buffer[..n])
}

/// Read until one complete JSON object has arrived.
///
/// Each byte is scanned once to find where the top-level object ends, and
/// the object is decoded a single time after that. Bytes after the object
/// are discarded. A `chunk_size` of zero is treated as one byte.
///
/// # Errors
///
/// - `SocketError::Transport` if the read fails or EOF comes before any data
/// - `SocketError::Protocol` if the stream closes mid-object, does not start
///   with an object, exceeds `max_size`, or does not decode as a [`Response`]
pub async fn read_until_complete<R>(
    reader: &mut R,
    chunk_size: usize,
    max_size: usize,
) -> Result<Response, SocketError>
where
    R: AsyncRead + Unpin,
{
    let mut received = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut scanner = ObjectScanner::default();

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| SocketError::transport("reading response", e))?;

        if n == 0 {
            if received.is_empty() {
                return Err(connection_closed());
            }
            return Err(SocketError::Protocol(format!(
                "Connection closed after {} bytes of incomplete response",
                received.len()
            )));
        }

        received.extend_from_slice(&chunk[..n]);
        trace!(bytes = n, total = received.len(), "Response chunk read");

        // Only the newly arrived bytes are scanned
        if let Some(end) = scanner.scan(&received)? {
            if end < received.len() {
                trace!(extra = received.len() - end, "Discarding bytes after response");
            }
            return decode(&received[..end]);
        }

        if received.len() > max_size {
            return Err(SocketError::Protocol(format!(
                "Response size {} exceeds maximum {} bytes",
                received.len(),
                max_size
            )));
        }
    }
}

/// Incremental scanner that finds the end of the first top-level JSON object.
///
/// Tracks nesting depth and string/escape state across calls, so a buffer
/// that grows chunk by chunk is scanned in linear time overall.
#[derive(Debug, Default)]
struct ObjectScanner {
    /// Bytes of the buffer already scanned.
    offset: usize,
    depth: usize,
    started: bool,
    in_string: bool,
    escaped: bool,
}

impl ObjectScanner {
    /// Scan `buffer[self.offset..]` and return the end offset of the object
    /// once its closing brace has been seen.
    fn scan(&mut self, buffer: &[u8]) -> Result<Option<usize>, SocketError> {
        for (i, &byte) in buffer.iter().enumerate().skip(self.offset) {
            if !self.started {
                match byte {
                    b' ' | b'\t' | b'\r' | b'\n' => continue,
                    b'{' => {
                        self.started = true;
                        self.depth = 1;
                        continue;
                    }
                    other => {
                        return Err(SocketError::Protocol(format!(
                            "Response does not start with a JSON object (found byte 0x{:02x})",
                            other
                        )));
                    }
                }
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.offset = i + 1;
                        return Ok(Some(i + 1));
                    }
                }
                _ => {}
            }
        }

        self.offset = buffer.len();
        Ok(None)
    }
}

fn decode(bytes: &[u8]) -> Result<Response, SocketError> {
    serde_json::from_slice(bytes).map_err(|e| {
        SocketError::Protocol(format!(
            "Failed to parse response ({} bytes): {}",
            bytes.len(),
            e
        ))
    })
}

fn connection_closed() -> SocketError {
    SocketError::transport(
        "reading response",
        std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        ),
    )
}
