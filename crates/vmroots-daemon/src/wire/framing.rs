//! Newline-delimited JSON framing

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{DaemonError, Result};

use super::types::Message;

/// Longest accepted message line, excluding the newline
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Pulls one decoded message at a time off a byte stream
pub struct MessageReader<R> {
    reader: R,
    line: String,
    line_no: u64,
    max_line: usize,
}

impl<R> MessageReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            max_line: MAX_LINE_BYTES,
        }
    }

    /// Override the longest accepted line
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Read the next message, or `None` once the peer has closed the stream.
    ///
    /// Blank lines are skipped. Anything that is not a well-formed message,
    /// including a line longer than the limit, is a protocol error.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        // One byte past the limit tells an overlong line from a full one
        let limit = self.max_line as u64 + 1;
        loop {
            self.line.clear();
            let mut bounded = (&mut self.reader).take(limit);
            let read = bounded.read_line(&mut self.line).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    DaemonError::Protocol(format!("line {} is not UTF-8", self.line_no + 1))
                } else {
                    DaemonError::Io(e)
                }
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            if self.line.trim_end_matches('\n').len() > self.max_line {
                return Err(DaemonError::Protocol(format!(
                    "line {} exceeds {} bytes",
                    self.line_no, self.max_line
                )));
            }

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            trace!("Received: {}", text);

            return serde_json::from_str(text).map(Some).map_err(|e| {
                DaemonError::Protocol(format!("malformed message on line {}: {}", self.line_no, e))
            });
        }
    }
}

/// Writes messages as single JSON lines
pub struct MessageWriter<W> {
    writer: W,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Send one message and flush it to the transport
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        let json = serde_json::to_string(message)?;
        trace!("Sending: {}", json);
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
