//! Line transport: any async byte stream in, trimmed non-empty lines out.
//!
//! The device node (e.g. `/dev/rfcomm0`) is opened as a plain file; without a
//! configured device the stream is read from stdin. Each line is stamped on
//! arrival and handed to the dispatcher client.

use crate::dispatch::{DispatchClient, RawLine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Dispatcher unavailable: {0}")]
    DispatcherClosed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Reads stdin when unset
    pub device: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            device: None,
            channel_capacity: 100,
        }
    }
}

pub type LineSource = Box<dyn AsyncRead + Unpin + Send>;

pub async fn open_source(device: Option<&Path>) -> Result<LineSource, TransportError> {
    match device {
        Some(path) => {
            info!("Opening device {}", path.display());
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| TransportError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Box::new(file))
        }
        None => {
            info!("No device configured, reading lines from stdin");
            Ok(Box::new(tokio::io::stdin()))
        }
    }
}

pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    lines_read: u64,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::with_capacity(128),
            lines_read: 0,
        }
    }

    /// Next trimmed, non-empty line or `None` at end of stream
    pub async fn next_line(&mut self) -> Result<Option<RawLine>, TransportError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&self.buf);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            self.lines_read += 1;
            return Ok(Some(RawLine::new(text)));
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

/// Feeds every line into the dispatcher until the stream ends
pub async fn forward_lines<R: AsyncRead + Unpin>(
    reader: R,
    client: DispatchClient,
) -> Result<u64, TransportError> {
    let mut lines = LineReader::new(reader);
    while let Some(line) = lines.next_line().await? {
        debug!("Received: {}", line.text);
        client
            .submit(line)
            .await
            .map_err(|e| TransportError::DispatcherClosed(e.to_string()))?;
    }
    if lines.lines_read() == 0 {
        warn!("Stream ended without delivering any lines");
    }
    Ok(lines.lines_read())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchAction;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn yields_trimmed_non_empty_lines() -> Result<(), TransportError> {
        let input: &[u8] = b"  PLAY \r\n\n\r\nRPM:40.0,40.0\nBTN1:ON";
        let mut reader = LineReader::new(input);

        let mut texts = Vec::new();
        while let Some(line) = reader.next_line().await? {
            texts.push(line.text);
        }

        assert_eq!(texts, vec!["PLAY", "RPM:40.0,40.0", "BTN1:ON"]);
        assert_eq!(reader.lines_read(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_stream() -> Result<(), TransportError> {
        let input: &[u8] = b"\xffNEXT\nPREV\n";
        let mut reader = LineReader::new(input);

        assert!(reader.next_line().await?.is_some());
        assert_eq!(reader.next_line().await?.map(|l| l.text).as_deref(), Some("PREV"));
        Ok(())
    }

    #[tokio::test]
    async fn forwards_lines_as_submit_requests() -> Result<(), TransportError> {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"NEXT\nTEMP:34\n";

        let count = forward_lines(input, DispatchClient::new(tx)).await?;

        assert_eq!(count, 2);
        let mut texts = Vec::new();
        while let Ok(action) = rx.try_recv() {
            if let DispatchAction::Submit(line) = action {
                texts.push(line.text);
            }
        }
        assert_eq!(texts, vec!["NEXT", "TEMP:34"]);
        Ok(())
    }

    #[tokio::test]
    async fn closed_dispatcher_ends_forwarding() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let input: &[u8] = b"NEXT\n";

        let result = forward_lines(input, DispatchClient::new(tx)).await;
        assert!(matches!(result, Err(TransportError::DispatcherClosed(_))));
    }

    #[tokio::test]
    async fn missing_device_is_reported() {
        let result = open_source(Some(Path::new("/nonexistent/velolink-device"))).await;
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
