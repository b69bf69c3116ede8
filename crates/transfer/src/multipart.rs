//! Streamed `multipart/form-data` upload bodies.
//!
//! The body carries two parts: a `resources` field holding the JSON list
//! of resources the control plane already has, and an `application` file
//! field holding the zip of everything else. The body is never buffered
//! whole; a producer task writes it into a bounded in-memory pipe that the
//! HTTP transport drains.

use std::io::Write;

use cloudpush_protocol::Resource;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{PIPE_CAPACITY, TransferError};

const RESOURCES_FIELD: &str = "resources";
const APPLICATION_FIELD: &str = "application";
const APPLICATION_FILENAME: &str = "application.zip";
const APPLICATION_CONTENT_TYPE: &str = "application/zip";

/// Read size when copying archive bytes into the pipe.
const COPY_BUFFER: usize = 8 * 1024;

/// Random bytes in a boundary; hex-encoded to twice this many characters.
const BOUNDARY_BYTES: usize = 15;

/// Boundary and framing shared by a size estimate and the body it sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFraming {
    boundary: String,
}

impl MultipartFraming {
    /// Creates a framing with a fresh random boundary.
    pub fn new() -> Self {
        let mut bytes = [0u8; BOUNDARY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            boundary: hex::encode(bytes),
        }
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Writes everything preceding the archive bytes: the `resources` field
    /// and the header of the `application` file field.
    pub fn write_head<W: Write>(
        &self,
        w: &mut W,
        existing: &[Resource],
    ) -> Result<(), TransferError> {
        write!(
            w,
            "--{}\r\nContent-Disposition: form-data; name=\"{RESOURCES_FIELD}\"\r\n\r\n",
            self.boundary
        )?;
        serde_json::to_writer(&mut *w, existing)?;
        write!(
            w,
            "\r\n--{}\r\nContent-Disposition: form-data; name=\"{APPLICATION_FIELD}\"; \
             filename=\"{APPLICATION_FILENAME}\"\r\n\
             Content-Type: {APPLICATION_CONTENT_TYPE}\r\n\r\n",
            self.boundary
        )?;
        Ok(())
    }

    /// Closing delimiter following the archive bytes.
    pub fn tail(&self) -> String {
        format!("\r\n--{}--\r\n", self.boundary)
    }

    /// Exact number of bytes the body will contain.
    pub fn encoded_len(
        &self,
        existing: &[Resource],
        content_len: u64,
    ) -> Result<u64, TransferError> {
        let mut counter = ByteCounter::default();
        self.write_head(&mut counter, existing)?;
        Ok(counter.0 + content_len + self.tail().len() as u64)
    }

    /// Spawns the producer and returns the readable body.
    ///
    /// Must be called from within a tokio runtime.
    pub fn into_body<R>(
        self,
        existing: Option<&[Resource]>,
        content: Option<R>,
        content_len: u64,
    ) -> Result<UploadBody, TransferError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let existing = existing.ok_or(TransferError::InvalidArgument(
            "existing resources must not be nil",
        ))?;
        let content = content.ok_or(TransferError::InvalidArgument(
            "new resources must not be nil",
        ))?;

        let mut head = Vec::new();
        self.write_head(&mut head, existing)?;
        let tail = self.tail().into_bytes();
        let size = head.len() as u64 + content_len + tail.len() as u64;

        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (err_tx, err_rx) = oneshot::channel();

        tokio::spawn(async move {
            match produce(&mut writer, &head, content, content_len, &tail).await {
                Ok(()) => {}
                Err(Interrupted::Content(e)) => {
                    warn!(error = %e, "multipart producer failed");
                    let _ = err_tx.send(e);
                }
                Err(Interrupted::ConsumerGone(e)) => {
                    debug!(error = %e, "upload body reader went away");
                }
            }
            // Dropping the write half lets the reader observe EOF.
            drop(writer);
        });

        debug!(size, kept = existing.len(), content_len, "multipart body ready");

        Ok(UploadBody {
            content_type: self.content_type(),
            size,
            stream: reader,
            errors: err_rx,
        })
    }
}

impl Default for MultipartFraming {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the producer stopped early.
enum Interrupted {
    /// The archive reader failed or ended short.
    Content(TransferError),
    /// The pipe's read half was dropped.
    ConsumerGone(std::io::Error),
}

async fn produce<R>(
    writer: &mut DuplexStream,
    head: &[u8],
    mut content: R,
    content_len: u64,
    tail: &[u8],
) -> Result<(), Interrupted>
where
    R: AsyncRead + Unpin,
{
    writer.write_all(head).await.map_err(Interrupted::ConsumerGone)?;

    let mut buf = vec![0u8; COPY_BUFFER];
    let mut remaining = content_len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = content.read(&mut buf[..want]).await.map_err(|e| {
            Interrupted::Content(TransferError::Encoding(format!(
                "reading application content: {e}"
            )))
        })?;
        if n == 0 {
            return Err(Interrupted::Content(TransferError::Encoding(format!(
                "application content ended after {} of {content_len} bytes",
                content_len - remaining
            ))));
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(Interrupted::ConsumerGone)?;
        remaining -= n as u64;
    }

    writer.write_all(tail).await.map_err(Interrupted::ConsumerGone)?;
    writer.shutdown().await.map_err(Interrupted::ConsumerGone)?;
    Ok(())
}

/// A streamed multipart body.
#[derive(Debug)]
pub struct UploadBody {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    /// Exact number of bytes `stream` yields when the producer succeeds.
    pub size: u64,
    pub stream: DuplexStream,
    /// Receives the producer's error if the archive content could not be
    /// read in full. Closed without a value on success, and when the
    /// reader of `stream` goes away first.
    pub errors: oneshot::Receiver<TransferError>,
}

/// Builds a streamed upload body with a fresh boundary.
///
/// `existing` is the list of resources to keep (an empty slice means a
/// full upload); `content` is the archive reader and `content_len` its
/// exact length.
pub fn build_upload_body<R>(
    existing: Option<&[Resource]>,
    content: Option<R>,
    content_len: u64,
) -> Result<UploadBody, TransferError>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    MultipartFraming::new().into_body(existing, content, content_len)
}

/// Size of the body [`build_upload_body`] produces for the same inputs.
///
/// Boundaries differ per call but always have the same length, so the
/// estimate holds for any body built afterwards.
pub fn estimate_size(existing: &[Resource], content_len: u64) -> Result<u64, TransferError> {
    MultipartFraming::new().encoded_len(existing, content_len)
}

#[derive(Default)]
struct ByteCounter(u64);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
