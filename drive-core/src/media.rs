use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::models::File;

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Upload body for insert/update. The reader is streamed, never buffered whole.
pub struct Media {
    mime_type: String,
    reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
}

impl Media {
    pub fn new(reader: impl AsyncRead + Send + Sync + Unpin + 'static, mime_type: &str) -> Self {
        let mime_type = if mime_type.is_empty() {
            DEFAULT_MEDIA_TYPE.to_string()
        } else {
            mime_type.to_string()
        };
        Self {
            mime_type,
            reader: Box::new(reader),
        }
    }

    pub fn from_file(file: tokio::fs::File, mime_type: &str) -> Self {
        Self::new(file, mime_type)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

impl std::fmt::Debug for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

pub(crate) struct MultipartBody {
    pub content_type: String,
    pub body: reqwest::Body,
}

pub(crate) fn multipart_related(metadata: &File, media: Media) -> serde_json::Result<MultipartBody> {
    let boundary = next_boundary();
    let json = serde_json::to_vec(metadata)?;

    let mut head = Vec::with_capacity(json.len() + 160);
    head.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    head.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    head.extend_from_slice(&json);
    head.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    head.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.mime_type).as_bytes());
    let tail = format!("\r\n--{boundary}--\r\n").into_bytes();

    let parts = stream::iter([Ok::<_, io::Error>(Bytes::from(head))])
        .chain(ReaderStream::new(media.reader))
        .chain(stream::iter([Ok(Bytes::from(tail))]));

    Ok(MultipartBody {
        content_type: format!("multipart/related; boundary={boundary}"),
        body: reqwest::Body::wrap_stream(parts),
    })
}

fn next_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("drive_core_{nanos:x}_{seq:x}")
}
