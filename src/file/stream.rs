//! Chunked, range-aware emission of stored files over HTTP.

use std::io::{self, SeekFrom};

use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::catalog::FileRecord;
use super::range::{resolve, RangeResolution};
use super::storage::ContentStore;
use crate::{Result, ShareError};

/// How the client should present the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Save to disk (`Content-Disposition: attachment`).
    Attachment,
    /// Render in place, e.g. a media player (`Content-Disposition: inline`).
    Inline,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Infer a MIME type from a file name's extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_for(name: &str) -> String {
    mime_guess::from_path(display_name(name))
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Last segment of a client-supplied relative path.
pub fn display_name(original_name: &str) -> &str {
    original_name
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or("download")
}

/// Build a `Content-Disposition` value that is safe to place in a header.
///
/// Control characters are removed (header injection), and the quoted ASCII
/// `filename` fallback replaces quotes, backslashes and non-ASCII characters.
/// Names that needed any of that also get an RFC 5987 `filename*` parameter
/// carrying the exact UTF-8 name percent-encoded.
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let kind = disposition.as_str();
    let filename: String = filename.chars().filter(|c| !c.is_control()).collect();

    if filename.is_ascii() && !filename.contains(['"', '\\']) {
        return format!("{kind}; filename=\"{filename}\"");
    }

    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(&filename);

    format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Stream exactly `length` bytes from `file`'s current position.
///
/// Reads are bounded by `chunk_size`. Running out of data before `length`
/// bytes were produced is an `UnexpectedEof` error rather than a short body.
pub fn read_exact_stream(
    file: File,
    length: u64,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Bytes>> + Send {
    let chunk_size = chunk_size.max(1);

    futures::stream::try_unfold((file, length), move |(mut file, remaining)| async move {
        if remaining == 0 {
            return Ok(None);
        }

        let want = remaining.min(chunk_size as u64) as usize;
        let mut buf = vec![0u8; want];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("object ended with {remaining} bytes still expected"),
            ));
        }

        buf.truncate(n);
        Ok(Some((Bytes::from(buf), (file, remaining - n as u64))))
    })
}

/// Build the HTTP response for a stored file.
///
/// Honors an optional Range header: 200 for the full body, 206 for a
/// satisfiable single range, and [`ShareError::InvalidRange`] otherwise.
/// A missing backing object is [`ShareError::NotFound`].
///
/// The catalog is not touched here; callers resolve the record first, so no
/// catalog resource is held while the body is being sent.
pub async fn serve(
    store: &ContentStore,
    record: &FileRecord,
    range_header: Option<&str>,
    disposition: Disposition,
    chunk_size: usize,
) -> Result<Response> {
    let total_size = match store.stat(&record.stored_path).await {
        Ok(size) => size,
        Err(ShareError::NotFound(what)) => {
            warn!(file_id = record.id, stored_path = %record.stored_path, "Catalogued file has no backing object");
            return Err(ShareError::NotFound(what));
        }
        Err(e) => return Err(e),
    };

    let (status, window) = match resolve(range_header, total_size) {
        RangeResolution::FullBody => (StatusCode::OK, None),
        RangeResolution::Partial(w) => (StatusCode::PARTIAL_CONTENT, Some(w)),
        RangeResolution::Unsatisfiable => {
            debug!(file_id = record.id, range = ?range_header, total_size, "Unsatisfiable range");
            return Err(ShareError::InvalidRange { size: total_size });
        }
    };

    let mut file = store.open(&record.stored_path).await?;
    let length = match window {
        Some(w) => {
            file.seek(SeekFrom::Start(w.start)).await?;
            w.len()
        }
        None => total_size,
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, mime_for(&record.original_name))
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, display_name(&record.original_name)),
        );
    if let Some(w) = window {
        builder = builder.header(header::CONTENT_RANGE, w.content_range(total_size));
    }

    debug!(file_id = record.id, status = status.as_u16(), length, "Streaming file");

    let body = Body::from_stream(read_exact_stream(file, length, chunk_size));
    builder.body(body).map_err(|e| ShareError::Io(io::Error::other(e)))
}
