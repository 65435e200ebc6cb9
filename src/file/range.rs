//! HTTP `Range` header resolution.
//!
//! Only the single-range form `bytes=<start>-<end>?` is understood. When a
//! client sends several ranges, the first one is served and the rest are
//! ignored. Suffix ranges (`bytes=-500`) and any other syntax are treated as
//! unsatisfiable.

/// Inclusive byte interval inside an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteWindow {
    /// Number of bytes covered by the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A resolved window always covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for this window.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }
}

/// Outcome of resolving a Range header against an object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeResolution {
    /// No Range header: serve the whole object.
    FullBody,
    /// Serve the given window.
    Partial(ByteWindow),
    /// The header is malformed or out of bounds.
    Unsatisfiable,
}

/// Resolve an optional Range header against the object's total size.
pub fn resolve(range_header: Option<&str>, total_size: u64) -> RangeResolution {
    let Some(header) = range_header else {
        return RangeResolution::FullBody;
    };

    match parse_first_range(header) {
        Some((start, end)) => {
            let end = end.unwrap_or_else(|| total_size.saturating_sub(1));
            if start >= total_size || end >= total_size || start > end {
                RangeResolution::Unsatisfiable
            } else {
                RangeResolution::Partial(ByteWindow { start, end })
            }
        }
        None => RangeResolution::Unsatisfiable,
    }
}

/// Parse `bytes=<start>-<end>?`, returning the first range only.
fn parse_first_range(header: &str) -> Option<(u64, Option<u64>)> {
    let (unit, ranges) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }

    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;
    let start = parse_offset(start)?;
    let end = match end.trim() {
        "" => None,
        end => Some(parse_offset(end)?),
    };

    Some((start, end))
}

fn parse_offset(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
