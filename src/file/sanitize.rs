//! Lexical sanitization of client-supplied relative paths.

use std::fmt;
use std::path::{Component, Path};

use crate::{Result, ShareError};

/// Maximum length of a single path segment, in bytes.
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Characters that are unsafe in a segment on at least one target filesystem.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Device names Windows refuses as file names regardless of extension.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A relative path that passed [`sanitize`].
///
/// Segments are joined with `/` and none of them is empty, `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedPath(String);

impl SanitizedPath {
    /// The sanitized path as a `/`-separated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for SanitizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize and secure a client-supplied relative path.
///
/// Both `/` and `\` separate segments. Empty segments, `.`, `..` and drive
/// markers are dropped; every other segment is stripped of characters unsafe
/// on common filesystems. Fails when nothing usable is left.
///
/// Purely lexical: the filesystem is never consulted.
pub fn sanitize(raw: &str) -> Result<SanitizedPath> {
    let normalized = raw.replace('\\', "/");

    let segments: Vec<String> = normalized
        .split('/')
        .enumerate()
        .filter(|(i, segment)| !(*i == 0 && is_drive_marker(segment)))
        .filter_map(|(_, segment)| sanitize_segment(segment))
        .collect();

    if segments.is_empty() {
        return Err(ShareError::InvalidPath(raw.to_string()));
    }

    Ok(SanitizedPath(segments.join("/")))
}

/// Check that a stored relative path cannot leave its root once joined.
pub(crate) fn is_contained(relative: &str) -> bool {
    !relative.is_empty()
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn is_drive_marker(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn sanitize_segment(segment: &str) -> Option<String> {
    let cleaned: String = segment
        .chars()
        .filter(|c| !c.is_control() && !FORBIDDEN_CHARS.contains(c))
        .collect();

    // Windows silently drops trailing dots and spaces
    let cleaned = cleaned.trim().trim_end_matches(['.', ' ']);

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }

    let mut cleaned = if is_reserved_name(cleaned) {
        format!("_{cleaned}")
    } else {
        cleaned.to_string()
    };

    if cleaned.len() > MAX_SEGMENT_BYTES {
        let mut end = MAX_SEGMENT_BYTES;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }

    Some(cleaned)
}

fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment);
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}
