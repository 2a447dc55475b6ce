//! Storage path layout for uploaded files.
//!
//! Every stored file lives at `<upload_dir>/<YYYYMMDD-HHMMSS>_<name>` where
//! the timestamp is the UTC time the drain job persisted it. The retention
//! sweep recovers a file's age from that prefix alone.

use chrono::{DateTime, NaiveDateTime, Utc};

/// `chrono` format of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Name used when a client file name sanitizes to nothing.
pub const FALLBACK_NAME: &str = "upload";

const TIMESTAMP_LEN: usize = 15;

/// Failure to recover a timestamp from a stored path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathTimestampError {
    /// The final segment has no `<timestamp>_` prefix.
    #[error("no timestamp prefix in path '{0}'")]
    MissingPrefix(String),

    /// The prefix is present but is not a valid timestamp.
    #[error("invalid timestamp '{prefix}' in path '{path}'")]
    InvalidTimestamp {
        /// The offending path
        path: String,
        /// The text before the first `_`
        prefix: String,
    },
}

/// Build the storage path for a file persisted at `at`.
pub fn storage_path(upload_dir: &str, at: DateTime<Utc>, stored_name: &str) -> String {
    format!(
        "{}/{}_{}",
        upload_dir.trim_end_matches('/'),
        at.format(TIMESTAMP_FORMAT),
        stored_name
    )
}

/// Recover the persist time encoded in a storage path.
pub fn parse_timestamp(path: &str) -> Result<DateTime<Utc>, PathTimestampError> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (prefix, _) = segment
        .split_once('_')
        .ok_or_else(|| PathTimestampError::MissingPrefix(path.to_string()))?;

    let invalid = || PathTimestampError::InvalidTimestamp {
        path: path.to_string(),
        prefix: prefix.to_string(),
    };

    // chrono accepts short numeric fields, so pin the exact shape first.
    let well_formed = prefix.len() == TIMESTAMP_LEN
        && prefix.bytes().enumerate().all(|(i, b)| {
            if i == 8 {
                b == b'-'
            } else {
                b.is_ascii_digit()
            }
        });
    if !well_formed {
        return Err(invalid());
    }

    NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| invalid())
}

/// Reduce an untrusted client file name to a single safe path segment.
///
/// Directory components are discarded, control characters become `_`,
/// and names that would resolve to nothing become [`FALLBACK_NAME`].
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        name => name.to_string(),
    }
}

/// Insert `-n` before the extension: `a.txt` becomes `a-1.txt`.
pub fn with_counter(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{name}-{n}"),
    }
}
