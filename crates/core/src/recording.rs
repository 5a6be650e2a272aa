//! Recording file naming convention.
//!
//! Recordings are named `YYYY-MM-DD_HH-MM_HH-MM.<ext>`: the date the recording
//! started, its start time and its end time. Everything the catalog knows
//! about a recording's timing comes from this name.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte offsets of the fields in a recording file name.
const DATE: std::ops::Range<usize> = 0..10;
const START: std::ops::Range<usize> = 11..16;
const END: std::ops::Range<usize> = 17..22;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Why a remote file name was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordingNameError {
    #[error("file name contains a space: {0}")]
    ContainsSpace(String),

    #[error("file name does not match YYYY-MM-DD_HH-MM_HH-MM.ext: {0}")]
    BadShape(String),

    #[error("invalid date in file name: {0}")]
    InvalidDate(String),

    #[error("invalid time in file name: {0}")]
    InvalidTime(String),
}

/// Timing fields parsed from a recording file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingName {
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl RecordingName {
    /// Parse a bare file name (no folders).
    pub fn parse(file_name: &str) -> Result<Self, RecordingNameError> {
        if file_name.contains(' ') {
            return Err(RecordingNameError::ContainsSpace(file_name.to_string()));
        }

        let bad_shape = || RecordingNameError::BadShape(file_name.to_string());
        let bytes = file_name.as_bytes();
        if bytes.len() < END.end + 2
            || bytes[DATE.end] != b'_'
            || bytes[START.end] != b'_'
            || bytes[END.end] != b'.'
        {
            return Err(bad_shape());
        }

        let date = file_name.get(DATE).ok_or_else(bad_shape)?;
        let start = file_name.get(START).ok_or_else(bad_shape)?;
        let end = file_name.get(END).ok_or_else(bad_shape)?;

        let start_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| RecordingNameError::InvalidDate(file_name.to_string()))?;
        let start_time = parse_time(start)
            .ok_or_else(|| RecordingNameError::InvalidTime(file_name.to_string()))?;
        let end_time = parse_time(end)
            .ok_or_else(|| RecordingNameError::InvalidTime(file_name.to_string()))?;

        Ok(Self {
            start_date,
            start_time,
            end_time,
        })
    }

    /// Length of the recording in minutes. A recording that ends before it
    /// starts ran past midnight.
    pub fn duration_minutes(&self) -> u32 {
        let start = self.start_time.num_seconds_from_midnight() / 60;
        let end = self.end_time.num_seconds_from_midnight() / 60;
        if end >= start {
            end - start
        } else {
            24 * 60 - start + end
        }
    }

    /// Human-readable description stored on the catalog entry.
    pub fn description(&self) -> String {
        format!(
            "Recording from {} {} until {}",
            self.start_date,
            self.start_time.format("%H:%M:%S"),
            self.end_time.format("%H:%M:%S")
        )
    }
}

/// `HH-MM` with `-` standing in for `:`; seconds are always zero.
fn parse_time(field: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(&field.replace('-', ":"), "%H:%M").ok()
}

/// Split a remote path into `(folder, file_name)`.
///
/// `/2024/03/a.mp4` → `("/2024/03", "a.mp4")`, `/a.mp4` → `("/", "a.mp4")`.
pub fn split_path(full_path: &str) -> (String, String) {
    match full_path.rfind('/') {
        Some(0) => ("/".to_string(), full_path[1..].to_string()),
        Some(idx) => (
            full_path[..idx].to_string(),
            full_path[idx + 1..].to_string(),
        ),
        None => ("/".to_string(), full_path.to_string()),
    }
}

/// Format a byte count the way the storefront shows it, e.g. `1.5 GB`.
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0.00 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Stable cache key for a path's thumbnail.
pub fn thumbnail_key(full_path: &str) -> String {
    format!("{:x}", md5::compute(full_path.as_bytes()))
}
