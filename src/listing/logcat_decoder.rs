use std::sync::OnceLock;

use regex::Regex;

use super::types::{LogEntry, LogRecord, Severity};
use crate::error_handling::types::DecodeIssue;

// `logcat -v time`: "01-15 10:30:45.123 W/ActivityManager( 1234): message"
const TIME_FORMAT: &str =
    r"^(\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d{3})\s+([VDIWEFA])/(.*?)\(\s*(\d+)\):\s?(.*)$";

// `logcat -v threadtime`: "01-15 10:30:45.123  1234  5678 W ActivityManager: message"
const THREADTIME_FORMAT: &str =
    r"^(\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d{3})\s+(\d+)\s+(\d+)\s+([VDIWEFA])\s+(.*?)\s*:\s?(.*)$";

static TIME_LINE: OnceLock<Regex> = OnceLock::new();
static THREADTIME_LINE: OnceLock<Regex> = OnceLock::new();

fn time_regex() -> &'static Regex {
    TIME_LINE.get_or_init(|| Regex::new(TIME_FORMAT).expect("time format pattern is valid"))
}

fn threadtime_regex() -> &'static Regex {
    THREADTIME_LINE
        .get_or_init(|| Regex::new(THREADTIME_FORMAT).expect("threadtime format pattern is valid"))
}

/// Decodes one log line in either the `time` or the `threadtime` layout.
pub fn decode_log_line(line: &str) -> Result<LogEntry, DecodeIssue> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(DecodeIssue::Skipped);
    }

    if let Some(caps) = time_regex().captures(line) {
        return Ok(LogEntry {
            timestamp: caps[1].to_string(),
            severity: severity(&caps[2])?,
            tag: caps[3].trim().to_string(),
            pid: number(&caps[4], "pid")?,
            tid: None,
            message: caps[5].to_string(),
        });
    }

    if let Some(caps) = threadtime_regex().captures(line) {
        return Ok(LogEntry {
            timestamp: caps[1].to_string(),
            pid: number(&caps[2], "pid")?,
            tid: Some(number(&caps[3], "tid")?),
            severity: severity(&caps[4])?,
            tag: caps[5].trim().to_string(),
            message: caps[6].to_string(),
        });
    }

    Err(DecodeIssue::Shape(line.to_string()))
}

/// Every line becomes a record: lines that do not decode (buffer banners,
/// wrapped stack traces) are passed through as [`LogRecord::Raw`].
pub fn decode_record(line: &str) -> LogRecord {
    match decode_log_line(line) {
        Ok(entry) => LogRecord::Entry(entry),
        Err(_) => LogRecord::Raw(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn severity(letter: &str) -> Result<Severity, DecodeIssue> {
    letter
        .chars()
        .next()
        .and_then(Severity::from_letter)
        .ok_or_else(|| DecodeIssue::Shape(letter.to_string()))
}

fn number(value: &str, field: &'static str) -> Result<u32, DecodeIssue> {
    value.parse::<u32>().map_err(|_| DecodeIssue::BadNumber {
        field,
        value: value.to_string(),
    })
}
