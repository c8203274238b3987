use serde::Serialize;

use crate::listing::types::Severity;

/// Which log lines the device should send.
///
/// Filtering happens on the device through logcat filter specs, so lines
/// below the floor never cross the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    pub severity_floor: Severity,
    /// Only this tag when set; everything else is silenced.
    pub tag: Option<String>,
}

impl StreamFilter {
    pub fn new(severity_floor: Severity, tag: Option<String>) -> Self {
        let tag = tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        StreamFilter {
            severity_floor,
            tag,
        }
    }

    /// Arguments for the stream command, e.g. `logcat -v time Foo:W *:S`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["logcat".to_string(), "-v".to_string(), "time".to_string()];
        match &self.tag {
            Some(tag) => {
                args.push(format!("{}:{}", tag, self.severity_floor.letter()));
                args.push("*:S".to_string());
            }
            None if self.severity_floor > Severity::Verbose => {
                args.push(format!("*:{}", self.severity_floor.letter()))
            }
            None => {}
        }
        args
    }
}

impl Default for StreamFilter {
    fn default() -> Self {
        StreamFilter::new(Severity::Verbose, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Idle,
    Streaming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_args() {
        assert_eq!(
            StreamFilter::new(Severity::Warn, None).to_args(),
            vec!["logcat", "-v", "time", "*:W"]
        );
        assert_eq!(StreamFilter::default().to_args(), vec!["logcat", "-v", "time"]);
        assert_eq!(
            StreamFilter::new(Severity::Verbose, Some("Zygote".into())).to_args(),
            vec!["logcat", "-v", "time", "Zygote:V", "*:S"]
        );
        assert_eq!(
            StreamFilter::new(Severity::Debug, Some("ActivityManager".into())).to_args(),
            vec!["logcat", "-v", "time", "ActivityManager:D", "*:S"]
        );
        assert_eq!(StreamFilter::new(Severity::Info, Some("  ".into())).tag, None);
    }
}
