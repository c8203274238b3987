use crate::error_handling::types::Rejection;

/// Substrings the remote shell prints for the conditions callers act on.
/// The first match in this order wins.
pub const VOCABULARY: [(&str, Rejection); 4] = [
    ("No such file", Rejection::NotFound),
    ("Permission denied", Rejection::PermissionDenied),
    ("No such process", Rejection::NoSuchProcess),
    ("Operation not permitted", Rejection::OperationNotPermitted),
];

/// Classifies remote output. Remote commands mostly exit with status 0 even
/// when they fail, so the text is the only signal.
pub fn classify(text: &str) -> Option<Rejection> {
    VOCABULARY
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, rejection)| *rejection)
}

/// True for lines that carry one of the vocabulary phrases.
pub fn is_rejection_line(line: &str) -> bool {
    classify(line).is_some()
}
