//! Best-effort extraction of photo identifiers from tool result text.
//!
//! Tool results are free text; when they carry lines like
//! `UUID: 1A2B3C4D-5E6F-7890-ABCD-EF1234567890` the identifiers are recovered
//! so the UI can fetch thumbnails. This is presentation enrichment only:
//! finding nothing is not an error, and the scan is isolated here so it can
//! be replaced by structured tool output without touching the orchestrator.

/// Minimum length for a token to count as an identifier. Library asset
/// identifiers are long hyphenated UUID-like strings; short hyphenated
/// words ("re-run") must not match.
const MIN_IDENTIFIER_LEN: usize = 20;

const MARKERS: [&str; 2] = ["UUID:", "id="];

/// Scan `text` line by line for identifier tokens following a known marker.
/// Returns each identifier once, in first-seen order.
#[must_use]
pub fn extract_references(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        for marker in MARKERS {
            let mut rest = line;
            while let Some(pos) = rest.find(marker) {
                let after = &rest[pos + marker.len()..];
                if let Some(token) = leading_identifier(after) {
                    if !out.iter().any(|seen| seen == token) {
                        out.push(token.to_string());
                    }
                }
                rest = after;
            }
        }
    }

    out
}

/// Take the identifier-shaped token at the start of `s`, if any.
fn leading_identifier(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(s.len());
    let token = s[..end].trim_end_matches('-');

    if token.len() >= MIN_IDENTIFIER_LEN && token.contains('-') {
        Some(token)
    } else {
        None
    }
}
