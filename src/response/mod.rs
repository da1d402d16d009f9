//! Raw HTTP response parsing.
//!
//! Turns one captured fuzzer record into a normalized structural
//! representation: status code, status message, ordered header list and
//! timing value. Captures are CRLF-delimited raw socket dumps, not
//! spec-compliant HTTP, so parsing is deliberately forgiving: malformed
//! status lines and junk header lines degrade to sentinels instead of
//! errors.

use serde::{Deserialize, Serialize};

/// One captured interaction as emitted by the fuzzer's JSON output.
///
/// Extra fields present in full fuzzer records (request index, mutation
/// description, the request itself) are ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    /// Raw response text: status line, CRLF-separated headers, blank line,
    /// optional body.
    pub response: String,
    /// Wall-clock response time, consumed at raw scale.
    pub response_time: f64,
    /// Framework label; required for training, absent in predict corpora.
    #[serde(default)]
    pub framework: Option<String>,
}

/// One header occurrence inside a parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Lowercase header name, the case-insensitive key.
    pub name: String,
    /// Header value with leading whitespace stripped.
    pub value: String,
    /// The name as it appeared on the wire, casing preserved.
    pub original: String,
}

/// Normalized structural view of one raw response.
///
/// Headers keep first-occurrence order; a repeated name (case-insensitive)
/// overwrites the value and original casing of the earlier entry while
/// keeping its position, mirroring map-insertion semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Parsed status code, 0 when the status line is absent or malformed.
    pub status_code: u16,
    /// Status message verbatim, empty when absent or malformed.
    pub status_message: String,
    /// Ordered header list (see type-level docs for the duplicate policy).
    pub headers: Vec<HeaderEntry>,
    /// Response time carried over from the sample.
    pub response_time: f64,
}

impl ParsedResponse {
    /// Looks up a header by its lowercase name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderEntry> {
        self.headers.iter().find(|h| h.name == name)
    }
}

/// Parses one raw sample into its structural representation.
///
/// Pure function: splits the blob on the first blank line, reads the first
/// header-block line as the status line and every further parseable
/// `name: value` line as a header.
#[must_use]
pub fn parse_response(sample: &RawSample) -> ParsedResponse {
    let header_block = sample
        .response
        .split("\r\n\r\n")
        .next()
        .unwrap_or_default();

    let mut lines = header_block.split("\r\n");

    let (status_code, status_message) = lines.next().map_or((0, String::new()), parse_status_line);

    let mut headers: Vec<HeaderEntry> = Vec::new();
    for line in lines {
        let Some((name, value)) = parse_header_line(line) else {
            continue;
        };
        let key = name.to_lowercase();
        match headers.iter_mut().find(|h| h.name == key) {
            // Repeated name: later occurrence wins, position stays.
            Some(entry) => {
                entry.value = value;
                entry.original = name;
            }
            None => headers.push(HeaderEntry {
                name: key,
                value,
                original: name,
            }),
        }
    }

    ParsedResponse {
        status_code,
        status_message,
        headers,
        response_time: sample.response_time,
    }
}

/// Splits a status line on its first two spaces into
/// `(version_ignored, code, message)`.
///
/// Any shape that doesn't yield an integer code collapses to the
/// `(0, "")` sentinel; this never fails.
fn parse_status_line(line: &str) -> (u16, String) {
    let mut parts = line.splitn(3, ' ');
    let _version = parts.next();
    let code = parts.next().and_then(|c| c.parse::<u16>().ok());
    match code {
        Some(code) => {
            let message = parts.next().unwrap_or_default().to_string();
            (code, message)
        }
        None => (0, String::new()),
    }
}

/// Splits a header line on the first colon into `(name, value)`.
///
/// Returns `None` for lines with no colon, an empty name, or a name
/// containing whitespace (raw socket noise, not a header).
fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return None;
    }
    let value = value.trim_start_matches([' ', '\t']);
    Some((name.to_string(), value.to_string()))
}

/// Capitalization style of a header name.
///
/// Classification is total and mutually exclusive: every string maps to
/// exactly one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasingStyle {
    /// Every letter is lowercase (at least one letter).
    Lowercase,
    /// Every letter is uppercase (at least one letter).
    Uppercase,
    /// Every letter-run starts uppercase and continues lowercase.
    Titlecase,
    /// Anything else, including strings with no letters.
    Other,
}

impl CasingStyle {
    /// Classifies a header name's original spelling.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        let letters: Vec<char> = name.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            return Self::Other;
        }
        if letters.iter().all(|c| c.is_lowercase()) {
            return Self::Lowercase;
        }
        if letters.iter().all(|c| c.is_uppercase()) {
            return Self::Uppercase;
        }
        if is_titlecase(name) {
            return Self::Titlecase;
        }
        Self::Other
    }

    /// The category label fed to the casing encoders.
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::Titlecase => "titlecase",
            Self::Other => "other",
        }
    }
}

/// Word-initial-capitalized check: a letter after a non-letter must be
/// uppercase, a letter after a letter must be lowercase.
fn is_titlecase(name: &str) -> bool {
    let mut prev_was_letter = false;
    let mut has_letter = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            has_letter = true;
            if prev_was_letter {
                if !c.is_lowercase() {
                    return false;
                }
            } else if !c.is_uppercase() {
                return false;
            }
            prev_was_letter = true;
        } else {
            prev_was_letter = false;
        }
    }
    has_letter
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(response: &str) -> RawSample {
        RawSample {
            response: response.to_string(),
            response_time: 0.1,
            framework: None,
        }
    }

    #[test]
    fn test_well_formed_status_line() {
        let parsed = parse_response(&sample(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\nbody",
        ));
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.status_message, "OK");
    }

    #[test]
    fn test_status_message_verbatim() {
        let parsed = parse_response(&sample("HTTP/1.1 404 Not Found\r\n\r\n"));
        assert_eq!(parsed.status_code, 404);
        assert_eq!(parsed.status_message, "Not Found");
    }

    #[test]
    fn test_malformed_status_line_defaults() {
        for raw in ["", "garbage", "HTTP/1.1", "HTTP/1.1 abc OK\r\n\r\n"] {
            let parsed = parse_response(&sample(raw));
            assert_eq!(parsed.status_code, 0, "input: {raw:?}");
            assert_eq!(parsed.status_message, "", "input: {raw:?}");
        }
    }

    #[test]
    fn test_status_line_without_message() {
        let parsed = parse_response(&sample("HTTP/1.1 204\r\n\r\n"));
        assert_eq!(parsed.status_code, 204);
        assert_eq!(parsed.status_message, "");
    }

    #[test]
    fn test_headers_keep_wire_order() {
        let parsed = parse_response(&sample(
            "HTTP/1.1 200 OK\r\nX-Powered-By: PHP/8.1\r\nContent-Type: text/html\r\n\r\n",
        ));
        let names: Vec<&str> = parsed.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["x-powered-by", "content-type"]);
    }

    #[test]
    fn test_header_casing_preserved() {
        let parsed = parse_response(&sample("HTTP/1.1 200 OK\r\nX-Powered-By: PHP/8.1\r\n\r\n"));
        let entry = parsed.header("x-powered-by").expect("header present");
        assert_eq!(entry.original, "X-Powered-By");
        assert_eq!(entry.value, "PHP/8.1");
    }

    #[test]
    fn test_duplicate_header_last_occurrence_wins() {
        let parsed = parse_response(&sample(
            "HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nContent-Type: text/html\r\nSET-COOKIE: b=2\r\n\r\n",
        ));
        // Exactly one entry, at its first-seen position, with the later value.
        let names: Vec<&str> = parsed.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["set-cookie", "content-type"]);
        let cookie = parsed.header("set-cookie").expect("header present");
        assert_eq!(cookie.value, "b=2");
        assert_eq!(cookie.original, "SET-COOKIE");
    }

    #[test]
    fn test_lines_without_colon_skipped() {
        let parsed = parse_response(&sample(
            "HTTP/1.1 200 OK\r\nnot a header line\r\nContent-Type: text/html\r\n\r\n",
        ));
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.headers[0].name, "content-type");
    }

    #[test]
    fn test_body_not_parsed_as_headers() {
        let parsed = parse_response(&sample(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\nFake-Header: in-body\r\n",
        ));
        assert!(parsed.header("fake-header").is_none());
    }

    #[test]
    fn test_missing_separator_header_block_is_whole_blob() {
        let parsed = parse_response(&sample("HTTP/1.1 200 OK\r\nContent-Type: text/html"));
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.headers.len(), 1);
    }

    #[test]
    fn test_value_leading_whitespace_trimmed() {
        let parsed = parse_response(&sample("HTTP/1.1 200 OK\r\nContent-Type:   text/html\r\n\r\n"));
        assert_eq!(parsed.header("content-type").expect("present").value, "text/html");
    }

    #[test]
    fn test_casing_classification() {
        assert_eq!(CasingStyle::classify("content-type"), CasingStyle::Lowercase);
        assert_eq!(CasingStyle::classify("CONTENT-TYPE"), CasingStyle::Uppercase);
        assert_eq!(CasingStyle::classify("Content-Type"), CasingStyle::Titlecase);
        assert_eq!(CasingStyle::classify("X-Powered-By"), CasingStyle::Titlecase);
        assert_eq!(CasingStyle::classify("ETag"), CasingStyle::Other);
        assert_eq!(CasingStyle::classify("X"), CasingStyle::Uppercase);
        assert_eq!(CasingStyle::classify("123"), CasingStyle::Other);
        assert_eq!(CasingStyle::classify(""), CasingStyle::Other);
    }

    #[test]
    fn test_casing_classification_total() {
        // Every name maps to exactly one bucket; classify is a total match,
        // so exercising odd shapes is enough to pin the contract.
        for name in ["", "x", "X", "xY", "Xy-Zw", "1-2-3", "é", "A1b"] {
            let style = CasingStyle::classify(name);
            assert!(matches!(
                style,
                CasingStyle::Lowercase
                    | CasingStyle::Uppercase
                    | CasingStyle::Titlecase
                    | CasingStyle::Other
            ));
        }
    }

    #[test]
    fn test_raw_sample_tolerates_fuzzer_fields() {
        let json = r#"{
            "request_index": 3,
            "mutation_description": "suppress char",
            "request": "GET / HTTP/1.1",
            "response": "HTTP/1.1 200 OK\r\n\r\n",
            "response_time": 0.25,
            "framework": "laravel"
        }"#;
        let sample: RawSample = serde_json::from_str(json).expect("deserializes");
        assert_eq!(sample.framework.as_deref(), Some("laravel"));
        assert!((sample.response_time - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_raw_sample_framework_optional() {
        let json = r#"{"response": "HTTP/1.1 200 OK\r\n\r\n", "response_time": 0.1}"#;
        let sample: RawSample = serde_json::from_str(json).expect("deserializes");
        assert!(sample.framework.is_none());
    }
}
