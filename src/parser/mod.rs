//! Incremental extraction of finding objects from a streamed response.
//!
//! The model is asked for bare JSON objects back to back, but what arrives
//! is chunked at arbitrary byte offsets and may carry prose, code fences or
//! a `{"findings": [...]}` wrapper. [`FindingParser`] scans the growing
//! buffer for balanced top-level objects, tracking string and escape state
//! so braces inside string literals do not count. Its scan state survives
//! between fragments, so how the text is split never changes the result.

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::models::ReviewFinding;
use crate::providers::ProviderError;

#[derive(Debug, Default, Clone)]
struct ScanState {
    /// Next byte of the buffer to examine.
    cursor: usize,
    /// Offset of the `{` opening the current top-level object.
    start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Streaming parser for review findings.
#[derive(Debug, Default)]
pub struct FindingParser {
    buffer: String,
    scan: ScanState,
}

impl FindingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for an object to complete.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a fragment and return every finding it completes.
    pub fn push(&mut self, fragment: &str) -> Vec<ReviewFinding> {
        self.buffer.push_str(fragment);
        let mut findings = Vec::new();
        self.scan_into(&mut findings);
        findings
    }

    /// Flush at end of stream.
    ///
    /// An unterminated object is first tried as a whole (minus any code
    /// fences). If that fails, its opening brace is treated as prose and
    /// scanning resumes right after it, so a stray `{` cannot hide the
    /// findings that follow.
    pub fn finish(&mut self) -> Vec<ReviewFinding> {
        let mut findings = Vec::new();

        if let Some(start) = self.scan.start {
            let leftover = strip_code_fences(&self.buffer[start..]);
            if let Ok(value) = serde_json::from_str::<Value>(leftover) {
                collect_value(value, &mut findings);
                self.reset();
                return findings;
            }
        }

        while let Some(start) = self.scan.start {
            self.buffer.drain(..=start);
            self.scan = ScanState::default();
            self.scan_into(&mut findings);
        }

        self.reset();
        findings
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.scan = ScanState::default();
    }

    fn scan_into(&mut self, findings: &mut Vec<ReviewFinding>) {
        let Self { buffer, scan } = self;
        let bytes = buffer.as_bytes();
        let mut consumed = 0;
        let mut complete = Vec::new();

        let mut i = scan.cursor;
        while i < bytes.len() {
            let b = bytes[i];
            match scan.start {
                None => {
                    if b == b'{' {
                        scan.start = Some(i);
                        scan.depth = 1;
                        scan.in_string = false;
                        scan.escaped = false;
                    } else {
                        consumed = i + 1;
                    }
                }
                Some(start) => {
                    if scan.in_string {
                        if scan.escaped {
                            scan.escaped = false;
                        } else if b == b'\\' {
                            scan.escaped = true;
                        } else if b == b'"' {
                            scan.in_string = false;
                        }
                    } else {
                        match b {
                            b'"' => scan.in_string = true,
                            b'{' => scan.depth += 1,
                            b'}' => {
                                scan.depth -= 1;
                                if scan.depth == 0 {
                                    complete.push((start, i + 1));
                                    scan.start = None;
                                    consumed = i + 1;
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            i += 1;
        }

        for (from, to) in complete {
            parse_candidate(&buffer[from..to], findings);
        }

        buffer.drain(..consumed);
        scan.cursor = i - consumed;
        scan.start = scan.start.map(|s| s - consumed);
    }
}

/// Parse one balanced `{...}` and validate what it contains.
fn parse_candidate(text: &str, findings: &mut Vec<ReviewFinding>) {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => collect_value(value, findings),
        Err(e) => tracing::debug!(error = %e, "dropping malformed JSON object"),
    }
}

/// Validate a parsed object, unwrapping a `{"findings": [...]}` envelope.
fn collect_value(value: Value, findings: &mut Vec<ReviewFinding>) {
    let candidates = match value {
        Value::Object(mut obj) if !obj.contains_key("filePath") && obj.contains_key("findings") => {
            match obj.remove("findings") {
                Some(Value::Array(items)) => items,
                _ => {
                    tracing::debug!("dropping wrapper whose findings field is not an array");
                    return;
                }
            }
        }
        Value::Array(items) => items,
        other => vec![other],
    };

    for candidate in candidates {
        match ReviewFinding::from_value(&candidate) {
            Ok(finding) => findings.push(finding),
            Err(e) => tracing::debug!(error = %e, "dropping invalid finding"),
        }
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Drain `stream` through a [`FindingParser`].
///
/// The first error from the stream aborts collection; findings seen
/// before it are discarded with it.
pub async fn collect_findings<S>(mut stream: S) -> Result<Vec<ReviewFinding>, ProviderError>
where
    S: Stream<Item = Result<String, ProviderError>> + Unpin,
{
    let mut parser = FindingParser::new();
    let mut findings = Vec::new();
    while let Some(fragment) = stream.next().await {
        findings.extend(parser.push(&fragment?));
    }
    findings.extend(parser.finish());
    tracing::debug!(count = findings.len(), "parsed findings from response");
    Ok(findings)
}
