//! Output extraction - CLI stdout을 하나의 content 문자열로 정규화
//!
//! 세 가지 외부 CLI의 JSON 출력 형태와 plain text를 구분한다:
//! - `{"response": ...}` - Gemini CLI
//! - `{"content": ...}` - generic
//! - `{"result": ...}` - Claude Code
//! - 그 외 - plain text
//!
//! 엄격한 스키마가 아니라 휴리스틱이다. 깨진 JSON은 에러 없이
//! plain text 규칙으로 넘어간다.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::trace;

/// content로 인정하는 최소 길이 (문자 수)
pub const MIN_CONTENT_LEN: usize = 10;

/// JSON 필드 우선순위: response > content > result
const FIELD_PRIORITY: [(&str, OutputFormat); 3] = [
    ("response", OutputFormat::Gemini),
    ("content", OutputFormat::Generic),
    ("result", OutputFormat::Claude),
];

/// 추출된 출력의 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gemini,
    Generic,
    Claude,
    Plaintext,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Generic => "generic",
            Self::Claude => "claude",
            Self::Plaintext => "plaintext",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 추출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub content: String,
    pub format: OutputFormat,
}

fn session_envelope() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)^\{.*"session_id".*\}$"#).expect("session envelope pattern is valid")
    })
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 캡처된 출력에서 content 추출. 없으면 `None`.
pub fn extract_content(raw: &str, exit_code: Option<i32>) -> Option<Extracted> {
    let trimmed = raw.trim();
    if char_len(trimmed) < MIN_CONTENT_LEN {
        return None;
    }

    if let Some(extracted) = extract_json_field(trimmed) {
        trace!(format = %extracted.format, ?exit_code, "extracted JSON field");
        return Some(extracted);
    }

    let text = session_envelope().replace(trimmed, "");
    let text = text.trim();
    if char_len(text) < MIN_CONTENT_LEN {
        return None;
    }

    trace!(?exit_code, "falling back to plaintext output");
    Some(Extracted {
        content: text.to_string(),
        format: OutputFormat::Plaintext,
    })
}

/// 첫 `{`부터 마지막 `}`까지를 JSON 객체로 파싱 시도
fn extract_json_field(trimmed: &str) -> Option<Extracted> {
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }

    let value: Value = serde_json::from_str(&trimmed[start..=end]).ok()?;
    let object = value.as_object()?;

    FIELD_PRIORITY.iter().find_map(|(field, format)| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .filter(|s| char_len(s) >= MIN_CONTENT_LEN)
            .map(|s| Extracted {
                content: s.to_string(),
                format: *format,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(raw: &str) -> Option<Extracted> {
        extract_content(raw, Some(0))
    }

    // ------------------------------------------------------------------------
    // Gemini CLI (`--output-format json`)
    // ------------------------------------------------------------------------

    #[test]
    fn test_gemini_response_field() {
        let raw = r#"{"response": "The answer is four.", "stats": {"models": {}}}"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.content, "The answer is four.");
        assert_eq!(out.format, OutputFormat::Gemini);
    }

    #[test]
    fn test_gemini_with_leading_log_noise() {
        let raw = "Loaded cached credentials.\n{\n  \"response\": \"Refactored the parser module.\"\n}\n";
        let out = extract(raw).unwrap();
        assert_eq!(out.content, "Refactored the parser module.");
        assert_eq!(out.format, OutputFormat::Gemini);
    }

    // ------------------------------------------------------------------------
    // Claude Code (`--output-format json`)
    // ------------------------------------------------------------------------

    #[test]
    fn test_claude_result_field() {
        let raw = r#"{"type":"result","subtype":"success","is_error":false,"duration_ms":2311,"result":"Created hello.py with a main function.","session_id":"4f1c"}"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.content, "Created hello.py with a main function.");
        assert_eq!(out.format, OutputFormat::Claude);
    }

    // ------------------------------------------------------------------------
    // Generic
    // ------------------------------------------------------------------------

    #[test]
    fn test_generic_content_field() {
        let raw = r#"{"content": "Generic agent output here"}"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.content, "Generic agent output here");
        assert_eq!(out.format, OutputFormat::Generic);
    }

    #[test]
    fn test_field_priority() {
        let all = r#"{"result": "result text long", "content": "content text long", "response": "response text long"}"#;
        assert_eq!(extract(all).unwrap().format, OutputFormat::Gemini);

        let two = r#"{"result": "result text long", "content": "content text long"}"#;
        let out = extract(two).unwrap();
        assert_eq!(out.format, OutputFormat::Generic);
        assert_eq!(out.content, "content text long");
    }

    #[test]
    fn test_short_field_skipped_for_next_priority() {
        let raw = r#"{"response": "short", "result": "a long enough result"}"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.format, OutputFormat::Claude);
        assert_eq!(out.content, "a long enough result");
    }

    #[test]
    fn test_non_string_field_ignored() {
        let raw = r#"{"content": [{"type": "text", "text": "nested"}], "other": 1}"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.format, OutputFormat::Plaintext);
        assert_eq!(out.content, raw);
    }

    // ------------------------------------------------------------------------
    // No content
    // ------------------------------------------------------------------------

    #[test]
    fn test_empty_and_short_inputs() {
        assert!(extract("").is_none());
        assert!(extract("   \n\t  ").is_none());
        assert!(extract("  short  ").is_none());
        assert!(extract("123456789").is_none());
        assert!(extract("1234567890").is_some());
    }

    #[test]
    fn test_session_envelope_only_is_noise() {
        let raw = r#"{"session_id": "abc-123", "status": "ok"}"#;
        assert!(extract(raw).is_none());
    }

    // ------------------------------------------------------------------------
    // Plaintext fallback
    // ------------------------------------------------------------------------

    #[test]
    fn test_plaintext_verbatim() {
        let raw = "Here is the refactored function:\n\nfn main() {}\n";
        let out = extract(raw).unwrap();
        assert_eq!(out.format, OutputFormat::Plaintext);
        assert_eq!(out.content, raw.trim());
    }

    #[test]
    fn test_malformed_json_falls_through() {
        let raw = r#"{"response": "unterminated string that goes on"#;
        let out = extract(raw).unwrap();
        assert_eq!(out.format, OutputFormat::Plaintext);
        assert_eq!(out.content, raw);
    }

    #[test]
    fn test_braces_in_plaintext() {
        let raw = "Use a closure } like this { to capture";
        let out = extract(raw).unwrap();
        assert_eq!(out.format, OutputFormat::Plaintext);
    }

    #[test]
    fn test_exit_code_does_not_change_extraction() {
        let raw = r#"{"result": "Partial answer before failure"}"#;
        assert_eq!(extract_content(raw, Some(1)), extract_content(raw, None));
    }

    #[test]
    fn test_format_display() {
        assert_eq!(OutputFormat::Plaintext.to_string(), "plaintext");
        assert_eq!(
            serde_json::to_string(&OutputFormat::Claude).unwrap(),
            "\"claude\""
        );
    }
}
