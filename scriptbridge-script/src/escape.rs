//! Escaping of text embedded in generated Python source
//!
//! Both user code and inlined payloads are embedded as `'''...'''` string
//! literals. [`escape_triple_quoted`] makes the literal's value equal to the
//! input text byte for byte: every backslash and single quote is escaped, so
//! the text can never contain the `'''` terminator, and the characters Python
//! refuses or rewrites in source (NUL, CR) are written as escape sequences.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Reserved words that cannot be assignment targets
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Escape `text` for use between `'''` delimiters
pub fn escape_triple_quoted(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\r' => escaped.push_str("\\r"),
            '\0' => escaped.push_str("\\x00"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Full `'''...'''` literal whose value is `text`
pub fn triple_quoted_literal(text: &str) -> String {
    format!("'''{}'''", escape_triple_quoted(text))
}

/// Whether `name` can be bound with a plain `name = ...` statement
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !PYTHON_KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of the escapes above, the way the interpreter reads them
    fn unescape(literal_body: &str) -> String {
        let mut out = String::new();
        let mut chars = literal_body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('r') => out.push('\r'),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    let code = u32::from_str_radix(&hex, 16).unwrap();
                    out.push(char::from_u32(code).unwrap());
                }
                other => panic!("unexpected escape {other:?}"),
            }
        }
        out
    }

    #[test]
    fn test_terminator_cannot_survive() {
        let hostile = "x = 1\n''' + __import__('os').system('echo pwned') + '''";
        let escaped = escape_triple_quoted(hostile);
        assert!(!escaped.contains("'''"));
        assert_eq!(unescape(&escaped), hostile);
    }

    #[test]
    fn test_backslashes_survive() {
        let code = r#"print("a\nb")  # \ trailing"#;
        assert_eq!(unescape(&escape_triple_quoted(code)), code);
    }

    #[test]
    fn test_json_payload_round_trip() {
        let payload = serde_json::json!({
            "input_text": "it's a \"quoted\" ''' test\\ with \r\n newlines",
            "nested": {"path": "C:\\temp\\file", "nul": "\u{0}"}
        });
        let text = payload.to_string();
        let escaped = escape_triple_quoted(&text);
        assert!(!escaped.contains("'''"));

        let decoded: serde_json::Value = serde_json::from_str(&unescape(&escaped)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_literal_ending_in_quote() {
        let literal = triple_quoted_literal("ends with '");
        assert_eq!(literal, r"'''ends with \''''");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("query"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("with-dash"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("class"));
        assert!(!is_identifier("None"));
    }
}
