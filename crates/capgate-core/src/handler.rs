//! Replies produced by bound routes

use std::fmt::Write;

pub const TEXT_PLAIN: &str = "text/plain";

/// Framework-independent HTTP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: TEXT_PLAIN,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }
}

/// What the not-found handler gets to see about an unmatched request
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub uri: String,
    /// Query parameters in the order they were received
    pub args: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestInfo {
    /// Diagnostic 404 listing method, URI and every received argument.
    /// A non-empty body counts as an argument named `plain`.
    pub fn not_found(&self) -> Reply {
        let mut args: Vec<(&str, &str)> = self
            .args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(body) = self.body.as_deref().filter(|b| !b.is_empty()) {
            args.push(("plain", body));
        }

        let mut message = String::from("File Not Found\n\n");
        let _ = write!(
            message,
            "URI: {}\nMethod: {}\nArguments: {}\n",
            self.uri,
            self.method,
            args.len()
        );
        for (name, value) in args {
            let _ = writeln!(message, " {}: {}", name, value);
        }

        Reply {
            status: 404,
            content_type: TEXT_PLAIN,
            body: message,
        }
    }
}

/// Parse the leading integer of `raw`, the way microcontroller `toInt` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, and input without digits yields 0. Out-of-range values saturate.
pub fn parse_int_lenient(raw: &str) -> i32 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_lenient() {
        assert_eq!(parse_int_lenient("128"), 128);
        assert_eq!(parse_int_lenient("  42\n"), 42);
        assert_eq!(parse_int_lenient("-7"), -7);
        assert_eq!(parse_int_lenient("+9"), 9);
        assert_eq!(parse_int_lenient("12abc"), 12);
        assert_eq!(parse_int_lenient("abc"), 0);
        assert_eq!(parse_int_lenient(""), 0);
        assert_eq!(parse_int_lenient("-"), 0);
    }

    #[test]
    fn test_parse_int_saturates() {
        assert_eq!(parse_int_lenient("99999999999999"), i32::MAX);
        assert_eq!(parse_int_lenient("-99999999999999"), i32::MIN);
        assert_eq!(parse_int_lenient("-2147483648"), i32::MIN);
    }

    #[test]
    fn test_not_found_body() {
        let info = RequestInfo {
            method: "GET".to_string(),
            uri: "/nope".to_string(),
            args: vec![("a".to_string(), "1".to_string())],
            body: Some("hello".to_string()),
        };
        let reply = info.not_found();
        assert_eq!(reply.status, 404);
        assert_eq!(
            reply.body,
            "File Not Found\n\nURI: /nope\nMethod: GET\nArguments: 2\n a: 1\n plain: hello\n"
        );
    }

    #[test]
    fn test_not_found_ignores_empty_body() {
        let info = RequestInfo {
            method: "POST".to_string(),
            uri: "/x".to_string(),
            args: Vec::new(),
            body: Some(String::new()),
        };
        assert!(info.not_found().body.ends_with("Arguments: 0\n"));
    }
}
