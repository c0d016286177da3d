//! String-literal escaping as performed by each engine's client library.
//!
//! The results are literal bodies: callers add the surrounding single quotes.

/// `mysql_real_escape_string` rules.
pub fn mysql(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

/// Postgres literal body: quotes and backslashes doubled.
///
/// A body containing a backslash is only read correctly inside an `E'...'`
/// literal; see [`postgres_needs_e`]. NUL cannot appear in a Postgres text
/// value and is dropped.
pub fn postgres(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => {}
            c => out.push(c),
        }
    }
    out
}

/// `true` when `value` must be written as an `E'...'` literal.
pub fn postgres_needs_e(value: &str) -> bool {
    value.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_escapes_control_and_quote_chars() {
        assert_eq!(mysql("it's"), r"it\'s");
        assert_eq!(mysql("a\"b"), "a\\\"b");
        assert_eq!(mysql("C:\\tmp"), r"C:\\tmp");
        assert_eq!(mysql("l1\nl2\r"), r"l1\nl2\r");
        assert_eq!(mysql("x\0y\x1a"), r"x\0y\Z");
        assert_eq!(mysql("plain"), "plain");
    }

    #[test]
    fn postgres_doubles_quotes_and_backslashes() {
        assert_eq!(postgres("it's"), "it''s");
        assert_eq!(postgres(r"C:\tmp"), r"C:\\tmp");
        assert_eq!(postgres(r"\' OR 1=1 --"), r"\\'' OR 1=1 --");
        assert_eq!(postgres("a\0b"), "ab");
        assert!(postgres_needs_e(r"C:\tmp"));
        assert!(!postgres_needs_e("it's"));
    }
}
