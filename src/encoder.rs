//! Encoding of attributes into `key=value` text.
//!
//! This produces the line grammar the console renderer consumes: tokens
//! separated by single spaces, values quoted only when they would otherwise
//! be ambiguous.

use std::io::Write as _;

use crate::attr::{Attr, Value};

/// Appends `key=value`, preceded by a space unless `buf` is empty.
pub fn append_key_value(buf: &mut Vec<u8>, key: &str, value: &str) {
    if !buf.is_empty() {
        buf.push(b' ');
    }
    append_string(buf, key);
    buf.push(b'=');
    append_string(buf, value);
}

/// Appends `attr`, with its key prefixed by `prefix` (a group path ending in
/// `.`, or empty). Groups are flattened into one token per member.
pub fn append_attr(buf: &mut Vec<u8>, prefix: &str, attr: &Attr) {
    if attr.is_empty() {
        return;
    }
    if let Value::Group(attrs) = &attr.value {
        let mut nested = prefix.to_string();
        if !attr.key.is_empty() {
            nested.push_str(&attr.key);
            nested.push('.');
        }
        for a in attrs {
            append_attr(buf, &nested, a);
        }
        return;
    }
    if !buf.is_empty() {
        buf.push(b' ');
    }
    if prefix.is_empty() {
        append_string(buf, &attr.key);
    } else {
        append_string(buf, &format!("{}{}", prefix, attr.key));
    }
    buf.push(b'=');
    append_value(buf, &attr.value);
}

fn append_value(buf: &mut Vec<u8>, value: &Value) {
    // Writes into a Vec cannot fail.
    let _ = match value {
        Value::Str(s) | Value::Error(s) => {
            append_string(buf, s);
            Ok(())
        }
        Value::Int(v) => write!(buf, "{}", v),
        Value::Uint(v) => write!(buf, "{}", v),
        Value::Float(v) => write!(buf, "{}", v),
        Value::Bool(v) => write!(buf, "{}", v),
        Value::Group(_) => Ok(()),
    };
}

/// Appends `s`, quoted when [`needs_quoting`] says so.
pub fn append_string(buf: &mut Vec<u8>, s: &str) {
    if needs_quoting(s) {
        append_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Reports whether `s` must be quoted to survive as a single value.
///
/// Empty strings and strings containing spaces, `=`, `"`, control or
/// non-printable characters are quoted. A lone backslash is not special
/// outside quotes.
pub fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.chars().any(|c| {
        if c.is_ascii() {
            c != '\\' && (c == ' ' || c == '=' || c == '"' || !c.is_ascii_graphic())
        } else {
            c.is_whitespace() || c.is_control() || c == char::REPLACEMENT_CHARACTER
        }
    })
}

/// Appends `s` as a double-quoted string literal.
pub fn append_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                buf.extend_from_slice(format!("\\x{:02x}", c as u32).as_bytes());
            }
            c if c.is_control() => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr;
    use crate::unquote::append_unquoted;

    fn encoded(attrs: &[Attr]) -> String {
        let mut buf = Vec::new();
        for a in attrs {
            append_attr(&mut buf, "", a);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_quoting_rules() {
        assert!(needs_quoting(""));
        assert!(needs_quoting("a b"));
        assert!(needs_quoting("a=b"));
        assert!(needs_quoting("say \"hi\""));
        assert!(needs_quoting("line\nbreak"));
        assert!(needs_quoting("nbsp\u{a0}"));
        assert!(!needs_quoting("plain"));
        assert!(!needs_quoting(r"C:\path"));
        assert!(!needs_quoting("héllo"));
    }

    #[test]
    fn test_append_quoted() {
        let mut buf = Vec::new();
        append_quoted(&mut buf, "a \"q\" \\ \n\t\x1b");
        assert_eq!(buf, br#""a \"q\" \\ \n\t\x1b""#);
    }

    #[test]
    fn test_quoted_round_trip() {
        let original = "say \"hi\" \\ to\n世界\ttab\x01";
        let mut quoted = Vec::new();
        append_quoted(&mut quoted, original);
        let mut decoded = Vec::new();
        append_unquoted(&mut decoded, &quoted, b"\n").unwrap();
        assert_eq!(decoded, original.as_bytes());
    }

    #[test]
    fn test_attrs() {
        assert_eq!(
            encoded(&[
                attr::int("n", -3),
                attr::uint("u", 4),
                attr::float("f", 1.5),
                attr::bool("ok", true),
                attr::string("s", "two words"),
                attr::string("e", ""),
            ]),
            r#"n=-3 u=4 f=1.5 ok=true s="two words" e="""#
        );
    }

    #[test]
    fn test_groups_are_flattened() {
        assert_eq!(
            encoded(&[
                attr::group("req", vec![attr::string("method", "GET"), attr::group("hdr", vec![attr::int("len", 2)])]),
                attr::group("", vec![attr::int("inline", 1)]),
                attr::group("empty", vec![]),
                attr::string("", "dropped"),
            ]),
            "req.method=GET req.hdr.len=2 inline=1"
        );
    }

    #[test]
    fn test_key_value() {
        let mut buf = Vec::new();
        append_key_value(&mut buf, "time", "01/02 15:04:05.000");
        append_key_value(&mut buf, "level", "INFO");
        assert_eq!(buf, br#"time="01/02 15:04:05.000" level=INFO"#);
    }
}
