//! Splitting of one encoded `key=value` line into key and value spans.

/// Value produced for a key that ends the line without any value.
pub const EMPTY_QUOTED: &[u8] = b"\"\"";

/// A byte range of a parsed line, or a constant that does not occur in it.
///
/// Spans let a classified record point into the line it was parsed from
/// without borrowing it, so the record can be kept and reused across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Range { start: usize, end: usize },
    Static(&'static [u8]),
}

impl Span {
    #[inline]
    pub const fn range(start: usize, end: usize) -> Self {
        Span::Range { start, end }
    }

    /// Returns the bytes this span refers to in `line`.
    ///
    /// # Panics
    ///
    /// Panics if the span was produced from a shorter line.
    #[inline]
    pub fn resolve<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        match *self {
            Span::Range { start, end } => &line[start..end],
            Span::Static(bytes) => bytes,
        }
    }
}

/// Iterator over the `(key, value)` spans of one line.
///
/// The grammar is a sequence of `key=value` tokens separated by single spaces,
/// where a value is either a bare run of bytes up to the next space or a
/// double-quoted string in which `"` and `\` are escaped with a backslash.
///
/// Malformed input never fails:
///
/// * a token without `=` (or starting with `=`) takes the rest of the line as
///   a key with an empty value and ends the iteration
/// * an unterminated quoted value extends to the end of the line
///
/// # Examples
///
/// ```
/// # use pretty_logfmt::tokenizer::Tokenizer;
/// let line = br#"level=INFO msg="hello world" n=3"#;
/// let pairs: Vec<(&[u8], &[u8])> = Tokenizer::new(line)
///     .map(|(k, v)| (k.resolve(line), v.resolve(line)))
///     .collect();
/// assert_eq!(pairs, vec![
///     (&b"level"[..], &b"INFO"[..]),
///     (&b"msg"[..], &br#""hello world""#[..]),
///     (&b"n"[..], &b"3"[..]),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }

    fn next_key(&mut self) -> Span {
        let rest = self.rest();
        match memchr(b'=', rest) {
            Some(idx) if idx > 0 => {
                let key = Span::range(self.pos, self.pos + idx);
                self.pos += idx + 1;
                key
            }
            _ => {
                let key = Span::range(self.pos, self.line.len());
                self.pos = self.line.len();
                key
            }
        }
    }

    fn next_value(&mut self) -> Span {
        let rest = self.rest();
        if rest.is_empty() {
            return Span::Static(EMPTY_QUOTED);
        }
        let len = if rest[0] == b'"' {
            closing_quote(rest).map_or(rest.len(), |idx| idx + 1)
        } else {
            memchr(b' ', rest).unwrap_or(rest.len())
        };
        let value = Span::range(self.pos, self.pos + len);
        self.pos += len;
        if self.line.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        value
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = (Span, Span);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.line.len() {
            return None;
        }
        let key = self.next_key();
        let value = self.next_value();
        Some((key, value))
    }
}

/// Index of the first `"` after position 0 that is not preceded by `\`.
fn closing_quote(s: &[u8]) -> Option<usize> {
    (1..s.len()).find(|&i| s[i] == b'"' && s[i - 1] != b'\\')
}

#[inline]
fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(line: &[u8]) -> Vec<(String, String)> {
        Tokenizer::new(line)
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(k.resolve(line)).into_owned(),
                    String::from_utf8_lossy(v.resolve(line)).into_owned(),
                )
            })
            .collect()
    }

    fn owned(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_tokens() {
        assert_eq!(
            pairs(b"time=12:00 level=WARN msg=hi"),
            owned(&[("time", "12:00"), ("level", "WARN"), ("msg", "hi")])
        );
    }

    #[test]
    fn test_quoted_value_with_escapes() {
        let line = br#"msg="say \"hi\" \\ now" next=1"#;
        assert_eq!(
            pairs(line),
            owned(&[("msg", r#""say \"hi\" \\ now""#), ("next", "1")])
        );
    }

    #[test]
    fn test_equals_inside_quoted_value() {
        assert_eq!(
            pairs(br#"q="a=b c" d=e"#),
            owned(&[("q", r#""a=b c""#), ("d", "e")])
        );
    }

    #[test]
    fn test_trailing_key_gets_empty_quoted_value() {
        assert_eq!(pairs(b"a=1 b="), owned(&[("a", "1"), ("b", "\"\"")]));
    }

    #[test]
    fn test_key_without_separator_closes_line() {
        assert_eq!(
            pairs(b"a=1 garbage here"),
            owned(&[("a", "1"), ("garbage here", "\"\"")])
        );
        assert_eq!(pairs(b"=oops x=1"), owned(&[("=oops x=1", "\"\"")]));
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(
            pairs(br#"a=1 msg="never closed x=2"#),
            owned(&[("a", "1"), ("msg", r#""never closed x=2"#)])
        );
    }

    #[test]
    fn test_only_one_separator_space_is_consumed() {
        assert_eq!(pairs(b"a=1   b=2"), owned(&[("a", "1"), ("  b", "2")]));
    }

    #[test]
    fn test_empty_line() {
        assert!(pairs(b"").is_empty());
    }
}
