use crate::tokenizer::{Span, Tokenizer};

/// Key of the record timestamp.
pub const TIME_KEY: &str = "time";
/// Key of the record level.
pub const LEVEL_KEY: &str = "level";
/// Key of the source code location.
pub const SOURCE_KEY: &str = "source";
/// Key of the log message.
pub const MESSAGE_KEY: &str = "msg";

/// Two-byte escape marking a line break inside a quoted value.
pub(crate) const ESCAPED_NEWLINE: &[u8] = b"\\n";

/// One encoded line, bucketed by the role of each field.
///
/// The four built-in keys fill single-valued slots, only the first
/// occurrence of each does; repeats fall through to the generic buckets.
/// Every other field lands in exactly one of the ordered buckets, chosen in
/// this order:
///
/// 1. `stacktrace` - the key contains `stack` or `trace` and the value holds
///    an escaped line break
/// 2. `errors` - the key is `err` or `error`, or ends with `.err` or `.error`
/// 3. `fields` - everything else
///
/// Spans point into the line passed to [`parse`](BufRecord::parse), the
/// record is only meaningful together with that line. The buckets keep their
/// capacity across [`reset`](BufRecord::reset) so a long-lived record stops
/// allocating once it has seen its widest line.
#[derive(Debug, Default, Clone)]
pub struct BufRecord {
    pub time: Option<Span>,
    pub level: Option<Span>,
    pub source: Option<Span>,
    pub message: Option<Span>,
    pub stacktrace: Vec<(Span, Span)>,
    pub errors: Vec<(Span, Span)>,
    pub fields: Vec<(Span, Span)>,
}

impl BufRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every slot and bucket, keeping the allocated capacity.
    pub fn reset(&mut self) {
        self.time = None;
        self.level = None;
        self.source = None;
        self.message = None;
        self.stacktrace.clear();
        self.errors.clear();
        self.fields.clear();
    }

    /// Tokenizes `line` and classifies each field into this record.
    ///
    /// Trailing newlines are ignored. The record is not reset first, call
    /// [`reset`](Self::reset) when reusing it.
    pub fn parse(&mut self, line: &[u8]) {
        let line = trim_newlines(line);
        for (key, value) in Tokenizer::new(line) {
            self.add_field(line, key, value);
        }
    }

    /// Moves a source location into the generic fields under the `source`
    /// key, so it renders after the message like any other attribute.
    pub fn fold_source(&mut self) {
        if let Some(source) = self.source.take() {
            self.fields
                .push((Span::Static(SOURCE_KEY.as_bytes()), source));
        }
    }

    /// Classifies one field. `key` and `value` must be spans of `line`.
    pub fn add_field(&mut self, line: &[u8], key: Span, mut value: Span) {
        let k = key.resolve(line);
        let v = value.resolve(line);
        let slot = match k {
            k if k == TIME_KEY.as_bytes() => Some(&mut self.time),
            k if k == LEVEL_KEY.as_bytes() => Some(&mut self.level),
            k if k == SOURCE_KEY.as_bytes() => Some(&mut self.source),
            k if k == MESSAGE_KEY.as_bytes() => Some(&mut self.message),
            _ => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                if k == TIME_KEY.as_bytes() {
                    value = strip_quotes(value, v);
                }
                *slot = Some(value);
                return;
            }
        }
        let bucket = if is_stacktrace(k, v) {
            &mut self.stacktrace
        } else if is_error_key(k) {
            &mut self.errors
        } else {
            &mut self.fields
        };
        bucket.push((key, value));
    }
}

fn is_stacktrace(key: &[u8], value: &[u8]) -> bool {
    (contains(key, b"stack") || contains(key, b"trace")) && contains(value, ESCAPED_NEWLINE)
}

fn is_error_key(key: &[u8]) -> bool {
    key == b"err" || key == b"error" || key.ends_with(b".err") || key.ends_with(b".error")
}

fn strip_quotes(span: Span, bytes: &[u8]) -> Span {
    match span {
        Span::Range { start, end }
            if bytes.len() > 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' =>
        {
            Span::range(start + 1, end - 1)
        }
        _ => span,
    }
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub(crate) fn trim_newlines(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && line[end - 1] == b'\n' {
        end -= 1;
    }
    &line[..end]
}
