use std::io::{self, Write};

use crate::classify::{contains, BufRecord, ESCAPED_NEWLINE};
use crate::handler::ConsoleOptions;
use crate::terminal::{check_is_terminal, Color};
use crate::unquote::append_unquoted;

const EQUAL_SPACE: &[u8] = b"= ";
const NEWLINE_TAB2: &[u8] = b"\n\t\t";
/// Minimum width of the level column.
const LEVEL_WIDTH: usize = 5;

/// Reusable state for turning encoded lines into console output.
///
/// Owns the output buffer, the key scratch buffer and the classified record.
/// All of them are truncated, never freed, between lines, so once warmed up
/// rendering does not allocate.
///
/// # Thread Safety
///
/// A renderer holds mutable scratch state and must be driven by one caller
/// at a time. Sharing it between threads requires external mutual
/// exclusion, such as the mutex held by [`crate::handler::TextHandler`]
/// around its sink. No locking happens here.
///
/// # Examples
///
/// ```
/// # use pretty_logfmt::console::ConsoleRenderer;
/// let mut renderer = ConsoleRenderer::new(false);
/// let out = renderer.render(b"time=12:00:00 level=INFO msg=\"hi there\" user=bob\n");
/// assert_eq!(out, b"12:00:00  INFO   hi there \tuser= bob\n");
/// ```
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    color: bool,
    buf: Vec<u8>,
    key_buf: Vec<u8>,
    record: BufRecord,
}

impl ConsoleRenderer {
    /// Creates a renderer, with ANSI colors when `color` is true.
    pub fn new(color: bool) -> Self {
        Self {
            color,
            buf: Vec::with_capacity(1024),
            key_buf: Vec::with_capacity(64),
            record: BufRecord::new(),
        }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Truncates all scratch state, keeping its capacity.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.key_buf.clear();
        self.record.reset();
    }

    /// Renders one encoded line.
    ///
    /// The returned bytes end with exactly one newline and have no other
    /// trailing whitespace. They borrow the renderer's buffer and are
    /// overwritten by the next call.
    pub fn render(&mut self, line: &[u8]) -> &[u8] {
        self.reset();
        self.record.parse(line);
        self.record.fold_source();
        self.format(line);
        let end = trimmed_len(&self.buf);
        self.buf.truncate(end);
        self.buf.push(b'\n');
        &self.buf
    }

    fn format(&mut self, line: &[u8]) {
        let record = &self.record;
        let buf = &mut self.buf;
        let key_buf = &mut self.key_buf;

        let level = record.level.map_or(&[][..], |s| s.resolve(line));
        let (color, err_color) = if self.color {
            (level_color(level), Color::Red)
        } else {
            (Color::NoColor, Color::NoColor)
        };

        if let Some(time) = record.time {
            add_with_color(buf, Color::NoColor, time.resolve(line));
        }
        add_with_color(buf, color, level);
        if !buf.is_empty() {
            let pad = LEVEL_WIDTH.saturating_sub(level.len());
            buf.resize(buf.len() + pad, b' ');
            buf.extend_from_slice(b"  ");
        }

        if let Some(message) = record.message {
            let message = message.resolve(line);
            append_value(buf, b"msg", message, b"\n");
            if contains(message, ESCAPED_NEWLINE) {
                buf.extend_from_slice(b"\n\t");
            } else {
                buf.extend_from_slice(b" \t");
            }
        }

        for &(key, value) in &record.errors {
            add_key(buf, key_buf, color, key.resolve(line));
            err_color.append(buf, value.resolve(line));
        }
        for &(key, value) in &record.fields {
            add_key(buf, key_buf, color, key.resolve(line));
            buf.extend_from_slice(value.resolve(line));
        }
        for &(key, value) in &record.stacktrace {
            let key = key.resolve(line);
            buf.extend_from_slice(b"\n\t");
            add_key(buf, key_buf, color, key);
            buf.extend_from_slice(NEWLINE_TAB2);
            append_value(buf, key, value.resolve(line), NEWLINE_TAB2);
        }
    }
}

/// Length of `buf` without its trailing Unicode whitespace.
///
/// Walks back one UTF-8 sequence at a time and stops at the first
/// character that is not whitespace or does not decode.
fn trimmed_len(buf: &[u8]) -> usize {
    let mut end = buf.len();
    while end > 0 {
        let mut start = end - 1;
        while start > 0 && end - start < 4 && buf[start] & 0xc0 == 0x80 {
            start -= 1;
        }
        match std::str::from_utf8(&buf[start..end]) {
            Ok(s) if s.chars().all(char::is_whitespace) => end = start,
            _ => break,
        }
    }
    end
}

/// Color for a record, chosen by the prefix of its level text.
pub fn level_color(level: &[u8]) -> Color {
    if level.starts_with(b"DEBUG") {
        Color::Magenta
    } else if level.starts_with(b"INFO") {
        Color::Cyan
    } else if level.starts_with(b"WARN") {
        Color::Yellow
    } else if level.starts_with(b"ERROR") {
        Color::Red
    } else {
        Color::NoColor
    }
}

/// Two spaces separate tokens, except right after a tab.
fn separate(buf: &mut Vec<u8>) {
    if matches!(buf.last(), Some(&b) if b != b'\t') {
        buf.extend_from_slice(b"  ");
    }
}

fn add_with_color(buf: &mut Vec<u8>, color: Color, s: &[u8]) {
    if s.is_empty() {
        return;
    }
    separate(buf);
    color.append(buf, s);
}

fn add_key(buf: &mut Vec<u8>, key_buf: &mut Vec<u8>, color: Color, key: &[u8]) {
    key_buf.clear();
    key_buf.extend_from_slice(key);
    key_buf.extend_from_slice(EQUAL_SPACE);
    add_with_color(buf, color, key_buf);
}

/// Appends an unquoted value, or a visible marker if it cannot be decoded.
fn append_value(buf: &mut Vec<u8>, key: &[u8], value: &[u8], newline: &[u8]) {
    if append_unquoted(buf, value, newline).is_err() {
        let key = String::from_utf8_lossy(key);
        if matches!(buf.last(), Some(&b) if b != b' ') {
            buf.push(b' ');
        }
        buf.extend_from_slice(
            format!(
                "!!![pretty_logfmt] bug: value of field {} is not a valid quoted string",
                key
            )
            .as_bytes(),
        );
    }
}

/// An [`io::Write`] adapter that pretty-prints encoded log lines.
///
/// Every `write` call must carry exactly one complete encoded record, as
/// produced by [`crate::handler::TextHandler`]. The rendered line is written
/// to the inner writer with a single `write_all`.
///
/// `write` reports the length of its input as written, whatever the length
/// of the rendered output, so encoders that check the count keep working.
/// Errors of the inner writer are returned unchanged and nothing is retried.
pub struct ConsoleWriter<W: Write> {
    writer: W,
    renderer: ConsoleRenderer,
}

impl<W: Write> ConsoleWriter<W> {
    /// Wraps `writer`, with colors when `color` is true.
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            writer,
            renderer: ConsoleRenderer::new(color),
        }
    }

    /// Wraps `writer`, choosing colors from `opts`: forced on by
    /// `force_color`, otherwise on for an interactive terminal unless
    /// `no_color` is set.
    pub fn detect(writer: W, opts: &ConsoleOptions) -> Self
    where
        W: 'static,
    {
        let color = opts.force_color || (!opts.no_color && check_is_terminal(&writer));
        Self::new(writer, color)
    }

    pub fn color(&self) -> bool {
        self.renderer.color()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Write for ConsoleWriter<W> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        let out = self.renderer.render(p);
        self.writer.write_all(out)?;
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
