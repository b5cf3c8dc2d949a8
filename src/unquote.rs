//! Decoding of double-quoted values back into their raw text.

use std::fmt;

use crate::tokenizer::EMPTY_QUOTED;

/// A quoted value held an escape sequence that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidEscape;

impl fmt::Display for InvalidEscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid escape sequence in quoted string")
    }
}

impl std::error::Error for InvalidEscape {}

/// One decoded unit of a quoted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unquoted {
    /// A raw byte, either copied through or produced by `\x`/octal escapes.
    Byte(u8),
    /// A code point produced by a `\u` or `\U` escape.
    Char(char),
}

/// Decodes the first character or escape sequence of `s`, the body of a
/// string quoted with `quote`.
///
/// Supports the usual escapes `\a \b \f \n \r \t \v \\`, the quote itself,
/// `\xHH`, three-digit octal `\OOO`, `\uHHHH` and `\UHHHHHHHH`. An unescaped
/// `quote` byte is an error. Returns the decoded unit and the remaining input.
pub fn unquote_char(s: &[u8], quote: u8) -> Result<(Unquoted, &[u8]), InvalidEscape> {
    let (&c, rest) = s.split_first().ok_or(InvalidEscape)?;
    if c == quote && (quote == b'"' || quote == b'\'') {
        return Err(InvalidEscape);
    }
    if c != b'\\' {
        return Ok((Unquoted::Byte(c), rest));
    }
    let (&c, rest) = rest.split_first().ok_or(InvalidEscape)?;
    let byte = |b| Ok((Unquoted::Byte(b), rest));
    match c {
        b'a' => byte(0x07),
        b'b' => byte(0x08),
        b'f' => byte(0x0c),
        b'n' => byte(b'\n'),
        b'r' => byte(b'\r'),
        b't' => byte(b'\t'),
        b'v' => byte(0x0b),
        b'\\' => byte(b'\\'),
        b'\'' | b'"' if c == quote => byte(c),
        b'x' => {
            let (v, rest) = hex_digits(rest, 2)?;
            Ok((Unquoted::Byte(v as u8), rest))
        }
        b'u' | b'U' => {
            let n = if c == b'u' { 4 } else { 8 };
            let (v, rest) = hex_digits(rest, n)?;
            let ch = char::from_u32(v).ok_or(InvalidEscape)?;
            Ok((Unquoted::Char(ch), rest))
        }
        b'0'..=b'7' => {
            let digits = rest.get(..2).ok_or(InvalidEscape)?;
            let mut v = u32::from(c - b'0');
            for &d in digits {
                if !(b'0'..=b'7').contains(&d) {
                    return Err(InvalidEscape);
                }
                v = v * 8 + u32::from(d - b'0');
            }
            if v > 255 {
                return Err(InvalidEscape);
            }
            Ok((Unquoted::Byte(v as u8), &rest[2..]))
        }
        _ => Err(InvalidEscape),
    }
}

fn hex_digits(s: &[u8], n: usize) -> Result<(u32, &[u8]), InvalidEscape> {
    let digits = s.get(..n).ok_or(InvalidEscape)?;
    let mut v = 0u32;
    for &d in digits {
        let x = (d as char).to_digit(16).ok_or(InvalidEscape)?;
        v = (v << 4) | x;
    }
    Ok((v, &s[n..]))
}

/// Appends `value` to `buf`, decoding it if it is a double-quoted string.
///
/// Unquoted values and values that do not both start and end with `"` are
/// copied unchanged. Inside a quoted value every decoded line break is
/// replaced with `newline`. The literal empty string `""` is kept as is so
/// that an empty value stays visible.
///
/// On an undecodable escape, whatever was decoded so far stays in `buf` and
/// the error is returned for the caller to report.
pub fn append_unquoted(buf: &mut Vec<u8>, value: &[u8], newline: &[u8]) -> Result<(), InvalidEscape> {
    if value == EMPTY_QUOTED {
        buf.extend_from_slice(EMPTY_QUOTED);
        return Ok(());
    }
    let quoted = value.len() >= 2 && value[0] == b'"' && value[value.len() - 1] == b'"';
    if !quoted {
        buf.extend_from_slice(value);
        return Ok(());
    }
    let mut s = &value[1..value.len() - 1];
    if !s.contains(&b'\\') && !s.contains(&b'\n') {
        buf.extend_from_slice(s);
        return Ok(());
    }
    while !s.is_empty() {
        let (unit, rest) = unquote_char(s, b'"')?;
        match unit {
            Unquoted::Byte(b'\n') => buf.extend_from_slice(newline),
            Unquoted::Byte(b) => buf.push(b),
            Unquoted::Char(ch) => {
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
            }
        }
        s = rest;
    }
    Ok(())
}
