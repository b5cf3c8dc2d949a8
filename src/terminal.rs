use std::any::Any;
use std::fs::File;
use std::io::{self, IsTerminal};

/// ANSI terminal colors used by the console renderer.
///
/// The discriminant is the SGR foreground code written inside the escape
/// sequence, `NoColor` disables wrapping entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Color {
    #[default]
    NoColor = 0,
    Black = 30,
    Red = 31,
    Green = 32,
    Yellow = 33,
    Blue = 34,
    Magenta = 35,
    Cyan = 36,
    Gray = 37,
}

const ESC_RESET: &[u8] = b"\x1b[0m";

impl Color {
    /// Returns the SGR code of this color.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Appends `s` to `buf`, wrapped in escape codes unless this is `NoColor`.
    ///
    /// Empty input appends nothing, not even the escape codes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pretty_logfmt::terminal::Color;
    /// let mut buf = Vec::new();
    /// Color::Red.append(&mut buf, b"boom");
    /// assert_eq!(buf, b"\x1b[31mboom\x1b[0m");
    ///
    /// buf.clear();
    /// Color::NoColor.append(&mut buf, b"boom");
    /// assert_eq!(buf, b"boom");
    /// ```
    pub fn append(self, buf: &mut Vec<u8>, s: &[u8]) {
        if s.is_empty() {
            return;
        }
        if self == Color::NoColor {
            buf.extend_from_slice(s);
            return;
        }
        let code = self.code();
        buf.extend_from_slice(b"\x1b[");
        buf.push(b'0' + code / 10);
        buf.push(b'0' + code % 10);
        buf.push(b'm');
        buf.extend_from_slice(s);
        buf.extend_from_slice(ESC_RESET);
    }

    /// Returns `s` wrapped in escape codes unless this is `NoColor`.
    pub fn format(self, s: &str) -> String {
        if self == Color::NoColor {
            return s.to_string();
        }
        format!("\x1b[{}m{}\x1b[0m", self.code(), s)
    }
}

/// Reports whether `w` writes to an interactive terminal.
///
/// Only the process standard streams and files can be probed, every other
/// writer (buffers, pipes wrapped in adapters, ...) is treated as
/// non-interactive.
pub fn check_is_terminal<W: Any>(w: &W) -> bool {
    let w = w as &dyn Any;
    if let Some(out) = w.downcast_ref::<io::Stdout>() {
        return out.is_terminal();
    }
    if let Some(err) = w.downcast_ref::<io::Stderr>() {
        return err.is_terminal();
    }
    if let Some(file) = w.downcast_ref::<File>() {
        return file.is_terminal();
    }
    false
}
