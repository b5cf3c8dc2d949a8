use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::attr::{self, Attr, Value};
use crate::classify::{LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY};
use crate::console::ConsoleWriter;
use crate::encoder::{append_attr, append_key_value};
use crate::level::{Level, Leveler};

/// Time layout used by [`TextHandler`] unless configured otherwise.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";
/// Compact time layout used by [`ConsoleHandler`] unless configured otherwise.
pub const CONSOLE_TIME_FORMAT: &str = "%m/%d %H:%M:%S%.3f";
/// Key of the logger name attribute added by `HandlerOptions::add_logger`.
pub const LOGGER_KEY: &str = "logger";

/// Code location a record was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub file: &'static str,
    pub line: u32,
}

impl Source {
    /// `file:line` with the file trimmed to its last two path components.
    pub fn short(&self) -> String {
        let file = self.file.replace('\\', "/");
        let mut parts = file.rsplitn(3, '/');
        let name = parts.next().unwrap_or_default();
        match parts.next() {
            Some(dir) => format!("{}/{}:{}", dir, name, self.line),
            None => format!("{}:{}", name, self.line),
        }
    }

    /// `file:line` with the file as recorded.
    pub fn full(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

impl From<&'static Location<'static>> for Source {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

/// How the `source` attribute is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// Last two path components and the line.
    #[default]
    Short,
    /// The full recorded path and the line.
    FullPath,
    /// A `source` group with `file` and `line` members.
    Group,
}

/// Builds the attribute for a record's source, replacing `source_format`.
pub type SourceFormatter = Arc<dyn Fn(&Source) -> Attr + Send + Sync>;

/// Builds the attribute for an error value from its key and the error.
pub type ErrorFormatter = Arc<dyn Fn(&str, &dyn fmt::Display) -> Attr + Send + Sync>;

/// A log event handed to a [`Handler`].
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Local>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    pub attrs: Vec<Attr>,
}

impl Record {
    /// A record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            level,
            message: message.into(),
            source: None,
            attrs: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }
}

/// Options for console output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    /// Disables colors even on a terminal.
    pub no_color: bool,
    /// Enables colors even when the sink is not a terminal.
    pub force_color: bool,
}

/// Options shared by all handlers.
#[derive(Clone)]
pub struct HandlerOptions {
    /// Adds a `source=file:line` attribute when the record has a location.
    pub add_source: bool,
    pub source_format: SourceFormat,
    /// Overrides `source_format` when set.
    pub source_formatter: Option<SourceFormatter>,
    /// Applied to every error attribute, including those inside groups.
    pub error_formatter: Option<ErrorFormatter>,
    /// Minimum level, possibly per logger name.
    pub level: Arc<dyn Leveler>,
    /// Adds a `logger=<name>` attribute for named loggers.
    pub add_logger: bool,
    /// chrono format string for the `time` attribute, `None` for the
    /// handler's default.
    pub time_format: Option<String>,
    pub console: ConsoleOptions,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            add_source: false,
            source_format: SourceFormat::default(),
            source_formatter: None,
            error_formatter: None,
            level: Arc::new(Level::INFO),
            add_logger: false,
            time_format: None,
            console: ConsoleOptions::default(),
        }
    }
}

impl HandlerOptions {
    /// Options with the given level source and everything else defaulted.
    pub fn with_level(level: impl Leveler + 'static) -> Self {
        Self {
            level: Arc::new(level),
            ..Self::default()
        }
    }

    /// The attribute describing `source`.
    pub fn source_attr(&self, source: &Source) -> Attr {
        if let Some(format) = &self.source_formatter {
            return format(source);
        }
        match self.source_format {
            SourceFormat::Short => attr::string(SOURCE_KEY, source.short()),
            SourceFormat::FullPath => attr::string(SOURCE_KEY, source.full()),
            SourceFormat::Group => attr::group(
                SOURCE_KEY,
                vec![
                    attr::string("file", source.file),
                    attr::uint("line", u64::from(source.line)),
                ],
            ),
        }
    }

    /// `a` with its error values passed through `error_formatter`.
    pub fn format_attr<'a>(&self, a: &'a Attr) -> Cow<'a, Attr> {
        match &self.error_formatter {
            Some(format) if attr::has_error(a) => Cow::Owned(format_errors(format, a)),
            _ => Cow::Borrowed(a),
        }
    }
}

fn format_errors(format: &ErrorFormatter, a: &Attr) -> Attr {
    match &a.value {
        Value::Error(msg) => format(a.key.as_str(), msg as &dyn fmt::Display),
        Value::Group(attrs) => attr::group(
            a.key.clone(),
            attrs.iter().map(|m| format_errors(format, m)).collect(),
        ),
        _ => a.clone(),
    }
}

/// Capability shared by every handler variant.
///
/// Handlers are cheap to derive: `with_*` return new handlers sharing the
/// original sink.
pub trait Handler: Send + Sync {
    /// Reports whether a record at `level` would be emitted.
    fn enabled(&self, level: Level) -> bool;

    /// Emits one record.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying sink, if any.
    fn handle(&self, record: &Record) -> io::Result<()>;

    /// A handler that adds `attrs` to every record.
    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler>;

    /// A handler that nests the keys of later attributes under `name`.
    fn with_group(&self, name: &str) -> Arc<dyn Handler>;

    /// A handler for the logger called `name`.
    fn with_name(&self, name: &str) -> Arc<dyn Handler>;

    /// The logger name, empty for the root logger.
    fn name(&self) -> &str;
}

/// Handler writing one `key=value` line per record.
///
/// Each record is encoded into a private buffer and then written to the
/// sink in a single `write_all` under the sink mutex, so handlers derived
/// from the same root never interleave their lines.
pub struct TextHandler<W: Write + Send + 'static> {
    sink: Arc<Mutex<W>>,
    opts: Arc<HandlerOptions>,
    name: String,
    /// Group path applied to record attributes, each group followed by `.`.
    groups: String,
    /// Attributes from `with_attrs`, already encoded.
    preformatted: Vec<u8>,
    time_format: String,
}

impl<W: Write + Send + 'static> TextHandler<W> {
    pub fn new(writer: W, opts: HandlerOptions) -> Self {
        Self::with_time_format(writer, opts, DEFAULT_TIME_FORMAT)
    }

    fn with_time_format(writer: W, opts: HandlerOptions, default_format: &str) -> Self {
        let time_format = opts
            .time_format
            .clone()
            .unwrap_or_else(|| default_format.to_string());
        Self {
            sink: Arc::new(Mutex::new(writer)),
            opts: Arc::new(opts),
            name: String::new(),
            groups: String::new(),
            preformatted: Vec::new(),
            time_format,
        }
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.opts
    }

    /// Runs `f` with exclusive access to the sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.sink.lock())
    }

    fn derive(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            opts: Arc::clone(&self.opts),
            name: self.name.clone(),
            groups: self.groups.clone(),
            preformatted: self.preformatted.clone(),
            time_format: self.time_format.clone(),
        }
    }

    fn derive_attrs(&self, attrs: &[Attr]) -> Self {
        let mut h = self.derive();
        for a in attrs {
            append_attr(&mut h.preformatted, &h.groups, &h.opts.format_attr(a));
        }
        h
    }

    fn derive_group(&self, name: &str) -> Self {
        let mut h = self.derive();
        if !name.is_empty() {
            h.groups.push_str(name);
            h.groups.push('.');
        }
        h
    }

    fn derive_name(&self, name: &str) -> Self {
        let mut h = self.derive();
        h.name = name.to_string();
        h
    }

    /// Encodes `record` as one newline-terminated line.
    pub fn encode(&self, record: &Record) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        let time = record.time.format(&self.time_format).to_string();
        append_key_value(&mut buf, TIME_KEY, &time);
        append_key_value(&mut buf, LEVEL_KEY, &record.level.to_string());
        if self.opts.add_source {
            if let Some(source) = &record.source {
                append_attr(&mut buf, "", &self.opts.source_attr(source));
            }
        }
        append_key_value(&mut buf, MESSAGE_KEY, &record.message);
        if self.opts.add_logger && !self.name.is_empty() {
            append_key_value(&mut buf, LOGGER_KEY, &self.name);
        }
        if !self.preformatted.is_empty() {
            buf.push(b' ');
            buf.extend_from_slice(&self.preformatted);
        }
        for a in &record.attrs {
            append_attr(&mut buf, &self.groups, &self.opts.format_attr(a));
        }
        buf.push(b'\n');
        buf
    }
}

pub(crate) fn is_enabled(opts: &HandlerOptions, name: &str, level: Level) -> bool {
    let min = if name.is_empty() {
        opts.level.level()
    } else {
        opts.level.logger_level(name)
    };
    level >= min
}

impl<W: Write + Send + 'static> Handler for TextHandler<W> {
    fn enabled(&self, level: Level) -> bool {
        is_enabled(&self.opts, &self.name, level)
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let line = self.encode(record);
        self.sink.lock().write_all(&line)
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        Arc::new(self.derive_attrs(attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(self.derive_group(name))
    }

    fn with_name(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(self.derive_name(name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler pretty-printing records for humans.
///
/// Records are encoded like [`TextHandler`] does, then re-formatted by a
/// [`ConsoleWriter`] before reaching the sink. Colors are enabled when the
/// sink is an interactive terminal, unless `ConsoleOptions` says otherwise.
pub struct ConsoleHandler<W: Write + Send + 'static> {
    inner: TextHandler<ConsoleWriter<W>>,
}

impl<W: Write + Send + 'static> ConsoleHandler<W> {
    pub fn new(writer: W, opts: HandlerOptions) -> Self {
        let writer = ConsoleWriter::detect(writer, &opts.console);
        Self {
            inner: TextHandler::with_time_format(writer, opts, CONSOLE_TIME_FORMAT),
        }
    }

    pub fn color(&self) -> bool {
        self.inner.with_sink(|w| w.color())
    }

    /// Runs `f` with exclusive access to the underlying writer.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        self.inner.with_sink(|w| f(w.get_mut()))
    }
}

impl<W: Write + Send + 'static> Handler for ConsoleHandler<W> {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        self.inner.handle(record)
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        Arc::new(Self {
            inner: self.inner.derive_attrs(attrs),
        })
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(Self {
            inner: self.inner.derive_group(name),
        })
    }

    fn with_name(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(Self {
            inner: self.inner.derive_name(name),
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
