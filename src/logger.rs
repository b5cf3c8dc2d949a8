//! Logger facade over a [`Handler`].
//!
//! A [`Logger`] is a cheap, cloneable front end: named children, attribute
//! chaining and leveled calls. Records are built only when the handler
//! accepts the level.

use std::fmt;
use std::io;
use std::panic::Location;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::attr::{self, Attr};
use crate::handler::{Handler, HandlerOptions, Record, Source, TextHandler};
use crate::level::Level;

lazy_static! {
    static ref DEFAULT: RwLock<Logger> = RwLock::new(Logger::new(TextHandler::new(
        io::stderr(),
        HandlerOptions::default(),
    )));
}

/// Front end emitting records through a shared handler.
///
/// # Examples
///
/// ```
/// use pretty_logfmt::{attr, ConsoleHandler, HandlerOptions, Logger};
///
/// let logger = Logger::new(ConsoleHandler::new(std::io::sink(), HandlerOptions::default()));
/// let db = logger.named("app").named("db");
/// assert_eq!(db.name(), "app.db");
/// db.info("connected", &[attr::int("pool", 4)]);
/// ```
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Name of the logger, empty for the root.
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// A child logger. Its name is this logger's name and `name` joined by `.`.
    pub fn named(&self, name: &str) -> Logger {
        let full = match self.name() {
            "" => name.to_string(),
            parent => format!("{}.{}", parent, name),
        };
        Self::from_arc(self.handler.with_name(&full))
    }

    /// A logger adding `attrs` to every record.
    pub fn with(&self, attrs: &[Attr]) -> Logger {
        if attrs.is_empty() {
            return self.clone();
        }
        Self::from_arc(self.handler.with_attrs(attrs))
    }

    /// A logger nesting the keys of later attributes under `name`.
    pub fn with_group(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        Self::from_arc(self.handler.with_group(name))
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Emits a record at `level`, tagged with the caller's location.
    ///
    /// Sink errors are dropped: logging never fails the caller.
    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, attrs: &[Attr]) {
        if !self.enabled(level) {
            return;
        }
        let mut record = Record::new(level, msg).with_source(Source::from(Location::caller()));
        record.add_attrs(attrs.iter().cloned());
        let _ = self.handler.handle(&record);
    }

    /// Emits a prepared record if its level is enabled.
    pub fn log_record(&self, record: &Record) -> io::Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        self.handler.handle(record)
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::DEBUG, msg, attrs);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::INFO, msg, attrs);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::WARN, msg, attrs);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::ERROR, msg, attrs);
    }

    /// Logs at ERROR with `err`, if any, as the leading `error` attribute.
    #[track_caller]
    pub fn error_with(&self, err: Option<&dyn fmt::Display>, msg: &str, attrs: &[Attr]) {
        match err {
            Some(err) => {
                let mut all = Vec::with_capacity(attrs.len() + 1);
                all.push(attr::err(err));
                all.extend_from_slice(attrs);
                self.log(Level::ERROR, msg, &all);
            }
            None => self.log(Level::ERROR, msg, attrs),
        }
    }
}

/// Replaces the process-wide default logger.
pub fn set_default(logger: Logger) {
    *DEFAULT.write() = logger;
    // Outside the lock: a log bridge may route this back to the default.
    log::debug!("default logger replaced");
}

/// Returns a handle to the process-wide default logger.
pub fn default_logger() -> Logger {
    DEFAULT.read().clone()
}

#[track_caller]
pub fn debug(msg: &str, attrs: &[Attr]) {
    default_logger().debug(msg, attrs);
}

#[track_caller]
pub fn info(msg: &str, attrs: &[Attr]) {
    default_logger().info(msg, attrs);
}

#[track_caller]
pub fn warn(msg: &str, attrs: &[Attr]) {
    default_logger().warn(msg, attrs);
}

#[track_caller]
pub fn error(msg: &str, attrs: &[Attr]) {
    default_logger().error(msg, attrs);
}
