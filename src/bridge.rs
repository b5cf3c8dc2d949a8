//! Adapters feeding records from the `log` and `tracing` ecosystems into a
//! [`Logger`].
//!
//! Both use the record target as the logger name, with `::` replaced by `.`,
//! so per-logger level rules written for dotted names apply to module paths.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::attr::{self, Attr};
use crate::handler::{Record, Source};
use crate::level::Level;
use crate::logger::Logger;

/// Converts a module path target into a dotted logger name.
pub fn target_name(target: &str) -> String {
    target.replace("::", ".")
}

/// Child loggers keyed by record target, each built on first use.
///
/// Targets are module paths, so the map stays as small as the set of
/// modules that log.
struct TargetLoggers {
    root: Logger,
    children: RwLock<HashMap<String, Logger>>,
}

impl TargetLoggers {
    fn new(root: Logger) -> Self {
        Self {
            root,
            children: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, target: &str) -> Logger {
        if target.is_empty() {
            return self.root.clone();
        }
        if let Some(logger) = self.children.read().get(target) {
            return logger.clone();
        }
        self.children
            .write()
            .entry(target.to_string())
            .or_insert_with(|| self.root.named(&target_name(target)))
            .clone()
    }
}

/// `log::Log` implementation forwarding to a [`Logger`].
pub struct LogBridge {
    loggers: TargetLoggers,
}

impl LogBridge {
    pub fn new(logger: Logger) -> Self {
        Self {
            loggers: TargetLoggers::new(logger),
        }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.loggers
            .get(metadata.target())
            .enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        let logger = self.loggers.get(record.target());
        let level = Level::from(record.level());
        if !logger.enabled(level) {
            return;
        }
        let mut r = Record::new(level, record.args().to_string());
        if let (Some(file), Some(line)) = (record.file_static(), record.line()) {
            r.source = Some(Source { file, line });
        }
        let _ = logger.log_record(&r);
    }

    fn flush(&self) {}
}

/// Installs a [`LogBridge`] as the global `log` logger.
///
/// # Errors
///
/// Fails if a global logger was already installed.
pub fn init(logger: Logger, max_level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))?;
    log::set_max_level(max_level);
    Ok(())
}

/// `tracing_subscriber` layer forwarding events to a [`Logger`].
///
/// The `message` field becomes the record message, every other field an
/// attribute. Fields recorded as errors keep their key and are rendered as
/// errors when the key is `error`, `err` or ends with `.error`/`.err`.
///
/// # Examples
///
/// ```
/// use pretty_logfmt::{ConsoleHandler, ConsoleLayer, HandlerOptions, Logger};
/// use tracing_subscriber::prelude::*;
///
/// let logger = Logger::new(ConsoleHandler::new(std::io::sink(), HandlerOptions::default()));
/// let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(logger));
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(user = "bob", "logged in");
/// });
/// ```
pub struct ConsoleLayer {
    loggers: TargetLoggers,
}

impl ConsoleLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            loggers: TargetLoggers::new(logger),
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let logger = self.loggers.get(meta.target());
        let level = Level::from(meta.level());
        if !logger.enabled(level) {
            return;
        }
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let mut r = Record::new(level, visitor.message);
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            r.source = Some(Source { file, line });
        }
        r.attrs = visitor.attrs;
        let _ = logger.log_record(&r);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    attrs: Vec<Attr>,
}

impl FieldVisitor {
    fn push(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(attr::float(field.name(), value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(attr::int(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(attr::uint(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(attr::bool(field.name(), value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push(attr::string(field.name(), value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(attr::named_err(field.name(), &value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push(attr::string(field.name(), format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_name() {
        assert_eq!(target_name("my_app::db::pool"), "my_app.db.pool");
        assert_eq!(target_name("plain"), "plain");
    }

    #[test]
    fn test_target_loggers_are_built_once() {
        use crate::handler::{ConsoleHandler, HandlerOptions};
        use std::sync::Arc;

        let root = Logger::new(ConsoleHandler::new(std::io::sink(), HandlerOptions::default()));
        let loggers = TargetLoggers::new(root.clone());
        let first = loggers.get("app::db");
        let second = loggers.get("app::db");
        assert_eq!(first.name(), "app.db");
        assert!(Arc::ptr_eq(first.handler(), second.handler()));
        assert_eq!(loggers.children.read().len(), 1);

        assert_eq!(loggers.get("").name(), "");
        assert!(Arc::ptr_eq(loggers.get("").handler(), root.handler()));
        loggers.get("app::http");
        assert_eq!(loggers.children.read().len(), 2);
    }
}
