//! # Pretty Logfmt
//!
//! A structured logging library whose console output is meant for humans:
//!
//! * **Readable console output**: `key=value` records are re-laid out with the
//!   message first, errors next, and stacktraces expanded over several lines
//! * **Colors when it matters**: levels and keys are colored on terminals,
//!   plain text everywhere else
//! * **Per-logger levels**: dotted logger names inherit the level of their
//!   nearest configured ancestor
//!
//! ## Main Components
//!
//! * `ConsoleWriter`: an `io::Write` adapter that pretty-prints one encoded
//!   record per `write` call
//! * `ConsoleRenderer`: the reusable, allocation-free rendering state behind it
//! * `PerLoggerLeveler` / `LevelTree`: hierarchical level resolution
//! * `TextHandler` / `ConsoleHandler` / `JsonHandler`: handlers encoding
//!   records and writing them to a shared sink
//! * `Logger`: named loggers with attribute chaining, plus a process-wide default
//! * `LogBridge` / `ConsoleLayer`: adapters for the `log` and `tracing` ecosystems
//!
//! ## Quick Start
//!
//! ```
//! use pretty_logfmt::{attr, ConsoleHandler, HandlerOptions, Level, Logger, PerLoggerLeveler};
//!
//! let leveler = PerLoggerLeveler::new(Level::INFO, &["app.db=DEBUG"]).unwrap();
//! let handler = ConsoleHandler::new(std::io::stderr(), HandlerOptions::with_level(leveler));
//! let logger = Logger::new(handler);
//!
//! let db = logger.named("app").named("db");
//! db.debug("query done", &[attr::int("rows", 3)]);
//! db.error("commit failed", &[attr::err(&"deadlock detected")]);
//! ```
//!
//! Lines that are already encoded can be pretty-printed directly:
//!
//! ```
//! use std::io::Write;
//! use pretty_logfmt::ConsoleWriter;
//!
//! let mut writer = ConsoleWriter::new(Vec::new(), false);
//! writer.write_all(b"level=WARN msg=\"disk almost full\" free=10\n").unwrap();
//! assert_eq!(writer.into_inner(), b"WARN   disk almost full \tfree= 10\n");
//! ```

pub mod attr;
pub mod bridge;
pub mod classify;
pub mod console;
pub mod encoder;
pub mod error;
pub mod handler;
pub mod json;
pub mod level;
pub mod logger;
pub mod radix_tree;
pub mod terminal;
pub mod tokenizer;
pub mod unquote;

pub use attr::{Attr, Value};
pub use bridge::{ConsoleLayer, LogBridge};
pub use console::{ConsoleRenderer, ConsoleWriter};
pub use error::{Error, Result};
pub use handler::{
    ConsoleHandler, ConsoleOptions, ErrorFormatter, Handler, HandlerOptions, Record, Source, SourceFormat,
    SourceFormatter, TextHandler,
};
pub use json::JsonHandler;
pub use level::{Level, LevelVar, Leveler, PerLoggerLeveler};
pub use logger::{default_logger, set_default, Logger};
pub use radix_tree::LevelTree;
pub use terminal::{check_is_terminal, Color};
