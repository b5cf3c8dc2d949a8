//! Handler writing one JSON object per record.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attr::{Attr, Value};
use crate::classify::{LEVEL_KEY, MESSAGE_KEY, TIME_KEY};
use crate::handler::{is_enabled, Handler, HandlerOptions, Record, DEFAULT_TIME_FORMAT, LOGGER_KEY};
use crate::level::Level;

/// Handler writing newline-delimited JSON.
///
/// Built-in members come first (`time`, `level`, `source`, `msg`, then
/// `logger`), followed by attributes in the order they were added. Groups
/// become nested objects. A group named by `with_group` is only emitted
/// once an attribute lands in it.
///
/// # Examples
///
/// ```
/// use pretty_logfmt::{attr, Handler, HandlerOptions, JsonHandler, Level, Record};
///
/// let opts = HandlerOptions {
///     time_format: Some("T".into()),
///     ..HandlerOptions::default()
/// };
/// let handler = JsonHandler::new(Vec::new(), opts);
/// let mut record = Record::new(Level::INFO, "ready");
/// record.add_attrs([attr::int("port", 8080)]);
/// handler.handle(&record).unwrap();
/// let out = handler.with_sink(|w| String::from_utf8(w.clone()).unwrap());
/// assert_eq!(out, "{\"time\":\"T\",\"level\":\"INFO\",\"msg\":\"ready\",\"port\":8080}\n");
/// ```
pub struct JsonHandler<W: Write + Send + 'static> {
    sink: Arc<Mutex<W>>,
    opts: Arc<HandlerOptions>,
    name: String,
    /// Groups from `with_group` that no attribute has opened yet.
    pending_groups: Vec<String>,
    /// Members from `with_attrs`, each preceded by a comma unless it opens
    /// a group. Ends inside `open_groups` unclosed objects.
    preformatted: Vec<u8>,
    open_groups: usize,
    time_format: String,
}

impl<W: Write + Send + 'static> JsonHandler<W> {
    pub fn new(writer: W, opts: HandlerOptions) -> Self {
        let time_format = opts
            .time_format
            .clone()
            .unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
        Self {
            sink: Arc::new(Mutex::new(writer)),
            opts: Arc::new(opts),
            name: String::new(),
            pending_groups: Vec::new(),
            preformatted: Vec::new(),
            open_groups: 0,
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
            pending_groups: self.pending_groups.clone(),
            preformatted: self.preformatted.clone(),
            open_groups: self.open_groups,
            time_format: self.time_format.clone(),
        }
    }

    /// Encodes `record` as one newline-terminated JSON object.
    pub fn encode(&self, record: &Record) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.push(b'{');
        let time = record.time.format(&self.time_format).to_string();
        append_scalar(&mut buf, TIME_KEY, &time);
        append_scalar(&mut buf, LEVEL_KEY, &record.level.to_string());
        if self.opts.add_source {
            if let Some(source) = &record.source {
                append_attr(&mut buf, &self.opts.source_attr(source));
            }
        }
        append_scalar(&mut buf, MESSAGE_KEY, &record.message);
        if self.opts.add_logger && !self.name.is_empty() {
            append_scalar(&mut buf, LOGGER_KEY, &self.name);
        }
        buf.extend_from_slice(&self.preformatted);
        if record.attrs.iter().any(|a| !a.is_empty()) {
            for group in &self.pending_groups {
                open_group(&mut buf, group);
            }
            for a in &record.attrs {
                append_attr(&mut buf, &self.opts.format_attr(a));
            }
            buf.resize(buf.len() + self.pending_groups.len(), b'}');
        }
        buf.resize(buf.len() + self.open_groups, b'}');
        buf.extend_from_slice(b"}\n");
        buf
    }
}

impl<W: Write + Send + 'static> Handler for JsonHandler<W> {
    fn enabled(&self, level: Level) -> bool {
        is_enabled(&self.opts, &self.name, level)
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let line = self.encode(record);
        self.sink.lock().write_all(&line)
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        let mut h = self.derive();
        if attrs.iter().all(Attr::is_empty) {
            return Arc::new(h);
        }
        for group in h.pending_groups.drain(..) {
            open_group(&mut h.preformatted, &group);
            h.open_groups += 1;
        }
        for a in attrs {
            append_attr(&mut h.preformatted, &h.opts.format_attr(a));
        }
        Arc::new(h)
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        let mut h = self.derive();
        if !name.is_empty() {
            h.pending_groups.push(name.to_string());
        }
        Arc::new(h)
    }

    fn with_name(&self, name: &str) -> Arc<dyn Handler> {
        let mut h = self.derive();
        h.name = name.to_string();
        Arc::new(h)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Comma before a member, except right after an opening brace.
fn separate(buf: &mut Vec<u8>) {
    if buf.last() != Some(&b'{') {
        buf.push(b',');
    }
}

fn append_json<T: serde::Serialize + ?Sized>(buf: &mut Vec<u8>, value: &T) {
    // Serializing strings and numbers into a Vec cannot fail.
    let _ = serde_json::to_writer(&mut *buf, value);
}

fn open_group(buf: &mut Vec<u8>, name: &str) {
    separate(buf);
    append_json(buf, name);
    buf.extend_from_slice(b":{");
}

/// Appends `attr` as a member. Groups with an empty key are inlined.
fn append_attr(buf: &mut Vec<u8>, attr: &Attr) {
    if attr.is_empty() {
        return;
    }
    match &attr.value {
        Value::Group(attrs) => {
            let named = !attr.key.is_empty();
            if named {
                open_group(buf, &attr.key);
            }
            for a in attrs {
                append_attr(buf, a);
            }
            if named {
                buf.push(b'}');
            }
        }
        Value::Str(s) | Value::Error(s) => append_scalar(buf, &attr.key, s.as_str()),
        Value::Int(v) => append_scalar(buf, &attr.key, v),
        Value::Uint(v) => append_scalar(buf, &attr.key, v),
        Value::Float(v) => append_scalar(buf, &attr.key, v),
        Value::Bool(v) => append_scalar(buf, &attr.key, v),
    }
}

fn append_scalar<T: serde::Serialize + ?Sized>(buf: &mut Vec<u8>, key: &str, value: &T) {
    separate(buf);
    append_json(buf, key);
    buf.push(b':');
    append_json(buf, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr;
    use crate::handler::{Source, SourceFormat};
    use std::fmt;

    fn base_opts() -> HandlerOptions {
        HandlerOptions {
            time_format: Some("T".into()),
            ..HandlerOptions::default()
        }
    }

    fn output(handler: &JsonHandler<Vec<u8>>) -> String {
        handler.with_sink(|w| String::from_utf8(w.clone()).unwrap())
    }

    #[test]
    fn test_scalar_members() {
        let h = JsonHandler::new(Vec::new(), base_opts());
        let mut r = Record::new(Level::WARN, "disk \"full\"\n");
        r.add_attrs([
            attr::int("n", -3),
            attr::uint("u", 4),
            attr::float("f", 1.5),
            attr::bool("ok", true),
            attr::string("s", "two words"),
            attr::string("", "dropped"),
        ]);
        h.handle(&r).unwrap();
        let out = output(&h);
        assert_eq!(
            out,
            "{\"time\":\"T\",\"level\":\"WARN\",\"msg\":\"disk \\\"full\\\"\\n\",\
             \"n\":-3,\"u\":4,\"f\":1.5,\"ok\":true,\"s\":\"two words\"}\n"
        );
        let parsed: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(parsed["msg"], "disk \"full\"\n");
    }

    #[test]
    fn test_groups_nest() {
        let root = JsonHandler::new(Vec::new(), base_opts());
        let h = root
            .with_attrs(&[attr::string("svc", "api")])
            .with_group("req")
            .with_attrs(&[attr::int("id", 9)])
            .with_group("resp");
        let mut r = Record::new(Level::INFO, "done");
        r.add_attrs([
            attr::int("status", 200),
            attr::group("hdr", vec![attr::int("len", 2)]),
            attr::group("", vec![attr::bool("inline", true)]),
        ]);
        h.handle(&r).unwrap();
        // Groups without attributes are left out.
        h.handle(&Record::new(Level::INFO, "empty")).unwrap();
        let out = output(&root);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines[0],
            "{\"time\":\"T\",\"level\":\"INFO\",\"msg\":\"done\",\"svc\":\"api\",\
             \"req\":{\"id\":9,\"resp\":{\"status\":200,\"hdr\":{\"len\":2},\"inline\":true}}}"
        );
        assert_eq!(
            lines[1],
            "{\"time\":\"T\",\"level\":\"INFO\",\"msg\":\"empty\",\"svc\":\"api\",\"req\":{\"id\":9}}"
        );
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn test_source_logger_and_errors() {
        let opts = HandlerOptions {
            add_source: true,
            add_logger: true,
            source_format: SourceFormat::Group,
            error_formatter: Some(Arc::new(|key: &str, err: &dyn fmt::Display| {
                attr::group(key, vec![attr::string("msg", err.to_string())])
            })),
            ..base_opts()
        };
        let root = JsonHandler::new(Vec::new(), opts);
        let h = root.with_name("app.db");
        let mut r = Record::new(Level::ERROR, "x").with_source(Source { file: "src/db.rs", line: 7 });
        r.add_attrs([attr::err(&"timeout")]);
        h.handle(&r).unwrap();
        assert_eq!(
            output(&root),
            "{\"time\":\"T\",\"level\":\"ERROR\",\"source\":{\"file\":\"src/db.rs\",\"line\":7},\
             \"msg\":\"x\",\"logger\":\"app.db\",\"error\":{\"msg\":\"timeout\"}}\n"
        );
    }

    #[test]
    fn test_per_logger_enabled() {
        let leveler = crate::level::PerLoggerLeveler::new(Level::INFO, &["db=ERROR"]).unwrap();
        let root = JsonHandler::new(io::sink(), HandlerOptions::with_level(leveler));
        assert!(root.enabled(Level::INFO));
        let db = root.with_name("db.pool");
        assert!(!db.enabled(Level::WARN));
        assert!(db.enabled(Level::ERROR));
    }
}
