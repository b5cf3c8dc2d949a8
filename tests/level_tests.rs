use pretty_logfmt::{
    attr, Error, HandlerOptions, Level, LevelTree, LevelVar, Leveler, Logger, PerLoggerLeveler,
    TextHandler,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn messages(&self) -> Vec<String> {
        let data = self.0.lock().unwrap();
        String::from_utf8_lossy(&data)
            .lines()
            .filter_map(|line| {
                line.split(' ')
                    .find_map(|token| token.strip_prefix("msg="))
                    .map(str::to_string)
            })
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn text_logger(level: impl Leveler + 'static) -> (Logger, SharedBuf) {
    let buf = SharedBuf::default();
    let opts = HandlerOptions {
        time_format: Some("T".into()),
        ..HandlerOptions::with_level(level)
    };
    (Logger::new(TextHandler::new(buf.clone(), opts)), buf)
}

#[test]
fn test_per_logger_levels() {
    let leveler = PerLoggerLeveler::new(
        Level::INFO,
        &["pretty_logfmt.testfilters=debug", "some.pkg2=error"],
    )
    .unwrap();
    let (root, buf) = text_logger(leveler);

    root.debug("root_debug", &[]);
    root.info("root_info", &[]);

    let filters = root.named("pretty_logfmt").named("testfilters");
    filters.debug("filters_debug", &[]);
    filters.named("sub").debug("filters_sub_debug", &[]);

    let pkg2 = root.named("some.pkg2");
    pkg2.warn("pkg2_warn", &[]);
    pkg2.error("pkg2_error", &[]);

    root.named("some").info("some_info", &[]);
    root.named("pretty_logfmt").debug("parent_debug", &[]);

    assert_eq!(
        buf.messages(),
        [
            "root_info",
            "filters_debug",
            "filters_sub_debug",
            "pkg2_error",
            "some_info",
        ]
    );
}

#[test]
fn test_level_var_changes_apply_immediately() {
    let var = Arc::new(LevelVar::new(Level::WARN));

    struct Shared(Arc<LevelVar>);
    impl Leveler for Shared {
        fn level(&self) -> Level {
            self.0.level()
        }
    }

    let (logger, buf) = text_logger(Shared(Arc::clone(&var)));
    logger.info("hidden", &[]);
    var.set(Level::DEBUG);
    logger.debug("shown", &[]);
    assert_eq!(buf.messages(), ["shown"]);
}

#[test]
fn test_custom_offsets() {
    let leveler = PerLoggerLeveler::new(Level::INFO, &["app=INFO+2"]).unwrap();
    let (root, buf) = text_logger(leveler);
    let app = root.named("app");
    app.log(Level::INFO.offset(1), "below", &[]);
    app.log(Level::INFO.offset(2), "at", &[attr::int("n", 1)]);
    assert_eq!(buf.messages(), ["at"]);
    assert!(String::from_utf8_lossy(&buf.0.lock().unwrap()).contains("level=INFO+2"));
}

#[test]
fn test_invalid_rule_reports_error() {
    let err = PerLoggerLeveler::new(Level::INFO, &["good=INFO", "missing_level"])
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidRule(ref rule) if rule == "missing_level"));

    let err = PerLoggerLeveler::new(Level::INFO, &["a=LOUD"]).err().unwrap();
    assert!(matches!(err, Error::InvalidLevel { .. }));
    assert_eq!(err.to_string(), "invalid level: \"LOUD\": unknown name");

    let err = PerLoggerLeveler::new(Level::INFO, &["ok=DEBUG", "a=ERROR+2147483647"])
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "invalid level: \"ERROR+2147483647\": offset out of range"
    );
}

#[test]
fn test_tree_dump_and_inheritance() {
    let leveler = PerLoggerLeveler::new(
        Level::INFO,
        &["b=WARN", "a.c=DEBUG", "a=ERROR", "a.c.d.e=INFO"],
    )
    .unwrap();
    let tree: &LevelTree = leveler.tree().unwrap();
    assert_eq!(tree.dump(), "a=ERROR\na.c=DEBUG\na.c.d.e=INFO\nb=WARN\n");

    assert_eq!(leveler.logger_level("a.b"), Level::ERROR);
    assert_eq!(leveler.logger_level("a.c.d"), Level::DEBUG);
    assert_eq!(leveler.logger_level("a.c.d.e.f"), Level::INFO);
    assert_eq!(leveler.logger_level("ab"), Level::INFO);
    assert_eq!(tree.search_or("zzz", Level::WARN), (Level::WARN, false));
}
