use pretty_logfmt::{attr, ConsoleHandler, ConsoleOptions, ConsoleWriter, HandlerOptions, Logger};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;

/// Writer collecting everything into a shared buffer.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
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

fn console_logger(opts: HandlerOptions) -> (Logger, SharedBuf) {
    let buf = SharedBuf::default();
    let opts = HandlerOptions {
        time_format: Some("T".into()),
        ..opts
    };
    (Logger::new(ConsoleHandler::new(buf.clone(), opts)), buf)
}

#[test]
fn test_quotes_and_backslashes_survive_round_trip() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    logger.info(r#"say "hi" \ bye"#, &[attr::string("path", r"C:\tmp\x")]);
    assert_eq!(buf.contents(), "T  INFO   say \"hi\" \\ bye \tpath= C:\\tmp\\x\n");
}

#[test]
fn test_field_order() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    logger.error(
        "request failed",
        &[
            attr::string("stacktrace", "a.rs:1\nb.rs:2"),
            attr::int("status", 502),
            attr::named_err("upstream.err", &"connection reset"),
            attr::err(&"bad gateway"),
        ],
    );
    assert_eq!(
        buf.contents(),
        "T  ERROR  request failed \tupstream.err= \"connection reset\"  error= \"bad gateway\"  status= 502\n\
         \tstacktrace= \n\t\ta.rs:1\n\t\tb.rs:2\n"
    );
}

#[test]
fn test_multiline_message() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    logger.warn("first\nsecond", &[attr::int("k", 1)]);
    assert_eq!(buf.contents(), "T  WARN   first\nsecond\n\tk= 1\n");
}

#[test]
fn test_empty_values_stay_visible() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    logger.info("", &[attr::string("empty", "")]);
    assert_eq!(buf.contents(), "T  INFO   \"\" \tempty= \"\"\n");
}

#[test]
fn test_groups_and_with_attrs() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    let logger = logger.with(&[attr::string("svc", "api")]).with_group("req");
    logger.info("handled", &[attr::int("id", 7), attr::string("method", "GET")]);
    assert_eq!(
        buf.contents(),
        "T  INFO   handled \tsvc= api  req.id= 7  req.method= GET\n"
    );
}

#[test]
fn test_source_is_rendered_last() {
    let opts = HandlerOptions {
        add_source: true,
        ..HandlerOptions::default()
    };
    let (logger, buf) = console_logger(opts);
    let line = line!() + 1;
    logger.info("with source", &[attr::bool("ok", true)]);
    let expected_suffix = format!("ok= true  source= tests/console_tests.rs:{}\n", line);
    assert!(buf.contents().ends_with(&expected_suffix), "{}", buf.contents());
}

#[test]
fn test_no_escape_codes_without_color() {
    let opts = HandlerOptions {
        console: ConsoleOptions {
            no_color: true,
            ..ConsoleOptions::default()
        },
        ..HandlerOptions::default()
    };
    let (logger, buf) = console_logger(opts);
    logger.error("boom", &[attr::err(&"broken"), attr::int("n", 1)]);
    logger.warn("careful", &[]);
    assert!(!buf.contents().contains('\x1b'));
}

#[test]
fn test_forced_color() {
    let opts = HandlerOptions {
        console: ConsoleOptions {
            force_color: true,
            ..ConsoleOptions::default()
        },
        ..HandlerOptions::default()
    };
    let (logger, buf) = console_logger(opts);
    logger.warn("careful", &[attr::int("n", 1)]);
    assert_eq!(
        buf.contents(),
        "T  \x1b[33mWARN\x1b[0m   careful \t\x1b[33mn= \x1b[0m1\n"
    );
}

#[test]
fn test_concurrent_lines_do_not_interleave() {
    let (logger, buf) = console_logger(HandlerOptions::default());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let logger = logger.named(&format!("worker{}", worker));
            thread::spawn(move || {
                for i in 0..50 {
                    logger.info("tick", &[attr::int("worker", worker), attr::int("i", i)]);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let contents = buf.contents();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 200);
    for line in lines {
        assert!(line.starts_with("T  INFO   tick \tworker= "), "{}", line);
        assert!(line.contains("  i= "), "{}", line);
    }
}

#[test]
fn test_console_writer_over_raw_lines() {
    let mut writer = ConsoleWriter::new(Vec::new(), false);
    for line in [
        "time=\"01/02 15:04:05.000\" level=INFO msg=started port=8080\n",
        "level=ERROR msg=\"lost connection\" err=EOF retry=true\n",
        "not a logfmt line\n",
    ] {
        writer.write_all(line.as_bytes()).unwrap();
    }
    let out = String::from_utf8(writer.into_inner()).unwrap();
    assert_eq!(
        out,
        "01/02 15:04:05.000  INFO   started \tport= 8080\n\
         ERROR  lost connection \terr= EOF  retry= true\n\
         not a logfmt line= \"\"\n"
    );
}
