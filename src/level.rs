use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::error::{Error, Result};
use crate::radix_tree::LevelTree;

/// Severity of a log record.
///
/// Levels are plain integers so that custom levels can sit between the named
/// ones: `INFO+2` is more severe than `INFO` but less severe than `WARN`.
/// The gaps of four between the named levels leave room for such offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Returns the numeric value of the level.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns a level offset from this one by `delta`, saturating at the
    /// bounds of `i32`.
    #[inline]
    pub const fn offset(self, delta: i32) -> Level {
        Level(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, name) = if *self < Level::INFO {
            (Level::DEBUG, "DEBUG")
        } else if *self < Level::WARN {
            (Level::INFO, "INFO")
        } else if *self < Level::ERROR {
            (Level::WARN, "WARN")
        } else {
            (Level::ERROR, "ERROR")
        };
        let delta = self.0 - base.0;
        if delta == 0 {
            f.write_str(name)
        } else {
            write!(f, "{}{:+}", name, delta)
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    /// Parses `DEBUG`, `INFO`, `WARN` or `ERROR` (any case), optionally
    /// followed by a signed offset such as `+4` or `-2`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidLevel {
            text: s.to_string(),
            reason,
        };
        let (name, delta) = match s.find(['+', '-']) {
            Some(idx) => {
                let delta = s[idx..]
                    .parse::<i32>()
                    .map_err(|_| invalid("invalid offset"))?;
                (&s[..idx], delta)
            }
            None => (s, 0),
        };
        let base = if name.eq_ignore_ascii_case("DEBUG") {
            Level::DEBUG
        } else if name.eq_ignore_ascii_case("INFO") {
            Level::INFO
        } else if name.eq_ignore_ascii_case("WARN") {
            Level::WARN
        } else if name.eq_ignore_ascii_case("ERROR") {
            Level::ERROR
        } else {
            return Err(invalid("unknown name"));
        };
        base.0
            .checked_add(delta)
            .map(Level)
            .ok_or_else(|| invalid("offset out of range"))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::DEBUG.offset(-4),
            log::Level::Debug => Level::DEBUG,
            log::Level::Info => Level::INFO,
            log::Level::Warn => Level::WARN,
            log::Level::Error => Level::ERROR,
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::DEBUG.offset(-4),
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            _ => Level::ERROR,
        }
    }
}

/// Source of the minimum level a handler accepts.
pub trait Leveler: Send + Sync {
    /// The minimum level for records without a logger name.
    fn level(&self) -> Level;

    /// The minimum level for records of the named logger.
    fn logger_level(&self, _name: &str) -> Level {
        self.level()
    }
}

impl Leveler for Level {
    fn level(&self) -> Level {
        *self
    }
}

/// A level that can be changed at runtime.
#[derive(Debug, Default)]
pub struct LevelVar(AtomicI32);

impl LevelVar {
    pub fn new(level: Level) -> Self {
        Self(AtomicI32::new(level.0))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level.0, Ordering::Relaxed);
    }
}

impl Leveler for LevelVar {
    fn level(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }
}

/// Leveler that configures levels by logger name.
///
/// Rules have the form `"loggerName.subLogger=LEVEL"`. A logger without a
/// rule of its own inherits the level of its nearest configured ancestor,
/// and falls back to the default level when no ancestor is configured.
///
/// # Examples
///
/// ```
/// # use pretty_logfmt::level::{Level, Leveler, PerLoggerLeveler};
/// let leveler = PerLoggerLeveler::new(
///     Level::INFO,
///     &["app.db=WARN", "app.db.pool=DEBUG"],
/// ).unwrap();
///
/// assert_eq!(leveler.logger_level("app.db.pool.conn"), Level::DEBUG);
/// assert_eq!(leveler.logger_level("app.db.query"), Level::WARN);
/// assert_eq!(leveler.logger_level("app.http"), Level::INFO);
/// ```
pub struct PerLoggerLeveler {
    default_level: Box<dyn Leveler>,
    tree: Option<LevelTree>,
}

impl PerLoggerLeveler {
    /// Builds a leveler from textual rules.
    ///
    /// Every rule is validated before the tree is built, so a single bad
    /// rule fails the whole construction.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidRule` - a rule without exactly one `=` or with an
    ///   empty logger name
    /// * `Error::InvalidLevel` - a level that does not parse
    pub fn new<S: AsRef<str>>(
        default_level: impl Leveler + 'static,
        rules: &[S],
    ) -> Result<Self> {
        let tree = build_level_tree(rules)?;
        Ok(Self {
            default_level: Box::new(default_level),
            tree,
        })
    }

    /// Returns the configured tree, if any rule was given.
    pub fn tree(&self) -> Option<&LevelTree> {
        self.tree.as_ref()
    }
}

impl Leveler for PerLoggerLeveler {
    fn level(&self) -> Level {
        self.default_level.level()
    }

    fn logger_level(&self, name: &str) -> Level {
        if !name.is_empty() {
            if let Some(level) = self.tree.as_ref().and_then(|tree| tree.search(name)) {
                return level;
            }
        }
        self.default_level.level()
    }
}

fn build_level_tree<S: AsRef<str>>(rules: &[S]) -> Result<Option<LevelTree>> {
    if rules.is_empty() {
        return Ok(None);
    }
    let mut parsed = Vec::with_capacity(rules.len());
    for rule in rules {
        let rule = rule.as_ref();
        let mut parts = rule.split('=');
        let (name, level_text) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(level), None) if !name.is_empty() => (name, level),
            _ => return Err(Error::InvalidRule(rule.to_string())),
        };
        parsed.push((name, level_text.parse::<Level>()?));
    }
    let mut tree = LevelTree::new();
    for (name, level) in parsed {
        tree.insert(name, level);
    }
    log::debug!("built per logger level tree from {} rules", rules.len());
    Ok(Some(tree))
}
