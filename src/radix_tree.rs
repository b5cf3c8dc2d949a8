use std::fmt::Write;

use crate::level::Level;

/// Separator between logger name segments.
const SEPARATOR: char = '.';

/// Compressed prefix tree mapping dotted logger names to levels.
///
/// Each edge spans one or more whole name segments: a chain of nodes that
/// have a single child and no level is stored as one node whose label holds
/// all of their segments. Inserting a name that diverges in the middle of a
/// label splits that node at the segment boundary.
///
/// Lookups return the level of the deepest configured node along the path of
/// the queried name, which gives child loggers the level of their nearest
/// configured ancestor.
///
/// The tree is built once and only read afterwards, so shared references can
/// be used from any number of threads.
///
/// # Examples
///
/// ```
/// # use pretty_logfmt::radix_tree::LevelTree;
/// # use pretty_logfmt::level::Level;
/// let mut tree = LevelTree::new();
/// tree.insert("a.b", Level::WARN);
/// tree.insert("a.b.c", Level::DEBUG);
///
/// assert_eq!(tree.search("a.b.c.d"), Some(Level::DEBUG));
/// assert_eq!(tree.search("a.b.x"), Some(Level::WARN));
/// assert_eq!(tree.search_or("a.x", Level::INFO), (Level::INFO, false));
/// ```
#[derive(Debug, Default, Clone)]
pub struct LevelTree {
    root: RadixNode,
}

#[derive(Debug, Default, Clone)]
struct RadixNode {
    /// Segments spanned by the edge leading to this node, empty for the root.
    label: Vec<String>,
    level: Option<Level>,
    /// Sorted by the first segment of their labels, which is unique among
    /// siblings.
    children: Vec<RadixNode>,
}

impl LevelTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level of the logger `name`, replacing any previous level.
    pub fn insert(&mut self, name: &str, level: Level) {
        let segments: Vec<&str> = name.split(SEPARATOR).collect();
        self.root.insert(&segments, level);
    }

    /// Returns the level of `name` or of its nearest configured ancestor.
    pub fn search(&self, name: &str) -> Option<Level> {
        self.root.search(name.split(SEPARATOR))
    }

    /// Like [`search`](Self::search), falling back to `default`.
    ///
    /// The flag reports whether a configured level was found.
    pub fn search_or(&self, name: &str, default: Level) -> (Level, bool) {
        match self.search(name) {
            Some(level) => (level, true),
            None => (default, false),
        }
    }

    /// Renders every configured name as a `name=LEVEL` line, in name order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.root.dump("", &mut out);
        out
    }

    /// Number of nodes in the tree, the root included.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

impl RadixNode {
    fn leaf(segments: &[&str], level: Level) -> Self {
        Self {
            label: segments.iter().map(|s| s.to_string()).collect(),
            level: Some(level),
            children: Vec::new(),
        }
    }

    fn child_index(&self, segment: &str) -> Result<usize, usize> {
        self.children
            .binary_search_by(|child| child.label[0].as_str().cmp(segment))
    }

    fn insert(&mut self, segments: &[&str], level: Level) {
        if segments.is_empty() {
            self.level = Some(level);
            return;
        }
        let idx = match self.child_index(segments[0]) {
            Ok(idx) => idx,
            Err(pos) => {
                self.children.insert(pos, RadixNode::leaf(segments, level));
                return;
            }
        };
        let child = &mut self.children[idx];
        let common = child
            .label
            .iter()
            .zip(segments)
            .take_while(|(a, b)| a.as_str() == **b)
            .count();
        if common < child.label.len() {
            child.split_at(common);
        }
        child.insert(&segments[common..], level);
    }

    /// Moves the label tail starting at `at` into a new single child.
    fn split_at(&mut self, at: usize) {
        let tail = RadixNode {
            label: self.label.split_off(at),
            level: self.level.take(),
            children: std::mem::take(&mut self.children),
        };
        self.children.push(tail);
    }

    fn search<'a>(&self, mut segments: impl Iterator<Item = &'a str>) -> Option<Level> {
        let mut found = self.level;
        let mut node = self;
        let mut next = segments.next();
        'walk: while let Some(segment) = next {
            let child = match node.child_index(segment) {
                Ok(idx) => &node.children[idx],
                Err(_) => break,
            };
            next = segments.next();
            for label in &child.label[1..] {
                match next {
                    Some(segment) if segment == label => next = segments.next(),
                    _ => break 'walk,
                }
            }
            if child.level.is_some() {
                found = child.level;
            }
            node = child;
        }
        found
    }

    fn dump(&self, prefix: &str, out: &mut String) {
        let mut path = prefix.to_string();
        for segment in &self.label {
            if !path.is_empty() {
                path.push(SEPARATOR);
            }
            path.push_str(segment);
        }
        if let Some(level) = self.level {
            let _ = writeln!(out, "{}={}", path, level);
        }
        for child in &self.children {
            child.dump(&path, out);
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(RadixNode::count).sum::<usize>()
    }
}
