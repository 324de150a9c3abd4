use crate::error::{PathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`KeyPath`].
///
/// Serialized untagged: names as JSON strings, concrete indices as numbers
/// and the wildcard as `null`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Name(String),
    Index(usize),
    Wildcard,
}

impl Segment {
    pub fn name(name: impl Into<String>) -> Self {
        Segment::Name(name.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard)
    }

    /// True for both concrete indices and the wildcard
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Wildcard)
    }

    /// Structural comparison: names by value, indices only by their
    /// concrete/wildcard classification.
    pub fn structurally_equals(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Name(a), Segment::Name(b)) => a == b,
            (Segment::Index(_), Segment::Index(_)) => true,
            (Segment::Wildcard, Segment::Wildcard) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => write!(f, "{}", name),
            Segment::Index(index) => write!(f, "[{}]", index),
            Segment::Wildcard => write!(f, "[*]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Name(name.to_string())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Ordered, immutable sequence of segments addressing a location inside a
/// document or the field schema. The empty path is the document root.
///
/// Every operation returns a new path; nothing mutates a path in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the textual form, e.g. `dishes[*].description` or `a.b[2]`
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Segment at position `i`.
    ///
    /// # Panics
    /// Panics when `i` is out of range; callers bounds-check with `len` first.
    pub fn get(&self, i: usize) -> &Segment {
        match self.segments.get(i) {
            Some(segment) => segment,
            None => panic!(
                "key path index {} out of range for '{}' (length {})",
                i,
                self,
                self.segments.len()
            ),
        }
    }

    /// Sub-path covering positions `from..to`
    pub fn slice(&self, from: usize, to: usize) -> KeyPath {
        KeyPath::new(self.segments[from..to].to_vec())
    }

    pub fn concat(&self, other: &KeyPath) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        KeyPath::new(segments)
    }

    /// New path with `segment` appended
    pub fn push(&self, segment: impl Into<Segment>) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        KeyPath::new(segments)
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Path without its last segment; `None` for the root
    pub fn parent(&self) -> Option<KeyPath> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.slice(0, self.segments.len() - 1))
        }
    }

    /// Schema identity comparison (see [`Segment::structurally_equals`])
    pub fn structurally_equals(&self, other: &KeyPath) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a.structurally_equals(b))
    }

    /// True if `self` is a structural prefix of `other` (or equal to it)
    pub fn is_structural_prefix_of(&self, other: &KeyPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a.structurally_equals(b))
    }

    /// True if `other` is this path plus exactly one segment
    pub fn is_structural_parent_of(&self, other: &KeyPath) -> bool {
        other.segments.len() == self.segments.len() + 1 && self.is_structural_prefix_of(other)
    }

    /// Remainder of `self` after a structural `prefix`
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<KeyPath> {
        if prefix.is_structural_prefix_of(self) {
            Some(self.slice(prefix.len(), self.len()))
        } else {
            None
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(Segment::is_wildcard)
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_wildcard()).count()
    }

    pub fn wildcard_positions(&self) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_wildcard())
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<Vec<Segment>> for KeyPath {
    fn from(segments: Vec<Segment>) -> Self {
        KeyPath::new(segments)
    }
}

impl<'a> IntoIterator for &'a KeyPath {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Name(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(input: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut chars = input.chars().peekable();
        let mut name = String::new();
        // true right after a '.', where a name must follow
        let mut expect_name = false;

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if name.is_empty() && (segments.is_empty() || expect_name) {
                        return Err(PathError::parse(input, "empty field name"));
                    }
                    if !name.is_empty() {
                        segments.push(Segment::Name(std::mem::take(&mut name)));
                    }
                    expect_name = true;
                }
                '[' => {
                    if expect_name && name.is_empty() {
                        return Err(PathError::parse(input, "empty field name before '['"));
                    }
                    if !name.is_empty() {
                        segments.push(Segment::Name(std::mem::take(&mut name)));
                    }
                    expect_name = false;

                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(ch) => inner.push(ch),
                            None => return Err(PathError::parse(input, "unclosed '['")),
                        }
                    }
                    let inner = inner.trim();
                    if inner == "*" {
                        segments.push(Segment::Wildcard);
                    } else {
                        let index = inner.parse::<usize>().map_err(|_| {
                            PathError::parse(input, format!("'{}' is not an array index", inner))
                        })?;
                        segments.push(Segment::Index(index));
                    }
                    if let Some(next) = chars.peek() {
                        if *next != '.' && *next != '[' {
                            return Err(PathError::parse(input, "expected '.' or '[' after ']'"));
                        }
                    }
                }
                ']' => return Err(PathError::parse(input, "unexpected ']'")),
                other => {
                    name.push(other);
                    expect_name = false;
                }
            }
        }

        if expect_name {
            return Err(PathError::parse(input, "trailing '.'"));
        }
        if !name.is_empty() {
            segments.push(Segment::Name(name));
        }
        Ok(KeyPath::new(segments))
    }
}
