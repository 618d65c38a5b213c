//! Property paths: ordered key/index accessors into a value tree.
//!
//! Paths address a subtree for [`get`](crate::Tree::get),
//! [`set`](crate::Tree::set) and [`delete`](crate::Tree::delete), and are
//! attached to errors raised while converting a single leaf.
//!
//! # Syntax
//!
//! - `"name"`: the object key `name`
//! - `"outer.inner"`: key `inner` inside key `outer`
//! - `"items[0]"`: element 0 of the array under `items`
//! - `"hosts[\"db.internal\"]"`: a quoted key, for keys containing `.`, `[`, `]` or `"`
//! - `"items[0]name"`: a key may follow `]` without a `.`
//!
//! Negative indices are accepted by the parser so that edits can report them
//! as out of range with the offending path attached.

use crate::error::{Result, SealError};
use std::fmt::{self, Write};
use std::str::FromStr;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Accessor {
    /// An object key.
    Key(String),
    /// An array index. Stored signed so out-of-range input survives parsing.
    Index(i64),
}

impl From<&str> for Accessor {
    fn from(key: &str) -> Self {
        Accessor::Key(key.to_string())
    }
}

impl From<String> for Accessor {
    fn from(key: String) -> Self {
        Accessor::Key(key)
    }
}

impl From<i64> for Accessor {
    fn from(index: i64) -> Self {
        Accessor::Index(index)
    }
}

impl From<usize> for Accessor {
    fn from(index: usize) -> Self {
        Accessor::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

/// An ordered sequence of [`Accessor`]s, rooted at a tree.
///
/// # Examples
///
/// ```
/// use sealcfg_core::{Accessor, PropertyPath};
///
/// let path = PropertyPath::parse(r#"db.hosts[1]["fully.qualified"]"#).unwrap();
/// assert_eq!(
///     path.accessors(),
///     &[
///         Accessor::from("db"),
///         Accessor::from("hosts"),
///         Accessor::Index(1),
///         Accessor::from("fully.qualified"),
///     ]
/// );
/// assert_eq!(path.to_string(), r#"db.hosts[1]["fully.qualified"]"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    accessors: Vec<Accessor>,
}

impl PropertyPath {
    /// The empty path, addressing the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a path from its textual form. The empty string is the root path.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |message: &str| SealError::InvalidPath {
            input: input.to_string(),
            message: message.to_string(),
        };

        let mut accessors = Vec::new();
        let mut rest = input;
        let mut after_dot = false;

        while !rest.is_empty() {
            if let Some(body) = rest.strip_prefix('[') {
                if after_dot {
                    return Err(invalid("unexpected '[' after '.'"));
                }
                let (accessor, remainder) = if let Some(quoted) = body.strip_prefix('"') {
                    let (key, remainder) =
                        parse_quoted(quoted).ok_or_else(|| invalid("unterminated quoted key"))?;
                    let remainder = remainder
                        .strip_prefix(']')
                        .ok_or_else(|| invalid("expected ']' after quoted key"))?;
                    (Accessor::Key(key), remainder)
                } else {
                    let close = body.find(']').ok_or_else(|| invalid("missing ']'"))?;
                    let index = body[..close]
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| invalid("array index must be an integer"))?;
                    (Accessor::Index(index), &body[close + 1..])
                };
                accessors.push(accessor);
                rest = remainder;
            } else {
                let end = rest.find(|c| c == '.' || c == '[').unwrap_or(rest.len());
                let key = &rest[..end];
                if key.is_empty() {
                    return Err(invalid("empty key"));
                }
                if key.contains(|c| c == ']' || c == '"') {
                    return Err(invalid("unquoted key contains ']' or '\"'"));
                }
                accessors.push(Accessor::Key(key.to_string()));
                rest = &rest[end..];
            }

            after_dot = false;
            if let Some(remainder) = rest.strip_prefix('.') {
                if remainder.is_empty() {
                    return Err(invalid("trailing '.'"));
                }
                rest = remainder;
                after_dot = true;
            }
        }

        Ok(Self { accessors })
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Accessor> {
        self.accessors.iter()
    }

    /// Append an accessor in place.
    pub fn push(&mut self, accessor: impl Into<Accessor>) {
        self.accessors.push(accessor.into());
    }

    /// Remove and return the last accessor.
    pub fn pop(&mut self) -> Option<Accessor> {
        self.accessors.pop()
    }

    /// Return a new path with `accessor` appended.
    pub fn join(&self, accessor: impl Into<Accessor>) -> Self {
        let mut child = self.clone();
        child.push(accessor);
        child
    }

    /// Human-readable form for error messages; the root renders as `(root)`.
    pub(crate) fn label(&self) -> String {
        if self.is_empty() {
            "(root)".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Read a quoted key body (after the opening `"`) up to its closing quote.
/// Returns the unescaped key and the text following the closing quote.
fn parse_quoted(s: &str) -> Option<(String, &str)> {
    let mut key = String::new();
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            key.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some((key, &s[i + 1..]));
        } else {
            key.push(ch);
        }
    }
    None
}

/// Keys that can be written without the `["..."]` form.
fn is_simple_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(|c| matches!(c, '.' | '[' | ']' | '"'))
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, accessor) in self.accessors.iter().enumerate() {
            match accessor {
                Accessor::Key(key) if is_simple_key(key) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(key)?;
                }
                Accessor::Key(key) => {
                    f.write_str("[\"")?;
                    for ch in key.chars() {
                        if ch == '"' || ch == '\\' {
                            f.write_char('\\')?;
                        }
                        f.write_char(ch)?;
                    }
                    f.write_str("\"]")?;
                }
                Accessor::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Vec<Accessor>> for PropertyPath {
    fn from(accessors: Vec<Accessor>) -> Self {
        Self { accessors }
    }
}

impl FromIterator<Accessor> for PropertyPath {
    fn from_iter<I: IntoIterator<Item = Accessor>>(iter: I) -> Self {
        Self {
            accessors: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PropertyPath {
    type Item = &'a Accessor;
    type IntoIter = std::slice::Iter<'a, Accessor>;

    fn into_iter(self) -> Self::IntoIter {
        self.accessors.iter()
    }
}
