//! Hierarchical functor paths.
//!
//! A [`Path`] is an ordered list of case-normalized segments such as
//! `first/sub1`. The last segment is the literal name; the leading segments
//! address the view of the belief store the literal lives in.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::TermError;

/// Separator used when parsing and displaying paths.
pub const SEPARATOR: char = '/';

/// A case-normalized, comparable functor path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The empty path (root of a belief store).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path. Empty segments are skipped, so
    /// `"a//b/"` is the same as `"a/b"`.
    pub fn parse(raw: &str) -> Result<Self, TermError> {
        let segments: Vec<String> = raw
            .split(SEPARATOR)
            .filter(|s| !s.trim().is_empty())
            .map(normalize_segment)
            .collect();
        if segments.is_empty() {
            return Err(TermError::EmptyPath { raw: raw.into() });
        }
        Ok(Self { segments })
    }

    /// Build a path from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            segments: segments
                .into_iter()
                .filter(|s| !s.as_ref().trim().is_empty())
                .map(|s| normalize_segment(s.as_ref()))
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment (the literal name for a functor path).
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Everything except the last segment.
    pub fn parent(&self) -> Path {
        let end = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..end].to_vec(),
        }
    }

    /// Append one segment, returning a new path.
    pub fn join(&self, segment: &str) -> Path {
        let mut segments = self.segments.clone();
        if !segment.trim().is_empty() {
            segments.push(normalize_segment(segment));
        }
        Self { segments }
    }

    /// Concatenate two paths.
    pub fn append(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The remainder after `prefix`, or `None` if `prefix` does not lead
    /// this path.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Path {
                segments: rest.to_vec(),
            })
    }
}

/// Segments are trimmed, NFC-normalized and lowercased.
fn normalize_segment(raw: &str) -> String {
    raw.trim().nfc().collect::<String>().to_lowercase()
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Path {
    type Error = TermError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Path::root());
        }
        Path::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl std::str::FromStr for Path {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}
