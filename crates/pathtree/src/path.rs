//! Path keys: ordered segment sequences addressing tree nodes

use std::fmt;

/// Ordered sequence of string segments, root to node
///
/// A single string converts into a one-segment path. Nothing here rejects
/// an empty key; operations that need a target node do that themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(Vec<String>);

impl PathKey {
    /// Create a path from owned segments
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Segments in root-to-node order
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the path has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Return a new path with `segment` appended
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Whole-segment prefix test; a path is a prefix of itself
    pub fn starts_with(&self, prefix: &PathKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over segments
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<&str> for PathKey {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_owned()])
    }
}

impl From<String> for PathKey {
    fn from(segment: String) -> Self {
        Self(vec![segment])
    }
}

impl From<Vec<String>> for PathKey {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<Vec<&str>> for PathKey {
    fn from(segments: Vec<&str>) -> Self {
        Self(segments.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for PathKey {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl From<&[String]> for PathKey {
    fn from(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for PathKey {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl From<&PathKey> for PathKey {
    fn from(path: &PathKey) -> Self {
        path.clone()
    }
}

impl FromIterator<String> for PathKey {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
