use std::fmt;
use std::str::FromStr;

use super::StoreError;

/// Characters a key segment may not contain.
const FORBIDDEN: [char; 6] = ['.', '#', '$', '[', ']', '/'];

/// A validated `/`-separated location in the realtime tree.
///
/// The empty path addresses the root. Segments are never empty and never
/// contain `.`, `#`, `$`, `[` or `]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for seg in trimmed.split('/') {
            validate_segment(seg)?;
            segments.push(seg.to_string());
        }
        Ok(Self { segments })
    }

    /// Append one key segment.
    pub fn child(&self, segment: &str) -> Result<Self, StoreError> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Append a relative path such as `students/abc`.
    pub fn join(&self, relative: &str) -> Result<Self, StoreError> {
        let rel = Self::parse(relative)?;
        let mut segments = self.segments.clone();
        segments.extend(rel.segments);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// `true` when `self` equals `other` or lies above it.
    pub fn is_ancestor_or_self_of(&self, other: &StorePath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// `true` when a change at one path can alter the value seen at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_or_self_of(other) || other.is_ancestor_or_self_of(self)
    }
}

fn validate_segment(seg: &str) -> Result<(), StoreError> {
    if seg.is_empty() {
        return Err(StoreError::InvalidPath("empty path segment".into()));
    }
    if let Some(c) = seg.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return Err(StoreError::InvalidPath(format!(
            "segment '{seg}' contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
