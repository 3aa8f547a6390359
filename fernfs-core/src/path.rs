//! Logical path normalization
//!
//! A [`LogicalPath`] is a caller-supplied, backend-relative path that has
//! been normalized lexically and is guaranteed never to name anything above
//! the root it is later joined onto. Parsing never touches the filesystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FernError, FernResult};

/// Normalized backend-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalPath {
    segments: Vec<String>,
}

impl LogicalPath {
    /// Parse and normalize a logical path.
    ///
    /// Empty strings, strings containing NUL, absolute paths and any `..`
    /// segment are rejected with [`FernError::InvalidPath`]. Redundant
    /// separators and `.` segments are dropped, so `"."` parses to the root.
    pub fn parse(raw: &str) -> FernResult<Self> {
        if raw.is_empty() {
            return Err(FernError::InvalidPath("path cannot be empty".into()));
        }
        if raw.contains('\0') {
            return Err(FernError::InvalidPath(format!("path contains NUL byte: {raw:?}")));
        }
        if raw.starts_with(std::path::is_separator) || Path::new(raw).has_root() || Path::new(raw).is_absolute() {
            return Err(FernError::InvalidPath(format!("absolute paths are not allowed: {raw}")));
        }

        let mut segments = Vec::new();
        for seg in raw.split(std::path::is_separator) {
            match seg {
                "" | "." => {}
                ".." => {
                    return Err(FernError::InvalidPath(format!("path traversal not allowed: {raw}")));
                }
                _ => segments.push(seg.to_string()),
            }
        }

        // A segment like `C:` would turn into a drive prefix when joined on Windows.
        if let Some(first) = segments.first() {
            if Path::new(first).components().any(|c| matches!(c, std::path::Component::Prefix(_))) {
                return Err(FernError::InvalidPath(format!("absolute paths are not allowed: {raw}")));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Join the segments onto `base`, one component at a time.
    pub fn to_real_path(&self, base: &Path) -> PathBuf {
        let mut real = base.to_path_buf();
        for seg in &self.segments {
            real.push(seg);
        }
        real
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

impl std::str::FromStr for LogicalPath {
    type Err = FernError;

    fn from_str(s: &str) -> FernResult<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = LogicalPath::parse("home/user/docs").unwrap();
        assert_eq!(path.segments(), ["home", "user", "docs"]);
    }

    #[test]
    fn test_parse_collapses_separators_and_dots() {
        let path = LogicalPath::parse("home//./user//").unwrap();
        assert_eq!(path.segments(), ["home", "user"]);
        assert_eq!(path.to_string(), "home/user");
    }

    #[test]
    fn test_dot_is_root() {
        assert!(LogicalPath::parse(".").unwrap().is_root());
        assert!(LogicalPath::parse("./").unwrap().is_root());
        assert_eq!(LogicalPath::parse("./.").unwrap().to_string(), ".");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(LogicalPath::parse(""), Err(FernError::InvalidPath(_))));
    }

    #[test]
    fn test_rejects_absolute() {
        assert!(matches!(LogicalPath::parse("/absolute/path"), Err(FernError::InvalidPath(_))));
        assert!(matches!(LogicalPath::parse("//server/share"), Err(FernError::InvalidPath(_))));
    }

    #[test]
    fn test_rejects_any_parent_segment() {
        for raw in ["..", "../outside", "a/../b", "a/b/..", "./..", "a/./../../x"] {
            assert!(
                matches!(LogicalPath::parse(raw), Err(FernError::InvalidPath(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_nul() {
        assert!(matches!(LogicalPath::parse("a\0b"), Err(FernError::InvalidPath(_))));
    }

    #[test]
    fn test_dotted_names_are_plain_segments() {
        let path = LogicalPath::parse("...").unwrap();
        assert_eq!(path.segments(), ["..."]);
        let path = LogicalPath::parse("..hidden/file..").unwrap();
        assert_eq!(path.segments(), ["..hidden", "file.."]);
    }

    #[test]
    fn test_to_real_path() {
        let path = LogicalPath::parse("a/b").unwrap();
        assert_eq!(path.to_real_path(Path::new("/srv/data")), PathBuf::from("/srv/data/a/b"));
        assert_eq!(LogicalPath::parse(".").unwrap().to_real_path(Path::new("/srv/data")), PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_equality_after_normalization() {
        let a = LogicalPath::parse("home/user").unwrap();
        let b: LogicalPath = "./home//user/".parse().unwrap();
        assert_eq!(a, b);
    }
}
