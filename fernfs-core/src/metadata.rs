//! File and directory metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FernError, FernResult};

/// Unix-style permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions {
    pub mode: u32,
}

impl Permissions {
    /// Mask applied to raw OS modes to keep only permission bits.
    pub const PERM_MASK: u32 = 0o777;

    pub fn new(mode: u32) -> Self {
        Self { mode }
    }

    /// Keep only the `rwx` bits of a raw OS mode (drops file type, setuid, setgid, sticky).
    pub fn from_raw_mode(raw: u32) -> Self {
        Self { mode: raw & Self::PERM_MASK }
    }

    /// Parse an octal mode string such as `644`, `0644` or `0o644`.
    pub fn parse_octal(s: &str) -> FernResult<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(FernError::InvalidMode(s.to_string()));
        }
        let mode = u32::from_str_radix(digits, 8).map_err(|_| FernError::InvalidMode(s.to_string()))?;
        if mode > 0o7777 {
            return Err(FernError::InvalidMode(s.to_string()));
        }
        Ok(Self { mode })
    }

    /// `ls -l` style rendering, e.g. `rw-r--r--`.
    pub fn symbolic(&self) -> String {
        const FLAGS: [(u32, char); 9] = [
            (0o400, 'r'), (0o200, 'w'), (0o100, 'x'),
            (0o040, 'r'), (0o020, 'w'), (0o010, 'x'),
            (0o004, 'r'), (0o002, 'w'), (0o001, 'x'),
        ];
        FLAGS
            .iter()
            .map(|&(bit, c)| if self.mode & bit != 0 { c } else { '-' })
            .collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.mode)
    }
}

/// Snapshot of one entry's metadata, taken at call time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mode: Permissions,
    #[serde(rename = "mod_time")]
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}
