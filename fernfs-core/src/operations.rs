//! Operation options

use serde::{Deserialize, Serialize};

use crate::error::{FernError, FernResult};
use crate::metadata::Permissions;

/// Options for a single `read_file` call.
///
/// `length == 0` means "read to end of file".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub offset: u64,
    pub length: u64,
}

impl ReadOptions {
    pub fn range(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Byte limit for this read, if any.
    pub fn limit(&self) -> Option<u64> {
        (self.length > 0).then_some(self.length)
    }

    /// Parse an HTTP `Range` header value of the form `bytes=start-end`
    /// (inclusive end) or `bytes=start-` (to end of file).
    pub fn from_range_header(header: &str) -> FernResult<Self> {
        let invalid = || FernError::InvalidRange(header.to_string());

        let spec = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
        let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
        let start: u64 = start.trim().parse().map_err(|_| invalid())?;

        let end = end.trim();
        if end.is_empty() {
            return Ok(Self { offset: start, length: 0 });
        }
        let end: u64 = end.parse().map_err(|_| invalid())?;
        if end < start {
            return Err(invalid());
        }
        // Only `0-u64::MAX` overflows, and that range is the whole file.
        let length = (end - start).checked_add(1).unwrap_or(0);
        Ok(Self { offset: start, length })
    }
}

/// Options for a single `write_file` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub mode: Permissions,
}

impl WriteOptions {
    pub const DEFAULT_MODE: u32 = 0o644;

    pub fn with_mode(mode: u32) -> Self {
        Self { mode: Permissions::new(mode) }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::with_mode(Self::DEFAULT_MODE)
    }
}

/// Mode used for directories the adapter creates implicitly (write and rename parents).
pub const DEFAULT_DIR_MODE: u32 = 0o755;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header_inclusive_end() {
        let opts = ReadOptions::from_range_header("bytes=5-8").unwrap();
        assert_eq!(opts, ReadOptions::range(5, 4));
    }

    #[test]
    fn test_range_header_open_end() {
        let opts = ReadOptions::from_range_header("bytes=10-").unwrap();
        assert_eq!(opts, ReadOptions::range(10, 0));
        assert_eq!(opts.limit(), None);
    }

    #[test]
    fn test_range_header_single_byte() {
        let opts = ReadOptions::from_range_header("bytes=0-0").unwrap();
        assert_eq!(opts.limit(), Some(1));
    }

    #[test]
    fn test_range_header_rejects_malformed() {
        for header in ["", "bytes=", "bytes=-5", "items=0-4", "bytes=a-b", "bytes=9-1", "bytes=1-2-3"] {
            assert!(
                matches!(ReadOptions::from_range_header(header), Err(FernError::InvalidRange(_))),
                "{header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_range_header_at_u64_limit() {
        let whole = ReadOptions::from_range_header("bytes=0-18446744073709551615").unwrap();
        assert_eq!(whole, ReadOptions::range(0, 0));
        assert_eq!(whole.limit(), None);

        let tail = ReadOptions::from_range_header("bytes=1-18446744073709551615").unwrap();
        assert_eq!(tail, ReadOptions::range(1, u64::MAX));

        assert!(matches!(
            ReadOptions::from_range_header("bytes=0-18446744073709551616"),
            Err(FernError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_write_options_default_mode() {
        assert_eq!(WriteOptions::default().mode.mode, 0o644);
    }
}
