//! Directory listing entries

use serde::{Deserialize, Serialize};

/// One direct child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: false }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: true }
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}
