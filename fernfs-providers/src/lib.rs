//! Storage adapters for fernfs
//!
//! Only the local filesystem adapter exists today. New backends implement
//! [`StorageAdapter`] and get an [`AdapterKind`] variant here; callers go
//! through [`create_adapter`] and never name a concrete type.

#[cfg(feature = "local")]
mod local;

#[cfg(feature = "local")]
pub use local::LocalAdapter;

use fernfs_core::{FernError, FernResult, StorageAdapter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which backend an [`AdapterConfig`] selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    #[default]
    Local,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Local => "local",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = FernError;

    fn from_str(s: &str) -> FernResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AdapterKind::Local),
            other => Err(FernError::Config(format!("unknown adapter type: {other}"))),
        }
    }
}

/// Storage adapter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(rename = "type", default)]
    pub kind: AdapterKind,
    #[serde(default)]
    pub base_path: String,
}

impl AdapterConfig {
    pub fn local(base_path: impl Into<String>) -> Self {
        Self { kind: AdapterKind::Local, base_path: base_path.into() }
    }
}

/// Build the adapter described by `config`.
pub fn create_adapter(config: &AdapterConfig) -> FernResult<Arc<dyn StorageAdapter>> {
    if config.base_path.trim().is_empty() {
        return Err(FernError::Config("base_path is required".into()));
    }

    match config.kind {
        #[cfg(feature = "local")]
        AdapterKind::Local => {
            let adapter = LocalAdapter::new(&config.base_path)?;
            tracing::debug!(
                kind = %config.kind,
                base_path = %adapter.base_path().display(),
                "created storage adapter"
            );
            Ok(Arc::new(adapter))
        }
        #[cfg(not(feature = "local"))]
        AdapterKind::Local => Err(FernError::Unsupported(
            "local adapter support was not compiled in".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("local".parse::<AdapterKind>().unwrap(), AdapterKind::Local);
        assert_eq!(" LOCAL ".parse::<AdapterKind>().unwrap(), AdapterKind::Local);
        assert!(matches!("s3".parse::<AdapterKind>(), Err(FernError::Config(_))));
    }

    #[test]
    fn test_create_adapter_requires_base_path() {
        let err = create_adapter(&AdapterConfig::default()).err().unwrap();
        assert!(matches!(err, FernError::Config(_)));
    }

    #[tokio::test]
    async fn test_create_local_adapter() {
        let temp = tempfile::TempDir::new().unwrap();
        let base = temp.path().join("store");
        let adapter = create_adapter(&AdapterConfig::local(base.to_string_lossy())).unwrap();

        assert_eq!(adapter.id(), "local");
        adapter
            .mkdir("docs", fernfs_core::Permissions::new(0o755))
            .await
            .unwrap();
        assert!(base.join("docs").is_dir());
        adapter.close().await.unwrap();
    }
}
