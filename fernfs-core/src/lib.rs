//! fernfs Core
//!
//! The storage adapter contract: the operation set every backend exposes,
//! the value types it exchanges, and the error vocabulary it raises.

pub mod adapter;
pub mod entry;
pub mod error;
pub mod metadata;
pub mod operations;
pub mod path;

pub use adapter::{read_to_bytes, ByteStream, StorageAdapter};
pub use entry::DirEntry;
pub use error::{FernError, FernResult};
pub use metadata::{FileInfo, Permissions};
pub use operations::{ReadOptions, WriteOptions};
pub use path::LogicalPath;
