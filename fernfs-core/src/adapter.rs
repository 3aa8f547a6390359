//! Storage adapter trait

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::{
    entry::DirEntry,
    error::FernResult,
    metadata::{FileInfo, Permissions},
    operations::{ReadOptions, WriteOptions},
};

/// Byte stream type, used for both reads and writes
pub type ByteStream = Pin<Box<dyn Stream<Item = FernResult<Bytes>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn bytes_stream(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a [`ByteStream`] into one contiguous buffer.
pub async fn read_to_bytes(mut stream: ByteStream) -> FernResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Filesystem operations every storage backend provides.
///
/// Paths are logical, backend-relative strings. Implementations must reject
/// empty, absolute and `..`-bearing paths with
/// [`FernError::InvalidPath`](crate::FernError::InvalidPath) before touching
/// any storage. Adapters hold no per-call state, so a single instance can be
/// shared across tasks behind an `Arc<dyn StorageAdapter>`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;

    /// Create a directory and any missing parents. Succeeds if it already exists.
    async fn mkdir(&self, path: &str, mode: Permissions) -> FernResult<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &str) -> FernResult<()>;

    /// List the direct children of a directory, in backend order.
    async fn readdir(&self, path: &str) -> FernResult<Vec<DirEntry>>;

    async fn stat(&self, path: &str) -> FernResult<FileInfo>;

    /// Open a file for reading from `opts.offset`, yielding at most
    /// `opts.length` bytes when it is nonzero. An offset past the end of the
    /// file yields an empty stream. Dropping the stream releases the handle.
    async fn read_file(&self, path: &str, opts: &ReadOptions) -> FernResult<ByteStream>;

    /// Replace the file's contents with everything `data` yields, creating
    /// parent directories as needed.
    async fn write_file(&self, path: &str, data: ByteStream, opts: &WriteOptions) -> FernResult<()>;

    /// Remove a file. Directories are rejected; use [`rmdir`](Self::rmdir).
    async fn unlink(&self, path: &str) -> FernResult<()>;

    /// Move an entry, creating the destination's parent directories as needed.
    async fn rename(&self, old_path: &str, new_path: &str) -> FernResult<()>;

    async fn chmod(&self, path: &str, mode: Permissions) -> FernResult<()>;

    /// Release backend resources. Called once at shutdown.
    async fn close(&self) -> FernResult<()>;

    async fn write_bytes(&self, path: &str, data: Bytes, opts: &WriteOptions) -> FernResult<()> {
        self.write_file(path, bytes_stream(data), opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FernError;

    #[tokio::test]
    async fn test_read_to_bytes_concatenates_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"test ")), Ok(Bytes::from_static(b"content"))];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        let data = read_to_bytes(stream).await.unwrap();
        assert_eq!(&data[..], b"test content");
    }

    #[tokio::test]
    async fn test_read_to_bytes_propagates_errors() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FernError::Other("broken pipe".into())),
        ];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        assert!(read_to_bytes(stream).await.is_err());
    }

    #[tokio::test]
    async fn test_bytes_stream_single_chunk() {
        let data = read_to_bytes(bytes_stream(Bytes::from_static(b"abc"))).await.unwrap();
        assert_eq!(&data[..], b"abc");
    }
}
