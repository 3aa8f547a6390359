//! Local filesystem adapter
//!
//! Confines every operation to a base directory. Logical paths are resolved
//! in three layers before any filesystem call is made:
//!
//! 1. lexical normalization via [`LogicalPath`], which rejects empty,
//!    absolute and `..`-bearing paths;
//! 2. a prefix check on the joined path that only matches the base at a
//!    separator boundary, so `/data` never admits `/data-private`;
//! 3. canonicalization of the deepest existing ancestor, which catches
//!    symlinks inside the sandbox pointing outside of it.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fernfs_core::{
    adapter::{ByteStream, StorageAdapter},
    entry::DirEntry,
    error::{FernError, FernResult},
    metadata::{FileInfo, Permissions},
    operations::{ReadOptions, WriteOptions, DEFAULT_DIR_MODE},
    LogicalPath,
};
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem adapter
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    id: String,
    root: PathBuf,
}

/// A logical path together with its location under the adapter root.
struct Resolved {
    logical: LogicalPath,
    real: PathBuf,
}

impl Resolved {
    fn err(&self, e: io::Error) -> FernError {
        FernError::from_io(e, self.logical.to_string())
    }

    /// Destructive operations never act on the base directory itself.
    fn reject_root(self) -> FernResult<Self> {
        if self.logical.is_root() {
            return Err(FernError::InvalidPath(
                "operation not permitted on the base directory".into(),
            ));
        }
        Ok(self)
    }
}

impl LocalAdapter {
    /// Create an adapter rooted at `base_path`.
    ///
    /// The directory is created if missing and the root is stored in
    /// canonical form, so later containment checks compare like with like
    /// (e.g. macOS `/tmp` vs `/private/tmp`).
    pub fn new(base_path: impl AsRef<Path>) -> FernResult<Self> {
        Self::with_id("local", base_path)
    }

    pub fn with_id(id: impl Into<String>, base_path: impl AsRef<Path>) -> FernResult<Self> {
        let base_path = base_path.as_ref();
        if base_path.as_os_str().is_empty() {
            return Err(FernError::Config("base_path is required".into()));
        }

        let absolute = std::path::absolute(base_path).map_err(|e| {
            FernError::Config(format!("failed to get absolute path for {}: {e}", base_path.display()))
        })?;

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DEFAULT_DIR_MODE);
        }
        builder.create(&absolute).map_err(|e| {
            FernError::Config(format!("failed to create base directory {}: {e}", absolute.display()))
        })?;

        let root = absolute.canonicalize().map_err(|e| {
            FernError::Config(format!("failed to resolve base directory {}: {e}", absolute.display()))
        })?;

        Ok(Self { id: id.into(), root })
    }

    pub fn base_path(&self) -> &Path {
        &self.root
    }

    async fn resolve(&self, raw: &str) -> FernResult<Resolved> {
        let logical = LogicalPath::parse(raw)?;
        let real = logical.to_real_path(&self.root);

        if !is_within(&self.root, &real) {
            return Err(FernError::InvalidPath(format!("path escapes base directory: {raw}")));
        }
        self.check_links(&logical, &real).await?;

        Ok(Resolved { logical, real })
    }

    /// Walk up from `real` to the deepest component that exists and make
    /// sure its canonical form is still under the root.
    async fn check_links(&self, logical: &LogicalPath, real: &Path) -> FernResult<()> {
        let mut cursor = real.to_path_buf();
        loop {
            match fs::canonicalize(&cursor).await {
                Ok(canonical) => {
                    if is_within(&self.root, &canonical) {
                        return Ok(());
                    }
                    return Err(FernError::InvalidPath(format!(
                        "path escapes base directory through a symlink: {logical}"
                    )));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // A dangling link would let a create follow it out of the sandbox.
                    if fs::symlink_metadata(&cursor).await.is_ok() {
                        return Err(FernError::InvalidPath(format!("dangling symlink: {logical}")));
                    }
                    if !cursor.pop() || !is_within(&self.root, &cursor) {
                        return Ok(());
                    }
                }
                Err(e) => return Err(FernError::from_io(e, logical.to_string())),
            }
        }
    }
}

/// `candidate` is `root` itself or lies below it at a separator boundary.
fn is_within(root: &Path, candidate: &Path) -> bool {
    if !candidate.starts_with(root) {
        return false;
    }

    let root = root.as_os_str().as_encoded_bytes();
    let candidate = candidate.as_os_str().as_encoded_bytes();
    if candidate == root {
        return true;
    }
    if !candidate.starts_with(root) {
        return false;
    }
    let root_has_trailing_sep = root.last().is_some_and(|&b| std::path::is_separator(b as char));
    root_has_trailing_sep || std::path::is_separator(candidate[root.len()] as char)
}

#[cfg(unix)]
fn os_permissions(mode: Permissions) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(mode.mode)
}

#[cfg(not(unix))]
fn os_permissions_for(mut current: std::fs::Permissions, mode: Permissions) -> std::fs::Permissions {
    current.set_readonly(mode.mode & 0o222 == 0);
    current
}

async fn set_mode(real: &Path, mode: Permissions) -> io::Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(real, os_permissions(mode)).await
    }
    #[cfg(not(unix))]
    {
        let current = fs::metadata(real).await?.permissions();
        fs::set_permissions(real, os_permissions_for(current, mode)).await
    }
}

async fn create_dirs(real: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(real).await
}

fn permissions_of(meta: &std::fs::Metadata) -> Permissions {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Permissions::from_raw_mode(meta.permissions().mode())
    }
    #[cfg(not(unix))]
    {
        let base = if meta.permissions().readonly() { 0o444 } else { 0o666 };
        Permissions::new(if meta.is_dir() { base | 0o111 } else { base })
    }
}

async fn next_chunk(file: &mut fs::File, remaining: Option<u64>) -> FernResult<Option<Bytes>> {
    let want = match remaining {
        Some(0) => return Ok(None),
        Some(n) => n.min(READ_CHUNK_SIZE as u64) as usize,
        None => READ_CHUNK_SIZE,
    };
    let mut buf = vec![0u8; want];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some(Bytes::from(buf)))
}

/// Stream the rest of `file`, stopping after `limit` bytes when set.
/// The handle lives in the stream state and is dropped with it.
fn ranged_stream(file: fs::File, limit: Option<u64>) -> ByteStream {
    Box::pin(futures::stream::try_unfold(
        (file, limit),
        |(mut file, remaining)| async move {
            next_chunk(&mut file, remaining).await.map(|chunk| {
                chunk.map(|bytes| {
                    let remaining = remaining.map(|r| r - bytes.len() as u64);
                    (bytes, (file, remaining))
                })
            })
        },
    ))
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Filesystem"
    }

    async fn mkdir(&self, path: &str, mode: Permissions) -> FernResult<()> {
        let target = self.resolve(path).await?;
        let existed = fs::symlink_metadata(&target.real).await.is_ok();

        create_dirs(&target.real, mode.mode).await.map_err(|e| target.err(e))?;

        // DirBuilder's mode is filtered by the umask; pin the requested bits on the leaf.
        if !existed {
            set_mode(&target.real, mode).await.map_err(|e| target.err(e))?;
        }
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> FernResult<()> {
        let target = self.resolve(path).await?.reject_root()?;

        let meta = fs::metadata(&target.real).await.map_err(|e| target.err(e))?;
        if !meta.is_dir() {
            return Err(FernError::NotADirectory(target.logical.to_string()));
        }

        fs::remove_dir(&target.real).await.map_err(|e| target.err(e))
    }

    async fn readdir(&self, path: &str) -> FernResult<Vec<DirEntry>> {
        let target = self.resolve(path).await?;

        let meta = fs::metadata(&target.real).await.map_err(|e| target.err(e))?;
        if !meta.is_dir() {
            return Err(FernError::NotADirectory(target.logical.to_string()));
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&target.real).await.map_err(|e| target.err(e))?;

        while let Some(entry) = read_dir.next_entry().await.map_err(|e| target.err(e))? {
            let file_type = entry.file_type().await.map_err(|e| target.err(e))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }

        Ok(entries)
    }

    async fn stat(&self, path: &str) -> FernResult<FileInfo> {
        let target = self.resolve(path).await?;

        let meta = fs::metadata(&target.real).await.map_err(|e| target.err(e))?;
        let modified = meta.modified().map_err(|e| target.err(e))?;
        let name = target
            .real
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());

        Ok(FileInfo {
            name,
            size: meta.len(),
            mode: permissions_of(&meta),
            modified: DateTime::<Utc>::from(modified),
            is_dir: meta.is_dir(),
        })
    }

    async fn read_file(&self, path: &str, opts: &ReadOptions) -> FernResult<ByteStream> {
        let target = self.resolve(path).await?;

        let mut file = fs::File::open(&target.real).await.map_err(|e| target.err(e))?;
        let meta = file.metadata().await.map_err(|e| target.err(e))?;
        if meta.is_dir() {
            return Err(FernError::IsADirectory(target.logical.to_string()));
        }

        // Seeking past i64::MAX fails with EINVAL; anything at or past EOF is empty anyway.
        if opts.offset >= meta.len() {
            return Ok(Box::pin(futures::stream::empty()));
        }

        if opts.offset > 0 {
            file.seek(io::SeekFrom::Start(opts.offset))
                .await
                .map_err(|e| target.err(e))?;
        }

        Ok(ranged_stream(file, opts.limit()))
    }

    async fn write_file(&self, path: &str, mut data: ByteStream, opts: &WriteOptions) -> FernResult<()> {
        let target = self.resolve(path).await?.reject_root()?;

        if let Some(parent) = target.real.parent() {
            create_dirs(parent, DEFAULT_DIR_MODE).await.map_err(|e| target.err(e))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(opts.mode.mode);
        let mut file = options.open(&target.real).await.map_err(|e| target.err(e))?;

        // Any early return drops `file`, which closes the descriptor.
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(|e| target.err(e))?;
        }
        file.flush().await.map_err(|e| target.err(e))?;

        set_mode(&target.real, opts.mode).await.map_err(|e| target.err(e))
    }

    async fn unlink(&self, path: &str) -> FernResult<()> {
        let target = self.resolve(path).await?.reject_root()?;

        let meta = fs::symlink_metadata(&target.real).await.map_err(|e| target.err(e))?;
        if meta.is_dir() {
            return Err(FernError::IsADirectory(target.logical.to_string()));
        }

        fs::remove_file(&target.real).await.map_err(|e| target.err(e))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> FernResult<()> {
        let source = self.resolve(old_path).await?.reject_root()?;
        let dest = self.resolve(new_path).await?.reject_root()?;

        fs::symlink_metadata(&source.real).await.map_err(|e| source.err(e))?;

        // Checked before parents are created so a refused move leaves no directories behind.
        let (from, to) = (source.logical.segments(), dest.logical.segments());
        if to.len() > from.len() && to.starts_with(from) {
            return Err(FernError::InvalidPath(format!(
                "cannot move {} into itself ({})",
                source.logical, dest.logical
            )));
        }

        if let Some(parent) = dest.real.parent() {
            create_dirs(parent, DEFAULT_DIR_MODE).await.map_err(|e| dest.err(e))?;
        }

        fs::rename(&source.real, &dest.real).await.map_err(|e| {
            FernError::from_io(e, format!("{} -> {}", source.logical, dest.logical))
        })
    }

    async fn chmod(&self, path: &str, mode: Permissions) -> FernResult<()> {
        let target = self.resolve(path).await?;
        set_mode(&target.real, mode).await.map_err(|e| target.err(e))
    }

    async fn close(&self) -> FernResult<()> {
        Ok(())
    }
}
