// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations
//!
//! Each command is a thin mapping from parsed arguments onto one or more
//! adapter calls. Every adapter call is logged with its outcome and latency.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use console::style;
use fernfs_core::{
    ByteStream, DirEntry, FernError, FernResult, FileInfo, Permissions, ReadOptions,
    StorageAdapter, WriteOptions,
};
use futures::StreamExt;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tabled::{Table, Tabled};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

const INPUT_CHUNK_SIZE: usize = 64 * 1024;

/// Default mode for `mkdir` when none is given
pub const DEFAULT_MKDIR_MODE: u32 = 0o755;

/// Run one adapter call, logging what happened and how long it took.
async fn logged<T, F>(adapter: &dyn StorageAdapter, op: &'static str, path: &str, call: F) -> FernResult<T>
where
    F: Future<Output = FernResult<T>>,
{
    let start = Instant::now();
    let result = call.await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => info!(adapter = adapter.id(), op, path, elapsed_ms, "storage call succeeded"),
        Err(e) => warn!(
            adapter = adapter.id(),
            op,
            path,
            elapsed_ms,
            status = e.http_status(),
            error = %e,
            "storage call failed"
        ),
    }
    result
}

/// Join a child name onto a logical directory path.
fn child_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn parse_mode(mode: Option<&str>, default: u32) -> FernResult<Permissions> {
    match mode {
        Some(m) => Permissions::parse_octal(m),
        None => Ok(Permissions::new(default)),
    }
}

/// Adapt any async reader into a [`ByteStream`] of fixed-size chunks.
fn reader_stream<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(futures::stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; INPUT_CHUNK_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => Ok(None),
            Ok(n) => {
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), reader)))
            }
            Err(e) => Err(FernError::Io(e)),
        }
    }))
}

/// Format a timestamp for display
fn format_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Format file size
fn format_size(size: u64, human: bool) -> String {
    if human {
        bytesize::ByteSize(size).to_string()
    } else {
        size.to_string()
    }
}

fn format_kind(is_dir: bool) -> String {
    if is_dir {
        style("d").cyan().to_string()
    } else {
        "-".to_string()
    }
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Permissions")]
    perms: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl LsEntry {
    fn new(info: &FileInfo, name: &str, human: bool) -> Self {
        Self {
            kind: format_kind(info.is_dir),
            perms: info.mode.symbolic(),
            size: format_size(info.size, human),
            modified: format_time(info.modified),
            name: name.to_string(),
        }
    }

    /// Row for a child that was listed but could not be inspected.
    fn unknown(name: &str) -> Self {
        Self {
            kind: style("?").red().to_string(),
            perms: "?????????".to_string(),
            size: "-".to_string(),
            modified: "-".to_string(),
            name: name.to_string(),
        }
    }
}

/// Stat every entry for `ls -l`. A child that cannot be inspected still gets a row.
async fn long_rows(adapter: &dyn StorageAdapter, dir: &str, entries: &[DirEntry], human: bool) -> Vec<LsEntry> {
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let child = child_path(dir, &entry.name);
        let row = match logged(adapter, "stat", &child, adapter.stat(&child)).await {
            Ok(info) => LsEntry::new(&info, &entry.name, human),
            Err(_) => LsEntry::unknown(&entry.name),
        };
        rows.push(row);
    }
    rows
}

fn to_json<T: serde::Serialize>(value: &T) -> FernResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| FernError::Other(format!("failed to encode JSON: {e}")))
}

/// List directory contents
pub async fn ls(
    adapter: &dyn StorageAdapter,
    path: &str,
    long: bool,
    all: bool,
    human: bool,
    json: bool,
) -> FernResult<()> {
    let entries: Vec<DirEntry> = logged(adapter, "readdir", path, adapter.readdir(path))
        .await?
        .into_iter()
        .filter(|e| all || !e.is_hidden())
        .collect();

    if json {
        println!("{}", to_json(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("(empty directory)");
        return Ok(());
    }

    if long {
        let rows = long_rows(adapter, path, &entries, human).await;
        println!("{}", Table::new(rows));
    } else {
        for entry in &entries {
            if entry.is_dir {
                println!("{}/", style(&entry.name).cyan());
            } else {
                println!("{}", entry.name);
            }
        }
    }

    Ok(())
}

/// Show file or directory information
pub async fn stat(adapter: &dyn StorageAdapter, path: &str, json: bool) -> FernResult<()> {
    let info = logged(adapter, "stat", path, adapter.stat(path)).await?;

    if json {
        println!("{}", to_json(&info)?);
        return Ok(());
    }

    println!("  Name: {}", info.name);
    println!("  Type: {}", if info.is_dir { "directory" } else { "file" });
    println!("  Size: {} ({})", info.size, bytesize::ByteSize(info.size));
    println!("  Mode: {} ({})", info.mode, info.mode.symbolic());
    println!("  Modified: {}", info.modified);

    Ok(())
}

/// Write file contents to stdout, optionally limited to a byte range
pub async fn cat(adapter: &dyn StorageAdapter, path: &str, range: Option<&str>) -> FernResult<()> {
    let options = match range {
        Some(header) => ReadOptions::from_range_header(header)?,
        None => ReadOptions::default(),
    };
    debug!(path, offset = options.offset, length = options.length, "reading file");

    let mut stream = logged(adapter, "read_file", path, adapter.read_file(path, &options)).await?;

    let mut out = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        out.write_all(&chunk?)?;
    }
    out.flush()?;

    Ok(())
}

/// Replace a file with the contents of stdin or a local file
pub async fn write(
    adapter: &dyn StorageAdapter,
    path: &str,
    from: Option<&Path>,
    mode: Option<&str>,
) -> FernResult<()> {
    let options = WriteOptions { mode: parse_mode(mode, WriteOptions::DEFAULT_MODE)? };

    let source = match from {
        Some(local) => {
            let file = tokio::fs::File::open(local)
                .await
                .map_err(|e| FernError::from_io(e, local.display().to_string()))?;
            reader_stream(file)
        }
        None => reader_stream(tokio::io::stdin()),
    };

    logged(adapter, "write_file", path, adapter.write_file(path, source, &options)).await?;
    println!("Wrote {}", path);
    Ok(())
}

/// Create directories
pub async fn mkdir(adapter: &dyn StorageAdapter, paths: &[String], mode: Option<&str>) -> FernResult<()> {
    let mode = parse_mode(mode, DEFAULT_MKDIR_MODE)?;
    for path in paths {
        logged(adapter, "mkdir", path, adapter.mkdir(path, mode)).await?;
        println!("Created {}", path);
    }
    Ok(())
}

/// Remove empty directories
pub async fn rmdir(adapter: &dyn StorageAdapter, paths: &[String]) -> FernResult<()> {
    for path in paths {
        logged(adapter, "rmdir", path, adapter.rmdir(path)).await?;
        println!("Removed {}", path);
    }
    Ok(())
}

/// Remove files
pub async fn rm(adapter: &dyn StorageAdapter, paths: &[String]) -> FernResult<()> {
    for path in paths {
        logged(adapter, "unlink", path, adapter.unlink(path)).await?;
        println!("Removed {}", path);
    }
    Ok(())
}

/// Move/rename files
pub async fn mv(adapter: &dyn StorageAdapter, source: &str, dest: &str) -> FernResult<()> {
    let label = format!("{source} -> {dest}");
    logged(adapter, "rename", &label, adapter.rename(source, dest)).await?;
    println!("Moved {}", label);
    Ok(())
}

/// Change permission bits
pub async fn chmod(adapter: &dyn StorageAdapter, mode: &str, paths: &[String]) -> FernResult<()> {
    let mode = Permissions::parse_octal(mode)?;
    for path in paths {
        logged(adapter, "chmod", path, adapter.chmod(path, mode)).await?;
        println!("Changed mode of {} to {}", path, mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fernfs_providers::{create_adapter, AdapterConfig};
    use std::sync::Arc;

    fn adapter(temp: &tempfile::TempDir) -> Arc<dyn StorageAdapter> {
        create_adapter(&AdapterConfig::local(temp.path().join("base").to_string_lossy())).unwrap()
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path(".", "a"), "a");
        assert_eq!(child_path("./", "a"), "a");
        assert_eq!(child_path("dir", "a"), "dir/a");
        assert_eq!(child_path("dir/", "a"), "dir/a");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None, 0o755).unwrap().mode, 0o755);
        assert_eq!(parse_mode(Some("600"), 0o755).unwrap().mode, 0o600);
        assert!(parse_mode(Some("rwx"), 0o755).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1024, false), "1024");
        assert_ne!(format_size(1024, true), "1024");
    }

    #[tokio::test]
    async fn test_reader_stream_chunks_input() {
        let body = vec![7u8; INPUT_CHUNK_SIZE + 5];
        let stream = reader_stream(std::io::Cursor::new(body.clone()));
        let collected = fernfs_core::read_to_bytes(stream).await.unwrap();
        assert_eq!(collected.to_vec(), body);
    }

    #[tokio::test]
    async fn test_write_from_local_file_then_move_and_chmod() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = adapter(&temp);
        let source = temp.path().join("upload.txt");
        std::fs::write(&source, b"uploaded body").unwrap();

        write(adapter.as_ref(), "in/upload.txt", Some(&source), Some("640")).await.unwrap();
        mv(adapter.as_ref(), "in/upload.txt", "out/final.txt").await.unwrap();
        chmod(adapter.as_ref(), "600", &["out/final.txt".to_string()]).await.unwrap();

        let info = adapter.stat("out/final.txt").await.unwrap();
        assert_eq!(info.size, 13);
        #[cfg(unix)]
        assert_eq!(info.mode.mode, 0o600);
    }

    #[tokio::test]
    async fn test_directory_commands() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = adapter(&temp);
        let dirs = vec!["a".to_string(), "b/c".to_string()];

        mkdir(adapter.as_ref(), &dirs, None).await.unwrap();
        ls(adapter.as_ref(), ".", true, false, true, false).await.unwrap();
        rmdir(adapter.as_ref(), &["b/c".to_string()]).await.unwrap();

        assert!(adapter.stat("a").await.unwrap().is_dir);
        assert!(adapter.stat("b/c").await.unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_long_listing_survives_unreadable_children() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = adapter(&temp);
        adapter
            .write_bytes("ok.txt", Bytes::from_static(b"hello"), &WriteOptions::default())
            .await
            .unwrap();

        let base = temp.path().join("base");
        let outside = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), base.join("escape")).unwrap();
        std::os::unix::fs::symlink(base.join("gone"), base.join("dangling")).unwrap();

        ls(adapter.as_ref(), ".", true, false, false, false).await.unwrap();

        let entries = adapter.readdir(".").await.unwrap();
        let rows = long_rows(adapter.as_ref(), ".", &entries, false).await;
        assert_eq!(rows.len(), 3);
        for row in &rows {
            if row.name == "ok.txt" {
                assert_eq!(row.perms, "rw-r--r--");
            } else {
                assert_eq!(row.perms, "?????????", "{} should render as unknown", row.name);
            }
        }
    }

    #[tokio::test]
    async fn test_cat_rejects_bad_range() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = adapter(&temp);
        let err = cat(adapter.as_ref(), "whatever", Some("bytes=9-1")).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_rm_missing_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = adapter(&temp);
        let err = rm(adapter.as_ref(), &["ghost.txt".to_string()]).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
