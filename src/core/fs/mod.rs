//! # Filesystem Module
//!
//! The mutations the organizer performs, behind a trait so plans can be
//! resolved and executed against something other than the real disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operations used by the resolver and executors
pub trait FileSystem: Send + Sync {
    /// Move a file, creating nothing on the way
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and its parents if missing
    fn ensure_directory(&self, path: &Path) -> io::Result<()>;

    /// Size in bytes
    fn file_size(&self, path: &Path) -> io::Result<u64>;

    fn exists(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`; empty when `dir` does not exist
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).or_else(|_| {
            // rename fails across filesystems; copy, verify, then delete
            let source_size = fs::metadata(from)?.len();
            fs::copy(from, to)?;

            let dest_size = fs::metadata(to)?.len();
            if dest_size != source_size {
                let _ = fs::remove_file(to);
                return Err(io::Error::other(format!(
                    "copy verification failed: source {} bytes, destination {} bytes",
                    source_size, dest_size
                )));
            }

            fs::remove_file(from)
        })
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn ensure_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Append `_N` to the stem until `taken` rejects no more.
///
/// `data.jpg` becomes `data_1.jpg`, then `data_2.jpg`.
pub fn unique_path(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1usize;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = parent.join(name);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
