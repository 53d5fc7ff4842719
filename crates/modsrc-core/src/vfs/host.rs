//! Loading host directories into a [`MemFs`].

use std::path::Path;

use walkdir::WalkDir;

use super::DEFAULT_DIR_MODE;
use super::DEFAULT_FILE_MODE;
use super::MemFs;
use crate::Result;
use crate::ResolveError;

impl MemFs {
    /// Copies a directory tree from the host filesystem.
    ///
    /// Symlinks are followed. Entries that are neither files nor directories
    /// after following links are skipped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modsrc_core::MemFs;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let fs = MemFs::from_host_dir("infra/")?;
    /// for file in fs.files() {
    ///     println!("{file}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_host_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut fs = Self::new();

        for entry in WalkDir::new(root).follow_links(true).min_depth(1) {
            let entry = entry.map_err(|e| {
                ResolveError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walkdir error")),
                )
            })?;

            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            let rel = rel.to_string_lossy();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs.mkdir_all(&rel, host_mode(&entry, DEFAULT_DIR_MODE))?;
            } else if file_type.is_file() {
                let data = std::fs::read(entry.path())?;
                fs.write_file(&rel, data, host_mode(&entry, DEFAULT_FILE_MODE))?;
            }
        }

        Ok(fs)
    }
}

#[cfg(unix)]
fn host_mode(entry: &walkdir::DirEntry, fallback: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    entry
        .metadata()
        .map_or(fallback, |m| m.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn host_mode(_entry: &walkdir::DirEntry, fallback: u32) -> u32 {
    fallback
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_host_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("modules/vpc")).unwrap();
        std::fs::write(temp.path().join("main.tf"), "root").unwrap();
        std::fs::write(temp.path().join("modules/vpc/main.tf"), "vpc").unwrap();

        let fs = MemFs::from_host_dir(temp.path()).unwrap();
        assert_eq!(fs.read("main.tf").unwrap(), b"root");
        assert_eq!(fs.read("modules/vpc/main.tf").unwrap(), b"vpc");
        assert!(fs.is_dir("modules"));
    }

    #[test]
    fn test_from_host_dir_missing() {
        let temp = TempDir::new().unwrap();
        let result = MemFs::from_host_dir(temp.path().join("absent"));
        assert!(matches!(result, Err(ResolveError::Io(_))));
    }
}
