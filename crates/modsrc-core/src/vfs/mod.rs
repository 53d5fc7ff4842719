//! In-memory virtual filesystem.
//!
//! [`MemFs`] is a path-addressed store of directories and files. Cloning a
//! `MemFs` produces a fully independent filesystem: the node table is copied
//! eagerly and file contents are immutable shared buffers, so no mutation of
//! a clone is ever visible through the original.

mod host;
pub mod path;

use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Read;
use std::sync::Arc;

use crate::error::FsError;

/// Default mode for directories created implicitly.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default mode for files written without an explicit mode.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Kind of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

#[derive(Debug, Clone)]
enum Node {
    Directory { mode: u32 },
    File { data: Arc<[u8]>, mode: u32 },
}

impl Node {
    const fn kind(&self) -> NodeKind {
        match self {
            Self::Directory { .. } => NodeKind::Directory,
            Self::File { .. } => NodeKind::File,
        }
    }
}

/// Metadata for a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Node kind.
    pub kind: NodeKind,
    /// Content length in bytes (zero for directories).
    pub len: u64,
    /// Permission bits.
    pub mode: u32,
}

impl Metadata {
    /// Returns `true` if the node is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Returns `true` if the node is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File)
    }
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Final path segment.
    pub name: String,
    /// Full normalised path.
    pub path: String,
    /// Node kind.
    pub kind: NodeKind,
}

/// Readable handle to a file's contents.
///
/// The handle holds its own reference to the bytes, so it stays valid even if
/// the file is overwritten or removed afterwards.
#[derive(Debug)]
pub struct VfsFile {
    path: String,
    mode: u32,
    cursor: Cursor<Arc<[u8]>>,
}

impl VfsFile {
    /// Returns the normalised path the handle was opened at.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the file mode.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Returns the total length of the file.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    /// Returns `true` if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Returns up to `n` leading bytes without moving the read position.
    pub(crate) fn head(&self, n: usize) -> &[u8] {
        let data = self.cursor.get_ref();
        &data[..n.min(data.len())]
    }
}

impl Read for VfsFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

/// Mutable in-memory filesystem.
///
/// # Examples
///
/// ```
/// use modsrc_core::MemFs;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut fs = MemFs::new();
/// fs.mkdir_all("modules/vpc", 0o755)?;
/// fs.write_file("modules/vpc/main.tf", b"resource {}".as_slice(), 0o644)?;
///
/// let snapshot = fs.clone();
/// fs.remove("modules/vpc/main.tf")?;
///
/// assert!(!fs.exists("modules/vpc/main.tf"));
/// assert!(snapshot.exists("modules/vpc/main.tf"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    nodes: BTreeMap<String, Node>,
}

impl MemFs {
    /// Creates an empty filesystem containing only the root directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes, excluding the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing but the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, path: &str) -> Option<&Node> {
        self.nodes.get(path)
    }

    fn kind_of(&self, path: &str) -> Option<NodeKind> {
        if path.is_empty() {
            return Some(NodeKind::Directory);
        }
        self.node(path).map(Node::kind)
    }

    /// Opens a file for reading.
    pub fn open(&self, path: &str) -> Result<VfsFile, FsError> {
        let path = path::normalize(path)?;
        match self.node(&path) {
            Some(Node::File { data, mode }) => Ok(VfsFile {
                cursor: Cursor::new(Arc::clone(data)),
                mode: *mode,
                path,
            }),
            Some(Node::Directory { .. }) => Err(FsError::IsADirectory(path)),
            None if path.is_empty() => Err(FsError::IsADirectory(path)),
            None => Err(FsError::NotFound(path)),
        }
    }

    /// Reads a whole file into a byte vector.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let file = self.open(path)?;
        Ok(file.cursor.into_inner().to_vec())
    }

    /// Reads a whole file as UTF-8, replacing invalid sequences.
    pub fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        let file = self.open(path)?;
        Ok(String::from_utf8_lossy(file.cursor.get_ref()).into_owned())
    }

    /// Returns metadata for a path.
    pub fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Ok(Metadata {
                kind: NodeKind::Directory,
                len: 0,
                mode: DEFAULT_DIR_MODE,
            });
        }
        match self.node(&path) {
            Some(Node::Directory { mode }) => Ok(Metadata {
                kind: NodeKind::Directory,
                len: 0,
                mode: *mode,
            }),
            Some(Node::File { data, mode }) => Ok(Metadata {
                kind: NodeKind::File,
                len: data.len() as u64,
                mode: *mode,
            }),
            None => Err(FsError::NotFound(path)),
        }
    }

    /// Returns `true` if the path exists.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.metadata(path).is_ok()
    }

    /// Returns `true` if the path exists and is a directory.
    #[must_use]
    pub fn is_dir(&self, path: &str) -> bool {
        self.metadata(path).is_ok_and(|m| m.is_dir())
    }

    /// Returns `true` if the path exists and is a regular file.
    #[must_use]
    pub fn is_file(&self, path: &str) -> bool {
        self.metadata(path).is_ok_and(|m| m.is_file())
    }

    /// Creates a directory and all missing ancestors.
    ///
    /// Existing directories are left untouched, so the call is idempotent.
    /// Fails with [`FsError::NotADirectory`] if any component is a file.
    pub fn mkdir_all(&mut self, path: &str, mode: u32) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Ok(());
        }
        for dir in path::ancestors(&path).chain(std::iter::once(path.as_str())) {
            match self.kind_of(dir) {
                Some(NodeKind::Directory) => {}
                Some(NodeKind::File) => return Err(FsError::NotADirectory(dir.to_string())),
                None => {
                    self.nodes
                        .insert(dir.to_string(), Node::Directory { mode });
                }
            }
        }
        Ok(())
    }

    /// Creates or overwrites a file.
    ///
    /// The parent directory must already exist. Fails with
    /// [`FsError::NotADirectory`] when an ancestor is a file and with
    /// [`FsError::IsADirectory`] when the path itself is a directory.
    pub fn write_file(
        &mut self,
        path: &str,
        data: impl Into<Arc<[u8]>>,
        mode: u32,
    ) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Err(FsError::IsADirectory(path));
        }
        self.check_parent(&path)?;
        if let Some(NodeKind::Directory) = self.kind_of(&path) {
            return Err(FsError::IsADirectory(path));
        }
        self.nodes.insert(
            path,
            Node::File {
                data: data.into(),
                mode,
            },
        );
        Ok(())
    }

    fn check_parent(&self, path: &str) -> Result<(), FsError> {
        for dir in path::ancestors(path) {
            match self.kind_of(dir) {
                Some(NodeKind::Directory) => {}
                Some(NodeKind::File) => return Err(FsError::NotADirectory(dir.to_string())),
                None => return Err(FsError::NotFound(dir.to_string())),
            }
        }
        Ok(())
    }

    /// Removes a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Err(FsError::InvalidPath(path));
        }
        match self.kind_of(&path) {
            None => Err(FsError::NotFound(path)),
            Some(NodeKind::Directory) if self.has_children(&path) => {
                Err(FsError::DirectoryNotEmpty(path))
            }
            Some(_) => {
                self.nodes.remove(&path);
                Ok(())
            }
        }
    }

    /// Removes a path and everything below it.
    ///
    /// Removing a path that does not exist is not an error. Removing the
    /// root clears the whole filesystem.
    pub fn remove_all(&mut self, path: &str) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            self.nodes.clear();
            return Ok(());
        }
        let prefix = format!("{path}/");
        self.nodes
            .retain(|key, _| key != &path && !key.starts_with(&prefix));
        Ok(())
    }

    fn has_children(&self, dir: &str) -> bool {
        self.children(dir).next().is_some()
    }

    fn children<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a Node)> + 'a {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter(move |(key, _)| {
                let rest = &key[dir.len() + usize::from(!dir.is_empty())..];
                !rest.is_empty() && !rest.contains('/')
            })
    }

    /// Lists the direct children of a directory, sorted by name.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let path = path::normalize(path)?;
        match self.kind_of(&path) {
            None => return Err(FsError::NotFound(path)),
            Some(NodeKind::File) => return Err(FsError::NotADirectory(path)),
            Some(NodeKind::Directory) => {}
        }
        Ok(self
            .children(&path)
            .map(|(key, node)| DirEntry {
                name: path::file_name(key).to_string(),
                path: key.clone(),
                kind: node.kind(),
            })
            .collect())
    }

    /// Iterates over every file path in lexical order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|(key, node)| match node {
            Node::File { .. } => Some(key.as_str()),
            Node::Directory { .. } => None,
        })
    }

    /// Iterates over every directory path in lexical order, excluding the
    /// root.
    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|(key, node)| match node {
            Node::Directory { .. } => Some(key.as_str()),
            Node::File { .. } => None,
        })
    }

    /// Returns a new filesystem holding a copy of the subtree at `prefix`,
    /// rebased so that `prefix` becomes the root.
    pub fn sub(&self, prefix: &str) -> Result<Self, FsError> {
        let prefix = path::normalize(prefix)?;
        if prefix.is_empty() {
            return Ok(self.clone());
        }
        match self.kind_of(&prefix) {
            None => return Err(FsError::NotFound(prefix)),
            Some(NodeKind::File) => return Err(FsError::NotADirectory(prefix)),
            Some(NodeKind::Directory) => {}
        }
        let lead = format!("{prefix}/");
        let nodes = self
            .nodes
            .range(lead.clone()..)
            .take_while(|(key, _)| key.starts_with(&lead))
            .map(|(key, node)| (key[lead.len()..].to_string(), node.clone()))
            .collect();
        Ok(Self { nodes })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MemFs {
        let mut fs = MemFs::new();
        fs.mkdir_all("modules/vpc", 0o755).unwrap();
        fs.write_file("modules/vpc/main.tf", b"vpc".as_slice(), 0o644)
            .unwrap();
        fs.write_file("main.tf", b"root".as_slice(), 0o644).unwrap();
        fs
    }

    #[test]
    fn test_write_and_read() {
        let fs = sample();
        assert_eq!(fs.read("modules/vpc/main.tf").unwrap(), b"vpc");
        assert_eq!(fs.read_to_string("/main.tf").unwrap(), "root");
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let fs = sample();
        assert!(matches!(
            fs.open("missing.tf"),
            Err(FsError::NotFound(p)) if p == "missing.tf"
        ));
    }

    #[test]
    fn test_open_directory_fails() {
        let fs = sample();
        assert!(matches!(fs.open("modules"), Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.open(""), Err(FsError::IsADirectory(_))));
    }

    #[test]
    fn test_open_handle_reads_contents() {
        let fs = sample();
        let mut file = fs.open("modules/vpc/main.tf").unwrap();
        assert_eq!(file.len(), 3);
        assert_eq!(file.mode(), 0o644);
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        assert_eq!(out, "vpc");
    }

    #[test]
    fn test_mkdir_all_idempotent() {
        let mut fs = MemFs::new();
        fs.mkdir_all("a/b/c", 0o700).unwrap();
        fs.mkdir_all("a/b/c", 0o755).unwrap();
        assert!(fs.is_dir("a"));
        assert!(fs.is_dir("a/b"));
        assert_eq!(fs.metadata("a/b/c").unwrap().mode, 0o700);
        assert_eq!(fs.len(), 3);
    }

    #[test]
    fn test_mkdir_all_through_file_fails() {
        let mut fs = sample();
        assert!(matches!(
            fs.mkdir_all("main.tf/nested", 0o755),
            Err(FsError::NotADirectory(p)) if p == "main.tf"
        ));
    }

    #[test]
    fn test_write_requires_parent() {
        let mut fs = MemFs::new();
        assert!(matches!(
            fs.write_file("a/b.tf", b"x".as_slice(), 0o644),
            Err(FsError::NotFound(p)) if p == "a"
        ));
    }

    #[test]
    fn test_write_under_file_fails() {
        let mut fs = sample();
        assert!(matches!(
            fs.write_file("main.tf/child", b"x".as_slice(), 0o644),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_write_over_directory_fails() {
        let mut fs = sample();
        assert!(matches!(
            fs.write_file("modules", b"x".as_slice(), 0o644),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let mut fs = sample();
        fs.write_file("main.tf", b"updated".to_vec(), 0o600).unwrap();
        assert_eq!(fs.read("main.tf").unwrap(), b"updated");
        assert_eq!(fs.metadata("main.tf").unwrap().mode, 0o600);
    }

    #[test]
    fn test_remove_file() {
        let mut fs = sample();
        fs.remove("main.tf").unwrap();
        assert!(!fs.exists("main.tf"));
        assert!(matches!(fs.remove("main.tf"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_remove_non_empty_directory_fails() {
        let mut fs = sample();
        assert!(matches!(
            fs.remove("modules"),
            Err(FsError::DirectoryNotEmpty(p)) if p == "modules"
        ));
        fs.remove_all("modules").unwrap();
        assert!(!fs.exists("modules/vpc/main.tf"));
        assert!(!fs.exists("modules"));
        assert!(fs.exists("main.tf"));
    }

    #[test]
    fn test_remove_root_rejected() {
        let mut fs = sample();
        assert!(matches!(fs.remove("/"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_remove_all_missing_is_ok() {
        let mut fs = sample();
        assert!(fs.remove_all("nope").is_ok());
    }

    #[test]
    fn test_remove_all_does_not_touch_siblings_with_shared_prefix() {
        let mut fs = MemFs::new();
        fs.mkdir_all("mod", 0o755).unwrap();
        fs.mkdir_all("module", 0o755).unwrap();
        fs.remove_all("mod").unwrap();
        assert!(fs.is_dir("module"));
    }

    #[test]
    fn test_clone_is_isolated() {
        let original = sample();
        let mut copy = original.clone();
        copy.write_file("main.tf", b"changed".as_slice(), 0o644)
            .unwrap();
        copy.remove_all("modules").unwrap();
        copy.mkdir_all("extra", 0o755).unwrap();

        assert_eq!(original.read("main.tf").unwrap(), b"root");
        assert!(original.exists("modules/vpc/main.tf"));
        assert!(!original.exists("extra"));
    }

    #[test]
    fn test_read_dir() {
        let fs = sample();
        let root = fs.read_dir("").unwrap();
        let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["main.tf", "modules"]);
        assert_eq!(root[1].kind, NodeKind::Directory);

        let vpc = fs.read_dir("modules/vpc").unwrap();
        assert_eq!(vpc.len(), 1);
        assert_eq!(vpc[0].path, "modules/vpc/main.tf");

        assert!(matches!(fs.read_dir("main.tf"), Err(FsError::NotADirectory(_))));
        assert!(matches!(fs.read_dir("nope"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_files_sorted() {
        let fs = sample();
        let files: Vec<&str> = fs.files().collect();
        assert_eq!(files, vec!["main.tf", "modules/vpc/main.tf"]);
        let dirs: Vec<&str> = fs.dirs().collect();
        assert_eq!(dirs, vec!["modules", "modules/vpc"]);
    }

    #[test]
    fn test_sub() {
        let fs = sample();
        let sub = fs.sub("modules").unwrap();
        assert_eq!(sub.read("vpc/main.tf").unwrap(), b"vpc");
        assert!(!sub.exists("main.tf"));
        assert!(matches!(fs.sub("main.tf"), Err(FsError::NotADirectory(_))));
        assert!(matches!(fs.sub("nope"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_invalid_path_rejected_everywhere() {
        let mut fs = sample();
        assert!(matches!(fs.open("../x"), Err(FsError::InvalidPath(_))));
        assert!(matches!(
            fs.mkdir_all("../x", 0o755),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(
            fs.write_file("a/../../x", b"".as_slice(), 0o644),
            Err(FsError::InvalidPath(_))
        ));
    }
}
