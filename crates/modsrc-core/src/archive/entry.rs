//! Tar entry classification.

/// How the stager treats a tar entry.
///
/// # Examples
///
/// ```
/// use modsrc_core::archive::EntryKind;
///
/// assert_eq!(EntryKind::from(tar::EntryType::Regular), EntryKind::File);
/// assert_eq!(
///     EntryKind::from(tar::EntryType::Symlink),
///     EntryKind::Unsupported("symlink")
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file, replayed with its contents.
    File,

    /// Directory, replayed with `mkdir_all`.
    Directory,

    /// pax global header. Archive-wide metadata with no filesystem
    /// counterpart.
    GlobalHeader,

    /// Any other entry type. Staging fails on these.
    Unsupported(&'static str),
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if staging must fail on this entry.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

impl From<tar::EntryType> for EntryKind {
    fn from(entry_type: tar::EntryType) -> Self {
        match entry_type {
            tar::EntryType::Regular | tar::EntryType::Continuous => Self::File,
            tar::EntryType::Directory => Self::Directory,
            tar::EntryType::XGlobalHeader => Self::GlobalHeader,
            tar::EntryType::Symlink => Self::Unsupported("symlink"),
            tar::EntryType::Link => Self::Unsupported("hardlink"),
            tar::EntryType::Char => Self::Unsupported("character device"),
            tar::EntryType::Block => Self::Unsupported("block device"),
            tar::EntryType::Fifo => Self::Unsupported("fifo"),
            tar::EntryType::GNUSparse => Self::Unsupported("sparse file"),
            _ => Self::Unsupported("unknown"),
        }
    }
}
