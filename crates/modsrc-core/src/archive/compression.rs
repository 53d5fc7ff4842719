//! Compression framing detection for staged archives.

/// Gzip member header magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression framing wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed tar.
    Plain,
    /// Gzip-compressed tar.
    Gzip,
}

impl Compression {
    /// Detects compression from an archive name.
    ///
    /// Returns `None` when the name carries no recognised extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use modsrc_core::archive::Compression;
    ///
    /// assert_eq!(Compression::from_name("chart-1.0.0.tgz"), Some(Compression::Gzip));
    /// assert_eq!(Compression::from_name("module.TAR"), Some(Compression::Plain));
    /// assert_eq!(Compression::from_name("download"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") || lower.ends_with(".gz") {
            Some(Self::Gzip)
        } else if lower.ends_with(".tar") {
            Some(Self::Plain)
        } else {
            None
        }
    }

    /// Detects compression from the first bytes of a stream.
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else {
            Self::Plain
        }
    }

    /// Detects compression from the name, falling back to the stream's magic
    /// bytes when the name is not conclusive.
    #[must_use]
    pub fn detect(name: &str, head: &[u8]) -> Self {
        Self::from_name(name).unwrap_or_else(|| Self::sniff(head))
    }

    /// Returns the conventional file extension for this framing.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Plain => "tar",
            Self::Gzip => "tar.gz",
        }
    }
}
