//! Test utilities for building in-memory archives.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are created with mode 0o644.
///
/// # Examples
///
/// ```
/// use modsrc_core::test_utils::create_test_tar;
///
/// let tar_data = create_test_tar(vec![("main.tf", b"hello"), ("modules/vpc/main.tf", b"world")]);
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(TarTestBuilder::new(), |builder, (path, data)| {
            builder.add_file(path, data)
        })
        .build()
}

/// Creates an in-memory gzip-compressed TAR archive from a list of entries.
///
/// # Examples
///
/// ```
/// use modsrc_core::test_utils::create_test_tar_gz;
///
/// let data = create_test_tar_gz(vec![("main.tf", b"hello")]);
/// assert_eq!(&data[..2], &[0x1f, 0x8b]);
/// ```
#[must_use]
pub fn create_test_tar_gz(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    gzip(&create_test_tar(entries))
}

/// Gzip-compresses a byte slice.
#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builder for creating TAR test archives with various entry types.
///
/// # Examples
///
/// ```
/// use modsrc_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_file("main.tf", b"content")
///     .add_directory("modules/")
///     .add_symlink("link.tf", "main.tf")
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a regular file with custom mode.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a regular file whose name is written verbatim into the header,
    /// bypassing the path checks of `tar::Builder`.
    #[must_use]
    pub fn add_file_raw_path(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_old();
        let name = &mut header.as_old_mut().name;
        name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a symlink to the archive.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a hardlink to the archive.
    #[must_use]
    pub fn add_hardlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Link);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a pax global header record, as written by `git archive`.
    #[must_use]
    pub fn add_global_header(mut self, records: &[u8]) -> Self {
        let mut header = tar::Header::new_ustar();
        header.set_size(records.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::XGlobalHeader);
        header.set_cksum();
        self.builder
            .append_data(&mut header, "pax_global_header", records)
            .unwrap();
        self
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    /// Builds the archive and gzip-compresses it.
    #[must_use]
    pub fn build_gz(self) -> Vec<u8> {
        gzip(&self.build())
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
