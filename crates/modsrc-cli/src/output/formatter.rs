//! Output formatter trait for CLI results.

use anyhow::Result;
use modsrc_core::MemFs;
use modsrc_core::StageReport;
use serde::Serialize;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format a completed resolution
    fn format_resolution(&self, summary: &ResolutionSummary, list: bool) -> Result<()>;

    /// Format archive staging result
    fn format_stage_result(
        &self,
        archive: &Path,
        report: &StageReport,
        files: Option<&[FileEntry]>,
    ) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// A regular file in a staged or resolved filesystem.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub mode: u32,
}

impl FileEntry {
    /// Collects every regular file of `fs`, in path order.
    pub fn collect(fs: &MemFs) -> Result<Vec<Self>> {
        fs.files()
            .map(|path| -> Result<Self> {
                let meta = fs.metadata(path)?;
                Ok(Self {
                    path: path.to_string(),
                    size: meta.len,
                    mode: meta.mode,
                })
            })
            .collect()
    }
}

/// What a resolution produced.
#[derive(Debug, Serialize)]
pub struct ResolutionSummary {
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub constraint: String,
    pub root: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub download_path: String,
    pub files: Vec<FileEntry>,
}

impl ResolutionSummary {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}
