//! JSON output formatter for machine-readable results.

use super::formatter::FileEntry;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::ResolutionSummary;
use anyhow::Result;
use modsrc_core::StageReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    // JSON always carries the file list.
    fn format_resolution(&self, summary: &ResolutionSummary, _list: bool) -> Result<()> {
        Self::output(&JsonOutput::success("resolve", summary))
    }

    fn format_stage_result(
        &self,
        archive: &Path,
        report: &StageReport,
        files: Option<&[FileEntry]>,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct StageOutput<'a> {
            archive: String,
            files_staged: usize,
            directories_created: usize,
            bytes_written: u64,
            metadata_skipped: usize,
            entries_stripped: usize,
            duration_ms: u128,
            #[serde(skip_serializing_if = "Option::is_none")]
            files: Option<&'a [FileEntry]>,
        }

        let data = StageOutput {
            archive: archive.display().to_string(),
            files_staged: report.files_staged,
            directories_created: report.directories_created,
            bytes_written: report.bytes_written,
            metadata_skipped: report.metadata_skipped,
            entries_stripped: report.entries_stripped,
            duration_ms: report.duration.as_millis(),
            files,
        };

        Self::output(&JsonOutput::success("unpack", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        // Warnings go to stderr so stdout stays a single JSON document.
        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        if let Ok(json) = serde_json::to_string(&output) {
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}
