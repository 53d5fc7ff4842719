//! Human-readable output formatter with colors and styling.

use super::formatter::FileEntry;
use super::formatter::OutputFormatter;
use super::formatter::ResolutionSummary;
use anyhow::Result;
use console::Term;
use console::style;
use modsrc_core::StageReport;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn write_heading(&self, message: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn write_files(&self, files: &[FileEntry]) {
        let _ = self.term.write_line("");
        for file in files {
            if self.verbose {
                let _ = self.term.write_line(&format!(
                    "  {:04o} {:>10}  {}",
                    file.mode & 0o7777,
                    Self::format_size(file.size),
                    file.path
                ));
            } else {
                let _ = self.term.write_line(&format!("  {}", file.path));
            }
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_resolution(&self, summary: &ResolutionSummary, list: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_heading(&format!("Resolved {}", summary.source));

        if !summary.constraint.is_empty() {
            let _ = self
                .term
                .write_line(&format!("  Constraint: {}", summary.constraint));
        }
        let root = if summary.root.is_empty() {
            "."
        } else {
            summary.root.as_str()
        };
        let _ = self.term.write_line(&format!("  Module root: {root}"));
        let _ = self.term.write_line(&format!(
            "  Files: {}",
            Self::format_number(summary.files.len())
        ));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(summary.total_size())
        ));
        if self.verbose && !summary.download_path.is_empty() {
            let _ = self
                .term
                .write_line(&format!("  Archive: {}", summary.download_path));
        }

        if list {
            self.write_files(&summary.files);
        }

        Ok(())
    }

    fn format_stage_result(
        &self,
        archive: &Path,
        report: &StageReport,
        files: Option<&[FileEntry]>,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_heading(&format!("Staged {}", archive.display()));

        let _ = self.term.write_line(&format!(
            "  Files staged: {}",
            Self::format_number(report.files_staged)
        ));
        let _ = self.term.write_line(&format!(
            "  Directories: {}",
            Self::format_number(report.directories_created)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written)
        ));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Metadata records skipped: {}", report.metadata_skipped));
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        if let Some(files) = files {
            self.write_files(files);
        }

        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
