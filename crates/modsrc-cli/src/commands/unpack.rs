//! Unpack command implementation.

use crate::cli::UnpackArgs;
use crate::error::convert_stage_error;
use crate::output::FileEntry;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use modsrc_core::ArchiveStager;
use modsrc_core::MemFs;
use modsrc_core::StageLimits;

pub fn execute(args: &UnpackArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let data = std::fs::read(&args.archive)
        .with_context(|| format!("Failed to read archive '{}'", args.archive.display()))?;
    let name = args
        .archive
        .file_name()
        .and_then(|n| n.to_str())
        .context("Archive path has no valid UTF-8 file name")?;

    let mut fs = MemFs::new();
    fs.write_file(name, data, 0o644)?;

    let stager = ArchiveStager::new()
        .limits(build_limits(args))
        .destination(args.destination.as_str())
        .strip_components(args.strip_components);
    let (staged, report) = stager
        .stage_with_report(&fs, name)
        .map_err(|e| convert_stage_error(e, &args.archive))?;

    if report.entries_stripped > 0 {
        formatter.format_warning(&format!(
            "{} entries dropped by --strip-components",
            report.entries_stripped
        ));
    }

    let files = if args.list {
        Some(FileEntry::collect(&staged)?)
    } else {
        None
    };
    formatter.format_stage_result(&args.archive, &report, files.as_deref())
}

fn build_limits(args: &UnpackArgs) -> StageLimits {
    let mut limits = StageLimits {
        max_entries: args.max_files,
        ..Default::default()
    };
    if let Some(max) = args.max_total_size {
        limits.max_total_size = max;
    }
    if let Some(max) = args.max_file_size {
        limits.max_entry_size = max;
    }
    limits
}
