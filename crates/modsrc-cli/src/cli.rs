//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modsrc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a module source and list the resolved files
    Resolve(ResolveArgs),
    /// Stage a tar or tar.gz archive into memory and report its contents
    Unpack(UnpackArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    /// Module source: local path, registry coordinate or archive URL
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Version constraint (e.g. "~> 1.0")
    #[arg(long = "constraint", short = 'c', value_name = "CONSTRAINT", default_value = "")]
    pub constraint: String,

    /// Directory loaded as the base filesystem for local sources
    #[arg(long, value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// Directory of the declaring module, relative to the base
    #[arg(long, value_name = "PATH", default_value = "")]
    pub module_path: String,

    /// Module registry base URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Forbid network access
    #[arg(long)]
    pub offline: bool,

    /// List resolved files
    #[arg(short, long)]
    pub list: bool,
}

#[derive(clap::Args)]
pub struct UnpackArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Directory inside the in-memory filesystem to expand into
    #[arg(long, value_name = "DIR", default_value = "")]
    pub destination: String,

    /// Drop leading path components from every entry
    #[arg(long, value_name = "N", default_value = "0")]
    pub strip_components: usize,

    /// Maximum number of entries
    #[arg(long, default_value = "10000")]
    pub max_files: usize,

    /// Maximum total expanded size in bytes
    #[arg(long, value_parser = parse_byte_size)]
    pub max_total_size: Option<u64>,

    /// Maximum single file size in bytes
    #[arg(long, value_parser = parse_byte_size)]
    pub max_file_size: Option<u64>,

    /// List staged files
    #[arg(short, long)]
    pub list: bool,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}
