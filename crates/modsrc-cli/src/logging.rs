//! Logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize logging to stderr.
///
/// `$RUST_LOG` takes precedence. Without it only warnings are shown, or debug
/// output when `verbose` is set.
pub fn set_up_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let fmt_layer = fmt::layer()
        .with_target(verbose)
        .with_ansi(should_emit_colors())
        .with_writer(std::io::stderr)
        .compact();

    let filter_layer = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

/// Check whether we should emit ANSI escape codes for log formatting.
fn should_emit_colors() -> bool {
    console::colors_enabled_stderr() && std::env::var_os("NO_COLOR").is_none()
}
