//! Resolve command implementation.

use crate::cli::ResolveArgs;
use crate::error::convert_resolve_error;
use crate::output::FileEntry;
use crate::output::OutputFormatter;
use crate::output::ResolutionSummary;
use anyhow::Context;
use anyhow::Result;
use modsrc_core::MemFs;
use modsrc_core::ResolveContext;
use modsrc_core::ResolverChain;
use modsrc_core::ResolverConfig;
use modsrc_core::SourceDescriptor;
use std::time::Duration;

pub async fn execute(args: &ResolveArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = build_config(args);
    let chain =
        ResolverChain::standard(&config).map_err(|e| convert_resolve_error(e, &args.source))?;
    tracing::debug!(
        registry = %config.registry_url,
        resolvers = ?chain.resolver_names().collect::<Vec<_>>(),
        "resolver chain ready"
    );

    let base = match &args.base {
        Some(dir) => MemFs::from_host_dir(dir)
            .with_context(|| format!("Failed to load base directory '{}'", dir.display()))?,
        None => MemFs::new(),
    };

    let desc = SourceDescriptor::new(&args.source)
        .with_version(&args.constraint)
        .with_module_path(&args.module_path)
        .allow_downloads(!args.offline);

    let ctx = ResolveContext::new();
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let resolved = chain
        .resolve_required(&ctx, &desc, &base)
        .await
        .map_err(|e| convert_resolve_error(e, &args.source))?;

    let module = resolved
        .module_fs()
        .map_err(|e| convert_resolve_error(e.into(), &args.source))?;
    let summary = ResolutionSummary {
        source: args.source.clone(),
        constraint: args.constraint.clone(),
        root: resolved.root()?,
        download_path: resolved.download_path.clone(),
        files: FileEntry::collect(&module)?,
    };

    if summary.files.is_empty() {
        formatter.format_warning(&format!("module '{}' contains no files", args.source));
    }
    formatter.format_resolution(&summary, args.list)
}

fn build_config(args: &ResolveArgs) -> ResolverConfig {
    let mut config = ResolverConfig::default();
    if let Some(registry) = &args.registry {
        config.registry_url.clone_from(registry);
    }
    if let Some(secs) = args.timeout {
        config.http_timeout = Duration::from_secs(secs);
    }
    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cli::Commands;
    use clap::Parser;

    fn resolve_args(argv: &[&str]) -> ResolveArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Resolve(args) => args,
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&resolve_args(&["modsrc", "resolve", "./vpc"]));
        assert_eq!(config.registry_url, "https://registry.terraform.io");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_build_config_overrides() {
        let args = resolve_args(&[
            "modsrc",
            "resolve",
            "a/b/c",
            "--registry",
            "http://127.0.0.1:8080",
            "--timeout",
            "30",
        ]);
        let config = build_config(&args);
        assert_eq!(config.registry_url, "http://127.0.0.1:8080");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
