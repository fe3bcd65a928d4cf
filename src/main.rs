//! `filesync` command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use filesync::cli::Args;
use filesync::conflict::{ConflictPolicy, ConflictResolver, PolicyResolver, PromptResolver};
use filesync::synchronizer::SyncAction;
use filesync::Synchronizer;
use std::io;

#[compio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.output.log_level())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    args.validate()?;

    let mut synchronizer = Synchronizer::new(
        args.local_root(),
        args.remote_root(),
        &args.hosts.local_hostname,
        &args.hosts.remote_hostname,
        args.sync_options(),
    )
    .await
    .context("Failed to open sync roots")?;

    let mut resolver: Box<dyn ConflictResolver> = match args.sync.conflict {
        ConflictPolicy::Ask => Box::new(PromptResolver::new(
            io::stdin().lock(),
            io::stdout(),
            args.local_root().clone(),
            args.remote_root().clone(),
        )),
        policy => Box::new(PolicyResolver::new(policy)),
    };

    let report = synchronizer
        .synchronize(resolver.as_mut())
        .await
        .context("Synchronization failed")?;

    if args.output.quiet {
        return Ok(());
    }

    if args.output.dry_run {
        for action in &report.actions {
            match action {
                SyncAction::Copy {
                    relative_path,
                    from,
                } => println!(
                    "would copy {} '{}' -> {}",
                    from.label(),
                    relative_path.display(),
                    from.other().label()
                ),
                SyncAction::Remove {
                    relative_path,
                    side,
                    ..
                } => println!("would remove {} '{}'", side.label(), relative_path.display()),
            }
        }
        println!(
            "[dry run] {} change(s), {} conflict(s)",
            report.actions.len(),
            report.conflicts.len()
        );
    } else {
        let stats = report.stats;
        println!(
            "{} file(s) copied ({} bytes), {} removed, {} conflict(s), {} skipped",
            stats.files_copied,
            stats.bytes_copied,
            stats.files_removed,
            stats.conflicts,
            stats.skipped
        );
    }

    Ok(())
}
