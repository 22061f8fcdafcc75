use anyhow::{Context, Result, bail};

use super::Core;
use crate::blocklist::{DEFAULT_BLOCKED_PACKAGES, SyncOutcome};
use crate::cli::{BlockCommands, StatsCommands};

/// Manage the blocked application set.
pub async fn block(core: &Core, command: BlockCommands) -> Result<()> {
    match command {
        BlockCommands::List => {
            let blocked = core.blocklist.blocked().await?;
            if blocked.is_empty() {
                println!("No applications blocked.");
                println!("Seed a starter set with: app-blocker block defaults");
            } else {
                for package in blocked {
                    println!("{package}");
                }
            }
            Ok(())
        }
        BlockCommands::Add { packages } => {
            let mut apps = core.blocklist.blocked().await?;
            apps.extend(packages);
            let outcome = core.blocklist.set_blocked(apps.clone()).await?;
            report_sync(apps.len(), outcome);
            Ok(())
        }
        BlockCommands::Remove { packages } => {
            let mut apps = core.blocklist.blocked().await?;
            apps.retain(|app| !packages.contains(app));
            let outcome = core.blocklist.set_blocked(apps.clone()).await?;
            report_sync(apps.len(), outcome);
            Ok(())
        }
        BlockCommands::Set { packages } => {
            let count = packages.len();
            let outcome = core.blocklist.set_blocked(packages).await?;
            report_sync(count, outcome);
            Ok(())
        }
        BlockCommands::Clear => {
            let outcome = core.blocklist.set_blocked(Vec::new()).await?;
            report_sync(0, outcome);
            Ok(())
        }
        BlockCommands::Defaults => {
            let current = core.blocklist.blocked().await?;
            if !current.is_empty() {
                bail!(
                    "Blocked set is not empty ({} package(s)); refusing to overwrite",
                    current.len()
                );
            }
            let defaults: Vec<String> = DEFAULT_BLOCKED_PACKAGES
                .iter()
                .map(|p| p.to_string())
                .collect();
            let outcome = core.blocklist.set_blocked(defaults.clone()).await?;
            for package in &defaults {
                println!("{package}");
            }
            report_sync(defaults.len(), outcome);
            Ok(())
        }
    }
}

/// Dashboard statistics.
pub async fn stats(core: &Core, command: StatsCommands) -> Result<()> {
    match command {
        StatsCommands::Show => {
            let stats = core.aggregator.snapshot().await?;
            println!("Blocks:      {}", stats.total_blocks);
            println!("Time saved:  {} minutes", stats.time_saved_minutes);
            println!(
                "Since:       {}",
                stats.last_reset.format("%Y-%m-%d %H:%M:%S %Z")
            );
            Ok(())
        }
        StatsCommands::Reset => {
            core.aggregator.reset().await?;
            println!("✓ Statistics reset");
            Ok(())
        }
    }
}

/// Re-push the blocked set, then watch for block events until interrupted.
pub async fn run(mut core: Core) -> Result<()> {
    let outcome = core.blocklist.resync().await?;
    if outcome.pushed {
        println!("✓ Blocked set pushed to enforcement");
    } else {
        println!("  Enforcement unavailable; the persisted set stays authoritative");
    }

    core.aggregator.start().await;
    println!("Watching for block events. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    core.aggregator.stop().await;

    let stats = core.aggregator.snapshot().await?;
    println!();
    println!(
        "✓ Stopped. {} block(s) on record, {} minute(s) saved.",
        stats.total_blocks, stats.time_saved_minutes
    );
    Ok(())
}

/// Full app reset: credential, settings, blocked set and statistics.
pub async fn reset(core: &Core, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "This deletes the password, security question, blocked set and statistics.\n\
             Re-run with --yes to confirm."
        );
    }

    core.credentials.clear().await?;
    core.blocklist.set_blocked(Vec::new()).await?;
    core.aggregator.reset().await?;

    println!("✓ App Blocker reset to a clean state");
    Ok(())
}

fn report_sync(count: usize, outcome: SyncOutcome) {
    println!("✓ Blocked set saved ({count} package(s))");
    if !outcome.pushed {
        println!("  Enforcement push failed; the set will be re-pushed on next run.");
    }
}
