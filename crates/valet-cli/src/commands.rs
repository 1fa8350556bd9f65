//! Command implementations: the shell around the engine.

use std::path::Path;

use anyhow::{Context, Result};

use valet_core::{ApplicationProfile, Fetcher, UpdateOutcome};

use crate::cli::{InstallArgs, UpdateArgs};
use crate::desktop;
use crate::privilege;
use crate::select;

/// Fresh install: fetch and install the bundle, then provision the desktop.
pub fn run_install(args: &InstallArgs) -> Result<()> {
    let (profile, profile_path) = load_profile(&args.profile)?;
    privilege::ensure_writable(&profile)?;

    let fetcher = Fetcher::new()?;
    valet_core::run_install(&profile, &fetcher)?;

    if args.no_desktop {
        tracing::info!("desktop provisioning skipped on request");
    } else {
        desktop::provision(&profile, &profile_path)?;
    }

    println!(
        "{} installed to {}",
        profile.app_name,
        profile.artifact_path().display()
    );
    Ok(())
}

/// Update check followed by launch; the desktop entry's entry point.
pub fn run_update(args: &UpdateArgs) -> Result<()> {
    let (profile, _) = load_profile(&args.profile)?;

    let fetcher = Fetcher::new()?;
    let outcome = valet_core::run_update(&profile, &fetcher, &args.launch_args)?;

    // All outcomes are successes; they differ only in their message.
    match outcome {
        UpdateOutcome::AlreadyRunning => {
            println!("{} is already running", profile.app_name);
        }
        UpdateOutcome::LaunchedCurrent => {
            println!("{} is up to date", profile.app_name);
        }
        UpdateOutcome::LaunchedUpdated => {
            println!("{} updated", profile.app_name);
        }
    }
    Ok(())
}

fn load_profile(path: &Path) -> Result<(ApplicationProfile, std::path::PathBuf)> {
    let profile_path = select::resolve_profile_path(path)?;
    let profile = ApplicationProfile::load(&profile_path)
        .with_context(|| format!("loading profile {}", profile_path.display()))?;
    Ok((profile, profile_path))
}
