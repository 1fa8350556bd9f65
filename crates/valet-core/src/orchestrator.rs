//! Orchestration of the check/update/launch and fresh-install workflows.

use std::fmt;

use crate::digest::{self, is_stale};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::guard;
use crate::install;
use crate::launch;
use crate::lock::InstanceLock;
use crate::profile::ApplicationProfile;

/// Successful terminations of the update workflow.
///
/// All three are success outcomes; they differ only in what was done and is
/// reported, never in exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The application was already active; nothing was fetched or launched.
    AlreadyRunning,
    /// The installed artifact matched the remote content; launched as-is.
    LaunchedCurrent,
    /// A newer artifact was installed, then launched.
    LaunchedUpdated,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "already running, nothing to do"),
            Self::LaunchedCurrent => write!(f, "already up to date, launched"),
            Self::LaunchedUpdated => write!(f, "updated and launched"),
        }
    }
}

/// The "check, update if needed, then launch" workflow.
///
/// Phases: run check, URL resolution, digest comparison, optional install,
/// launch. Any failure ends the invocation immediately; there are no
/// retries. An exclusive per-installation lock is held from digest
/// computation through launch so concurrent invocations cannot race the
/// current/backup pair.
pub fn run_update(
    profile: &ApplicationProfile,
    fetcher: &Fetcher,
    extra_args: &[String],
) -> Result<UpdateOutcome> {
    tracing::debug!(app = %profile.app_name, "checking for a running instance");
    if guard::is_running(&profile.focus_cmd_pattern) {
        tracing::info!(app = %profile.app_name, "already running, skipping update");
        return Ok(UpdateOutcome::AlreadyRunning);
    }

    let _lock = InstanceLock::acquire(&profile.lock_path())?;

    tracing::debug!(endpoint = %profile.api_url, "resolving download URL");
    let url = fetcher.resolve_download_url(profile)?;

    tracing::debug!("comparing local and remote digests");
    let remote = fetcher.remote_digest(&url)?;
    let local = digest::local_digest(&profile.artifact_path())?;

    let outcome = if is_stale(local.as_ref(), &remote) {
        tracing::info!(app = %profile.app_name, "installed artifact is stale, updating");
        install::install(profile, fetcher, &url)?;
        UpdateOutcome::LaunchedUpdated
    } else {
        tracing::info!(app = %profile.app_name, "installed artifact is current");
        UpdateOutcome::LaunchedCurrent
    };

    tracing::debug!(app = %profile.app_name, "launching");
    launch::launch(profile, extra_args)?;

    tracing::info!(app = %profile.app_name, %outcome, "update workflow finished");
    Ok(outcome)
}

/// The fresh-install workflow.
///
/// No run check and no digest comparison: the artifact is resolved and
/// installed unconditionally. Desktop integration and updater deployment are
/// the caller's follow-up; the application is not launched.
pub fn run_install(profile: &ApplicationProfile, fetcher: &Fetcher) -> Result<()> {
    let _lock = InstanceLock::acquire(&profile.lock_path())?;

    tracing::debug!(endpoint = %profile.api_url, "resolving download URL");
    let url = fetcher.resolve_download_url(profile)?;

    tracing::info!(app = %profile.app_name, "installing");
    install::install(profile, fetcher, &url)?;

    tracing::info!(app = %profile.app_name, "install workflow finished");
    Ok(())
}
