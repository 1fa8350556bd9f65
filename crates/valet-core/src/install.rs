//! The install transaction: replace the installed artifact, keep one backup.

use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{Result, ValetError};
use crate::fetch::Fetcher;
use crate::profile::ApplicationProfile;

/// Downloads the artifact at `url` and installs it for `profile`.
///
/// The download is staged next to the destination so the final rename never
/// crosses a filesystem. An existing artifact is displaced onto the backup
/// path first, atomically discarding any prior backup; only then is the
/// staged file moved into place. A failure inside that window is reported as
/// [`ValetError::PartialInstall`] and never silently recovered, because
/// recovery would mean choosing between two unverified files.
pub fn install(profile: &ApplicationProfile, fetcher: &Fetcher, url: &str) -> Result<()> {
    fs::create_dir_all(&profile.install_dir)?;

    let staged = fetcher.download_to_dir(url, &profile.install_dir)?;
    set_executable(staged.path())?;

    let dest = profile.artifact_path();
    let backup = profile.backup_path();

    let had_previous = dest.exists();
    if had_previous {
        tracing::info!(
            from = %dest.display(),
            to = %backup.display(),
            "keeping previous artifact as backup"
        );
        fs::rename(&dest, &backup)?;
    }

    match staged.persist(&dest) {
        Ok(_) => {
            tracing::info!(artifact = %dest.display(), "artifact installed");
            Ok(())
        }
        Err(persist_err) if had_previous => {
            // The previous artifact is already displaced; the installation has
            // no current file until the operator intervenes.
            tracing::error!(
                error = %persist_err.error,
                "install failed after displacing the previous artifact"
            );
            Err(ValetError::PartialInstall { dest, backup })
        }
        Err(persist_err) => Err(ValetError::File(persist_err.error)),
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
