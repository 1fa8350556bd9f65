//! Privilege precondition check.
//!
//! The engine assumes it runs with whatever privilege level its target paths
//! require; it never re-executes itself under elevation. This probe runs
//! before any work and turns a doomed invocation into a typed outcome the
//! operator can act on.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use valet_core::ApplicationProfile;

/// The invocation lacks the privileges its configured paths require.
#[derive(Debug, Error)]
#[error(
    "insufficient privileges to write {}; re-run elevated (e.g. with sudo)",
    .path.display()
)]
pub struct PrivilegeRequired {
    /// First path the probe could not write.
    pub path: PathBuf,
}

/// Verifies every directory the install will write is writable.
///
/// Probes the install directory, the updater's directory, and the parents of
/// any configured desktop entries and icons by creating them and placing a
/// short-lived file inside. Permission failures become [`PrivilegeRequired`];
/// other I/O failures surface when the real write happens.
pub fn ensure_writable(profile: &ApplicationProfile) -> Result<(), PrivilegeRequired> {
    let mut targets: Vec<&Path> = vec![&profile.install_dir];
    if let Some(parent) = profile.updater_path.parent() {
        targets.push(parent);
    }
    for optional in [
        &profile.desktop_file,
        &profile.icon_path,
        &profile.updater_desktop_file,
        &profile.updater_icon_path,
    ] {
        if let Some(parent) = optional.as_deref().and_then(Path::parent) {
            targets.push(parent);
        }
    }

    for dir in targets {
        if dir.as_os_str().is_empty() {
            continue;
        }
        if let Err(err) = probe_dir(dir) {
            if err.kind() == std::io::ErrorKind::PermissionDenied {
                return Err(PrivilegeRequired {
                    path: dir.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

fn probe_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    // Created and removed immediately; only the permission outcome matters.
    let probe = tempfile::NamedTempFile::new_in(dir)?;
    drop(probe);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_dirs(install: &Path, desktop: Option<PathBuf>) -> ApplicationProfile {
        serde_json::from_value(serde_json::json!({
            "APP_NAME": "Acme Notes",
            "INSTALL_DIR": install,
            "APPIMAGE_NAME": "acme.AppImage",
            "API_URL": "http://127.0.0.1:9/unused",
            "DOWNLOAD_METHOD": "redirect",
            "FOCUS_CMD_PATTERN": "acme.AppImage",
            "UPDATER_SCRIPT": install.join("valet"),
            "DESKTOP_FILE": desktop
        }))
        .unwrap()
    }

    #[test]
    fn writable_directories_pass() {
        let dir = tempfile::tempdir().unwrap();
        let profile = profile_with_dirs(
            &dir.path().join("bundles"),
            Some(dir.path().join("applications/acme.desktop")),
        );
        assert!(ensure_writable(&profile).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_privilege_required() {
        use std::os::unix::fs::PermissionsExt;

        // Root bypasses permission bits; the probe cannot fail there.
        let dir = tempfile::tempdir().unwrap();
        let sealed = dir.path().join("sealed");
        fs::create_dir(&sealed).unwrap();
        let mut perms = fs::metadata(&sealed).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&sealed, perms).unwrap();

        let probe_can_fail = fs::write(sealed.join("probe"), b"x").is_err();
        let _ = fs::remove_file(sealed.join("probe"));
        if !probe_can_fail {
            return;
        }

        let profile = profile_with_dirs(&sealed.join("bundles"), None);
        let err = ensure_writable(&profile).unwrap_err();
        assert_eq!(err.path, sealed.join("bundles"));
    }
}
