//! Desktop integration: launcher entries, icons, and the companion updater.
//!
//! The generated application entry does not start the bundle directly: its
//! Exec line runs the deployed updater's `update` operation, so every launch
//! from the desktop checks for a newer bundle first. The updater itself is a
//! byte copy of the running executable placed at the configured path and
//! selected by argument, never a modified copy.

use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use valet_core::ApplicationProfile;

/// Provisions desktop integration for a freshly installed bundle.
///
/// Deploys the companion updater, writes configured icons, and renders the
/// desktop entries. Every step is driven by the profile; steps whose paths
/// are not configured are skipped.
pub fn provision(profile: &ApplicationProfile, profile_path: &Path) -> Result<()> {
    deploy_updater(&profile.updater_path)?;

    if let (Some(path), Some(payload)) = (&profile.icon_path, &profile.icon_b64) {
        write_icon(path, payload).context("writing application icon")?;
    }
    if let (Some(path), Some(payload)) = (&profile.updater_icon_path, &profile.updater_icon_b64) {
        write_icon(path, payload).context("writing updater icon")?;
    }

    if let Some(path) = &profile.desktop_file {
        let entry = render_desktop_entry(
            &profile.app_name,
            &format!("Launch {} (updates first)", profile.app_name),
            &profile.updater_path,
            profile_path,
            profile.icon_path.as_deref(),
        );
        write_entry(path, &entry).context("writing application desktop entry")?;
    }
    if let Some(path) = &profile.updater_desktop_file {
        let entry = render_desktop_entry(
            &format!("{} Updater", profile.app_name),
            &format!("Check for {} updates", profile.app_name),
            &profile.updater_path,
            profile_path,
            profile.updater_icon_path.as_deref(),
        );
        write_entry(path, &entry).context("writing updater desktop entry")?;
    }

    Ok(())
}

/// Copies the running executable to `dest` and marks it executable.
pub fn deploy_updater(dest: &Path) -> Result<()> {
    let source = std::env::current_exe().context("locating current executable")?;
    if source == *dest {
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::copy(&source, dest).with_context(|| {
        format!("copying {} to {}", source.display(), dest.display())
    })?;
    set_mode(dest, 0o755)?;
    tracing::info!(updater = %dest.display(), "companion updater deployed");
    Ok(())
}

/// Renders a freedesktop `.desktop` entry whose Exec runs the updater.
fn render_desktop_entry(
    name: &str,
    comment: &str,
    updater: &Path,
    profile_path: &Path,
    icon: Option<&Path>,
) -> String {
    let mut entry = String::from("[Desktop Entry]\nType=Application\n");
    entry.push_str(&format!("Name={name}\n"));
    entry.push_str(&format!("Comment={comment}\n"));
    entry.push_str(&format!(
        "Exec=\"{}\" update --profile \"{}\"\n",
        updater.display(),
        profile_path.display()
    ));
    if let Some(icon) = icon {
        entry.push_str(&format!("Icon={}\n", icon.display()));
    }
    entry.push_str("Terminal=false\nCategories=Utility;\n");
    entry
}

fn write_entry(path: &Path, entry: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, entry)?;
    set_mode(path, 0o644)?;
    tracing::info!(entry = %path.display(), "desktop entry written");
    Ok(())
}

fn write_icon(path: &Path, payload_b64: &str) -> Result<()> {
    let bytes = BASE64
        .decode(payload_b64.trim())
        .context("icon payload is not valid base64")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    set_mode(path, 0o644)?;
    tracing::info!(icon = %path.display(), "icon written");
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
