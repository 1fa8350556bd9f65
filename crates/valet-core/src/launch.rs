//! Launch supervisor: start the installed artifact detached.

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::error::{Result, ValetError};
use crate::profile::ApplicationProfile;

/// Flag appended to every launch. The bundle's internal sandbox refuses to
/// start from a process that was (or is) privileged, so it is disabled here.
pub const NO_SANDBOX_FLAG: &str = "--no-sandbox";

/// Starts the installed artifact as a detached child process.
///
/// `extra_args` are passed through verbatim, followed by the fixed
/// [`NO_SANDBOX_FLAG`]. The child gets its own process group and null stdio;
/// the caller never waits on it. When this process was invoked through
/// `sudo`, the child is re-associated with the invoking user's identity and
/// session environment before it starts; launching with retained elevation
/// would be a security defect, not an optimization.
pub fn launch(profile: &ApplicationProfile, extra_args: &[String]) -> Result<()> {
    let artifact = profile.artifact_path();
    ensure_executable(&artifact)?;

    let mut command = Command::new(&artifact);
    command
        .args(extra_args)
        .arg(NO_SANDBOX_FLAG)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        command.process_group(0);
        if let Some(invoker) = SudoInvoker::from_env() {
            tracing::info!(uid = invoker.uid, "dropping privileges for launch");
            invoker.apply(&mut command);
        }
    }

    let child = command.spawn().map_err(|e| {
        ValetError::Launch(format!("failed to start {}: {e}", artifact.display()))
    })?;
    tracing::info!(pid = child.id(), artifact = %artifact.display(), "application launched");

    // Detached by design: the child outlives this process.
    drop(child);
    Ok(())
}

fn ensure_executable(artifact: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(artifact) {
        Ok(metadata) => metadata,
        Err(_) => {
            return Err(ValetError::Launch(format!(
                "{} is not installed",
                artifact.display()
            )));
        }
    };

    #[cfg(unix)]
    if metadata.permissions().mode() & 0o111 == 0 {
        return Err(ValetError::Launch(format!(
            "{} is not executable",
            artifact.display()
        )));
    }

    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}

/// Identity of the non-elevated user that invoked this process via sudo.
#[cfg(unix)]
struct SudoInvoker {
    uid: u32,
    gid: u32,
    user: Option<String>,
}

#[cfg(unix)]
impl SudoInvoker {
    /// Present only when sudo's environment markers identify a real invoker.
    fn from_env() -> Option<Self> {
        let uid: u32 = env::var("SUDO_UID").ok()?.parse().ok()?;
        let gid: u32 = env::var("SUDO_GID").ok()?.parse().ok()?;
        if uid == 0 {
            return None;
        }
        Some(Self {
            uid,
            gid,
            user: env::var("SUDO_USER").ok(),
        })
    }

    /// Re-associates `command` with the invoking user's identity and the
    /// session environment the desktop application expects. Display variables
    /// (DISPLAY, XAUTHORITY, WAYLAND_DISPLAY, DBUS_SESSION_BUS_ADDRESS) are
    /// inherited from the current environment, which sudo preserves for
    /// graphical invocations.
    fn apply(&self, command: &mut Command) {
        command.uid(self.uid).gid(self.gid);
        command.env("XDG_RUNTIME_DIR", format!("/run/user/{}", self.uid));
        if let Some(user) = &self.user {
            command
                .env("USER", user)
                .env("LOGNAME", user)
                .env("HOME", format!("/home/{user}"));
        }
    }
}
