//! Error types for the install/update engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while installing, updating, or launching a bundle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValetError {
    /// Malformed or missing configuration. Fatal, not retryable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure or an endpoint whose response had the wrong shape.
    #[error("remote error: {0}")]
    Remote(String),

    /// Local filesystem failure other than the expected missing-artifact case.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),

    /// The artifact download failed. The previously installed artifact is intact.
    #[error("download failed for {url}: {reason}")]
    DownloadFailed {
        /// URL the download was attempted from.
        url: String,
        /// Why the download failed.
        reason: String,
    },

    /// The install failed after the previous artifact was displaced.
    ///
    /// The current/backup invariant may be violated: the destination may be
    /// missing while the backup holds the previous version. Requires manual
    /// inspection.
    #[error(
        "partial install: {} may be missing, previous version kept at {}",
        .dest.display(),
        .backup.display()
    )]
    PartialInstall {
        /// Destination path the new artifact should occupy.
        dest: PathBuf,
        /// Backup path holding the displaced previous artifact.
        backup: PathBuf,
    },

    /// The installed artifact is missing or not executable.
    #[error("launch error: {0}")]
    Launch(String),

    /// Another instance holds the installation lock.
    #[error("another instance is updating this installation (lock: {})", .0.display())]
    Locked(PathBuf),
}

impl ValetError {
    /// Returns whether re-invoking later can succeed with no manual repair.
    ///
    /// `DownloadFailed` and `Remote` leave prior state intact; `Locked` clears
    /// when the other instance finishes. `PartialInstall` and `Config` do not
    /// fix themselves.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::DownloadFailed { .. } | Self::Locked(_)
        )
    }
}

impl From<reqwest::Error> for ValetError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

impl From<serde_json::Error> for ValetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ValetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(ValetError::Remote("timeout".to_string()).is_recoverable());
        assert!(
            ValetError::DownloadFailed {
                url: "https://host/app".to_string(),
                reason: "connection reset".to_string(),
            }
            .is_recoverable()
        );
        assert!(ValetError::Locked(PathBuf::from("/tmp/x.lock")).is_recoverable());
    }

    #[test]
    fn fatal_errors() {
        assert!(!ValetError::Config("missing key".to_string()).is_recoverable());
        assert!(
            !ValetError::PartialInstall {
                dest: PathBuf::from("/opt/app/app.AppImage"),
                backup: PathBuf::from("/opt/app/app.AppImage.old"),
            }
            .is_recoverable()
        );
        assert!(!ValetError::Launch("not executable".to_string()).is_recoverable());
    }

    #[test]
    fn partial_install_names_both_paths() {
        let err = ValetError::PartialInstall {
            dest: PathBuf::from("/opt/app/app.AppImage"),
            backup: PathBuf::from("/opt/app/app.AppImage.old"),
        };
        let message = err.to_string();
        assert!(message.contains("app.AppImage"));
        assert!(message.contains("app.AppImage.old"));
    }
}
