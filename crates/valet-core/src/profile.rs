//! Application profile: the immutable per-run configuration.
//!
//! Profiles are JSON documents whose keys match the configuration schema
//! consumed by earlier deployments, so existing profile files keep working
//! unchanged. A profile is loaded once at startup and treated as read-only
//! input by every component.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ValetError};

/// Suffix appended to the artifact name for the single-generation backup.
pub const BACKUP_SUFFIX: &str = ".old";

/// Strategy for resolving the artifact download URL from the API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMethod {
    /// The endpoint returns a JSON object; the URL is the string at
    /// `DOWNLOAD_URL_KEY`.
    Json,
    /// The endpoint answers with a redirect; the URL is the `Location`
    /// response header.
    Redirect,
}

impl fmt::Display for DownloadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Redirect => write!(f, "redirect"),
        }
    }
}

/// Immutable configuration for one managed application.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationProfile {
    /// Display name used in desktop entries and log messages.
    #[serde(rename = "APP_NAME")]
    pub app_name: String,

    /// Directory the artifact is installed into.
    #[serde(rename = "INSTALL_DIR")]
    pub install_dir: PathBuf,

    /// Artifact filename within `install_dir`.
    #[serde(rename = "APPIMAGE_NAME")]
    pub appimage_name: String,

    /// Endpoint queried to resolve the download URL.
    #[serde(rename = "API_URL")]
    pub api_url: String,

    /// How the download URL is extracted from the endpoint's response.
    #[serde(rename = "DOWNLOAD_METHOD")]
    pub download_method: DownloadMethod,

    /// JSON key holding the download URL. Required when the method is `json`.
    #[serde(rename = "DOWNLOAD_URL_KEY", default)]
    pub download_url_key: Option<String>,

    /// Substring matched against live process command lines by the run guard.
    #[serde(rename = "FOCUS_CMD_PATTERN")]
    pub focus_cmd_pattern: String,

    /// Install path of the companion updater executable.
    #[serde(rename = "UPDATER_SCRIPT")]
    pub updater_path: PathBuf,

    /// Path of the application desktop entry, when desktop integration is wanted.
    #[serde(rename = "DESKTOP_FILE", default)]
    pub desktop_file: Option<PathBuf>,

    /// Path the application icon is written to.
    #[serde(rename = "ICON_PATH", default)]
    pub icon_path: Option<PathBuf>,

    /// Base64-encoded icon payload for the application.
    #[serde(rename = "ICON_B64", default)]
    pub icon_b64: Option<String>,

    /// Path of the updater desktop entry, when one is wanted.
    #[serde(rename = "UPDATER_DESKTOP_FILE", default)]
    pub updater_desktop_file: Option<PathBuf>,

    /// Path the updater icon is written to.
    #[serde(rename = "UPDATER_ICON_PATH", default)]
    pub updater_icon_path: Option<PathBuf>,

    /// Base64-encoded icon payload for the updater entry.
    #[serde(rename = "UPDATER_ICON_B64", default)]
    pub updater_icon_b64: Option<String>,
}

impl ApplicationProfile {
    /// Loads and validates a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ValetError::Config(format!("cannot read profile {}: {e}", path.display()))
        })?;
        let profile: Self = serde_json::from_str(&raw).map_err(|e| {
            ValetError::Config(format!("invalid profile {}: {e}", path.display()))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Checks cross-field requirements that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.download_method == DownloadMethod::Json
            && self
                .download_url_key
                .as_deref()
                .is_none_or(|key| key.is_empty())
        {
            return Err(ValetError::Config(
                "DOWNLOAD_URL_KEY must be set when DOWNLOAD_METHOD is \"json\"".to_string(),
            ));
        }
        if self.appimage_name.is_empty() {
            return Err(ValetError::Config("APPIMAGE_NAME must not be empty".to_string()));
        }
        Ok(())
    }

    /// Path of the installed artifact.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.install_dir.join(&self.appimage_name)
    }

    /// Path of the single-generation backup.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.install_dir
            .join(format!("{}{BACKUP_SUFFIX}", self.appimage_name))
    }

    /// Path of the per-installation advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.install_dir
            .join(format!(".{}.lock", self.appimage_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "APP_NAME": "Acme Notes",
            "INSTALL_DIR": "/opt/acme-notes",
            "APPIMAGE_NAME": "acme-notes.AppImage",
            "API_URL": "https://api.acme.example/latest",
            "DOWNLOAD_METHOD": "json",
            "DOWNLOAD_URL_KEY": "download_url",
            "FOCUS_CMD_PATTERN": "acme-notes.AppImage",
            "UPDATER_SCRIPT": "/opt/acme-notes/valet"
        })
    }

    #[test]
    fn parses_uppercase_keys() {
        let profile: ApplicationProfile =
            serde_json::from_value(minimal_json()).expect("minimal profile parses");
        assert_eq!(profile.app_name, "Acme Notes");
        assert_eq!(profile.download_method, DownloadMethod::Json);
        assert_eq!(profile.download_url_key.as_deref(), Some("download_url"));
        assert_eq!(
            profile.artifact_path(),
            PathBuf::from("/opt/acme-notes/acme-notes.AppImage")
        );
        assert_eq!(
            profile.backup_path(),
            PathBuf::from("/opt/acme-notes/acme-notes.AppImage.old")
        );
    }

    #[test]
    fn rejects_unknown_download_method() {
        let mut value = minimal_json();
        value["DOWNLOAD_METHOD"] = "torrent".into();
        let result: std::result::Result<ApplicationProfile, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn json_method_requires_url_key() {
        let mut value = minimal_json();
        value.as_object_mut().unwrap().remove("DOWNLOAD_URL_KEY");
        let profile: ApplicationProfile =
            serde_json::from_value(value).expect("parses without key");
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, ValetError::Config(_)));
    }

    #[test]
    fn redirect_method_needs_no_url_key() {
        let mut value = minimal_json();
        value["DOWNLOAD_METHOD"] = "redirect".into();
        value.as_object_mut().unwrap().remove("DOWNLOAD_URL_KEY");
        let profile: ApplicationProfile =
            serde_json::from_value(value).expect("redirect profile parses");
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn lock_file_is_hidden_next_to_artifact() {
        let profile: ApplicationProfile =
            serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(
            profile.lock_path(),
            PathBuf::from("/opt/acme-notes/.acme-notes.AppImage.lock")
        );
    }
}
