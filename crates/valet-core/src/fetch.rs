//! Remote content resolution and retrieval.

use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use tempfile::NamedTempFile;

use crate::digest::{self, Digest};
use crate::error::{Result, ValetError};
use crate::profile::{ApplicationProfile, DownloadMethod};

/// User agent sent on every request.
const USER_AGENT_VALUE: &str = concat!(
    "appimage-valet/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/appimage-valet/valet)"
);

/// Per-request timeout. Generous because it covers full artifact bodies.
const REQUEST_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP fetcher for URL resolution, digests, and downloads.
///
/// Redirects are never followed: the `redirect` resolution method reads the
/// `Location` header of the first response, and resolved artifact URLs are
/// expected to be direct.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Builds a fetcher with a fixed user agent and bounded timeouts.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(Policy::none())
            .build()
            .map_err(|e| ValetError::Remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Resolves the artifact download URL for `profile`.
    ///
    /// With the `json` method the endpoint's body is parsed as a JSON object
    /// and the string at the configured key is returned. With the `redirect`
    /// method the `Location` header of the unfollowed response is returned,
    /// trimmed of trailing carriage control.
    pub fn resolve_download_url(&self, profile: &ApplicationProfile) -> Result<String> {
        let url = match profile.download_method {
            DownloadMethod::Json => self.resolve_from_json(profile)?,
            DownloadMethod::Redirect => self.resolve_from_redirect(&profile.api_url)?,
        };

        // Endpoints that have no artifact yet answer with an empty or "null"
        // value rather than an HTTP error.
        if url.is_empty() || url == "null" {
            return Err(ValetError::Remote(format!(
                "endpoint {} did not yield a download URL",
                profile.api_url
            )));
        }

        tracing::debug!(%url, "resolved download URL");
        Ok(url)
    }

    fn resolve_from_json(&self, profile: &ApplicationProfile) -> Result<String> {
        let key = profile
            .download_url_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ValetError::Config(
                    "DOWNLOAD_URL_KEY must be set when DOWNLOAD_METHOD is \"json\"".to_string(),
                )
            })?;

        let response = self.client.get(&profile.api_url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValetError::Remote(format!(
                "endpoint {} answered {status}",
                profile.api_url
            )));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| ValetError::Remote(format!("endpoint body is not JSON: {e}")))?;

        match body.get(key) {
            Some(serde_json::Value::String(url)) => Ok(url.clone()),
            Some(serde_json::Value::Null) | None => Err(ValetError::Remote(format!(
                "endpoint {} has no \"{key}\" value",
                profile.api_url
            ))),
            Some(other) => Err(ValetError::Remote(format!(
                "endpoint value at \"{key}\" is not a string: {other}"
            ))),
        }
    }

    fn resolve_from_redirect(&self, api_url: &str) -> Result<String> {
        let response = self.client.get(api_url).send()?;

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| {
                ValetError::Remote(format!("endpoint {api_url} sent no Location header"))
            })?
            .to_str()
            .map_err(|e| ValetError::Remote(format!("Location header is not valid text: {e}")))?;

        Ok(trim_carriage(location).to_string())
    }

    /// Downloads `url` fully and returns the SHA-256 of the body.
    ///
    /// The body lands in an unnamed temporary file that the OS reclaims on
    /// every exit path, including partial-download failure. No lighter-weight
    /// integrity signal is assumed to exist remotely, so this is a full-body
    /// transfer.
    pub fn remote_digest(&self, url: &str) -> Result<Digest> {
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValetError::Remote(format!("{url} answered {status}")));
        }

        let mut transient = tempfile::tempfile().map_err(ValetError::File)?;
        response
            .copy_to(&mut transient)
            .map_err(|e| ValetError::Remote(format!("download from {url} failed: {e}")))?;

        transient.seek(SeekFrom::Start(0)).map_err(ValetError::File)?;
        let digest = digest::hash_reader(&mut transient).map_err(ValetError::File)?;
        tracing::debug!(%url, %digest, "computed remote digest");
        Ok(digest)
    }

    /// Streams `url` into a uniquely named temporary file inside `dir`.
    ///
    /// The temp file shares a filesystem with the final destination so the
    /// caller's rename is atomic. On any failure the file is deleted and the
    /// previously installed artifact is untouched.
    pub fn download_to_dir(&self, url: &str, dir: &Path) -> Result<NamedTempFile> {
        let mut staged = NamedTempFile::new_in(dir).map_err(ValetError::File)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ValetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValetError::DownloadFailed {
                url: url.to_string(),
                reason: format!("server answered {status}"),
            });
        }

        let bytes = response
            .copy_to(staged.as_file_mut())
            .map_err(|e| ValetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(%url, bytes, "downloaded artifact");
        Ok(staged)
    }
}

/// Raw header captures keep the line terminator; the URL itself never
/// contains carriage control.
fn trim_carriage(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;

    use tiny_http::{Header, Response, Server};

    fn test_profile(api_url: &str, method: &str) -> ApplicationProfile {
        serde_json::from_value(serde_json::json!({
            "APP_NAME": "Acme Notes",
            "INSTALL_DIR": "/tmp/acme",
            "APPIMAGE_NAME": "acme.AppImage",
            "API_URL": api_url,
            "DOWNLOAD_METHOD": method,
            "DOWNLOAD_URL_KEY": "download_url",
            "FOCUS_CMD_PATTERN": "acme.AppImage",
            "UPDATER_SCRIPT": "/tmp/acme/valet"
        }))
        .unwrap()
    }

    fn serve_once(response: Response<std::io::Cursor<Vec<u8>>>) -> String {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request.respond(response);
            }
        });
        format!("http://127.0.0.1:{port}/")
    }

    #[test]
    fn json_resolution_returns_value_at_key() {
        let url = serve_once(Response::from_string(
            r#"{"download_url": "https://host/app.bin", "other": 1}"#,
        ));
        let fetcher = Fetcher::new().unwrap();
        let resolved = fetcher
            .resolve_download_url(&test_profile(&url, "json"))
            .unwrap();
        assert_eq!(resolved, "https://host/app.bin");
    }

    #[test]
    fn json_resolution_fails_on_missing_key() {
        let url = serve_once(Response::from_string(r#"{"something_else": "x"}"#));
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .resolve_download_url(&test_profile(&url, "json"))
            .unwrap_err();
        assert!(matches!(err, ValetError::Remote(_)));
    }

    #[test]
    fn json_resolution_fails_on_null_value() {
        let url = serve_once(Response::from_string(r#"{"download_url": null}"#));
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .resolve_download_url(&test_profile(&url, "json"))
            .unwrap_err();
        assert!(matches!(err, ValetError::Remote(_)));
    }

    #[test]
    fn json_method_without_key_is_config_error() {
        let mut profile = test_profile("http://127.0.0.1:9/", "json");
        profile.download_url_key = None;
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.resolve_download_url(&profile).unwrap_err();
        assert!(matches!(err, ValetError::Config(_)));
    }

    #[test]
    fn redirect_resolution_reads_location_header() {
        let response = Response::from_string("")
            .with_status_code(302)
            .with_header(
                Header::from_bytes(&b"Location"[..], &b"https://host/app.bin"[..]).unwrap(),
            );
        let url = serve_once(response);
        let fetcher = Fetcher::new().unwrap();
        let resolved = fetcher
            .resolve_download_url(&test_profile(&url, "redirect"))
            .unwrap();
        assert_eq!(resolved, "https://host/app.bin");
    }

    #[test]
    fn redirect_resolution_fails_without_location() {
        let url = serve_once(Response::from_string("no header here"));
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .resolve_download_url(&test_profile(&url, "redirect"))
            .unwrap_err();
        assert!(matches!(err, ValetError::Remote(_)));
    }

    #[test]
    fn location_trimming_strips_carriage_control() {
        assert_eq!(trim_carriage("https://host/app.bin\r\n"), "https://host/app.bin");
        assert_eq!(trim_carriage("https://host/app.bin\r"), "https://host/app.bin");
        assert_eq!(trim_carriage("https://host/app.bin"), "https://host/app.bin");
    }

    #[test]
    fn literal_null_url_is_resolution_failure() {
        let url = serve_once(Response::from_string(r#"{"download_url": "null"}"#));
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .resolve_download_url(&test_profile(&url, "json"))
            .unwrap_err();
        assert!(matches!(err, ValetError::Remote(_)));
    }

    #[test]
    fn remote_digest_matches_body() {
        let url = serve_once(Response::from_data(b"Hello, World!".to_vec()));
        let fetcher = Fetcher::new().unwrap();
        let digest = fetcher.remote_digest(&url).unwrap();
        assert_eq!(
            digest.as_hex(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn download_stages_into_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(Response::from_data(b"artifact bytes".to_vec()));
        let fetcher = Fetcher::new().unwrap();
        let staged = fetcher.download_to_dir(&url, dir.path()).unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"artifact bytes");
    }

    #[test]
    fn failed_download_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(Response::from_string("gone").with_status_code(404));
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.download_to_dir(&url, dir.path()).unwrap_err();
        assert!(matches!(err, ValetError::DownloadFailed { .. }));
        let leftovers: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }
}
