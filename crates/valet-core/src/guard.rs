//! Run guard: detect whether the managed application is already active.

use std::fs;

/// Returns true when a live process command line contains `pattern`.
///
/// Command lines are read from `/proc/<pid>/cmdline` with argv separators
/// replaced by spaces. The calling process is skipped so an invocation whose
/// own arguments mention the pattern does not shadow the application. A
/// matching unrelated process is an accepted false positive; this is a
/// coarse guard, not PID tracking. No side effects.
#[must_use]
pub fn is_running(pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let own_pid = std::process::id();

    let Ok(entries) = fs::read_dir("/proc") else {
        return false;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        if pid == own_pid {
            continue;
        }
        // Processes may exit between readdir and read; treat as not running.
        let Ok(raw) = fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        if cmdline_matches(&raw, pattern) {
            tracing::debug!(pid, pattern, "matching process found");
            return true;
        }
    }
    false
}

/// Substring match over a NUL-separated argv blob.
fn cmdline_matches(raw: &[u8], pattern: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    let cmdline: String = String::from_utf8_lossy(raw).replace('\0', " ");
    cmdline.contains(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn matches_nul_separated_argv() {
        let raw = b"/opt/acme/acme.AppImage\0--no-sandbox\0--minimized\0";
        assert!(cmdline_matches(raw, "acme.AppImage"));
        assert!(cmdline_matches(raw, "--no-sandbox --minimized"));
        assert!(!cmdline_matches(raw, "other.AppImage"));
    }

    #[test]
    fn empty_cmdline_never_matches() {
        assert!(!cmdline_matches(b"", "anything"));
    }

    #[test]
    fn unmatched_pattern_reports_not_running() {
        assert!(!is_running("valet-test-pattern-that-matches-no-process"));
    }

    #[test]
    fn empty_pattern_reports_not_running() {
        assert!(!is_running(""));
    }

    #[test]
    fn finds_a_live_process_by_marker() {
        let marker = "valet-guard-marker-4f1c";
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(format!("sleep 30 # {marker}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sh");

        // The shell holds the marker in its own argv while sleep runs. Poll
        // briefly to cover the window before the child has exec'd.
        let mut found = false;
        for _ in 0..50 {
            if is_running(marker) {
                found = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(found, "marker process not visible in /proc");

        child.kill().expect("kill child");
        let _ = child.wait();
    }
}
