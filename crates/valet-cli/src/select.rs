//! Profile discovery and selection.
//!
//! `--profile` may name a single profile file or a directory of them. With
//! several candidates the operator picks one from a numbered menu; when no
//! terminal is attached the ambiguity is a configuration error instead.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Resolves `path` to one concrete profile file.
pub fn resolve_profile_path(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        bail!("profile path {} does not exist", path.display());
    }

    let mut candidates = discover_profiles(path)
        .with_context(|| format!("cannot scan profile directory {}", path.display()))?;

    match candidates.len() {
        0 => bail!("no profile files (*.json) in {}", path.display()),
        1 => Ok(candidates.remove(0)),
        _ if io::stdin().is_terminal() => {
            let index = prompt_choice(&candidates)?;
            Ok(candidates.remove(index))
        }
        _ => bail!(
            "multiple profiles in {}; pass --profile with one of: {}",
            path.display(),
            candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// All `*.json` files directly inside `dir`, sorted by name.
fn discover_profiles(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Numbered menu on stderr; reads a 1-based choice from stdin.
fn prompt_choice(candidates: &[PathBuf]) -> anyhow::Result<usize> {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "Several profiles found:")?;
    for (i, candidate) in candidates.iter().enumerate() {
        writeln!(stderr, "  {}) {}", i + 1, candidate.display())?;
    }
    write!(stderr, "Select a profile [1-{}]: ", candidates.len())?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let choice: usize = line
        .trim()
        .parse()
        .with_context(|| format!("not a number: {:?}", line.trim()))?;
    if choice == 0 || choice > candidates.len() {
        bail!("choice {choice} is out of range");
    }
    Ok(choice - 1)
}
