//! Content digests and the staleness predicate.
//!
//! Currency is defined purely by content identity: the installed artifact is
//! stale exactly when its SHA-256 differs from the remote artifact's, or when
//! there is no installed artifact at all. No version numbers are parsed.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::error::Result;

/// SHA-256 content digest, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(String);

impl Digest {
    /// The digest as a lowercase hex string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the SHA-256 digest of everything `reader` yields.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(Digest(hex::encode(hasher.finalize())))
}

/// Computes the SHA-256 digest of the file at `path`.
pub fn hash_file(path: &Path) -> io::Result<Digest> {
    hash_reader(File::open(path)?)
}

/// Digest of the locally installed artifact.
///
/// Returns `Ok(None)` when no artifact exists at `path`; a missing local
/// artifact means "always stale", not an error. Other I/O failures propagate.
pub fn local_digest(path: &Path) -> Result<Option<Digest>> {
    match File::open(path) {
        Ok(file) => Ok(Some(hash_reader(file)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether the installed artifact must be replaced by the remote one.
///
/// True when no local digest exists or the digests differ byte-for-byte.
/// Identical digests mean "not stale" regardless of names or timestamps.
#[must_use]
pub fn is_stale(local: Option<&Digest>, remote: &Digest) -> bool {
    match local {
        None => true,
        Some(local) => local != remote,
    }
}
