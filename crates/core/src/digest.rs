//! Content digests for captured-output comparison.
//!
//! Adapted payloads are compared against golden fixtures by SHA-256
//! digest, streamed in fixed-size chunks so large samples never load
//! into memory at once.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::error::HarnessError;

/// Read buffer size for streaming digests (64 KiB).
const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Computes the SHA-256 digest of `path`, streaming in fixed-size chunks.
pub fn file_digest(path: &Path) -> Result<Digest, HarnessError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest(hasher.finalize().into()))
}

/// Byte-for-byte equivalence of two files, by digest.
///
/// A file missing on either side yields `false`, never an error — an
/// absent capture file is an expected (failing) comparison result when
/// the SUT refuses an exchange. Read errors are likewise "not equal".
pub fn files_match(a: &Path, b: &Path) -> bool {
    if !a.exists() || !b.exists() {
        return false;
    }
    match (file_digest(a), file_digest(b)) {
        (Ok(da), Ok(db)) => da == db,
        _ => false,
    }
}
