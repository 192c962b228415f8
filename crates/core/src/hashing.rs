//! Shared SHA-256 hex digest utility.
//!
//! Used by the extractor to derive stable identities for virtual images:
//! the same unresolved URL always hashes to the same id across scans.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
