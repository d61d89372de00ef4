//! Content fingerprints for canonical specifications.
//!
//! The fingerprint covers only the canonical model, never the source file
//! name or format, so equivalent CSV, JSON and DBC inputs hash identically.

use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::Specification;

/// Hex SHA-256 of a specification's canonical JSON.
///
/// A serialization failure is returned rather than hashed over.
pub fn fingerprint(spec: &Specification) -> Result<String, serde_json::Error> {
    json_sha256(spec)
}

fn json_sha256<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, value)?;
    let mut hex = String::with_capacity(64);
    for byte in hasher.finalize() {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}
