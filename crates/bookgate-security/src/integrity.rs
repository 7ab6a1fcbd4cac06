// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SHA-256 helpers for referring to secrets without revealing them.

use sha2::{Digest, Sha256};

/// Number of hex characters kept in a fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Short, stable identifier for a secret (credential value, admission key).
///
/// Safe to put in logs and the audit trail: it identifies repeated use of the
/// same secret but cannot be turned back into it.
pub fn fingerprint(secret: &str) -> String {
    let mut full = hash_bytes(secret.as_bytes());
    full.truncate(FINGERPRINT_LEN);
    full
}

/// Compare two secrets without an early exit on the first differing byte.
///
/// Both sides are hashed first, so the comparison always runs over 32 bytes
/// regardless of the input lengths.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
