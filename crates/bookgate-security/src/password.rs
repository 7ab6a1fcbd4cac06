// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password hashing — salted PBKDF2-HMAC-SHA256 via `ring`.
//
// Stored form:
//   pbkdf2-sha256$<iterations>$<salt hex>$<derived key hex>
//
// The iteration count travels with each hash, so raising it in the config
// only affects passwords hashed afterwards; older hashes keep verifying.

use std::num::NonZeroU32;

use bookgate_core::error::{BookgateError, Result};
use ring::digest::SHA256_OUTPUT_LEN;
use ring::pbkdf2::{self, PBKDF2_HMAC_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;

/// Hashes and verifies user passwords.
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    /// Create a hasher that derives new hashes with `iterations` rounds.
    pub fn new(iterations: u32) -> Result<Self> {
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| BookgateError::Config("pbkdf2_iterations must be non-zero".into()))?;
        Ok(Self {
            iterations,
            rng: SystemRandom::new(),
        })
    }

    /// Hash `password` with a fresh random salt.
    #[instrument(skip_all, fields(iterations = self.iterations.get()))]
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|e| BookgateError::Crypto(format!("salt generation failed: {e}")))?;

        let mut derived = [0u8; SHA256_OUTPUT_LEN];
        pbkdf2::derive(PBKDF2_HMAC_SHA256, self.iterations, &salt, password.as_bytes(), &mut derived);

        debug!("password hashed");
        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(derived)
        ))
    }

    /// Check `password` against a stored hash in constant time.
    ///
    /// Returns `Ok(false)` for a wrong password and an error only when the
    /// stored hash itself is malformed.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let parsed = ParsedHash::parse(stored)?;
        Ok(pbkdf2::verify(
            PBKDF2_HMAC_SHA256,
            parsed.iterations,
            &parsed.salt,
            password.as_bytes(),
            &parsed.derived,
        )
        .is_ok())
    }
}

struct ParsedHash {
    iterations: NonZeroU32,
    salt: Vec<u8>,
    derived: Vec<u8>,
}

impl ParsedHash {
    fn parse(stored: &str) -> Result<Self> {
        let malformed = |what: &str| BookgateError::Crypto(format!("stored hash: {what}"));

        let mut parts = stored.split('$');
        if parts.next() != Some(SCHEME) {
            return Err(malformed("unknown scheme"));
        }
        let iterations = parts
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .and_then(NonZeroU32::new)
            .ok_or_else(|| malformed("bad iteration count"))?;
        let salt = parts
            .next()
            .and_then(|s| hex::decode(s).ok())
            .ok_or_else(|| malformed("bad salt"))?;
        let derived = parts
            .next()
            .and_then(|s| hex::decode(s).ok())
            .filter(|d| d.len() == SHA256_OUTPUT_LEN)
            .ok_or_else(|| malformed("bad derived key"))?;
        if parts.next().is_some() {
            return Err(malformed("trailing data"));
        }

        Ok(Self {
            iterations,
            salt,
            derived,
        })
    }
}
