// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Random download-credential values from the OS CSPRNG.

use bookgate_core::error::{BookgateError, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// Random bytes per generated credential (rendered as 32 hex characters).
pub const TOKEN_BYTES: usize = 16;

/// Generate an unguessable credential value.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|e| BookgateError::Crypto(format!("token generation failed: {e}")))?;
    Ok(hex::encode_upper(bytes))
}
