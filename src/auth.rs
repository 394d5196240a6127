// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! PIN handling and the login attempt state machine.
//!
//! PINs are hashed with Argon2id under a random salt and stored as PHC
//! strings. Verification goes through the Argon2 verifier, which compares
//! digests in constant time.
//!
//! A login is a [`PendingLogin`] that is consumed by each attempt:
//!
//! ```text
//!  PendingLogin(n) ──correct PIN──► Matched(account)
//!        │
//!        └──wrong PIN──► PendingLogin(n - 1) ... ──n == 0──► Exhausted (account gets locked)
//! ```

use crate::BankError;
use crate::account::Account;
use crate::base::AccountId;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Wrong PINs allowed before the account is locked.
pub const MAX_ATTEMPTS: u32 = 3;

pub const PIN_LENGTH: usize = 4;

/// Accepts exactly [`PIN_LENGTH`] ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), BankError> {
    if pin.len() != PIN_LENGTH || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BankError::InvalidPinFormat);
    }
    Ok(())
}

/// Hashes a PIN into a PHC string with a fresh salt.
pub fn hash_pin(pin: &str) -> Result<String, BankError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BankError::Hashing(e.to_string()))
}

/// Checks a PIN against a stored PHC string.
///
/// A malformed stored hash never verifies.
pub fn verify_pin(pin: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

/// A login that has passed the lock check and is waiting for a PIN.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    account: Account,
    remaining: u32,
}

/// Result of a single PIN submission.
#[derive(Debug)]
pub enum Attempt {
    /// PIN matched; carries the account snapshot for the session.
    Matched(Account),
    /// PIN was wrong; attempts remain.
    Failed(PendingLogin),
    /// PIN was wrong and no attempts remain.
    Exhausted(AccountId),
}

impl PendingLogin {
    /// Starts a login for an unlocked account.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::AccountLocked`] if the account is locked; no
    /// attempts are granted in that case.
    pub fn start(account: Account, max_attempts: u32) -> Result<Self, BankError> {
        if account.locked() {
            return Err(BankError::AccountLocked);
        }
        Ok(Self {
            account,
            remaining: max_attempts.max(1),
        })
    }

    pub fn account_id(&self) -> &AccountId {
        self.account.id()
    }

    /// Attempts left before this one is submitted.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn attempt(mut self, pin: &str) -> Attempt {
        if verify_pin(pin, self.account.secret()) {
            return Attempt::Matched(self.account);
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            Attempt::Exhausted(self.account.id().clone())
        } else {
            Attempt::Failed(self)
        }
    }
}
