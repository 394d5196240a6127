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

//! Error types for account and session operations.

use thiserror::Error;

/// Banking operation errors.
///
/// Every variant is recoverable from the menu loop's point of view: the
/// rejected operation leaves the store and the session unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    /// An account with the requested ID already exists
    #[error("account already exists")]
    AccountExists,

    /// Referenced account does not exist
    #[error("account not found")]
    AccountNotFound,

    /// Account was locked after too many failed logins
    #[error("account is locked, please contact customer support")]
    AccountLocked,

    /// Amount is not a positive multiple of 10, or exceeds the balance limit
    #[error("invalid amount (must be a positive multiple of 10)")]
    InvalidAmount,

    /// Withdrawal or transfer would exceed the balance
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Deposit or incoming transfer would exceed the balance limit
    #[error("account balance limit reached")]
    BalanceLimit,

    /// PIN confirmation differs from the new PIN
    #[error("PIN mismatch")]
    PinMismatch,

    /// PIN is not exactly 4 digits, or equals the current PIN
    #[error("PIN must consist of 4 digits and differ from the previous PIN")]
    InvalidPinFormat,

    /// Operation requires a logged-in session
    #[error("not logged in")]
    NotAuthenticated,

    /// Login attempted while another account is logged in
    #[error("log out the current account before logging in again")]
    AlreadyAuthenticated,

    /// Account ID is empty or padded with whitespace
    #[error("invalid account ID")]
    InvalidAccountId,

    /// Transfer destination is the logged-in account
    #[error("cannot transfer to the same account")]
    SelfTransfer,

    /// Underlying SQLite failure
    #[error("storage error: {0}")]
    Storage(String),

    /// PIN hashing failure
    #[error("PIN hashing failed: {0}")]
    Hashing(String),
}

impl From<rusqlite::Error> for BankError {
    fn from(error: rusqlite::Error) -> Self {
        BankError::Storage(error.to_string())
    }
}
