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

//! Account records and balance rules.
//!
//! An [`Account`] is the typed form of one `users` row. The same struct is
//! the session's balance snapshot: operations mutate the snapshot first and
//! the engine flushes the new balance to the store.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use atm_ledger::{Account, AccountId};
//!
//! let mut account = Account::new(AccountId::new("alice").unwrap(), "<hash>".into());
//! account.deposit(dec!(100)).unwrap();
//! assert_eq!(account.withdraw(dec!(30)).unwrap(), dec!(70));
//! ```

use crate::BankError;
use crate::base::AccountId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Notes dispensed and accepted by the machine.
pub const NOTE_DENOMINATION: Decimal = Decimal::TEN;

/// Largest balance an account may hold.
///
/// Balances are stored as SQLite REAL, so every value up to this limit must be
/// an integer below 2^53 to survive the round trip exactly.
pub const MAX_BALANCE: Decimal = dec!(9000000000000000);

/// Rejects amounts that are not a positive multiple of [`NOTE_DENOMINATION`]
/// or that exceed [`MAX_BALANCE`].
pub fn validate_amount(amount: Decimal) -> Result<(), BankError> {
    if amount <= Decimal::ZERO
        || amount > MAX_BALANCE
        || !(amount % NOTE_DENOMINATION).is_zero()
    {
        return Err(BankError::InvalidAmount);
    }
    Ok(())
}

/// Ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    /// Argon2 PHC string, never the PIN itself.
    secret: String,
    balance: Decimal,
    locked: bool,
}

impl Account {
    /// A fresh, unlocked account with zero balance.
    pub fn new(id: AccountId, secret: String) -> Self {
        Self {
            id,
            secret,
            balance: Decimal::ZERO,
            locked: false,
        }
    }

    pub(crate) fn restore(id: AccountId, secret: String, balance: Decimal, locked: bool) -> Self {
        Self {
            id,
            secret,
            balance,
            locked,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_secret(&mut self, secret: String) {
        self.secret = secret;
    }

    pub(crate) fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
        self.assert_invariants();
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Increases the balance and returns the new value.
    pub fn deposit(&mut self, amount: Decimal) -> Result<Decimal, BankError> {
        self.ensure_depositable(amount)?;
        self.balance += amount;
        self.assert_invariants();
        Ok(self.balance)
    }

    /// Decreases the balance and returns the new value.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<Decimal, BankError> {
        self.ensure_withdrawable(amount)?;
        self.balance -= amount;
        self.assert_invariants();
        Ok(self.balance)
    }

    /// Checks a deposit without applying it.
    pub fn ensure_depositable(&self, amount: Decimal) -> Result<(), BankError> {
        validate_amount(amount)?;
        match self.balance.checked_add(amount) {
            Some(balance) if balance <= MAX_BALANCE => Ok(()),
            _ => Err(BankError::BalanceLimit),
        }
    }

    /// Checks a withdrawal without applying it.
    pub fn ensure_withdrawable(&self, amount: Decimal) -> Result<(), BankError> {
        validate_amount(amount)?;
        if amount > self.balance {
            return Err(BankError::InsufficientFunds);
        }
        Ok(())
    }
}
