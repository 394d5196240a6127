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

//! The caller-owned session slot.
//!
//! A [`SessionState`] holds at most one authenticated account. It is an
//! ordinary value owned by whoever drives the engine (the menu loop, a
//! test); the engine never keeps one of its own.

use crate::BankError;
use crate::account::Account;
use crate::base::AccountId;
use rust_decimal::Decimal;

/// Snapshot of the logged-in account, taken at login.
///
/// Balance changes are applied here first and then flushed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account: Account,
}

impl Session {
    pub(crate) fn new(account: Account) -> Self {
        Self { account }
    }

    pub fn account_id(&self) -> &AccountId {
        self.account.id()
    }

    pub fn balance(&self) -> Decimal {
        self.account.balance()
    }

    pub(crate) fn account(&self) -> &Account {
        &self.account
    }

    pub(crate) fn account_mut(&mut self) -> &mut Account {
        &mut self.account
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn session(&self) -> Result<&Session, BankError> {
        match self {
            Self::Authenticated(session) => Ok(session),
            Self::Unauthenticated => Err(BankError::NotAuthenticated),
        }
    }

    pub fn session_mut(&mut self) -> Result<&mut Session, BankError> {
        match self {
            Self::Authenticated(session) => Ok(session),
            Self::Unauthenticated => Err(BankError::NotAuthenticated),
        }
    }

    /// Clears the slot; returns the account that was logged in, if any.
    pub fn logout(&mut self) -> Option<AccountId> {
        match std::mem::take(self) {
            Self::Authenticated(session) => Some(session.account.id().clone()),
            Self::Unauthenticated => None,
        }
    }
}
