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

//! Session and transaction engine.
//!
//! The [`Bank`] owns the [`AccountStore`] and implements every operation a
//! customer can perform. Session state is not part of the bank: callers own
//! a [`SessionState`] and pass it in, so the bank itself holds no notion of
//! "the current user".
//!
//! # Operations
//!
//! - **Create account**: new unlocked account with zero balance.
//! - **Login**: [`Bank::begin_login`] followed by one [`Bank::submit_pin`]
//!   per attempt. Exhausting the attempts locks the account for good.
//! - **Withdraw / Deposit**: positive multiples of 10 only; withdrawals
//!   never take the balance below zero.
//! - **Transfer**: debit, credit and both ledger rows commit together.
//! - **Change PIN**: 4 digits, different from the current PIN, confirmed.
//! - **Statement**: current balance plus recent ledger rows; the view itself
//!   is recorded as a zero-amount ledger row.
//!
//! Every mutation is flushed to the store before the call returns.

use crate::BankError;
use crate::account::Account;
use crate::auth::{self, Attempt, PendingLogin};
use crate::base::AccountId;
use crate::config::Config;
use crate::session::{Session, SessionState};
use crate::store::AccountStore;
use crate::transaction::{TransactionKind, TransactionRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Outcome of a PIN submission that did not fail outright.
#[derive(Debug)]
pub enum LoginStep {
    /// The session now holds the account.
    Authenticated,
    /// Wrong PIN; submit again with the returned login.
    Retry(PendingLogin),
    /// Wrong PIN and no attempts left; the account is now locked.
    Locked,
}

/// Balance report returned by [`Bank::statement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub account_id: AccountId,
    pub balance: Decimal,
    /// Most recent ledger rows, newest first, excluding this view.
    pub history: Vec<TransactionRecord>,
}

/// The ATM back end.
///
/// # Invariants
///
/// - Stored balances are never negative.
/// - A locked account never regains a session.
/// - Every successful balance change appends exactly one ledger row per
///   affected account.
pub struct Bank {
    store: AccountStore,
    max_attempts: u32,
    history_limit: usize,
}

impl Bank {
    /// Creates a bank over `store` with default settings.
    pub fn new(store: AccountStore) -> Self {
        Self::with_config(store, &Config::default())
    }

    pub fn with_config(store: AccountStore, config: &Config) -> Self {
        Bank {
            store,
            max_attempts: config.max_attempts.max(1),
            history_limit: config.history_limit,
        }
    }

    /// Opens the database named by `config` and builds a bank over it.
    pub fn open(config: &Config) -> Result<Self, BankError> {
        let store = AccountStore::open(&config.database)?;
        Ok(Self::with_config(store, config))
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// - [`BankError::InvalidAccountId`] - ID is empty or padded.
    /// - [`BankError::InvalidPinFormat`] - PIN is not 4 digits.
    /// - [`BankError::AccountExists`] - ID is taken.
    pub fn create_account(&self, id: &str, pin: &str) -> Result<Account, BankError> {
        let id = AccountId::new(id)?;
        auth::validate_pin(pin)?;
        if self.store.exists(&id)? {
            return Err(BankError::AccountExists);
        }

        let account = self.store.create(&id, &auth::hash_pin(pin)?)?;
        info!(account = %id, "account created");
        Ok(account)
    }

    /// Starts a login for `id`.
    ///
    /// # Errors
    ///
    /// - [`BankError::AlreadyAuthenticated`] - `state` already holds a session.
    /// - [`BankError::AccountNotFound`] - No such account.
    /// - [`BankError::AccountLocked`] - Account is locked; no attempts granted.
    pub fn begin_login(&self, state: &SessionState, id: &str) -> Result<PendingLogin, BankError> {
        if state.is_authenticated() {
            return Err(BankError::AlreadyAuthenticated);
        }
        let id = AccountId::new(id).map_err(|_| BankError::AccountNotFound)?;
        let account = self.store.fetch(&id)?.ok_or(BankError::AccountNotFound)?;

        PendingLogin::start(account, self.max_attempts).inspect_err(|_| {
            warn!(account = %id, "login refused for locked account");
        })
    }

    /// Submits one PIN for a pending login.
    ///
    /// On success the session in `state` holds a snapshot of the account.
    /// When the last attempt fails the lock is persisted before returning
    /// [`LoginStep::Locked`].
    pub fn submit_pin(
        &self,
        state: &mut SessionState,
        login: PendingLogin,
        pin: &str,
    ) -> Result<LoginStep, BankError> {
        if state.is_authenticated() {
            return Err(BankError::AlreadyAuthenticated);
        }

        match login.attempt(pin) {
            Attempt::Matched(account) => {
                info!(account = %account.id(), "login succeeded");
                *state = SessionState::Authenticated(Session::new(account));
                Ok(LoginStep::Authenticated)
            }
            Attempt::Failed(login) => {
                warn!(
                    account = %login.account_id(),
                    remaining = login.remaining(),
                    "incorrect PIN"
                );
                Ok(LoginStep::Retry(login))
            }
            Attempt::Exhausted(id) => {
                self.store.set_locked(&id, true)?;
                warn!(account = %id, "too many incorrect PINs, account locked");
                Ok(LoginStep::Locked)
            }
        }
    }

    /// Withdraws `amount` and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`BankError::NotAuthenticated`] - No session.
    /// - [`BankError::InvalidAmount`] - Not a positive multiple of 10, or above the limit.
    /// - [`BankError::InsufficientFunds`] - Amount exceeds the balance.
    pub fn withdraw(&self, state: &mut SessionState, amount: Decimal) -> Result<Decimal, BankError> {
        let session = state.session_mut()?;
        let mut updated = session.account().clone();
        let balance = updated.withdraw(amount)?;
        self.flush(session, updated, TransactionKind::Withdraw, amount)?;
        debug!(account = %session.account_id(), %amount, %balance, "withdrawal");
        Ok(balance)
    }

    /// Deposits `amount` and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`BankError::NotAuthenticated`] - No session.
    /// - [`BankError::InvalidAmount`] - Not a positive multiple of 10, or above the limit.
    /// - [`BankError::BalanceLimit`] - New balance would exceed the limit.
    pub fn deposit(&self, state: &mut SessionState, amount: Decimal) -> Result<Decimal, BankError> {
        let session = state.session_mut()?;
        let mut updated = session.account().clone();
        let balance = updated.deposit(amount)?;
        self.flush(session, updated, TransactionKind::Deposit, amount)?;
        debug!(account = %session.account_id(), %amount, %balance, "deposit");
        Ok(balance)
    }

    /// Persists the new balance, then adopts it as the snapshot and records the row.
    fn flush(
        &self,
        session: &mut Session,
        updated: Account,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<(), BankError> {
        self.store.update_balance(updated.id(), updated.balance())?;
        *session.account_mut() = updated;
        self.store.append_transaction(&TransactionRecord::now(
            session.account_id().clone(),
            kind,
            amount,
        ))
    }

    /// Transfers `amount` to `destination` and returns the new balance.
    ///
    /// The amount and the available funds are checked before the
    /// destination is looked up.
    ///
    /// # Errors
    ///
    /// - [`BankError::NotAuthenticated`] - No session.
    /// - [`BankError::InvalidAmount`] - Not a positive multiple of 10, or above the limit.
    /// - [`BankError::InsufficientFunds`] - Amount exceeds the balance.
    /// - [`BankError::AccountNotFound`] - Destination does not exist.
    /// - [`BankError::SelfTransfer`] - Destination is the logged-in account.
    /// - [`BankError::BalanceLimit`] - Destination balance would exceed the limit.
    pub fn transfer(
        &self,
        state: &mut SessionState,
        destination: &str,
        amount: Decimal,
    ) -> Result<Decimal, BankError> {
        let session = state.session_mut()?;
        session.account().ensure_withdrawable(amount)?;

        let destination = AccountId::new(destination).map_err(|_| BankError::AccountNotFound)?;
        if &destination == session.account_id() {
            return Err(BankError::SelfTransfer);
        }
        if !self.store.exists(&destination)? {
            return Err(BankError::AccountNotFound);
        }

        let (balance, _) =
            self.store
                .transfer(session.account_id(), &destination, amount, Utc::now())?;
        session.account_mut().set_balance(balance);
        info!(
            from = %session.account_id(),
            to = %destination,
            %amount,
            "transfer completed"
        );
        Ok(balance)
    }

    /// Replaces the session's PIN.
    ///
    /// # Errors
    ///
    /// - [`BankError::NotAuthenticated`] - No session.
    /// - [`BankError::InvalidPinFormat`] - Not 4 digits, or same as the current PIN.
    /// - [`BankError::PinMismatch`] - Confirmation differs from `new_pin`.
    pub fn change_pin(
        &self,
        state: &mut SessionState,
        new_pin: &str,
        confirm_pin: &str,
    ) -> Result<(), BankError> {
        let session = state.session_mut()?;
        auth::validate_pin(new_pin)?;
        if auth::verify_pin(new_pin, session.account().secret()) {
            return Err(BankError::InvalidPinFormat);
        }
        if confirm_pin != new_pin {
            return Err(BankError::PinMismatch);
        }

        let secret = auth::hash_pin(new_pin)?;
        self.store.update_secret(session.account_id(), &secret)?;
        session.account_mut().set_secret(secret);
        info!(account = %session.account_id(), "PIN changed");
        Ok(())
    }

    /// Reports the balance and recent history, then records the view.
    pub fn statement(&self, state: &SessionState) -> Result<Statement, BankError> {
        let session = state.session()?;
        let history = self
            .store
            .transactions(session.account_id(), self.history_limit)?;
        self.store.append_transaction(&TransactionRecord::now(
            session.account_id().clone(),
            TransactionKind::Statement,
            Decimal::ZERO,
        ))?;

        Ok(Statement {
            account_id: session.account_id().clone(),
            balance: session.balance(),
            history,
        })
    }

    /// Ends the session. Nothing is written to the store.
    pub fn logout(&self, state: &mut SessionState) -> Option<AccountId> {
        let id = state.logout();
        if let Some(id) = &id {
            info!(account = %id, "logged out");
        }
        id
    }
}
