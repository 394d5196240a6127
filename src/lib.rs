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

//! # ATM Ledger
//!
//! This library provides the back end of a single-user ATM simulator:
//! account creation, PIN login with lockout, and balance operations
//! (withdraw, deposit, transfer, PIN change, statement) against a SQLite
//! store with an append-only transaction ledger.
//!
//! ## Core Components
//!
//! - [`Bank`]: Operation engine over the account store
//! - [`AccountStore`]: SQLite persistence for accounts and the ledger
//! - [`SessionState`]: Caller-owned slot for the logged-in account
//! - [`PendingLogin`]: PIN attempt state machine
//! - [`BankError`]: Error types for rejected operations
//!
//! ## Example
//!
//! ```
//! use atm_ledger::{AccountStore, Bank, BankError, LoginStep, SessionState};
//! use rust_decimal_macros::dec;
//!
//! let bank = Bank::new(AccountStore::open_in_memory().unwrap());
//! bank.create_account("alice", "1234").unwrap();
//!
//! let mut state = SessionState::new();
//! let login = bank.begin_login(&state, "alice").unwrap();
//! assert!(matches!(
//!     bank.submit_pin(&mut state, login, "1234").unwrap(),
//!     LoginStep::Authenticated
//! ));
//!
//! assert_eq!(bank.deposit(&mut state, dec!(100)).unwrap(), dec!(100));
//! assert_eq!(bank.withdraw(&mut state, dec!(30)).unwrap(), dec!(70));
//! assert_eq!(
//!     bank.transfer(&mut state, "bob", dec!(20)),
//!     Err(BankError::AccountNotFound)
//! );
//! ```

pub mod account;
pub mod auth;
mod base;
pub mod config;
mod engine;
pub mod error;
mod session;
mod store;
mod transaction;

pub use account::Account;
pub use auth::PendingLogin;
pub use base::AccountId;
pub use config::Config;
pub use engine::{Bank, LoginStep, Statement};
pub use error::BankError;
pub use session::{Session, SessionState};
pub use store::AccountStore;
pub use transaction::{TransactionKind, TransactionRecord};
