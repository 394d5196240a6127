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

//! SQLite-backed account store.
//!
//! Only this module talks to the database. Every public method commits
//! before returning; [`AccountStore::transfer`] is the one operation that
//! spans several rows and runs inside a single SQLite transaction.
//!
//! Balances and amounts are kept in `REAL` columns for compatibility with
//! existing `atm.db` files and converted to [`Decimal`] at this boundary.
//! A value that would not read back unchanged is refused on write.

use crate::BankError;
use crate::account::Account;
use crate::base::AccountId;
use crate::transaction::{TransactionKind, TransactionRecord};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        pin TEXT,
        balance REAL,
        locked INTEGER
    );

    CREATE TABLE IF NOT EXISTS transactions (
        user_id TEXT,
        transaction_type TEXT,
        amount REAL,
        timestamp DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_transactions_user
    ON transactions(user_id);
";

/// A [`Decimal`] stored as SQLite `REAL`.
struct Real(Decimal);

impl ToSql for Real {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = self
            .0
            .to_f64()
            .filter(|value| Decimal::from_f64(*value) == Some(self.0))
            .ok_or_else(|| {
                rusqlite::Error::ToSqlConversionFailure(
                    format!("amount {} is not exact in REAL", self.0).into(),
                )
            })?;
        Ok(ToSqlOutput::from(value))
    }
}

impl FromSql for Real {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let value = f64::column_result(value)?;
        Decimal::from_f64(value)
            .map(|amount| Real(amount.normalize()))
            .ok_or_else(|| FromSqlError::Other(format!("non-finite amount: {value}").into()))
    }
}

/// Durable table of accounts plus the append-only ledger.
pub struct AccountStore {
    conn: Connection,
}

impl AccountStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                BankError::Storage(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        debug!(path = %path.display(), "opened account store");
        Self::initialize(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, BankError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, BankError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn exists(&self, id: &AccountId) -> Result<bool, BankError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Inserts a new unlocked account with zero balance.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::AccountExists`] if the ID is taken.
    pub fn create(&self, id: &AccountId, secret: &str) -> Result<Account, BankError> {
        let inserted = self.conn.execute(
            "INSERT INTO users (user_id, pin, balance, locked) VALUES (?1, ?2, 0, 0)",
            params![id, secret],
        );
        match inserted {
            Ok(_) => Ok(Account::new(id.clone(), secret.to_owned())),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(BankError::AccountExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn fetch(&self, id: &AccountId) -> Result<Option<Account>, BankError> {
        fetch_account(&self.conn, id)
    }

    pub fn update_secret(&self, id: &AccountId, secret: &str) -> Result<(), BankError> {
        let changed = self.conn.execute(
            "UPDATE users SET pin = ?1 WHERE user_id = ?2",
            params![secret, id],
        )?;
        require_row(changed)
    }

    pub fn update_balance(&self, id: &AccountId, balance: Decimal) -> Result<(), BankError> {
        update_balance(&self.conn, id, balance)
    }

    pub fn set_locked(&self, id: &AccountId, locked: bool) -> Result<(), BankError> {
        let changed = self.conn.execute(
            "UPDATE users SET locked = ?1 WHERE user_id = ?2",
            params![locked, id],
        )?;
        require_row(changed)
    }

    pub fn append_transaction(&self, record: &TransactionRecord) -> Result<(), BankError> {
        append_transaction(&self.conn, record)
    }

    /// Moves `amount` from `source` to `destination` and records both legs.
    ///
    /// Balances are read inside the transaction, so the returned pair is
    /// the post-transfer `(source, destination)` balances as stored.
    ///
    /// # Errors
    ///
    /// - [`BankError::AccountNotFound`] - Either account is missing.
    /// - [`BankError::InsufficientFunds`] - Source balance is below `amount`.
    /// - [`BankError::SelfTransfer`] - `source` and `destination` are the same.
    /// - [`BankError::BalanceLimit`] - Destination balance would exceed the limit.
    ///
    /// Nothing is written when an error is returned.
    pub fn transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Decimal, Decimal), BankError> {
        if source == destination {
            return Err(BankError::SelfTransfer);
        }
        let tx = self.conn.unchecked_transaction()?;

        let mut from = fetch_account(&tx, source)?.ok_or(BankError::AccountNotFound)?;
        let mut to = fetch_account(&tx, destination)?.ok_or(BankError::AccountNotFound)?;
        let source_balance = from.withdraw(amount)?;
        let destination_balance = to.deposit(amount)?;

        update_balance(&tx, source, source_balance)?;
        update_balance(&tx, destination, destination_balance)?;
        append_transaction(
            &tx,
            &TransactionRecord::at(source.clone(), TransactionKind::TransferOut, amount, at),
        )?;
        append_transaction(
            &tx,
            &TransactionRecord::at(destination.clone(), TransactionKind::TransferIn, amount, at),
        )?;

        tx.commit()?;
        Ok((source_balance, destination_balance))
    }

    /// Returns up to `limit` ledger records for `id`, newest first.
    pub fn transactions(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, BankError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT user_id, transaction_type, amount, timestamp
             FROM transactions WHERE user_id = ?1
             ORDER BY rowid DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![id, limit], |row| {
                Ok(TransactionRecord {
                    account_id: row.get(0)?,
                    kind: row.get(1)?,
                    amount: row.get::<_, Real>(2)?.0,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account::restore(
        row.get(0)?,
        row.get(1)?,
        row.get::<_, Real>(2)?.0,
        row.get(3)?,
    ))
}

fn fetch_account(conn: &Connection, id: &AccountId) -> Result<Option<Account>, BankError> {
    let account = conn
        .query_row(
            "SELECT user_id, pin, balance, locked FROM users WHERE user_id = ?1",
            params![id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

fn update_balance(conn: &Connection, id: &AccountId, balance: Decimal) -> Result<(), BankError> {
    let changed = conn.execute(
        "UPDATE users SET balance = ?1 WHERE user_id = ?2",
        params![Real(balance), id],
    )?;
    require_row(changed)
}

fn append_transaction(conn: &Connection, record: &TransactionRecord) -> Result<(), BankError> {
    conn.execute(
        "INSERT INTO transactions (user_id, transaction_type, amount, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.account_id,
            record.kind,
            Real(record.amount),
            record.timestamp
        ],
    )?;
    Ok(())
}

fn require_row(changed: usize) -> Result<(), BankError> {
    if changed == 0 {
        return Err(BankError::AccountNotFound);
    }
    Ok(())
}
