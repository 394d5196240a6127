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

//! Ledger records.
//!
//! Every balance operation, and every statement view, appends one
//! [`TransactionRecord`] per affected account. Records are never updated or
//! deleted.

use crate::base::AccountId;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    Withdraw,
    Deposit,
    #[serde(rename = "Transfer (Out)")]
    TransferOut,
    #[serde(rename = "Transfer (In)")]
    TransferIn,
    Statement,
}

impl TransactionKind {
    /// Label stored in the `transaction_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdraw => "Withdraw",
            Self::Deposit => "Deposit",
            Self::TransferOut => "Transfer (Out)",
            Self::TransferIn => "Transfer (In)",
            Self::Statement => "Statement",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Withdraw" => Some(Self::Withdraw),
            "Deposit" => Some(Self::Deposit),
            "Transfer (Out)" => Some(Self::TransferOut),
            "Transfer (In)" => Some(Self::TransferIn),
            "Statement" => Some(Self::Statement),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        TransactionKind::from_label(label)
            .ok_or_else(|| FromSqlError::Other(format!("unknown transaction type: {label}").into()))
    }
}

/// One row of the append-only ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates a record stamped with the current time.
    pub fn now(account_id: AccountId, kind: TransactionKind, amount: Decimal) -> Self {
        Self::at(account_id, kind, amount, Utc::now())
    }

    pub fn at(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            kind,
            amount,
            timestamp,
        }
    }
}
