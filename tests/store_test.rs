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

//! Account store public API integration tests.

use atm_ledger::{AccountId, AccountStore, BankError, TransactionKind, TransactionRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn id(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn record(account: &str, kind: TransactionKind, amount: Decimal) -> TransactionRecord {
    TransactionRecord::now(id(account), kind, amount)
}

#[test]
fn create_makes_account_exist_with_zero_balance() {
    let store = AccountStore::open_in_memory().unwrap();
    assert!(!store.exists(&id("alice")).unwrap());

    let account = store.create(&id("alice"), "hash").unwrap();

    assert!(store.exists(&id("alice")).unwrap());
    assert_eq!(account.balance(), Decimal::ZERO);
    assert!(!account.locked());

    let fetched = store.fetch(&id("alice")).unwrap().unwrap();
    assert_eq!(fetched, account);
}

#[test]
fn create_duplicate_fails() {
    let store = AccountStore::open_in_memory().unwrap();
    store.create(&id("alice"), "hash").unwrap();

    let result = store.create(&id("alice"), "other");

    assert_eq!(result, Err(BankError::AccountExists));
    assert_eq!(store.fetch(&id("alice")).unwrap().unwrap().secret(), "hash");
}

#[test]
fn fetch_missing_returns_none() {
    let store = AccountStore::open_in_memory().unwrap();
    assert_eq!(store.fetch(&id("nobody")).unwrap(), None);
}

#[test]
fn updates_are_visible_on_fetch() {
    let store = AccountStore::open_in_memory().unwrap();
    store.create(&id("alice"), "hash").unwrap();

    store.update_secret(&id("alice"), "new-hash").unwrap();
    store.update_balance(&id("alice"), dec!(250)).unwrap();
    store.set_locked(&id("alice"), true).unwrap();

    let account = store.fetch(&id("alice")).unwrap().unwrap();
    assert_eq!(account.secret(), "new-hash");
    assert_eq!(account.balance(), dec!(250));
    assert!(account.locked());
}

#[test]
fn ledger_is_returned_newest_first() {
    let store = AccountStore::open_in_memory().unwrap();
    store
        .append_transaction(&record("alice", TransactionKind::Deposit, dec!(100)))
        .unwrap();
    store
        .append_transaction(&record("alice", TransactionKind::Withdraw, dec!(30)))
        .unwrap();
    store
        .append_transaction(&record("bob", TransactionKind::Deposit, dec!(10)))
        .unwrap();
    store
        .append_transaction(&record("alice", TransactionKind::Statement, Decimal::ZERO))
        .unwrap();

    let history = store.transactions(&id("alice"), 10).unwrap();
    let kinds: Vec<_> = history.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Statement,
            TransactionKind::Withdraw,
            TransactionKind::Deposit
        ]
    );
    assert_eq!(history[1].amount, dec!(30));
    assert!(history.iter().all(|r| r.account_id == id("alice")));

    assert_eq!(store.transactions(&id("alice"), 1).unwrap().len(), 1);
}

#[test]
fn transfer_moves_funds_and_records_both_legs() {
    let store = AccountStore::open_in_memory().unwrap();
    store.create(&id("alice"), "hash").unwrap();
    store.create(&id("bob"), "hash").unwrap();
    store.update_balance(&id("alice"), dec!(100)).unwrap();
    store.update_balance(&id("bob"), dec!(5)).unwrap();

    let balances = store
        .transfer(&id("alice"), &id("bob"), dec!(40), Utc::now())
        .unwrap();

    assert_eq!(balances, (dec!(60), dec!(45)));
    assert_eq!(store.fetch(&id("alice")).unwrap().unwrap().balance(), dec!(60));
    assert_eq!(store.fetch(&id("bob")).unwrap().unwrap().balance(), dec!(45));

    let out = store.transactions(&id("alice"), 10).unwrap();
    let incoming = store.transactions(&id("bob"), 10).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, TransactionKind::TransferOut);
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].kind, TransactionKind::TransferIn);
    assert_eq!(incoming[0].amount, dec!(40));
}

#[test]
fn transfer_to_missing_destination_writes_nothing() {
    let store = AccountStore::open_in_memory().unwrap();
    store.create(&id("alice"), "hash").unwrap();
    store.update_balance(&id("alice"), dec!(100)).unwrap();

    let result = store.transfer(&id("alice"), &id("bob"), dec!(40), Utc::now());

    assert_eq!(result, Err(BankError::AccountNotFound));
    assert_eq!(store.fetch(&id("alice")).unwrap().unwrap().balance(), dec!(100));
    assert!(store.transactions(&id("alice"), 10).unwrap().is_empty());
}

#[test]
fn transfer_to_self_is_rejected() {
    let store = AccountStore::open_in_memory().unwrap();
    store.create(&id("alice"), "hash").unwrap();
    store.update_balance(&id("alice"), dec!(100)).unwrap();

    let result = store.transfer(&id("alice"), &id("alice"), dec!(40), Utc::now());

    assert_eq!(result, Err(BankError::SelfTransfer));
    assert_eq!(store.fetch(&id("alice")).unwrap().unwrap().balance(), dec!(100));
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("atm.db");

    {
        let store = AccountStore::open(&path).unwrap();
        store.create(&id("alice"), "hash").unwrap();
        store.update_balance(&id("alice"), dec!(70)).unwrap();
        store.set_locked(&id("alice"), true).unwrap();
        store
            .append_transaction(&record("alice", TransactionKind::Deposit, dec!(70)))
            .unwrap();
    }

    let store = AccountStore::open(&path).unwrap();
    let account = store.fetch(&id("alice")).unwrap().unwrap();
    assert_eq!(account.balance(), dec!(70));
    assert!(account.locked());

    let history = store.transactions(&id("alice"), 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Deposit);
}
