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

//! Runtime settings for the engine.

use crate::auth::MAX_ATTEMPTS;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "atm.db";

/// Ledger rows shown with a statement.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// Wrong PINs allowed before lockout. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            max_attempts: MAX_ATTEMPTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
