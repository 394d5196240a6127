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

use atm_ledger::auth::MAX_ATTEMPTS;
use atm_ledger::config::{DEFAULT_DATABASE, DEFAULT_HISTORY_LIMIT};
use atm_ledger::{Bank, BankError, Config, LoginStep, SessionState, TransactionRecord};
use clap::Parser;
use csv::Writer;
use dialoguer::Password;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// ATM Interface - Terminal banking simulator
///
/// Create an account, log in with a 4-digit PIN, then withdraw, deposit,
/// transfer and view statements. Accounts and the transaction ledger are
/// kept in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "atm-ledger")]
#[command(about = "A terminal ATM simulator backed by SQLite", long_about = None)]
struct Args {
    /// Path to the SQLite database (created if missing)
    #[arg(long, value_name = "FILE", env = "ATM_DATABASE", default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// Incorrect PINs allowed before an account is locked
    #[arg(
        long,
        env = "ATM_MAX_ATTEMPTS",
        default_value_t = MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_attempts: u32,

    /// Ledger rows shown with each statement
    #[arg(long = "history", env = "ATM_HISTORY", default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            database: self.database,
            max_attempts: self.max_attempts,
            history_limit: self.history_limit,
        }
    }
}

fn main() {
    let config = Args::parse().into_config();

    // Logs go to stderr; RUST_LOG=debug shows every balance operation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    let bank = match Bank::open(&config) {
        Ok(bank) => bank,
        Err(e) => {
            eprintln!(
                "Error opening database '{}': {}",
                config.database.display(),
                e
            );
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let hide_secrets = stdin.is_terminal();
    let mut console = Console::new(stdin.lock(), io::stdout()).hide_secrets(hide_secrets);

    if let Err(e) = run(&bank, &mut console) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Line-based prompt over any reader/writer pair.
struct Console<R, W> {
    input: R,
    output: W,
    /// Read PINs through a no-echo terminal prompt.
    hide_secrets: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    fn hide_secrets(mut self, hide: bool) -> Self {
        self.hide_secrets = hide;
        self
    }

    fn say(&mut self, message: impl Display) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    /// Prompts and reads one line without its terminator.
    ///
    /// End of input is reported as [`io::ErrorKind::UnexpectedEof`].
    fn line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut buffer = String::new();
        if self.input.read_line(&mut buffer)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
    }

    fn secret(&mut self, prompt: &str) -> io::Result<String> {
        if !self.hide_secrets {
            return self.line(prompt);
        }
        Password::new()
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)
    }

    fn amount(&mut self, prompt: &str) -> io::Result<Option<Decimal>> {
        let input = self.line(prompt)?;
        match input.trim().parse::<Decimal>() {
            Ok(amount) => Ok(Some(amount)),
            Err(_) => {
                self.report(&BankError::InvalidAmount)?;
                Ok(None)
            }
        }
    }

    fn report(&mut self, error: &BankError) -> io::Result<()> {
        let message = match error {
            BankError::InvalidAmount => "AMOUNT MUST MATCH 10 RUPEE NOTES".to_string(),
            BankError::InsufficientFunds => "YOU HAVE INSUFFICIENT BALANCE".to_string(),
            BankError::AccountNotFound => "ACCOUNT NOT FOUND".to_string(),
            other => other.to_string().to_uppercase(),
        };
        self.say(message)
    }
}

/// Runs the menu loop until the user quits or input ends.
fn run<R: BufRead, W: Write>(bank: &Bank, console: &mut Console<R, W>) -> io::Result<()> {
    let mut state = SessionState::new();
    loop {
        let step = if state.is_authenticated() {
            account_menu(bank, &mut state, console)
        } else {
            main_menu(bank, &mut state, console)
        };
        match step {
            Ok(true) => continue,
            Ok(false) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Returns `false` when the user chose to quit.
fn main_menu<R: BufRead, W: Write>(
    bank: &Bank,
    state: &mut SessionState,
    console: &mut Console<R, W>,
) -> io::Result<bool> {
    console.say("-------------------------")?;
    console.say("ATM INTERFACE")?;
    console.say("1. Create Account (C)")?;
    console.say("2. Login (L)")?;
    console.say("3. Quit (Q)")?;
    let choice = console.line("Enter your choice: ")?;

    match choice.trim().to_lowercase().as_str() {
        "1" | "c" => create_account(bank, console)?,
        "2" | "l" => login(bank, state, console)?,
        "3" | "q" => {
            console.say("Goodbye!")?;
            return Ok(false);
        }
        _ => console.say("Invalid choice. Please select a valid option.")?,
    }
    Ok(true)
}

fn create_account<R: BufRead, W: Write>(
    bank: &Bank,
    console: &mut Console<R, W>,
) -> io::Result<()> {
    let id = console.line("Enter your account number: ")?;
    let pin = console.secret("Create a 4-digit PIN for your account: ")?;
    match bank.create_account(id.trim(), &pin) {
        Ok(_) => console.say("Account created successfully!"),
        Err(e) => console.report(&e),
    }
}

fn login<R: BufRead, W: Write>(
    bank: &Bank,
    state: &mut SessionState,
    console: &mut Console<R, W>,
) -> io::Result<()> {
    let id = console.line("Enter your account number: ")?;
    let mut login = match bank.begin_login(state, id.trim()) {
        Ok(login) => login,
        Err(e) => return console.report(&e),
    };

    loop {
        let pin = console.secret("Please enter your PIN: ")?;
        match bank.submit_pin(state, login, &pin) {
            Ok(LoginStep::Authenticated) => return console.say("Login successful!"),
            Ok(LoginStep::Retry(next)) => {
                console.say(format!(
                    "Incorrect PIN. {} attempts remaining.",
                    next.remaining()
                ))?;
                login = next;
            }
            Ok(LoginStep::Locked) => {
                console.say("Incorrect PIN. 0 attempts remaining.")?;
                return console.say("Login failed. Account locked. Please contact customer support.");
            }
            Err(e) => return console.report(&e),
        }
    }
}

/// Returns `false` when the user chose to quit.
fn account_menu<R: BufRead, W: Write>(
    bank: &Bank,
    state: &mut SessionState,
    console: &mut Console<R, W>,
) -> io::Result<bool> {
    console.say("-------------------------")?;
    console.say("ATM INTERFACE")?;
    console.say("1. STATEMENT")?;
    console.say("2. WITHDRAW")?;
    console.say("3. DEPOSIT")?;
    console.say("4. CHANGE PIN")?;
    console.say("5. TRANSFER")?;
    console.say("6. LOGOUT")?;
    let choice = console.line("Enter the number of your choice (1-6): ")?;

    match choice.trim() {
        "1" => match bank.statement(state) {
            Ok(statement) => {
                console.say(format!(
                    "{} YOU HAVE {} RUPEES ON YOUR ACCOUNT.",
                    statement.account_id.as_str().to_uppercase(),
                    statement.balance
                ))?;
                if !statement.history.is_empty() {
                    console.say("RECENT TRANSACTIONS:")?;
                    write_history(&statement.history, &mut console.output).map_err(io::Error::from)?;
                }
            }
            Err(e) => console.report(&e)?,
        },
        "2" => {
            if let Some(amount) = console.amount("ENTER AMOUNT YOU WOULD LIKE TO WITHDRAW: ")? {
                match bank.withdraw(state, amount) {
                    Ok(balance) => console.say(format!("YOUR NEW BALANCE IS: {balance} RUPEES"))?,
                    Err(e) => console.report(&e)?,
                }
            }
        }
        "3" => {
            if let Some(amount) = console.amount("ENTER AMOUNT YOU WANT TO LODGE: ")? {
                match bank.deposit(state, amount) {
                    Ok(balance) => console.say(format!("YOUR NEW BALANCE IS: {balance} RUPEES"))?,
                    Err(e) => console.report(&e)?,
                }
            }
        }
        "4" => {
            let new_pin = console.secret("ENTER A NEW PIN: ")?;
            let confirm_pin = console.secret("CONFIRM NEW PIN: ")?;
            match bank.change_pin(state, &new_pin, &confirm_pin) {
                Ok(()) => console.say("NEW PIN SAVED")?,
                Err(e) => console.report(&e)?,
            }
        }
        "5" => {
            let destination = console.line("Enter the destination account number: ")?;
            if let Some(amount) = console.amount("Enter the amount to transfer: ")? {
                match bank.transfer(state, destination.trim(), amount) {
                    Ok(balance) => {
                        console.say("TRANSFER SUCCESSFUL")?;
                        console.say(format!("YOUR NEW BALANCE IS: {balance} RUPEES"))?;
                    }
                    Err(BankError::AccountNotFound) => {
                        console.say("DESTINATION ACCOUNT NOT FOUND")?
                    }
                    Err(e) => console.report(&e)?,
                }
            }
        }
        "6" => {
            bank.logout(state);
            console.say("Logged out successfully!")?;
        }
        _ => console.say("Invalid choice. Please select a valid option.")?,
    }
    Ok(true)
}

/// Write ledger records as CSV.
///
/// # CSV Format
///
/// Columns: `account_id, type, amount, timestamp`
///
/// # Example
///
/// ```csv
/// account_id,type,amount,timestamp
/// alice,Withdraw,30,2025-06-01T10:15:00.123456Z
/// alice,Deposit,100,2025-06-01T10:14:02.654321Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_history<W: Write>(records: &[TransactionRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_ledger::{AccountId, AccountStore, TransactionKind};
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn bank() -> Bank {
        Bank::new(AccountStore::open_in_memory().unwrap())
    }

    /// Feeds `script` to the menu loop and returns everything it printed.
    fn session(bank: &Bank, script: &str) -> String {
        let mut console = Console::new(Cursor::new(script.to_string()), Vec::new());
        run(bank, &mut console).unwrap();
        String::from_utf8(console.output).unwrap()
    }

    fn balance(bank: &Bank, id: &str) -> Decimal {
        bank.store()
            .fetch(&AccountId::new(id).unwrap())
            .unwrap()
            .unwrap()
            .balance()
    }

    #[test]
    fn quit_exits_loop() {
        let output = session(&bank(), "q\n");
        assert!(output.contains("Goodbye!"));
    }

    #[test]
    fn end_of_input_exits_loop() {
        let output = session(&bank(), "");
        assert!(output.contains("ATM INTERFACE"));
    }

    #[test]
    fn invalid_choice_is_reported_and_loop_continues() {
        let output = session(&bank(), "9\nq\n");
        assert!(output.contains("Invalid choice."));
        assert!(output.contains("Goodbye!"));
    }

    #[test]
    fn create_account_twice_reports_exists() {
        let bank = bank();
        let output = session(&bank, "c\nalice\n1234\nc\nalice\n5678\nq\n");
        assert!(output.contains("Account created successfully!"));
        assert!(output.contains("ACCOUNT ALREADY EXISTS"));
    }

    #[test]
    fn deposit_withdraw_and_failed_transfer() {
        let bank = bank();
        let script = "c\nalice\n1234\n\
                      l\nalice\n1234\n\
                      3\n100\n\
                      2\n30\n\
                      5\nbob\n20\n\
                      6\nq\n";
        let output = session(&bank, script);

        assert!(output.contains("Login successful!"));
        assert!(output.contains("YOUR NEW BALANCE IS: 100 RUPEES"));
        assert!(output.contains("YOUR NEW BALANCE IS: 70 RUPEES"));
        assert!(output.contains("DESTINATION ACCOUNT NOT FOUND"));
        assert!(output.contains("Logged out successfully!"));
        assert_eq!(balance(&bank, "alice"), dec!(70));
    }

    #[test]
    fn bad_amounts_are_rejected() {
        let bank = bank();
        let script = "c\nalice\n1234\nl\nalice\n1234\n3\n15\n3\nten\n2\n10\n6\nq\n";
        let output = session(&bank, script);

        assert_eq!(output.matches("AMOUNT MUST MATCH 10 RUPEE NOTES").count(), 2);
        assert!(output.contains("YOU HAVE INSUFFICIENT BALANCE"));
        assert_eq!(balance(&bank, "alice"), Decimal::ZERO);
    }

    #[test]
    fn oversized_deposits_keep_the_menu_running() {
        let bank = bank();
        let script = "c\nalice\n1234\nl\nalice\n1234\n\
                      3\n70000000000000000000000000000\n\
                      3\n70000000000000000000000000000\n\
                      3\n9000000000000000\n3\n10\n6\nq\n";
        let output = session(&bank, script);

        assert_eq!(output.matches("AMOUNT MUST MATCH 10 RUPEE NOTES").count(), 2);
        assert!(output.contains("YOUR NEW BALANCE IS: 9000000000000000 RUPEES"));
        assert!(output.contains("ACCOUNT BALANCE LIMIT REACHED"));
        assert!(output.contains("Logged out successfully!"));
        assert_eq!(balance(&bank, "alice"), dec!(9000000000000000));
    }

    #[test]
    fn three_wrong_pins_lock_the_account() {
        let bank = bank();
        let script = "c\nalice\n1234\n\
                      l\nalice\n0000\n1111\n2222\n\
                      l\nalice\n";
        let output = session(&bank, script);

        assert!(output.contains("Incorrect PIN. 2 attempts remaining."));
        assert!(output.contains("Incorrect PIN. 1 attempts remaining."));
        assert!(output.contains(
            "Incorrect PIN. 0 attempts remaining.\nLogin failed. Account locked."
        ));
        assert!(output.contains("ACCOUNT IS LOCKED, PLEASE CONTACT CUSTOMER SUPPORT"));
    }

    #[test]
    fn statement_prints_balance_and_history() {
        let bank = bank();
        let script = "c\nalice\n1234\nl\nalice\n1234\n3\n50\n1\n6\nq\n";
        let output = session(&bank, script);

        assert!(output.contains("ALICE YOU HAVE 50 RUPEES ON YOUR ACCOUNT."));
        assert!(output.contains("account_id,type,amount,timestamp"));
        assert!(output.contains("alice,Deposit,50,"));
    }

    #[test]
    fn change_pin_through_menu() {
        let bank = bank();
        let script = "c\nalice\n1234\nl\nalice\n1234\n\
                      4\n1234\n1234\n\
                      4\n5678\n5679\n\
                      4\n5678\n5678\n\
                      6\nl\nalice\n5678\nq\n";
        let output = session(&bank, script);

        assert!(output.contains("PIN MUST CONSIST OF 4 DIGITS AND DIFFER FROM THE PREVIOUS PIN"));
        assert!(output.contains("PIN MISMATCH"));
        assert!(output.contains("NEW PIN SAVED"));
        assert_eq!(output.matches("Login successful!").count(), 2);
    }

    #[test]
    fn write_history_as_csv() {
        let records = vec![TransactionRecord::now(
            AccountId::new("alice").unwrap(),
            TransactionKind::TransferOut,
            dec!(20),
        )];

        let mut output = Vec::new();
        write_history(&records, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("account_id,type,amount,timestamp\n"));
        assert!(output.contains("alice,Transfer (Out),20,"));
    }
}
