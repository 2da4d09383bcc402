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

//! # Wallet Ledger
//!
//! This library provides a money-movement engine for multi-currency
//! wallets: deposits, withdrawals, currency conversions at a spot rate,
//! and wallet-to-wallet transfers, each recorded as an immutable ledger
//! entry.
//!
//! ## Core Components
//!
//! - [`WalletEngine`]: Orchestrates the four operations atomically
//! - [`BalanceStore`]: Per-(wallet, currency) balances, the unit of consistency
//! - [`Ledger`]: Append-only audit trail with assigned ids and timestamps
//! - [`FeeSchedule`]: Pure fee policy with configurable per-operation rates
//! - [`WalletGuard`] / [`PriceOracle`]: External collaborators for wallet
//!   status and spot rates
//! - [`EngineError`]: Business precondition failures
//!
//! ## Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use wallet_ledger::{
//!     CurrencyCode, FeeSchedule, FixedRateOracle, WalletAddress, WalletDirectory, WalletEngine,
//! };
//!
//! let wallets = WalletDirectory::new();
//! let alice = WalletAddress::from("alice");
//! wallets.register(alice.clone(), "alice-key");
//!
//! let oracle = FixedRateOracle::new();
//! let engine = WalletEngine::new(wallets, oracle, FeeSchedule::default());
//!
//! let brl = CurrencyCode::from("BRL");
//! let entry = engine.deposit(&alice, &brl, dec!(100.00)).unwrap();
//! assert_eq!(entry.amount, dec!(100.00));
//! assert_eq!(engine.balance(&alice, &brl), dec!(100.00));
//! ```
//!
//! ## Thread Safety
//!
//! All engine methods take `&self` and may be called concurrently. Each
//! operation serializes read-check-write per (wallet, currency) row, and
//! two-row operations lock both rows in a consistent order.

pub mod balance;
mod base;
pub mod currency;
mod engine;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod oracle;
pub mod wallet;

pub use balance::{BalanceKey, BalanceStore};
pub use base::{CurrencyCode, EntryId, WalletAddress};
pub use currency::{Currency, CurrencyKind, default_currencies};
pub use engine::WalletEngine;
pub use error::EngineError;
pub use fees::{FeeSchedule, OperationKind};
pub use ledger::{
    ConversionEntry, Ledger, LedgerEntry, MovementEntry, MovementKind, TransferEntry,
};
pub use oracle::{CoinbaseOracle, FixedRateOracle, PriceOracle, QuoteError};
pub use wallet::{Wallet, WalletDirectory, WalletGuard, WalletStatus};
