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

//! Error types for money-movement operations.

use thiserror::Error;

/// Money-movement operation errors.
///
/// Every variant reflects a business precondition failure and is terminal:
/// the engine never retries internally, and a failed operation leaves every
/// balance exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Wallet address does not exist
    #[error("wallet not found")]
    WalletNotFound,

    /// Wallet exists but is blocked
    #[error("wallet is blocked")]
    WalletBlocked,

    /// Credential does not match the wallet
    #[error("invalid credential")]
    InvalidCredential,

    /// Debit would exceed the wallet balance
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Conversion source and target currencies are the same
    #[error("source and target currencies must differ")]
    SameCurrency,

    /// Transfer source and destination wallets are the same
    #[error("source and destination wallets must differ")]
    SameWallet,

    /// Transfer destination wallet does not exist
    #[error("destination wallet not found")]
    DestinationNotFound,

    /// Transfer destination wallet is blocked
    #[error("destination wallet is blocked")]
    DestinationBlocked,

    /// The price oracle failed to produce a usable spot rate
    #[error("exchange rate quote unavailable")]
    QuoteUnavailable,
}
