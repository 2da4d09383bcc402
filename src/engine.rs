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

//! Money-movement engine.
//!
//! The [`WalletEngine`] is the central component that moves funds between
//! balance rows and records every completed operation in the ledger. It
//! handles deposits, withdrawals, currency conversions, and wallet-to-wallet
//! transfers.
//!
//! # Operations
//!
//! - **Deposits**: Credit funds to a (wallet, currency) row. No credential,
//!   no fee.
//! - **Withdrawals**: Debit funds plus a percentage fee (fails if the total
//!   exceeds the balance).
//! - **Conversions**: Exchange between two currencies of one wallet at a
//!   spot rate from the price oracle, charging the fee on the converted
//!   amount.
//! - **Transfers**: Move funds to another wallet; the sender pays the fee,
//!   the recipient receives the full amount.
//!
//! # Atomicity
//!
//! Each operation is atomic: every balance mutation and the paired ledger
//! append take effect together, or the operation fails with no observable
//! state change. Single-row operations run under the row mutex; two-row
//! operations (conversion, transfer) hold both row mutexes, acquired in key
//! order, for the whole read-check-mutate-append sequence.

use crate::balance::{BalanceKey, BalanceStore};
use crate::base::{CurrencyCode, WalletAddress};
use crate::fees::{FeeSchedule, OperationKind};
use crate::ledger::{ConversionEntry, Ledger, LedgerEntry, MovementEntry, MovementKind, TransferEntry};
use crate::wallet::{WalletGuard, WalletStatus};
use crate::{EngineError, PriceOracle};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Money-movement engine over a wallet guard and a price oracle.
///
/// The engine owns the balance store and the ledger; wallet identity and
/// spot rates come from the injected collaborators. All methods take
/// `&self` and are safe to call concurrently.
///
/// # Invariants
///
/// - No balance row is ever negative.
/// - Every completed operation has exactly one ledger entry.
/// - A failed operation changes neither balances nor the ledger.
pub struct WalletEngine<G, O> {
    guard: G,
    oracle: O,
    fees: FeeSchedule,
    balances: BalanceStore,
    ledger: Ledger,
}

impl<G, O> WalletEngine<G, O>
where
    G: WalletGuard,
    O: PriceOracle,
{
    pub fn new(guard: G, oracle: O, fees: FeeSchedule) -> Self {
        Self {
            guard,
            oracle,
            fees,
            balances: BalanceStore::new(),
            ledger: Ledger::new(),
        }
    }

    /// Credits `amount` to the wallet's balance in `currency`.
    ///
    /// Deposits are permissionless top-ups: the wallet must exist and be
    /// active, but no credential is required and no fee is charged.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] - Amount is zero or negative.
    /// - [`EngineError::WalletNotFound`] - Unknown wallet address.
    /// - [`EngineError::WalletBlocked`] - Wallet is not active.
    pub fn deposit(
        &self,
        wallet: &WalletAddress,
        currency: &CurrencyCode,
        amount: Decimal,
    ) -> Result<MovementEntry, EngineError> {
        ensure_positive(amount)?;
        self.ensure_active(wallet)?;

        let key = BalanceKey::new(wallet.clone(), currency.clone());
        let entry = self.balances.with_row(&key, |quantity| {
            *quantity += amount;
            self.ledger.record_movement(
                wallet.clone(),
                currency.clone(),
                MovementKind::Deposit,
                amount,
                Decimal::ZERO,
            )
        });

        debug!(%wallet, %currency, %amount, entry = %entry.id, "deposit applied");
        Ok(entry)
    }

    /// Debits `amount` plus the withdrawal fee from the wallet.
    ///
    /// The fee is not credited anywhere; it simply leaves the system.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] - Amount is zero or negative.
    /// - [`EngineError::WalletNotFound`] - Unknown wallet address.
    /// - [`EngineError::WalletBlocked`] - Wallet is not active.
    /// - [`EngineError::InvalidCredential`] - Credential does not match.
    /// - [`EngineError::InsufficientFunds`] - Balance below amount + fee.
    pub fn withdraw(
        &self,
        wallet: &WalletAddress,
        currency: &CurrencyCode,
        amount: Decimal,
        credential: &str,
    ) -> Result<MovementEntry, EngineError> {
        ensure_positive(amount)?;
        self.ensure_active(wallet)?;
        self.authorize(wallet, credential)?;

        let fee = self.fees.fee(OperationKind::Withdrawal, amount);
        let total_debit = amount + fee;

        let key = BalanceKey::new(wallet.clone(), currency.clone());
        let entry = self.balances.with_row(&key, |quantity| {
            if *quantity < total_debit {
                return Err(EngineError::InsufficientFunds);
            }
            *quantity -= total_debit;
            Ok(self.ledger.record_movement(
                wallet.clone(),
                currency.clone(),
                MovementKind::Withdrawal,
                amount,
                fee,
            ))
        })?;

        debug!(%wallet, %currency, %amount, %fee, entry = %entry.id, "withdrawal applied");
        Ok(entry)
    }

    /// Converts `amount` of `source` into `target` at the oracle's spot
    /// rate, crediting the converted amount net of the conversion fee.
    ///
    /// The quote is obtained while both balance rows are held, after the
    /// sufficiency check and before any mutation: a failed quote leaves the
    /// rows untouched, and a successful one cannot race a concurrent debit
    /// of the source row. A retried conversion quotes fresh; there is no
    /// idempotency key.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] - Amount is zero or negative.
    /// - [`EngineError::WalletNotFound`] - Unknown wallet address.
    /// - [`EngineError::WalletBlocked`] - Wallet is not active.
    /// - [`EngineError::InvalidCredential`] - Credential does not match.
    /// - [`EngineError::SameCurrency`] - Source equals target.
    /// - [`EngineError::InsufficientFunds`] - Source balance below amount.
    /// - [`EngineError::QuoteUnavailable`] - Oracle failed, for any reason.
    pub fn convert(
        &self,
        wallet: &WalletAddress,
        source: &CurrencyCode,
        target: &CurrencyCode,
        amount: Decimal,
        credential: &str,
    ) -> Result<ConversionEntry, EngineError> {
        ensure_positive(amount)?;
        self.ensure_active(wallet)?;
        self.authorize(wallet, credential)?;
        if source == target {
            return Err(EngineError::SameCurrency);
        }

        let source_key = BalanceKey::new(wallet.clone(), source.clone());
        let target_key = BalanceKey::new(wallet.clone(), target.clone());

        let entry = self
            .balances
            .with_rows(&source_key, &target_key, |source_quantity, target_quantity| {
                if *source_quantity < amount {
                    return Err(EngineError::InsufficientFunds);
                }

                let rate = self.oracle.quote(source, target).map_err(|err| {
                    warn!(%source, %target, error = %err, "spot quote unavailable");
                    EngineError::QuoteUnavailable
                })?;

                let gross = amount * rate;
                let fee = self.fees.fee(OperationKind::Conversion, gross);
                let net = gross - fee;

                *source_quantity -= amount;
                *target_quantity += net;

                Ok(self.ledger.record_conversion(
                    wallet.clone(),
                    source.clone(),
                    target.clone(),
                    amount,
                    net,
                    rate,
                    fee,
                ))
            })?;

        debug!(
            %wallet, %source, %target, %amount,
            rate = %entry.rate, fee = %entry.fee, entry = %entry.id,
            "conversion applied"
        );
        Ok(entry)
    }

    /// Moves `amount` from `source` to `destination` in `currency`.
    ///
    /// The sender is debited amount + fee; the recipient is credited the
    /// full amount. Destination validity is checked before the funds check,
    /// so callers learn about structural problems first.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] - Amount is zero or negative.
    /// - [`EngineError::WalletNotFound`] - Unknown source wallet.
    /// - [`EngineError::WalletBlocked`] - Source wallet is not active.
    /// - [`EngineError::InvalidCredential`] - Credential does not match.
    /// - [`EngineError::SameWallet`] - Source equals destination.
    /// - [`EngineError::DestinationNotFound`] - Unknown destination wallet.
    /// - [`EngineError::DestinationBlocked`] - Destination is not active.
    /// - [`EngineError::InsufficientFunds`] - Balance below amount + fee.
    pub fn transfer(
        &self,
        source: &WalletAddress,
        destination: &WalletAddress,
        currency: &CurrencyCode,
        amount: Decimal,
        credential: &str,
    ) -> Result<TransferEntry, EngineError> {
        ensure_positive(amount)?;
        self.ensure_active(source)?;
        self.authorize(source, credential)?;
        if source == destination {
            return Err(EngineError::SameWallet);
        }
        match self.guard.status(destination) {
            None => return Err(EngineError::DestinationNotFound),
            Some(WalletStatus::Blocked) => return Err(EngineError::DestinationBlocked),
            Some(WalletStatus::Active) => {}
        }

        let fee = self.fees.fee(OperationKind::Transfer, amount);
        let total_debit = amount + fee;

        let source_key = BalanceKey::new(source.clone(), currency.clone());
        let destination_key = BalanceKey::new(destination.clone(), currency.clone());

        let entry = self
            .balances
            .with_rows(&source_key, &destination_key, |source_quantity, destination_quantity| {
                if *source_quantity < total_debit {
                    return Err(EngineError::InsufficientFunds);
                }
                *source_quantity -= total_debit;
                *destination_quantity += amount;

                Ok(self.ledger.record_transfer(
                    source.clone(),
                    destination.clone(),
                    currency.clone(),
                    amount,
                    fee,
                ))
            })?;

        debug!(
            %source, %destination, %currency, %amount, %fee, entry = %entry.id,
            "transfer applied"
        );
        Ok(entry)
    }

    /// Current balance of one (wallet, currency) row, zero if untouched.
    pub fn balance(&self, wallet: &WalletAddress, currency: &CurrencyCode) -> Decimal {
        self.balances
            .get(&BalanceKey::new(wallet.clone(), currency.clone()))
    }

    /// All balances of a wallet, sorted by currency code.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WalletNotFound`] for an unknown address.
    pub fn balances_of(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Vec<(CurrencyCode, Decimal)>, EngineError> {
        if self.guard.status(wallet).is_none() {
            return Err(EngineError::WalletNotFound);
        }
        Ok(self.balances.balances_of(wallet))
    }

    /// Ledger entries touching the wallet, in append order.
    pub fn history(&self, wallet: &WalletAddress) -> Vec<LedgerEntry> {
        self.ledger.entries_for(wallet)
    }

    /// Total number of ledger entries ever recorded.
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    fn ensure_active(&self, wallet: &WalletAddress) -> Result<(), EngineError> {
        match self.guard.status(wallet) {
            None => Err(EngineError::WalletNotFound),
            Some(WalletStatus::Blocked) => Err(EngineError::WalletBlocked),
            Some(WalletStatus::Active) => Ok(()),
        }
    }

    fn authorize(&self, wallet: &WalletAddress, credential: &str) -> Result<(), EngineError> {
        if self.guard.check_credential(wallet, credential) {
            Ok(())
        } else {
            Err(EngineError::InvalidCredential)
        }
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount);
    }
    Ok(())
}
