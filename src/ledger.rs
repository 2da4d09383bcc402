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

//! Append-only operation ledger.
//!
//! Every completed operation appends exactly one immutable entry. Entries
//! are the audit trail and the source of historical truth; balances are a
//! derived projection maintained in lockstep with entry creation. Ids and
//! creation timestamps are assigned here, at append time.

use crate::base::{CurrencyCode, EntryId, WalletAddress};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Direction of a movement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Deposit,
    Withdrawal,
}

/// Ledger row for a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementEntry {
    pub id: EntryId,
    pub wallet: WalletAddress,
    pub currency: CurrencyCode,
    pub kind: MovementKind,
    /// Gross amount deposited or withdrawn, before the fee.
    pub amount: Decimal,
    /// Fee charged on top of the amount. Zero for deposits.
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Ledger row for a currency conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionEntry {
    pub id: EntryId,
    pub wallet: WalletAddress,
    pub source_currency: CurrencyCode,
    pub target_currency: CurrencyCode,
    /// Amount debited from the source currency.
    pub source_amount: Decimal,
    /// Amount credited to the target currency, net of the fee.
    pub target_amount: Decimal,
    /// Spot rate applied, as quoted at execution time.
    pub rate: Decimal,
    /// Fee charged in the target currency.
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Ledger row for a wallet-to-wallet transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferEntry {
    pub id: EntryId,
    pub source: WalletAddress,
    pub destination: WalletAddress,
    pub currency: CurrencyCode,
    /// Amount received in full by the destination.
    pub amount: Decimal,
    /// Fee paid by the source on top of the amount.
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One immutable ledger record, one shape per operation family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "lowercase")]
pub enum LedgerEntry {
    Movement(MovementEntry),
    Conversion(ConversionEntry),
    Transfer(TransferEntry),
}

impl LedgerEntry {
    pub fn id(&self) -> EntryId {
        match self {
            Self::Movement(entry) => entry.id,
            Self::Conversion(entry) => entry.id,
            Self::Transfer(entry) => entry.id,
        }
    }

    /// Whether the entry touches the given wallet, on either side.
    pub fn involves(&self, wallet: &WalletAddress) -> bool {
        match self {
            Self::Movement(entry) => &entry.wallet == wallet,
            Self::Conversion(entry) => &entry.wallet == wallet,
            Self::Transfer(entry) => &entry.source == wallet || &entry.destination == wallet,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerLog {
    entries: Vec<LedgerEntry>,
    next_id: u64,
}

/// Append-only ledger of completed operations.
///
/// Appends happen inside the same critical section as their paired balance
/// mutation, so entry order is consistent with the order balance effects
/// became visible. Ids start at 1 and increase monotonically across all
/// three entry shapes.
#[derive(Debug, Default)]
pub struct Ledger {
    log: Mutex<LedgerLog>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(LedgerLog {
                entries: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Appends a deposit or withdrawal row and returns it with its assigned
    /// id and timestamp.
    pub fn record_movement(
        &self,
        wallet: WalletAddress,
        currency: CurrencyCode,
        kind: MovementKind,
        amount: Decimal,
        fee: Decimal,
    ) -> MovementEntry {
        let mut log = self.log.lock();
        let entry = MovementEntry {
            id: EntryId(log.next_id),
            wallet,
            currency,
            kind,
            amount,
            fee,
            created_at: Utc::now(),
        };
        log.next_id += 1;
        log.entries.push(LedgerEntry::Movement(entry.clone()));
        entry
    }

    /// Appends a conversion row and returns it with its assigned id and
    /// timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn record_conversion(
        &self,
        wallet: WalletAddress,
        source_currency: CurrencyCode,
        target_currency: CurrencyCode,
        source_amount: Decimal,
        target_amount: Decimal,
        rate: Decimal,
        fee: Decimal,
    ) -> ConversionEntry {
        let mut log = self.log.lock();
        let entry = ConversionEntry {
            id: EntryId(log.next_id),
            wallet,
            source_currency,
            target_currency,
            source_amount,
            target_amount,
            rate,
            fee,
            created_at: Utc::now(),
        };
        log.next_id += 1;
        log.entries.push(LedgerEntry::Conversion(entry.clone()));
        entry
    }

    /// Appends a transfer row and returns it with its assigned id and
    /// timestamp.
    pub fn record_transfer(
        &self,
        source: WalletAddress,
        destination: WalletAddress,
        currency: CurrencyCode,
        amount: Decimal,
        fee: Decimal,
    ) -> TransferEntry {
        let mut log = self.log.lock();
        let entry = TransferEntry {
            id: EntryId(log.next_id),
            source,
            destination,
            currency,
            amount,
            fee,
            created_at: Utc::now(),
        };
        log.next_id += 1;
        log.entries.push(LedgerEntry::Transfer(entry.clone()));
        entry
    }

    /// All entries touching the given wallet, in append order.
    pub fn entries_for(&self, wallet: &WalletAddress) -> Vec<LedgerEntry> {
        self.log
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.involves(wallet))
            .cloned()
            .collect()
    }

    /// Total number of entries ever appended.
    pub fn len(&self) -> usize {
        self.log.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().entries.is_empty()
    }
}
