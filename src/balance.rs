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

//! Balance storage.
//!
//! One row per (wallet, currency), each holding a non-negative quantity.
//! Rows are the unit of consistency: every read-check-write sequence runs
//! under the row's own mutex, so two concurrent debits against the same row
//! can never both pass a sufficiency check against a stale balance.
//!
//! # Thread Safety
//!
//! Rows live in a [`DashMap`] keyed by [`BalanceKey`]; operations on
//! different rows proceed in parallel. Two-row operations lock both rows in
//! key order, which makes opposite-direction transfers between the same
//! pair of wallets deadlock-free.

use crate::EngineError;
use crate::base::{CurrencyCode, WalletAddress};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Identifies one balance row.
///
/// The derived ordering (wallet address, then currency code) is the global
/// lock-acquisition order for multi-row operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalanceKey {
    pub wallet: WalletAddress,
    pub currency: CurrencyCode,
}

impl BalanceKey {
    pub fn new(wallet: WalletAddress, currency: CurrencyCode) -> Self {
        Self { wallet, currency }
    }
}

/// Concurrent store of per-(wallet, currency) balances.
///
/// Rows are created at zero the first time they are touched. Quantities are
/// exact decimals and never go negative; callers that might debit must
/// check sufficiency inside [`with_row`](Self::with_row) or
/// [`with_rows`](Self::with_rows) before mutating.
#[derive(Debug, Default)]
pub struct BalanceStore {
    rows: DashMap<BalanceKey, Arc<Mutex<Decimal>>>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Returns the row cell, creating it at zero if absent.
    ///
    /// The `Arc` is cloned out of the map so the shard lock is released
    /// before the row mutex is taken.
    fn row(&self, key: &BalanceKey) -> Arc<Mutex<Decimal>> {
        self.rows
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Decimal::ZERO)))
            .clone()
    }

    /// Current quantity for a row, zero if the row does not exist.
    pub fn get(&self, key: &BalanceKey) -> Decimal {
        self.rows
            .get(key)
            .map(|row| *row.lock())
            .unwrap_or(Decimal::ZERO)
    }

    /// Runs `f` with exclusive access to one row.
    ///
    /// The closure sees the live quantity and may mutate it; the mutex is
    /// held for the whole closure, serializing read-check-write per key.
    pub fn with_row<R>(&self, key: &BalanceKey, f: impl FnOnce(&mut Decimal) -> R) -> R {
        let row = self.row(key);
        let mut quantity = row.lock();
        let result = f(&mut quantity);
        debug_assert!(
            *quantity >= Decimal::ZERO,
            "balance row {key:?} went negative: {}",
            *quantity
        );
        result
    }

    /// Runs `f` with exclusive access to two distinct rows.
    ///
    /// Locks are acquired in [`BalanceKey`] order regardless of argument
    /// order; `f` still receives the quantities in `(a, b)` order.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; callers must reject same-row operations first.
    pub fn with_rows<R>(
        &self,
        a: &BalanceKey,
        b: &BalanceKey,
        f: impl FnOnce(&mut Decimal, &mut Decimal) -> R,
    ) -> R {
        assert_ne!(a, b, "with_rows requires two distinct rows");

        let row_a = self.row(a);
        let row_b = self.row(b);

        let (mut guard_a, mut guard_b) = if a < b {
            let guard_a = row_a.lock();
            let guard_b = row_b.lock();
            (guard_a, guard_b)
        } else {
            let guard_b = row_b.lock();
            let guard_a = row_a.lock();
            (guard_a, guard_b)
        };

        let result = f(&mut guard_a, &mut guard_b);
        debug_assert!(
            *guard_a >= Decimal::ZERO && *guard_b >= Decimal::ZERO,
            "balance row went negative: {a:?}={} {b:?}={}",
            *guard_a,
            *guard_b
        );
        result
    }

    /// Applies a signed delta to one row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InsufficientFunds`] if the delta would drive
    /// the quantity negative; the row is left unchanged.
    pub fn apply_delta(&self, key: &BalanceKey, delta: Decimal) -> Result<Decimal, EngineError> {
        self.with_row(key, |quantity| {
            let next = *quantity + delta;
            if next < Decimal::ZERO {
                return Err(EngineError::InsufficientFunds);
            }
            *quantity = next;
            Ok(next)
        })
    }

    /// All balances held by one wallet, sorted by currency code.
    pub fn balances_of(&self, wallet: &WalletAddress) -> Vec<(CurrencyCode, Decimal)> {
        let mut balances: Vec<(CurrencyCode, Decimal)> = self
            .rows
            .iter()
            .filter(|entry| &entry.key().wallet == wallet)
            .map(|entry| (entry.key().currency.clone(), *entry.value().lock()))
            .collect();
        balances.sort_by(|left, right| left.0.cmp(&right.0));
        balances
    }

    /// Number of rows that have been touched.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
