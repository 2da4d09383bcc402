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

//! Fee policy.
//!
//! `fee(kind, notional)` is a pure function of the operation kind and the
//! notional amount, parameterized by per-operation percentage rates. Rates
//! are loaded once at construction; changing the process environment after
//! that has no effect on a running engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// The four money-movement operation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Deposit,
    Withdrawal,
    Conversion,
    Transfer,
}

/// Immutable per-operation fee rates.
///
/// - Deposits are free.
/// - Withdrawals charge `withdrawal_rate` on the withdrawn amount.
/// - Conversions charge `conversion_rate` on the destination-currency amount
///   after the exchange rate is applied.
/// - Transfers charge `transfer_rate` to the sender on top of the amount;
///   the recipient receives the full notional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSchedule {
    withdrawal_rate: Decimal,
    conversion_rate: Decimal,
    transfer_rate: Decimal,
}

impl FeeSchedule {
    /// Default withdrawal fee rate (1%).
    pub const DEFAULT_WITHDRAWAL_RATE: Decimal = dec!(0.01);
    /// Default conversion fee rate (2%).
    pub const DEFAULT_CONVERSION_RATE: Decimal = dec!(0.02);
    /// Default transfer fee rate (1.5%).
    pub const DEFAULT_TRANSFER_RATE: Decimal = dec!(0.015);

    pub fn new(withdrawal_rate: Decimal, conversion_rate: Decimal, transfer_rate: Decimal) -> Self {
        Self {
            withdrawal_rate,
            conversion_rate,
            transfer_rate,
        }
    }

    /// Builds a schedule from `WITHDRAWAL_FEE_RATE`, `CONVERSION_FEE_RATE`,
    /// and `TRANSFER_FEE_RATE`, falling back to the defaults for variables
    /// that are unset or unparseable.
    ///
    /// Read once at startup; the schedule is immutable afterwards.
    pub fn from_env() -> Self {
        Self {
            withdrawal_rate: env_rate("WITHDRAWAL_FEE_RATE", Self::DEFAULT_WITHDRAWAL_RATE),
            conversion_rate: env_rate("CONVERSION_FEE_RATE", Self::DEFAULT_CONVERSION_RATE),
            transfer_rate: env_rate("TRANSFER_FEE_RATE", Self::DEFAULT_TRANSFER_RATE),
        }
    }

    /// A schedule with every rate set to zero. Useful in tests.
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    /// Computes the fee for an operation of the given kind and notional.
    ///
    /// Pure and deterministic; performs no I/O.
    pub fn fee(&self, kind: OperationKind, notional: Decimal) -> Decimal {
        match kind {
            OperationKind::Deposit => Decimal::ZERO,
            OperationKind::Withdrawal => notional * self.withdrawal_rate,
            OperationKind::Conversion => notional * self.conversion_rate,
            OperationKind::Transfer => notional * self.transfer_rate,
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_WITHDRAWAL_RATE,
            Self::DEFAULT_CONVERSION_RATE,
            Self::DEFAULT_TRANSFER_RATE,
        )
    }
}

fn env_rate(name: &str, default: Decimal) -> Decimal {
    env::var(name)
        .ok()
        .and_then(|raw| Decimal::from_str(&raw).ok())
        .unwrap_or(default)
}
