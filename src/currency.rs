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

//! Currency reference data.
//!
//! Currencies are read-only metadata used to tag balances and ledger rows.
//! The engine itself never consults them when moving money.

use crate::base::CurrencyCode;
use serde::{Deserialize, Serialize};

/// Whether a currency is a cryptocurrency or government-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyKind {
    Crypto,
    Fiat,
}

/// A supported currency: code, display name, and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
    pub kind: CurrencyKind,
}

impl Currency {
    pub fn new(code: impl AsRef<str>, name: impl Into<String>, kind: CurrencyKind) -> Self {
        Self {
            code: CurrencyCode::new(code),
            name: name.into(),
            kind,
        }
    }
}

/// The currencies seeded by default.
pub fn default_currencies() -> Vec<Currency> {
    vec![
        Currency::new("BTC", "Bitcoin", CurrencyKind::Crypto),
        Currency::new("ETH", "Ethereum", CurrencyKind::Crypto),
        Currency::new("SOL", "Solana", CurrencyKind::Crypto),
        Currency::new("USD", "US Dollar", CurrencyKind::Fiat),
        Currency::new("BRL", "Brazilian Real", CurrencyKind::Fiat),
    ]
}
