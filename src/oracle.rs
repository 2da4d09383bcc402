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

//! Spot-rate price oracles.
//!
//! The engine treats an oracle as a data source: one blocking call per
//! conversion, bounded by a timeout, failing with a single opaque error
//! kind. Upstream failure sub-kinds (unknown pair, timeout, malformed
//! response) are deliberately collapsed into [`QuoteError`]; the engine
//! acts only on the fact that no usable rate was obtained.

use crate::base::CurrencyCode;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A spot rate could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("quote failed: {0}")]
pub struct QuoteError(pub String);

impl QuoteError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Source of spot exchange rates.
///
/// `quote` returns how much of `target` one unit of `base` buys. The rate
/// is always positive; implementations must reject zero or negative values.
pub trait PriceOracle: Send + Sync {
    fn quote(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<Decimal, QuoteError>;
}

impl<O: PriceOracle> PriceOracle for std::sync::Arc<O> {
    fn quote(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<Decimal, QuoteError> {
        (**self).quote(base, target)
    }
}

/// Static rate table, for tests and offline runs.
#[derive(Debug, Default)]
pub struct FixedRateOracle {
    rates: DashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FixedRateOracle {
    pub fn new() -> Self {
        Self {
            rates: DashMap::new(),
        }
    }

    /// Sets the rate for one directed pair. Does not derive the inverse.
    pub fn set_rate(&self, base: impl Into<CurrencyCode>, target: impl Into<CurrencyCode>, rate: Decimal) {
        self.rates.insert((base.into(), target.into()), rate);
    }
}

impl PriceOracle for FixedRateOracle {
    fn quote(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<Decimal, QuoteError> {
        self.rates
            .get(&(base.clone(), target.clone()))
            .map(|rate| *rate)
            .ok_or_else(|| QuoteError::new(format!("no rate for pair {base}-{target}")))
    }
}

/// Coinbase v2 spot-price response body:
/// `{"data": {"base": "BTC", "currency": "USD", "amount": "43250.00"}}`
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    /// The amount is decimal text; it is parsed exactly, never through a
    /// binary float.
    amount: String,
}

/// Live oracle backed by the public Coinbase spot-price API.
#[derive(Debug, Clone)]
pub struct CoinbaseOracle {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CoinbaseOracle {
    const BASE_URL: &'static str = "https://api.coinbase.com/v2/prices";
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self, QuoteError> {
        Self::with_base_url(Self::BASE_URL)
    }

    /// Builds an oracle against an alternate endpoint, e.g. a local stub.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, QuoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|err| QuoteError::new(format!("http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl PriceOracle for CoinbaseOracle {
    fn quote(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<Decimal, QuoteError> {
        let url = format!("{}/{base}-{target}/spot", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| QuoteError::new(format!("request to {url}: {err}")))?
            .error_for_status()
            .map_err(|err| QuoteError::new(format!("pair {base}-{target}: {err}")))?;

        let body: SpotResponse = response
            .json()
            .map_err(|err| QuoteError::new(format!("malformed response: {err}")))?;

        let rate = Decimal::from_str(&body.data.amount)
            .map_err(|err| QuoteError::new(format!("amount {:?}: {err}", body.data.amount)))?;

        if rate <= Decimal::ZERO {
            return Err(QuoteError::new(format!(
                "non-positive rate {rate} for {base}-{target}"
            )));
        }
        Ok(rate)
    }
}
