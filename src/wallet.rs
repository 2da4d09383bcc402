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

//! Wallet identity and status.
//!
//! The engine never mutates wallet identity or status itself; it only asks
//! a [`WalletGuard`] whether a wallet exists, whether it is active, and
//! whether a presented credential matches. [`WalletDirectory`] is the
//! in-memory implementation used by tests and embedders without their own
//! wallet backend.

use crate::base::WalletAddress;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Lifecycle status of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WalletStatus {
    Active,
    Blocked,
}

/// Answers existence, status, and credential questions about wallets.
///
/// Implementations must be safe to call concurrently; the engine consults
/// the guard before taking any balance lock.
pub trait WalletGuard: Send + Sync {
    /// Status of the wallet, or `None` if the address is unknown.
    fn status(&self, address: &WalletAddress) -> Option<WalletStatus>;

    /// Whether the credential authorizes operations on the wallet.
    ///
    /// Returns `false` for unknown addresses.
    fn check_credential(&self, address: &WalletAddress, credential: &str) -> bool;
}

/// Public view of a directory wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    pub address: WalletAddress,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WalletRecord {
    status: WalletStatus,
    credential: String,
    created_at: DateTime<Utc>,
}

/// In-memory wallet registry.
///
/// Wallets register active and can be blocked; blocking is one-way here,
/// matching the engine's view that a blocked wallet stops moving money.
/// Credentials are compared verbatim; hashing belongs to the embedding
/// application.
#[derive(Debug, Default)]
pub struct WalletDirectory {
    wallets: DashMap<WalletAddress, WalletRecord>,
}

impl WalletDirectory {
    pub fn new() -> Self {
        Self {
            wallets: DashMap::new(),
        }
    }

    /// Registers an active wallet. Re-registering an address replaces its
    /// credential and reactivates it.
    pub fn register(&self, address: WalletAddress, credential: impl Into<String>) {
        self.wallets.insert(
            address,
            WalletRecord {
                status: WalletStatus::Active,
                credential: credential.into(),
                created_at: Utc::now(),
            },
        );
    }

    /// Blocks a wallet. Returns `false` if the address is unknown.
    pub fn block(&self, address: &WalletAddress) -> bool {
        match self.wallets.get_mut(address) {
            Some(mut record) => {
                record.status = WalletStatus::Blocked;
                true
            }
            None => false,
        }
    }

    /// Snapshot of one wallet.
    pub fn get(&self, address: &WalletAddress) -> Option<Wallet> {
        self.wallets.get(address).map(|record| Wallet {
            address: address.clone(),
            status: record.status,
            created_at: record.created_at,
        })
    }

    /// Snapshot of all registered wallets, sorted by address.
    pub fn list(&self) -> Vec<Wallet> {
        let mut wallets: Vec<Wallet> = self
            .wallets
            .iter()
            .map(|entry| Wallet {
                address: entry.key().clone(),
                status: entry.value().status,
                created_at: entry.value().created_at,
            })
            .collect();
        wallets.sort_by(|left, right| left.address.cmp(&right.address));
        wallets
    }
}

impl<G: WalletGuard> WalletGuard for std::sync::Arc<G> {
    fn status(&self, address: &WalletAddress) -> Option<WalletStatus> {
        (**self).status(address)
    }

    fn check_credential(&self, address: &WalletAddress, credential: &str) -> bool {
        (**self).check_credential(address, credential)
    }
}

impl WalletGuard for WalletDirectory {
    fn status(&self, address: &WalletAddress) -> Option<WalletStatus> {
        self.wallets.get(address).map(|record| record.status)
    }

    fn check_credential(&self, address: &WalletAddress, credential: &str) -> bool {
        self.wallets
            .get(address)
            .map(|record| record.credential == credential)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_wallet_is_active() {
        let directory = WalletDirectory::new();
        let address = WalletAddress::from("w1");
        directory.register(address.clone(), "secret");

        assert_eq!(directory.status(&address), Some(WalletStatus::Active));
        assert!(directory.check_credential(&address, "secret"));
        assert!(!directory.check_credential(&address, "wrong"));
    }

    #[test]
    fn unknown_wallet_has_no_status_and_fails_credentials() {
        let directory = WalletDirectory::new();
        let address = WalletAddress::from("ghost");

        assert_eq!(directory.status(&address), None);
        assert!(!directory.check_credential(&address, "anything"));
    }

    #[test]
    fn blocking_changes_status() {
        let directory = WalletDirectory::new();
        let address = WalletAddress::from("w1");
        directory.register(address.clone(), "secret");

        assert!(directory.block(&address));
        assert_eq!(directory.status(&address), Some(WalletStatus::Blocked));
        // Credential still matches; blocked wallets keep their identity.
        assert!(directory.check_credential(&address, "secret"));
    }

    #[test]
    fn block_unknown_wallet_returns_false() {
        let directory = WalletDirectory::new();
        assert!(!directory.block(&WalletAddress::from("ghost")));
    }

    #[test]
    fn list_is_sorted_by_address() {
        let directory = WalletDirectory::new();
        directory.register(WalletAddress::from("charlie"), "c");
        directory.register(WalletAddress::from("alice"), "a");
        directory.register(WalletAddress::from("bob"), "b");

        let addresses: Vec<String> = directory
            .list()
            .into_iter()
            .map(|wallet| wallet.address.0)
            .collect();
        assert_eq!(addresses, vec!["alice", "bob", "charlie"]);
    }
}
