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

//! Concurrency tests for the money-movement engine.
//!
//! These verify the per-row serialization guarantees under contention and
//! use parking_lot's `deadlock_detection` feature to prove that the ordered
//! two-row locking in conversions and transfers cannot cycle.

use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use wallet_ledger::{
    CurrencyCode, EngineError, FeeSchedule, FixedRateOracle, WalletAddress, WalletDirectory,
    WalletEngine,
};

type TestEngine = WalletEngine<Arc<WalletDirectory>, Arc<FixedRateOracle>>;

const KEY: &str = "key";

fn engine_with_wallets(addresses: &[&str], fees: FeeSchedule) -> (Arc<TestEngine>, Arc<FixedRateOracle>) {
    let wallets = Arc::new(WalletDirectory::new());
    for address in addresses {
        wallets.register(WalletAddress::from(*address), KEY);
    }
    let oracle = Arc::new(FixedRateOracle::new());
    let engine = Arc::new(WalletEngine::new(wallets, Arc::clone(&oracle), fees));
    (engine, oracle)
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// N concurrent withdrawals of the full balance: exactly one passes the
/// sufficiency check, the rest fail, and the final balance is zero.
#[test]
fn concurrent_full_withdrawals_allow_exactly_one_success() {
    const N: usize = 16;

    let (engine, _) = engine_with_wallets(&["w1"], FeeSchedule::zero());
    let wallet = WalletAddress::from("w1");
    let brl = CurrencyCode::from("BRL");
    let balance = dec!(1000);
    engine.deposit(&wallet, &brl, balance).unwrap();

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let engine = Arc::clone(&engine);
        let wallet = wallet.clone();
        let brl = brl.clone();
        handles.push(thread::spawn(move || {
            engine.withdraw(&wallet, &brl, balance, KEY)
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let failures = results
        .iter()
        .filter(|r| **r == Err(EngineError::InsufficientFunds))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(failures, N - 1);
    assert_eq!(engine.balance(&wallet, &brl), Decimal::ZERO);
    // One deposit + one successful withdrawal in the ledger.
    assert_eq!(engine.ledger_len(), 2);
}

/// Partial concurrent withdrawals never overdraw: the successes sum to at
/// most the starting balance and the row never goes negative.
#[test]
fn concurrent_partial_withdrawals_never_overdraw() {
    const N: usize = 40;

    let (engine, _) = engine_with_wallets(&["w1"], FeeSchedule::zero());
    let wallet = WalletAddress::from("w1");
    let brl = CurrencyCode::from("BRL");
    // Enough for 25 of the 40 attempted withdrawals of 4 each.
    engine.deposit(&wallet, &brl, dec!(100)).unwrap();

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let engine = Arc::clone(&engine);
        let wallet = wallet.clone();
        let brl = brl.clone();
        handles.push(thread::spawn(move || {
            engine.withdraw(&wallet, &brl, dec!(4), KEY).is_ok()
        }));
    }

    let successes = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 25);
    assert_eq!(engine.balance(&wallet, &brl), Decimal::ZERO);
}

/// Concurrent deposits across many wallets all land.
#[test]
fn concurrent_deposits_sum_exactly() {
    const THREADS: usize = 20;
    const DEPOSITS_PER_THREAD: usize = 50;

    let (engine, _) = engine_with_wallets(&["w1", "w2", "w3", "w4"], FeeSchedule::zero());
    let brl = CurrencyCode::from("BRL");

    let mut handles = Vec::with_capacity(THREADS);
    for thread_id in 0..THREADS {
        let engine = Arc::clone(&engine);
        let brl = brl.clone();
        handles.push(thread::spawn(move || {
            for i in 0..DEPOSITS_PER_THREAD {
                let wallet = WalletAddress::from(["w1", "w2", "w3", "w4"][(thread_id + i) % 4]);
                engine.deposit(&wallet, &brl, dec!(1)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let total: Decimal = ["w1", "w2", "w3", "w4"]
        .iter()
        .map(|w| engine.balance(&WalletAddress::from(*w), &brl))
        .sum();
    assert_eq!(total, Decimal::from(THREADS * DEPOSITS_PER_THREAD));
    assert_eq!(engine.ledger_len(), THREADS * DEPOSITS_PER_THREAD);
}

/// Opposite-direction transfers between the same pair of wallets: the
/// ordered two-row locking must not deadlock, and the combined funds are
/// conserved (fees are zero here).
#[test]
fn no_deadlock_opposite_direction_transfers() {
    const ROUNDS: usize = 500;

    let detector = start_deadlock_detector();
    let (engine, _) = engine_with_wallets(&["alice", "bob"], FeeSchedule::zero());
    let usd = CurrencyCode::from("USD");
    let alice = WalletAddress::from("alice");
    let bob = WalletAddress::from("bob");

    engine.deposit(&alice, &usd, dec!(10000)).unwrap();
    engine.deposit(&bob, &usd, dec!(10000)).unwrap();

    let forward = {
        let engine = Arc::clone(&engine);
        let (alice, bob, usd) = (alice.clone(), bob.clone(), usd.clone());
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                let _ = engine.transfer(&alice, &bob, &usd, dec!(3), KEY);
            }
        })
    };
    let backward = {
        let engine = Arc::clone(&engine);
        let (alice, bob, usd) = (alice.clone(), bob.clone(), usd.clone());
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                let _ = engine.transfer(&bob, &alice, &usd, dec!(5), KEY);
            }
        })
    };

    forward.join().expect("Thread panicked");
    backward.join().expect("Thread panicked");

    stop_deadlock_detector(detector);

    let total = engine.balance(&alice, &usd) + engine.balance(&bob, &usd);
    assert_eq!(total, dec!(20000));
    assert!(engine.balance(&alice, &usd) >= Decimal::ZERO);
    assert!(engine.balance(&bob, &usd) >= Decimal::ZERO);
}

/// Mixed conversions and transfers touching overlapping rows.
#[test]
fn no_deadlock_mixed_conversions_and_transfers() {
    const THREADS: usize = 16;
    const OPS_PER_THREAD: usize = 100;

    let detector = start_deadlock_detector();
    let (engine, oracle) = engine_with_wallets(&["alice", "bob"], FeeSchedule::zero());
    oracle.set_rate("USD", "BRL", dec!(5));
    oracle.set_rate("BRL", "USD", dec!(0.2));

    let usd = CurrencyCode::from("USD");
    let brl = CurrencyCode::from("BRL");
    let alice = WalletAddress::from("alice");
    let bob = WalletAddress::from("bob");

    engine.deposit(&alice, &usd, dec!(100000)).unwrap();
    engine.deposit(&bob, &brl, dec!(100000)).unwrap();

    let mut handles = Vec::with_capacity(THREADS);
    for thread_id in 0..THREADS {
        let engine = Arc::clone(&engine);
        let (alice, bob, usd, brl) = (alice.clone(), bob.clone(), usd.clone(), brl.clone());
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match (thread_id + i) % 4 {
                    0 => {
                        let _ = engine.convert(&alice, &usd, &brl, dec!(1), KEY);
                    }
                    1 => {
                        let _ = engine.convert(&bob, &brl, &usd, dec!(1), KEY);
                    }
                    2 => {
                        let _ = engine.transfer(&alice, &bob, &usd, dec!(1), KEY);
                    }
                    _ => {
                        let _ = engine.transfer(&bob, &alice, &brl, dec!(1), KEY);
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Nothing overdrawn anywhere.
    for wallet in [&alice, &bob] {
        for currency in [&usd, &brl] {
            assert!(engine.balance(wallet, currency) >= Decimal::ZERO);
        }
    }
}

/// Reads are stable while no operation runs in between.
#[test]
fn repeated_reads_are_idempotent() {
    let (engine, _) = engine_with_wallets(&["w1"], FeeSchedule::default());
    let wallet = WalletAddress::from("w1");
    let brl = CurrencyCode::from("BRL");
    engine.deposit(&wallet, &brl, dec!(42.42)).unwrap();

    let first = engine.balance(&wallet, &brl);
    for _ in 0..100 {
        assert_eq!(engine.balance(&wallet, &brl), first);
    }
}
