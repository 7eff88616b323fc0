#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use quest_ledger::Accounts;
use quest_ledger::store::{MemoryStore, Store};

/// A clock tests can move by hand.
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn at(rfc3339: &str) -> Self {
        Self(Arc::new(Mutex::new(rfc3339.parse().unwrap())))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn set(&self, rfc3339: &str) {
        *self.0.lock().unwrap() = rfc3339.parse().unwrap();
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

pub fn accounts_on(store: Arc<dyn Store>, clock: &TestClock, win: bool) -> Accounts {
    let clock = clock.clone();
    Accounts::new(store)
        .with_clock(move || clock.now())
        .with_coin(move || win)
}

pub fn accounts(clock: &TestClock) -> Accounts {
    accounts_on(Arc::new(MemoryStore::new()), clock, true)
}
