//! Module: notify
//! Responsibility: coalesced, cancellable change notification scheduling.
//!
//! Time is read from an injectable `Clock`. Each key holds at most one pending
//! task; a second schedule before delivery is a no-op.

use std::{
    cell::Cell,
    collections::BTreeMap,
    fmt,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// Clock
///

pub trait Clock {
    /// Current time in ticks.
    fn now(&self) -> u64;

    /// Step the clock forward. Wall clocks ignore this.
    fn advance(&self, _ticks: u64) {}
}

///
/// ManualClock
///
/// Test clock that only moves when advanced.
///

#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }

    fn advance(&self, ticks: u64) {
        self.now.set(self.now.get().saturating_add(ticks));
    }
}

///
/// SystemClock
///
/// Milliseconds since the Unix epoch.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}

///
/// ChangeScheduler
///
/// Single-shot pending tasks keyed by `K`, each due at schedule time plus
/// `delay`.
///

pub struct ChangeScheduler<K> {
    clock: Rc<dyn Clock>,
    delay: u64,
    pending: BTreeMap<K, u64>,
}

impl<K: Clone + Ord> ChangeScheduler<K> {
    #[must_use]
    pub fn new(clock: Rc<dyn Clock>, delay: u64) -> Self {
        Self {
            clock,
            delay,
            pending: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    /// Schedule a task for `key`. Returns false when one is already pending.
    pub fn schedule(&mut self, key: K) -> bool {
        if self.pending.contains_key(&key) {
            return false;
        }

        let due = self.clock.now().saturating_add(self.delay);
        self.pending.insert(key, due);

        true
    }

    /// Cancel the pending task for `key`, if any.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Remove and return every task due at the current time, earliest first.
    pub fn take_due(&mut self) -> Vec<K> {
        let now = self.clock.now();
        let mut due: Vec<(u64, K)> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, key.clone()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, key) in &due {
            self.pending.remove(key);
        }

        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Remove and return every pending task regardless of due time.
    pub fn take_all(&mut self) -> Vec<K> {
        let mut all: Vec<(u64, K)> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(key, at)| (at, key))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        all.into_iter().map(|(_, key)| key).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: fmt::Debug> fmt::Debug for ChangeScheduler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeScheduler")
            .field("delay", &self.delay)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

///
/// TESTS
///
