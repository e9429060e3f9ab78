// src/ledger.rs

// the per-relay map of sender -> active inbound flow rate

// dependencies
use crate::address::Address;
use crate::errors::RelayError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Flow rate in the asset's smallest unit per second.
pub type FlowRate = u64;

/// Active inbound flows keyed by sender, plus their running sum.
///
/// An entry exists only while its rate is non-zero. The host serializes
/// callbacks, so mutations never interleave; `total` is kept next to the
/// entries rather than recomputed on every read.
#[derive(Debug, Default)]
pub(crate) struct FlowLedger {
    entries: DashMap<Address, FlowRate>,
    total: AtomicU64,
}

/// Point-in-time copy of a ledger, restored when a host transaction fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LedgerSnapshot {
    entries: Vec<(Address, FlowRate)>,
    total: FlowRate,
}

impl FlowLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rate currently recorded for `sender`, zero when absent.
    pub(crate) fn rate_of(&self, sender: &Address) -> FlowRate {
        self.entries
            .get(sender)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    /// Sum of all recorded rates.
    pub(crate) fn total(&self) -> FlowRate {
        self.total.load(Ordering::Acquire)
    }

    /// Senders with an open entry, in address order.
    pub(crate) fn senders(&self) -> Vec<Address> {
        let mut senders: Vec<Address> = self.entries.iter().map(|entry| *entry.key()).collect();
        senders.sort();
        senders
    }

    /// The aggregate that would result from setting `sender` to `rate`.
    /// Nothing is written.
    pub(crate) fn projected_total(&self, sender: &Address, rate: FlowRate) -> Result<FlowRate, RelayError> {
        let previous = self.rate_of(sender);
        let total = self.total();
        total
            .checked_sub(previous)
            .ok_or(RelayError::LedgerCorrupted {
                sender: *sender,
                rate: previous,
                total,
            })?
            .checked_add(rate)
            .ok_or(RelayError::RateOverflow)
    }

    /// Set `sender` to `rate` and return the new aggregate.
    /// A zero rate removes the entry.
    pub(crate) fn record(&self, sender: Address, rate: FlowRate) -> Result<FlowRate, RelayError> {
        let total = self.projected_total(&sender, rate)?;
        if rate == 0 {
            self.entries.remove(&sender);
        } else {
            self.entries.insert(sender, rate);
        }
        self.total.store(total, Ordering::Release);
        Ok(total)
    }

    /// Remove `sender` and return the rate it held (zero when absent).
    pub(crate) fn remove(&self, sender: &Address) -> Result<FlowRate, RelayError> {
        let rate = self.rate_of(sender);
        self.record(*sender, 0)?;
        Ok(rate)
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: self
                .entries
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
            total: self.total(),
        }
    }

    /// Replace every entry and the total with the snapshot's.
    pub(crate) fn restore(&self, snapshot: LedgerSnapshot) {
        self.entries.clear();
        for (sender, rate) in snapshot.entries {
            self.entries.insert(sender, rate);
        }
        self.total.store(snapshot.total, Ordering::Release);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, sender: &Address) -> bool {
        self.entries.contains_key(sender)
    }
}
