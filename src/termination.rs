// src/termination.rs

// handoff between the before/after halves of a flow termination

// dependencies
use crate::address::Address;
use crate::ledger::FlowRate;
use parking_lot::Mutex;

/// Single-slot cache written by the before-terminate callback and consumed
/// by the after-terminate callback of the same close.
///
/// The ledger entry stays authoritative for the decrement. The captured rate
/// is compared against it to detect a ledger that changed between the two
/// halves of one close. A later before-terminate overwrites whatever an
/// unmatched earlier one left.
#[derive(Debug, Default)]
pub(crate) struct TerminationStash {
    slot: Mutex<Option<(Address, FlowRate)>>,
}

impl TerminationStash {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn capture(&self, sender: Address, rate: FlowRate) {
        *self.slot.lock() = Some((sender, rate));
    }

    /// Take the captured rate if it belongs to `sender`; a slot held for
    /// another sender is left in place.
    pub(crate) fn take_for(&self, sender: &Address) -> Option<FlowRate> {
        let mut slot = self.slot.lock();
        match *slot {
            Some((captured, rate)) if captured == *sender => {
                *slot = None;
                Some(rate)
            }
            _ => None,
        }
    }

    pub(crate) fn slot(&self) -> Option<(Address, FlowRate)> {
        *self.slot.lock()
    }

    pub(crate) fn restore(&self, slot: Option<(Address, FlowRate)>) {
        *self.slot.lock() = slot;
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}
