//! Ready-made [`TraceSink`] implementations.

use std::collections::VecDeque;

use log::trace;

use crate::api::{TraceEvent, TraceSink};
use crate::encoding::Mnemonic;
use crate::word::Address;

/// Default number of entries kept by [`InstructionHistory`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// One retired instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryEntry {
    /// Fetch address.
    pub pc: Address,
    /// Raw encoding.
    pub raw: u16,
    /// Mnemonic.
    pub mnemonic: Mnemonic,
}

/// Bounded record of the most recently retired instructions, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for InstructionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl InstructionHistory {
    /// Creates a history that keeps at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Recorded entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TraceSink for InstructionHistory {
    fn on_event(&mut self, event: TraceEvent) {
        if let TraceEvent::InstructionRetired {
            pc, raw, mnemonic, ..
        } = event
        {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(HistoryEntry { pc, raw, mnemonic });
        }
    }
}

/// Forwards every event to `log::trace!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionRetired {
                pc,
                raw,
                mnemonic,
                cycles,
                accumulator,
                carry,
            } => trace!(
                "{pc}: {mnemonic} ({raw:04X}) cycles={cycles} acc={accumulator} cy={}",
                u8::from(carry)
            ),
            TraceEvent::ReturnAddressEvicted { address } => {
                trace!("return address {address} evicted");
            }
            TraceEvent::FaultRaised { cause, pc } => trace!("{pc}: fault {cause:?}"),
        }
    }
}
