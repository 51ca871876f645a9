//! Maps a logical port to a registered handler.
//!
//! Grounded in the original implementation's `sdgram_rcv_table.h`: a linear
//! scan over a fixed-size array of `{port, handler}` slots, with the
//! reserved port value marking an empty slot.

use crate::proto::RESERVED_PORT;
use crate::Status;

/// Receives datagrams delivered to a registered port.
///
/// The payload slice is only valid for the duration of the call; implementors
/// must copy out anything they need to keep.
pub trait PortHandler {
    fn process_msg(&self, payload: &[u8]);
}

struct Entry<'a> {
    port: u8,
    handler: Option<&'a dyn PortHandler>,
}

impl<'a> Default for Entry<'a> {
    fn default() -> Self {
        Entry {
            port: RESERVED_PORT,
            handler: None,
        }
    }
}

pub struct ReceiverTable<'a, const N: usize> {
    entries: [Entry<'a>; N],
}

impl<'a, const N: usize> ReceiverTable<'a, N> {
    pub fn new() -> Self {
        ReceiverTable {
            entries: core::array::from_fn(|_| Entry::default()),
        }
    }

    /// Registers `handler` for `port`.
    ///
    /// Rejects the reserved port outright, then a duplicate registration,
    /// then a full table, in that order.
    pub fn register(&mut self, port: u8, handler: &'a dyn PortHandler) -> Status {
        if port == RESERVED_PORT {
            return Status::Failure;
        }

        if self.entries.iter().any(|e| e.port == port) {
            return Status::Duplicate;
        }

        match self.entries.iter_mut().find(|e| e.port == RESERVED_PORT) {
            Some(slot) => {
                slot.port = port;
                slot.handler = Some(handler);
                Status::Success
            }
            None => Status::NoMoreSpace,
        }
    }

    /// Delivers `payload` to the handler registered for `port`, if any.
    pub fn deliver(&self, port: u8, payload: &[u8]) -> Status {
        match self.entries.iter().find(|e| e.port == port) {
            Some(entry) => {
                if let Some(handler) = entry.handler {
                    handler.process_msg(payload);
                }
                Status::Success
            }
            None => Status::NoReceiver,
        }
    }
}

impl<'a, const N: usize> Default for ReceiverTable<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}
