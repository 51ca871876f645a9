//! A static, no-alloc datagram framing layer over a byte-oriented serial stream.
//!
//! Each datagram carries an 8-bit logical port and an opaque payload of up
//! to [`MAX_PAYLOAD`] bytes. The crate turns a [`Stream`] that can only
//! offer non-blocking, possibly-partial reads and writes into a reliable,
//! message-oriented channel: the receiver resynchronises on header/trailer
//! magic and CRC-16 after any combination of truncated, duplicated, or
//! corrupted bytes, and the sender frames a user's buffer in place and
//! resumes partial writes without re-sending already-sent bytes. There is
//! no retransmission, no acknowledgement, and no dynamic allocation;
//! everything is backed by arrays sized at compile time through
//! [`Facade`]'s const generic parameters.
//!
//! ## Example
//! ```
//! use sdgram::{Facade, Stream, PortHandler};
//! use std::cell::RefCell;
//! use std::collections::VecDeque;
//!
//! struct MemStream {
//!     rx: VecDeque<u8>,
//!     tx: VecDeque<u8>,
//! }
//!
//! impl Stream for MemStream {
//!     fn available(&mut self) -> u16 {
//!         self.rx.len() as u16
//!     }
//!     fn read(&mut self) -> u8 {
//!         self.rx.pop_front().unwrap()
//!     }
//!     fn available_for_write(&mut self) -> u16 {
//!         u16::MAX
//!     }
//!     fn write(&mut self, bytes: &[u8]) -> u16 {
//!         self.tx.extend(bytes.iter().copied());
//!         bytes.len() as u16
//!     }
//! }
//!
//! struct Printer {
//!     seen: RefCell<Vec<u8>>,
//! }
//!
//! impl PortHandler for Printer {
//!     fn process_msg(&self, payload: &[u8]) {
//!         self.seen.borrow_mut().extend_from_slice(payload);
//!     }
//! }
//!
//! let printer = Printer { seen: RefCell::new(Vec::new()) };
//! let mut facade: Facade<_, 4, 4> = Facade::new(MemStream { rx: VecDeque::new(), tx: VecDeque::new() });
//! assert!(matches!(facade.register_receiver(1, &printer), sdgram::Status::Success));
//!
//! let mut buf = facade.alloc_buffer().unwrap();
//! facade.payload_mut(&mut buf)[0..3].copy_from_slice(&[10, 11, 12]);
//! buf.set_len(3);
//! facade.send(1, buf);
//! facade.process();
//!
//! // Loop the sender's output back into the receiver's input and tick again.
//! let bytes: Vec<u8> = facade.stream_mut().tx.drain(..).collect();
//! facade.stream_mut().rx.extend(bytes);
//! facade.process();
//!
//! assert_eq!(*printer.seen.borrow(), vec![10, 11, 12]);
//! ```

mod crc;
mod interface;
mod pool;
mod proto;
mod queue;
mod receiver;
mod sender;
mod table;

pub use interface::Stream;
pub use pool::Buffer;
pub use proto::{MAX_PAYLOAD, RESERVED_PORT};
pub use receiver::RcvStats;
pub use table::PortHandler;

use pool::BufferPool;
use receiver::Receiver;
use sender::Sender;
use table::ReceiverTable;

/// Default slab count (`slab_count` in the original design's compile-time parameters).
pub const DEFAULT_SLAB_COUNT: usize = 4;
/// Default receiver table capacity (`max_receivers`).
pub const DEFAULT_MAX_RECEIVERS: usize = 4;

/// The flat result/error enumeration shared by every fallible operation in
/// this crate. There is no wrapping error type: the surface is small and
/// closed enough that callers are expected to match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Operation completed.
    Success,
    /// Port already registered.
    Duplicate,
    /// Receiver table full, or send queue full with the buffer returned to the caller.
    NoMoreSpace,
    /// Incoming datagram addressed a port with no registered handler.
    NoReceiver,
    /// Reserved-port registration attempt, or another unspecified rejection.
    Failure,
}

/// Ties the buffer pool, receiver table, receiver, and sender to a single
/// [`Stream`], and drives them with one cooperative [`Facade::process`] tick.
///
/// `SLAB_COUNT` sizes both the buffer pool and the send FIFO (they share a
/// capacity by the backpressure invariant in the module docs); `MAX_RECEIVERS`
/// sizes the receiver table.
pub struct Facade<'a, S, const SLAB_COUNT: usize = DEFAULT_SLAB_COUNT, const MAX_RECEIVERS: usize = DEFAULT_MAX_RECEIVERS> {
    stream: S,
    pool: BufferPool<SLAB_COUNT>,
    table: ReceiverTable<'a, MAX_RECEIVERS>,
    receiver: Receiver,
    sender: Sender<SLAB_COUNT>,
}

impl<'a, S: Stream, const SLAB_COUNT: usize, const MAX_RECEIVERS: usize> Facade<'a, S, SLAB_COUNT, MAX_RECEIVERS> {
    pub fn new(stream: S) -> Self {
        Facade {
            stream,
            pool: BufferPool::new(),
            table: ReceiverTable::new(),
            receiver: Receiver::new(),
            sender: Sender::new(),
        }
    }

    /// Registers `handler` to receive datagrams addressed to `port`.
    pub fn register_receiver(&mut self, port: u8, handler: &'a dyn PortHandler) -> Status {
        self.table.register(port, handler)
    }

    /// Borrows a free slab from the pool as a payload-view [`Buffer`], or
    /// `None` if the pool is exhausted.
    pub fn alloc_buffer(&mut self) -> Option<Buffer> {
        self.pool.alloc()
    }

    /// Mutable payload bytes addressed by `buf`. Only valid before framing.
    pub fn payload_mut(&mut self, buf: &mut Buffer) -> &mut [u8] {
        self.pool.payload_mut(buf)
    }

    /// Frames `buf` for `port` and attempts an immediate send, queueing any
    /// unwritten tail. Always returns `Success`; the buffer is owned by the
    /// sender from this call onward regardless of how much reached the stream.
    pub fn send(&mut self, port: u8, buf: Buffer) -> Status {
        self.sender.send(&mut self.pool, &mut self.stream, port, buf)
    }

    /// Frames `buf` for `port` without transmitting it.
    pub fn prepare(&mut self, port: u8, buf: Buffer) -> Buffer {
        self.sender.prepare(&mut self.pool, port, buf)
    }

    /// Transmits an already-framed buffer, queueing the remainder if the
    /// stream can't take it all right now.
    pub fn send_prepared(&mut self, buf: Buffer) -> Status {
        self.sender.send_prepared(&mut self.pool, &mut self.stream, buf)
    }

    /// One cooperative tick: drains any bytes the stream currently has
    /// through the receiver (dispatching completed datagrams synchronously),
    /// then drains any bytes the sender still owes the stream.
    pub fn process(&mut self) {
        self.receiver.process(&mut self.stream, &self.table);
        self.sender.process(&mut self.pool, &mut self.stream);
    }

    pub fn rcv_stats(&self) -> &RcvStats {
        self.receiver.stats()
    }

    pub fn clear_rcv_stats(&mut self) {
        self.receiver.clear_stats();
    }

    /// Direct access to the underlying stream, mainly useful for tests that
    /// need to inspect or splice bytes between two facades sharing a loopback.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}
