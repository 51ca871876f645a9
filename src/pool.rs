//! A fixed-capacity, no-alloc pool of datagram slabs.
//!
//! Each slab reserves [`crate::proto::SLAB_SIZE`] bytes: room for a header,
//! the largest payload, and a trailer. The pool hands out a [`Buffer`]
//! handle (a pool slot index plus a view tag and length) rather than a raw
//! pointer; the handle only becomes meaningful again when indexed back
//! through the pool that issued it. This is the free-standing-array
//! alternative the original design's free-list note explicitly allows, in
//! place of the C original's intrusive free-list stored in the slab's first
//! word.

use heapless::Vec as HVec;

use crate::crc::crc16_usb;
use crate::proto::{self, HEADER_SIZE, SLAB_SIZE, TRAILER_SIZE};

/// Which region of the slab a [`Buffer`] currently addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Addresses the payload bytes only (the view returned by `alloc`).
    #[default]
    Payload,
    /// Addresses the whole framed datagram, header through trailer.
    Frame,
}

/// A handle to a slab owned by a [`BufferPool`].
///
/// Cheap to copy and move; it carries no bytes itself; see the [`BufferPool`]
/// methods to read or write through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Buffer {
    slot: u8,
    view: View,
    len: u8,
}

impl Buffer {
    /// Length of the region currently addressed (payload length, or total frame length).
    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shrinks the payload-view length down to the actual payload size.
    ///
    /// Only meaningful before framing; `n` must be at most [`proto::MAX_PAYLOAD`].
    pub fn set_len(&mut self, n: u8) {
        debug_assert!(self.view == View::Payload);
        debug_assert!((n as usize) <= proto::MAX_PAYLOAD);
        self.len = n;
    }

    pub fn view(&self) -> View {
        self.view
    }
}

pub struct BufferPool<const N: usize> {
    arena: [[u8; SLAB_SIZE]; N],
    free: HVec<u8, N>,
}

impl<const N: usize> BufferPool<N> {
    pub fn new() -> Self {
        let mut free = HVec::new();
        // Reverse order so the first `alloc()` returns the lowest slot index.
        for slot in (0..N as u8).rev() {
            let _ = free.push(slot);
        }

        BufferPool {
            arena: [[0u8; SLAB_SIZE]; N],
            free,
        }
    }

    /// Hands out the payload view of a free slab, or `None` if the pool is exhausted.
    pub fn alloc(&mut self) -> Option<Buffer> {
        let slot = self.free.pop()?;

        Some(Buffer {
            slot,
            view: View::Payload,
            len: proto::MAX_PAYLOAD as u8,
        })
    }

    /// Returns a slab to the pool. `buf` must not be used again afterwards.
    pub fn free(&mut self, buf: Buffer) {
        debug_assert!(!self.free.iter().any(|&s| s == buf.slot));
        let _ = self.free.push(buf.slot);
    }

    /// The payload bytes addressed by `buf` (only valid in [`View::Payload`]).
    pub fn payload(&self, buf: &Buffer) -> &[u8] {
        debug_assert!(buf.view == View::Payload);
        &self.arena[buf.slot as usize][HEADER_SIZE..HEADER_SIZE + buf.len as usize]
    }

    /// Mutable payload bytes addressed by `buf` (only valid in [`View::Payload`]).
    pub fn payload_mut(&mut self, buf: &mut Buffer) -> &mut [u8] {
        debug_assert!(buf.view == View::Payload);
        let len = buf.len as usize;
        &mut self.arena[buf.slot as usize][HEADER_SIZE..HEADER_SIZE + len]
    }

    /// The framed bytes addressed by `buf` (only valid in [`View::Frame`]).
    pub fn frame(&self, buf: &Buffer) -> &[u8] {
        debug_assert!(buf.view == View::Frame);
        &self.arena[buf.slot as usize][0..buf.len as usize]
    }

    /// Writes header and trailer around the payload already sitting in the slab,
    /// computes the CRC over the whole frame, and returns the frame-view handle.
    ///
    /// No payload byte moves: the header is written into the 6 bytes
    /// preceding the payload, and the trailer into the 2 bytes following it,
    /// both already reserved inside the slab.
    pub fn frame_in_place(&mut self, buf: Buffer, port: u8) -> Buffer {
        debug_assert!(buf.view == View::Payload);

        let n = buf.len as usize;
        let total = n + HEADER_SIZE + TRAILER_SIZE;
        let slab = &mut self.arena[buf.slot as usize];

        proto::write_u16_le(&mut slab[0..2], proto::HEADER_MAGIC);
        slab[2] = buf.len;
        slab[3] = port;
        proto::write_u16_le(&mut slab[4..6], 0);

        proto::write_u16_le(&mut slab[HEADER_SIZE + n..HEADER_SIZE + n + TRAILER_SIZE], proto::TRAILER_MAGIC);

        let crc = crc16_usb(&slab[0..total]);
        proto::write_u16_le(&mut slab[4..6], crc);

        Buffer {
            slot: buf.slot,
            view: View::Frame,
            len: total as u8,
        }
    }
}

impl<const N: usize> Default for BufferPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_exhausts_and_frees() {
        let mut pool: BufferPool<2> = BufferPool::new();

        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert!(pool.alloc().is_none());

        pool.free(a);
        assert!(pool.alloc().is_some());
        pool.free(b);
    }

    #[test]
    fn frame_in_place_preserves_payload_bytes() {
        let mut pool: BufferPool<1> = BufferPool::new();
        let mut buf = pool.alloc().unwrap();
        buf.set_len(3);
        pool.payload_mut(&mut buf).copy_from_slice(&[10, 11, 12]);

        let framed = pool.frame_in_place(buf, 7);
        assert_eq!(framed.len(), 11);

        let bytes = pool.frame(&framed);
        assert_eq!(proto::read_u16_le(&bytes[0..2]), proto::HEADER_MAGIC);
        assert_eq!(bytes[2], 3);
        assert_eq!(bytes[3], 7);
        assert_eq!(&bytes[6..9], &[10, 11, 12]);
        assert_eq!(proto::read_u16_le(&bytes[9..11]), proto::TRAILER_MAGIC);
    }
}
