//! Wire format constants and byte-level (de)serialization helpers.
//!
//! The frame is little-endian, packed, with no padding:
//! `[magic:u16][size:u8][port:u8][crc:u16] payload[size] [magic:u16]`.

/// Header magic, sent first on the wire.
pub const HEADER_MAGIC: u16 = 0xA357;
/// Trailer magic, sent last on the wire.
pub const TRAILER_MAGIC: u16 = 0xC69B;

/// Header size in bytes: magic(2) + size(1) + port(1) + crc(2).
pub const HEADER_SIZE: usize = 6;
/// Trailer size in bytes: magic(2).
pub const TRAILER_SIZE: usize = 2;

/// Largest payload a single datagram may carry.
pub const MAX_PAYLOAD: usize = 56;

/// Largest possible on-wire frame: header + max payload + trailer.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + TRAILER_SIZE;
/// Smallest possible on-wire frame: an empty-payload datagram.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// Every pool slab reserves exactly this many bytes: header + max payload + trailer.
pub const SLAB_SIZE: usize = MAX_FRAME_SIZE;

/// Port value meaning "no registration"; must never be a valid destination on the wire.
pub const RESERVED_PORT: u8 = 0xFF;

const _: () = assert!(HEADER_SIZE == 6);
const _: () = assert!(TRAILER_SIZE == 2);
const _: () = assert!(SLAB_SIZE == 64);

/// Reads a little-endian `u16` out of the first two bytes of `buf`.
#[inline]
pub fn read_u16_le(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

/// Writes `val` as little-endian bytes into the first two bytes of `buf`.
#[inline]
pub fn write_u16_le(buf: &mut [u8], val: u16) {
    buf[0..2].copy_from_slice(&val.to_le_bytes());
}

/// A view onto the header fields of a frame that has already been fully received.
pub struct HeaderView<'a> {
    bytes: &'a [u8],
}

impl<'a> HeaderView<'a> {
    /// `bytes` must be at least `HEADER_SIZE` long.
    pub fn new(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() >= HEADER_SIZE);
        HeaderView { bytes }
    }

    pub fn magic(&self) -> u16 {
        read_u16_le(&self.bytes[0..2])
    }

    pub fn size(&self) -> u8 {
        self.bytes[2]
    }

    pub fn port(&self) -> u8 {
        self.bytes[3]
    }

    pub fn crc(&self) -> u16 {
        read_u16_le(&self.bytes[4..6])
    }
}

/// Total on-wire frame length implied by a payload `size` byte.
#[inline]
pub fn total_frame_size(size: u8) -> usize {
    size as usize + HEADER_SIZE + TRAILER_SIZE
}
