//! The byte-stream collaborator this crate frames datagrams over.

/// Non-blocking, side-effect-free-beyond-byte-transfer access to the
/// underlying link. Implementations back onto a UART, a socket, an
/// in-memory test double, or anything else that can report how many bytes
/// it can move right now.
pub trait Stream {
    /// Bytes readable right now.
    fn available(&mut self) -> u16;

    /// Consumes one byte. Callable up to `available()` times without blocking.
    fn read(&mut self) -> u8;

    /// Bytes the stream can currently accept without blocking.
    fn available_for_write(&mut self) -> u16;

    /// Enqueues up to `bytes.len()` bytes; returns the number actually accepted.
    fn write(&mut self, bytes: &[u8]) -> u16;
}
