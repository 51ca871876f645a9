//! Datagram-to-stream framing and partial-write resumption.
//!
//! Grounded in the original implementation's `sdgram_sender.h`: frame
//! in-place in the buffer the user already holds, attempt an immediate
//! drain, and fall back to a bounded queue of in-flight frames when the
//! stream's write window is smaller than the frame.

use log::{debug, trace};

use crate::interface::Stream;
use crate::pool::{Buffer, BufferPool};
use crate::queue::StaticQueue;
use crate::Status;

pub struct Sender<const N: usize> {
    queued: StaticQueue<Buffer, N>,
    written: u16,
}

impl<const N: usize> Sender<N> {
    pub fn new() -> Self {
        Sender {
            queued: StaticQueue::new(),
            written: 0,
        }
    }

    /// Frames `buf` for `port`, then attempts an immediate send. Always
    /// succeeds from the caller's point of view: ownership of `buf` passes
    /// to the sender regardless of how much of the frame made it to the
    /// stream this call.
    pub fn send<S: Stream, const P: usize>(
        &mut self,
        pool: &mut BufferPool<P>,
        stream: &mut S,
        port: u8,
        buf: Buffer,
    ) -> Status {
        let framed = pool.frame_in_place(buf, port);
        self.send_prepared(pool, stream, framed);
        Status::Success
    }

    /// Framing only, no transmission. Lets a caller hand a pre-framed
    /// buffer to [`Sender::send_prepared`] separately.
    pub fn prepare<const P: usize>(&self, pool: &mut BufferPool<P>, port: u8, buf: Buffer) -> Buffer {
        pool.frame_in_place(buf, port)
    }

    /// Transmits an already-framed buffer, queueing the remainder if the
    /// stream can't take it all right now.
    pub fn send_prepared<S: Stream, const P: usize>(
        &mut self,
        pool: &mut BufferPool<P>,
        stream: &mut S,
        buf: Buffer,
    ) -> Status {
        if !self.queued.is_empty() {
            if self.queued.is_full() {
                return Status::NoMoreSpace;
            }

            self.queued.push(buf);
            return Status::Success;
        }

        let available = stream.available_for_write() as usize;
        let total = buf.len() as usize;

        let written = {
            let frame = pool.frame(&buf);
            let to_write = total.min(available);
            stream.write(&frame[0..to_write]) as usize
        };

        if written == total {
            trace!(target: "sdgram::sender", "wrote {} bytes in one shot", written);
            pool.free(buf);
        } else {
            debug!(target: "sdgram::sender", "partial write {}/{}, queueing", written, total);
            self.written = written as u16;
            self.queued.push(buf);
        }

        Status::Success
    }

    /// Drains as much of the queue as the stream currently allows.
    pub fn process<S: Stream, const P: usize>(&mut self, pool: &mut BufferPool<P>, stream: &mut S) {
        while !self.queued.is_empty() {
            if !self.write_data(pool, stream) {
                break;
            }
        }
    }

    /// Writes more of the head-of-queue frame. Returns `true` if progress
    /// was made (so the caller should keep looping), `false` if the stream
    /// has no room right now.
    fn write_data<S: Stream, const P: usize>(&mut self, pool: &mut BufferPool<P>, stream: &mut S) -> bool {
        let available = stream.available_for_write() as usize;
        if available == 0 {
            return false;
        }

        let buf = self.queued.peek();
        let total = buf.len() as usize;
        let offset = self.written as usize;
        let left = total - offset;
        let to_write = left.min(available);

        let written = {
            let frame = pool.frame(&buf);
            stream.write(&frame[offset..offset + to_write]) as usize
        };

        if written == 0 {
            return false;
        }

        if offset + written == total {
            self.written = 0;
            self.queued.pop();
            pool.free(buf);
        } else {
            self.written += written as u16;
        }

        true
    }
}

impl<const N: usize> Default for Sender<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto;

    struct MemStream {
        out: Vec<u8>,
        write_window: usize,
    }

    impl MemStream {
        fn unbounded() -> Self {
            MemStream { out: Vec::new(), write_window: usize::MAX }
        }

        fn bounded(write_window: usize) -> Self {
            MemStream { out: Vec::new(), write_window }
        }
    }

    impl Stream for MemStream {
        fn available(&mut self) -> u16 {
            0
        }

        fn read(&mut self) -> u8 {
            unreachable!("sender tests never read")
        }

        fn available_for_write(&mut self) -> u16 {
            self.write_window.min(u16::MAX as usize) as u16
        }

        fn write(&mut self, bytes: &[u8]) -> u16 {
            let n = bytes.len().min(self.write_window);
            self.out.extend_from_slice(&bytes[0..n]);
            self.write_window -= n;
            n as u16
        }
    }

    fn alloc_payload<const P: usize>(pool: &mut BufferPool<P>, bytes: &[u8]) -> Buffer {
        let mut buf = pool.alloc().unwrap();
        buf.set_len(bytes.len() as u8);
        pool.payload_mut(&mut buf).copy_from_slice(bytes);
        buf
    }

    #[test]
    fn send_writes_whole_frame_immediately() {
        let mut pool: BufferPool<4> = BufferPool::new();
        let mut sender: Sender<4> = Sender::new();
        let mut stream = MemStream::unbounded();

        let buf = alloc_payload(&mut pool, &[1, 2, 3]);
        let status = sender.send(&mut pool, &mut stream, 7, buf);

        assert!(matches!(status, Status::Success));
        assert_eq!(stream.out.len(), 3 + proto::HEADER_SIZE + proto::TRAILER_SIZE);
        assert!(pool.alloc().is_some()); // the slab came back
    }

    #[test]
    fn partial_write_resumes_on_process() {
        let mut pool: BufferPool<4> = BufferPool::new();
        let mut sender: Sender<4> = Sender::new();

        let payload = [1u8, 2, 3, 4, 5];
        let total = payload.len() + proto::HEADER_SIZE + proto::TRAILER_SIZE;

        let mut stream = MemStream::bounded(4);
        let buf = alloc_payload(&mut pool, &payload);
        sender.send(&mut pool, &mut stream, 1, buf);
        assert_eq!(stream.out.len(), 4);

        stream.write_window = total; // unblock
        sender.process(&mut pool, &mut stream);

        assert_eq!(stream.out.len(), total);
    }

    #[test]
    fn send_prepared_queues_when_busy() {
        let mut pool: BufferPool<4> = BufferPool::new();
        let mut sender: Sender<4> = Sender::new();
        let mut stream = MemStream::bounded(0);

        let first = alloc_payload(&mut pool, &[1, 2, 3]);
        sender.send(&mut pool, &mut stream, 1, first);

        let second = alloc_payload(&mut pool, &[4, 5]);
        let framed = sender.prepare(&mut pool, 2, second);
        let status = sender.send_prepared(&mut pool, &mut stream, framed);
        assert!(matches!(status, Status::Success));
    }

    #[test]
    fn pool_exhaustion_enforces_backpressure_before_queue_ever_fills() {
        let mut pool: BufferPool<2> = BufferPool::new();
        let mut sender: Sender<2> = Sender::new();
        let mut stream = MemStream::bounded(0);

        let a = alloc_payload(&mut pool, &[1]);
        sender.send(&mut pool, &mut stream, 1, a);
        let b = alloc_payload(&mut pool, &[2]);
        sender.send(&mut pool, &mut stream, 2, b);

        // Pool is now exhausted (both slabs queued); a third send can't even
        // allocate, matching the backpressure invariant (fifo cap == pool cap).
        assert!(pool.alloc().is_none());
    }

    #[test]
    fn multiple_queued_frames_drain_in_order() {
        let mut pool: BufferPool<4> = BufferPool::new();
        let mut sender: Sender<4> = Sender::new();
        let mut stream = MemStream::bounded(0);

        for i in 0..3u8 {
            let buf = alloc_payload(&mut pool, &[i]);
            sender.send(&mut pool, &mut stream, i, buf);
        }

        stream.write_window = 1024;
        sender.process(&mut pool, &mut stream);

        // Three ports (0,1,2) each contribute a byte at offset HEADER_SIZE+1(port)... just check total length matches 3 frames.
        let per_frame = 1 + proto::HEADER_SIZE + proto::TRAILER_SIZE;
        assert_eq!(stream.out.len(), per_frame * 3);
        assert!(pool.alloc().is_some());
    }
}
