//! Stream-to-datagram resynchronisation state machine.
//!
//! Grounded in the original implementation's `sdgram_receiver.h`: a
//! byte-at-a-time reader feeding a two-state machine (`SearchStart` /
//! `SearchEnd`) over one scratch buffer, with recovery that re-scans from
//! just past a stale header magic rather than discarding everything.

use log::{debug, trace, warn};

use crate::crc::crc16_usb;
use crate::interface::Stream;
use crate::proto::{self, HeaderView, HEADER_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE, TRAILER_SIZE};
use crate::table::ReceiverTable;
use crate::Status;

/// Receive-side counters. All fields saturate at `u16::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RcvStats {
    pub msgs: u16,
    pub bytes: u16,
    pub dropped_bytes: u16,
    pub crc_error: u16,
    pub trl_error: u16,
    pub size_error: u16,
    pub rcv_error: u16,
}

impl RcvStats {
    pub fn clear(&mut self) {
        *self = RcvStats::default();
    }

    fn add_msg(&mut self, total: usize) {
        self.msgs = self.msgs.saturating_add(1);
        self.bytes = self.bytes.saturating_add(total as u16);
    }

    fn add_dropped(&mut self, n: usize) {
        self.dropped_bytes = self.dropped_bytes.saturating_add(n as u16);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SearchStart,
    SearchEnd,
}

pub struct Receiver {
    state: State,
    scratch: [u8; MAX_FRAME_SIZE],
    next: usize,
    stats: RcvStats,
}

impl Receiver {
    pub fn new() -> Self {
        Receiver {
            state: State::SearchStart,
            scratch: [0u8; MAX_FRAME_SIZE],
            next: 0,
            stats: RcvStats::default(),
        }
    }

    pub fn stats(&self) -> &RcvStats {
        &self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    /// Consumes whatever bytes the stream currently has and dispatches any
    /// completed, validated datagrams to `table`.
    pub fn process<S: Stream, const N: usize>(&mut self, stream: &mut S, table: &ReceiverTable<N>) {
        while self.read_more(stream) {
            match self.state {
                State::SearchStart => self.process_search_start(0, table),
                State::SearchEnd => self.process_search_end(table),
            }
        }
    }

    fn max_bytes_to_read(&self) -> usize {
        match self.state {
            State::SearchStart => {
                if self.next < MIN_FRAME_SIZE {
                    MIN_FRAME_SIZE - self.next
                } else {
                    0
                }
            }
            State::SearchEnd if self.next < HEADER_SIZE => MIN_FRAME_SIZE - self.next,
            State::SearchEnd => {
                let total = self.total_frame_size();
                let bytes_to_read = total - self.next;
                if bytes_to_read + self.next <= MAX_FRAME_SIZE {
                    bytes_to_read
                } else {
                    0
                }
            }
        }
    }

    /// Pulls available bytes into the scratch buffer. Returns `true` if the
    /// caller should keep looping (bytes were consumed, or the state machine
    /// still has work to do with what's already buffered), `false` if we're
    /// stalled waiting on the stream with nothing left to process.
    fn read_more(&mut self, stream: &mut impl Stream) -> bool {
        let want = self.max_bytes_to_read();
        let available = stream.available() as usize;

        if available == 0 && want != 0 {
            return false;
        }

        let to_read = want.min(available);

        if to_read == 0 {
            return want == 0 && self.next > 0;
        }

        for i in 0..to_read {
            self.scratch[self.next + i] = stream.read();
        }
        trace!(target: "sdgram::receiver", "read {} bytes", to_read);
        self.next += to_read;

        true
    }

    fn header(&self) -> HeaderView<'_> {
        HeaderView::new(&self.scratch[0..HEADER_SIZE])
    }

    fn total_frame_size(&self) -> usize {
        proto::total_frame_size(self.header().size())
    }

    fn process_search_start<const N: usize>(&mut self, curr: usize, table: &ReceiverTable<N>) {
        if self.next < 2 {
            return;
        }

        let mut c = curr;
        while c < self.next - 1 {
            let val = proto::read_u16_le(&self.scratch[c..c + 2]);

            if val == proto::HEADER_MAGIC {
                debug!(target: "sdgram::receiver", "found header magic at {}", c);

                if c > 0 {
                    self.scratch.copy_within(c..self.next, 0);
                    self.next -= c;
                    self.stats.add_dropped(c);
                }

                self.state = State::SearchEnd;

                if self.next >= HEADER_SIZE {
                    self.process_search_end(table);
                }

                return;
            }

            c += 1;
        }

        // No magic found; keep only the last byte (it may be the low half
        // of a magic word that straddles the next read).
        if c != 0 {
            self.scratch[0] = self.scratch[c];
            self.stats.add_dropped(c);
            self.next = 1;
        }
    }

    fn process_search_end<const N: usize>(&mut self, table: &ReceiverTable<N>) {
        if self.next < HEADER_SIZE {
            return;
        }

        let total = self.total_frame_size();

        if total > MAX_FRAME_SIZE {
            warn!(target: "sdgram::receiver", "frame too large ({} > {})", total, MAX_FRAME_SIZE);
            self.stats.size_error = self.stats.size_error.saturating_add(1);
            self.recover(table);
            return;
        }

        if self.next < total {
            return;
        }

        let trl_offset = total - TRAILER_SIZE;
        let trl_magic = proto::read_u16_le(&self.scratch[trl_offset..trl_offset + 2]);
        if trl_magic != proto::TRAILER_MAGIC {
            warn!(target: "sdgram::receiver", "trailer mismatch");
            self.stats.trl_error = self.stats.trl_error.saturating_add(1);
            self.recover(table);
            return;
        }

        if !self.check_crc(total) {
            warn!(target: "sdgram::receiver", "crc mismatch");
            self.stats.crc_error = self.stats.crc_error.saturating_add(1);
            self.recover(table);
            return;
        }

        self.invoke(table, total);
        self.start_next_msg(total);
    }

    fn check_crc(&mut self, total: usize) -> bool {
        let received = self.header().crc();

        proto::write_u16_le(&mut self.scratch[4..6], 0);
        let calc = crc16_usb(&self.scratch[0..total]);

        calc == received
    }

    fn invoke<const N: usize>(&mut self, table: &ReceiverTable<N>, total: usize) {
        let port = self.header().port();
        let payload = &self.scratch[HEADER_SIZE..total - TRAILER_SIZE];

        match table.deliver(port, payload) {
            Status::Success => {
                debug!(target: "sdgram::receiver", "delivered {} bytes on port {}", total, port);
                self.stats.add_msg(total);
            }
            Status::NoReceiver => {
                warn!(target: "sdgram::receiver", "no receiver for port {}", port);
                self.stats.rcv_error = self.stats.rcv_error.saturating_add(1);
                self.stats.add_dropped(total);
            }
            other => {
                warn!(target: "sdgram::receiver", "unexpected delivery status {:?}", other);
            }
        }
    }

    fn start_next_msg(&mut self, total: usize) {
        self.state = State::SearchStart;

        if self.next == total {
            self.next = 0;
        } else {
            self.scratch.copy_within(total..self.next, 0);
            self.next -= total;
        }
    }

    fn recover<const N: usize>(&mut self, table: &ReceiverTable<N>) {
        self.state = State::SearchStart;
        self.process_search_start(2, table);
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}
