//! Two threads, each holding one end of a channel-backed `Stream`, sending
//! datagrams to each other through a `Facade`. Illustrative only; not part
//! of the crate's tested contract.

use std::cell::RefCell;
use std::sync::mpsc::{channel, Receiver as ChanReceiver, Sender as ChanSender};
use std::thread;
use std::time::Duration;

use log::info;
use sdgram::{Facade, PortHandler, Stream};

/// A `Stream` backed by a pair of unbounded byte channels: `tx` carries
/// bytes out to the peer, `rx` buffers bytes that arrived from the peer.
struct ChannelStream {
    name: &'static str,
    tx: ChanSender<u8>,
    rx: ChanReceiver<u8>,
    pending: Vec<u8>,
}

impl ChannelStream {
    fn new(name: &'static str, tx: ChanSender<u8>, rx: ChanReceiver<u8>) -> Self {
        ChannelStream { name, tx, rx, pending: Vec::new() }
    }

    fn drain_channel(&mut self) {
        while let Ok(byte) = self.rx.try_recv() {
            self.pending.push(byte);
        }
    }
}

impl Stream for ChannelStream {
    fn available(&mut self) -> u16 {
        self.drain_channel();
        self.pending.len() as u16
    }

    fn read(&mut self) -> u8 {
        self.pending.remove(0)
    }

    fn available_for_write(&mut self) -> u16 {
        // Simulate a narrow write window, same as the original demo's
        // "send through a slow link" flavour: a handful of bytes per tick.
        4
    }

    fn write(&mut self, bytes: &[u8]) -> u16 {
        let n = bytes.len().min(self.available_for_write() as usize);
        let mut sent = 0u16;
        for &b in &bytes[0..n] {
            if self.tx.send(b).is_err() {
                break;
            }
            sent += 1;
        }
        info!(target: "sdgram::demo", "{}: wrote {} bytes", self.name, sent);
        sent
    }
}

struct Printer {
    name: &'static str,
    received: RefCell<Vec<Vec<u8>>>,
}

impl PortHandler for Printer {
    fn process_msg(&self, payload: &[u8]) {
        println!("{}: received {:?}", self.name, payload);
        self.received.borrow_mut().push(payload.to_vec());
    }
}

fn main() {
    env_logger::init();

    let (a_to_b_tx, a_to_b_rx) = channel();
    let (b_to_a_tx, b_to_a_rx) = channel();

    let handle = thread::spawn(move || {
        let printer = Printer { name: "b", received: RefCell::new(Vec::new()) };
        let stream = ChannelStream::new("b", b_to_a_tx, a_to_b_rx);
        let mut facade: Facade<_, 4, 4> = Facade::new(stream);
        facade.register_receiver(1, &printer);

        for _ in 0..200 {
            facade.process();
            if printer.received.borrow().len() >= 3 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        printer.received.borrow().len()
    });

    let printer_a = Printer { name: "a", received: RefCell::new(Vec::new()) };
    let stream = ChannelStream::new("a", a_to_b_tx, b_to_a_rx);
    let mut facade: Facade<_, 4, 4> = Facade::new(stream);
    facade.register_receiver(9, &printer_a);

    for i in 0..3u8 {
        let mut buf = facade.alloc_buffer().expect("pool exhausted");
        let payload = [i, i + 1, i + 2];
        facade.payload_mut(&mut buf)[0..payload.len()].copy_from_slice(&payload);
        buf.set_len(payload.len() as u8);
        facade.send(1, buf);
    }

    for _ in 0..200 {
        facade.process();
        thread::sleep(Duration::from_millis(1));
    }

    let delivered = handle.join().unwrap();
    println!("peer b delivered {} datagrams", delivered);
}
