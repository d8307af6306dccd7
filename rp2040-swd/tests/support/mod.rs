//! Hand-written scripted target for exercising the engine without real hardware.
//!
//! `ScriptedLine` implements [`rp2040_swd::Line`] by replaying a queue of bits the
//! test pre-loads (the "target's" ACK/data responses) and recording every bit the
//! engine drives. Its state lives behind an `Rc` so a cheap [`Recorder`] handle can
//! keep inspecting it after the `ScriptedLine` itself has been moved into a `Session`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rp2040_swd::{Delay, Line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SetClk(bool),
    SetDio(bool),
    Release,
    Hold,
    Sample(bool),
}

#[derive(Default)]
struct Inner {
    responses: RefCell<VecDeque<bool>>,
    events: RefCell<Vec<Event>>,
}

pub struct ScriptedLine(Rc<Inner>);

/// A cloneable read-only view onto a [`ScriptedLine`]'s recorded events, kept around
/// after the line itself has been handed off to a `Session`.
#[derive(Clone)]
pub struct Recorder(Rc<Inner>);

pub fn data_parity(value: u32) -> bool {
    (0..32).filter(|i| (value >> i) & 1 != 0).count() % 2 == 1
}

/// The three ACK wire bits (read-order, bit0 first) for each decoded [`rp2040_swd::Ack`].
pub fn ack_bits(ack: rp2040_swd::Ack) -> [bool; 3] {
    use rp2040_swd::Ack;
    match ack {
        Ack::Ok => [true, false, false],
        Ack::Wait => [false, true, false],
        Ack::Fault => [false, false, true],
        Ack::Protocol => [true, true, false],
    }
}

impl ScriptedLine {
    pub fn new() -> Self {
        ScriptedLine(Rc::new(Inner::default()))
    }

    pub fn recorder(&self) -> Recorder {
        Recorder(self.0.clone())
    }

    pub fn queue_bit(&mut self, bit: bool) -> &mut Self {
        self.0.responses.borrow_mut().push_back(bit);
        self
    }

    pub fn queue_bits_lsb(&mut self, value: u32, n: u32) -> &mut Self {
        for i in 0..n {
            self.queue_bit((value >> i) & 1 != 0);
        }
        self
    }

    /// Queue the wire response for one transaction that the target acks with `ack`.
    /// Only `Ack::Ok` has a data phase; the turnaround bit before ACK is a don't-care.
    pub fn queue_ack_only(&mut self, ack: rp2040_swd::Ack) -> &mut Self {
        self.queue_bit(false);
        for b in ack_bits(ack) {
            self.queue_bit(b);
        }
        self
    }

    pub fn queue_ok_write(&mut self) -> &mut Self {
        self.queue_ack_only(rp2040_swd::Ack::Ok)
    }

    pub fn queue_ok_read(&mut self, data: u32) -> &mut Self {
        self.queue_ack_only(rp2040_swd::Ack::Ok);
        self.queue_bits_lsb(data, 32);
        self.queue_bit(data_parity(data));
        self
    }

    pub fn queue_bad_parity_read(&mut self, data: u32) -> &mut Self {
        self.queue_ack_only(rp2040_swd::Ack::Ok);
        self.queue_bits_lsb(data, 32);
        self.queue_bit(!data_parity(data));
        self
    }

    /// Everything a `write_word_via_ap` call consumes (TAR write + DRW write).
    pub fn expect_write_word(&mut self) -> &mut Self {
        self.queue_ok_write();
        self.queue_ok_write()
    }

    /// Everything a `read_word_via_ap` call consumes: TAR write, the posted (discarded)
    /// AP read, and the RDBUFF drain that actually carries `value`.
    pub fn expect_read_word(&mut self, value: u32) -> &mut Self {
        self.queue_ok_write();
        self.queue_ok_read(0);
        self.queue_ok_read(value)
    }

    /// A `write_core_reg` call that succeeds on the first REGRDY poll: DCRDR write,
    /// DCRSR write, one `dhcsr_read` reporting S_REGRDY set.
    pub fn expect_write_core_reg(&mut self) -> &mut Self {
        self.expect_write_word();
        self.expect_write_word();
        self.expect_read_word(1 << 16) // DHCSR_S_REGRDY
    }

    /// A `read_core_reg` call that succeeds on the first REGRDY poll, returning `value`.
    pub fn expect_read_core_reg(&mut self, value: u32) -> &mut Self {
        self.expect_write_word(); // DCRSR
        self.expect_read_word(1 << 16); // REGRDY poll
        self.expect_read_word(value) // DCRDR
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.events.borrow().clone()
    }

    pub fn written_bits(&self) -> Vec<bool> {
        written_bits_of(&self.0)
    }
}

fn written_bits_of(inner: &Inner) -> Vec<bool> {
    inner
        .events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::SetDio(b) => Some(*b),
            _ => None,
        })
        .collect()
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.0.events.borrow().clone()
    }

    pub fn written_bits(&self) -> Vec<bool> {
        written_bits_of(&self.0)
    }
}

impl Default for ScriptedLine {
    fn default() -> Self {
        Self::new()
    }
}

impl Line for ScriptedLine {
    fn set_clk(&mut self, level: bool) {
        self.0.events.borrow_mut().push(Event::SetClk(level));
    }

    fn set_dio(&mut self, level: bool) {
        self.0.events.borrow_mut().push(Event::SetDio(level));
    }

    fn release_dio(&mut self) {
        self.0.events.borrow_mut().push(Event::Release);
    }

    fn hold_dio(&mut self) {
        self.0.events.borrow_mut().push(Event::Hold);
    }

    fn sample_dio(&self) -> bool {
        let bit = self.0.responses.borrow_mut().pop_front().unwrap_or(false);
        self.0.events.borrow_mut().push(Event::Sample(bit));
        bit
    }
}

/// A `Delay` that doesn't actually sleep; scripted tests have no wall clock.
pub struct NullDelay;

impl Delay for NullDelay {
    fn delay_us(&mut self, _us: u32) {}
}
