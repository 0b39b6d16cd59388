//! Host-side peripherals for simulation and tests (feature `std`).
//!
//! Every mock is a cheap handle around shared state: clone it, hand one clone
//! to the node and keep the other to drive or inspect the simulated hardware.
//! Time only moves when [`MockClock::advance`] or [`MockClock::set`] is called.

use crate::indicators::{Display, Row};
use crate::radio::Radio;
use crate::radio::mailbox::Mailbox;
use crate::sensors::{Acceleration, Gps, Imu};
use crate::timer::Clock;
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A manually driven millisecond counter.
#[derive(Debug, Clone, Default)]
pub struct MockClock(Rc<Cell<u32>>);

impl MockClock {
    /// A clock reading `start_ms`.
    pub fn starting_at(start_ms: u32) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    /// Jumps to `ms`.
    pub fn set(&self, ms: u32) {
        self.0.set(ms);
    }

    /// Moves forward by `ms`, wrapping like a hardware counter.
    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// One frame put on the air by a [`MockRadio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Clock reading when the frame was transmitted.
    pub at_ms: u32,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct RadioState {
    sent: Vec<SentFrame>,
    rx_starts: u32,
    fail_sends: bool,
    mailbox: Option<&'static Mailbox>,
}

/// A radio that records every transmitted frame with its timestamp.
#[derive(Debug, Clone)]
pub struct MockRadio {
    clock: MockClock,
    state: Rc<RefCell<RadioState>>,
}

impl MockRadio {
    /// A radio stamping frames with `clock`.
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(RadioState::default())),
        }
    }

    /// Every frame transmitted so far.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.state.borrow().sent.clone()
    }

    /// Number of frames transmitted so far.
    pub fn sent_count(&self) -> usize {
        self.state.borrow().sent.len()
    }

    /// Number of times receive mode was (re-)entered.
    pub fn rx_starts(&self) -> u32 {
        self.state.borrow().rx_starts
    }

    /// Makes every following transmission fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().fail_sends = failing;
    }

    /// The mailbox registered by the link, if any.
    pub fn mailbox(&self) -> Option<&'static Mailbox> {
        self.state.borrow().mailbox
    }
}

/// Error returned by a [`MockRadio`] set to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockRadioError;

impl Radio for MockRadio {
    type Error = MockRadioError;

    fn send(&mut self, frame: &[u8]) -> Result<(), MockRadioError> {
        let mut state = self.state.borrow_mut();
        if state.fail_sends {
            return Err(MockRadioError);
        }
        state.sent.push(SentFrame {
            at_ms: self.clock.now_ms(),
            bytes: frame.to_vec(),
        });
        Ok(())
    }

    fn start_rx(&mut self) -> Result<(), MockRadioError> {
        self.state.borrow_mut().rx_starts += 1;
        Ok(())
    }

    fn on_receive(&mut self, mailbox: &'static Mailbox) {
        self.state.borrow_mut().mailbox = Some(mailbox);
    }
}

#[derive(Debug, Default)]
struct ImuState {
    sample: Acceleration,
    failing: bool,
}

/// An accelerometer reporting whatever sample was last set.
#[derive(Debug, Clone, Default)]
pub struct MockImu(Rc<RefCell<ImuState>>);

impl MockImu {
    /// A sensor at rest under 1 g of gravity.
    pub fn at_rest() -> Self {
        let imu = Self::default();
        imu.set(Acceleration::new(0.0, 0.0, crate::consts::STANDARD_GRAVITY));
        imu
    }

    /// Sets the sample returned by the next reads.
    pub fn set(&self, sample: Acceleration) {
        self.0.borrow_mut().sample = sample;
    }

    /// Makes reads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.0.borrow_mut().failing = failing;
    }
}

impl Imu for MockImu {
    type Error = ();

    fn read(&mut self) -> Result<Acceleration, ()> {
        let state = self.0.borrow();
        if state.failing {
            return Err(());
        }
        Ok(state.sample)
    }
}

#[derive(Debug, Default)]
struct GpsState {
    fix: Option<(f32, f32)>,
    polls: u32,
}

/// A position source whose fix is set directly.
#[derive(Debug, Clone, Default)]
pub struct MockGps(Rc<RefCell<GpsState>>);

impl MockGps {
    /// Sets the position reported from now on.
    pub fn set_fix(&self, lat: f32, lon: f32) {
        self.0.borrow_mut().fix = Some((lat, lon));
    }

    /// Number of polls so far.
    pub fn polls(&self) -> u32 {
        self.0.borrow().polls
    }
}

impl Gps for MockGps {
    fn poll(&mut self) {
        self.0.borrow_mut().polls += 1;
    }

    fn fix(&self) -> Option<(f32, f32)> {
        self.0.borrow().fix
    }
}

#[derive(Debug, Default)]
struct ScreenState {
    rows: [String; 2],
    clears: u32,
}

/// A two-line display keeping the text currently shown.
#[derive(Debug, Clone, Default)]
pub struct MockDisplay(Rc<RefCell<ScreenState>>);

impl MockDisplay {
    /// Text currently on `row`, with trailing padding removed.
    pub fn row(&self, row: Row) -> String {
        let state = self.0.borrow();
        String::from(state.rows[usize::from(row.index())].trim_end())
    }

    /// Number of clears so far.
    pub fn clears(&self) -> u32 {
        self.0.borrow().clears
    }
}

impl Display for MockDisplay {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        state.rows = [String::new(), String::new()];
        state.clears += 1;
        Ok(())
    }

    fn line(&mut self, row: Row, text: &str) -> Result<(), Infallible> {
        self.0.borrow_mut().rows[usize::from(row.index())] = String::from(text);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PinLevel {
    high: bool,
    rising_edges: u32,
}

/// An output pin remembering its level and counting rising edges.
#[derive(Debug, Clone, Default)]
pub struct MockPin(Rc<RefCell<PinLevel>>);

impl MockPin {
    /// Current level.
    pub fn is_high(&self) -> bool {
        self.0.borrow().high
    }

    /// Number of low-to-high transitions so far.
    pub fn rising_edges(&self) -> u32 {
        self.0.borrow().rising_edges
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut level = self.0.borrow_mut();
        if !level.high {
            level.rising_edges += 1;
        }
        level.high = true;
        Ok(())
    }
}
