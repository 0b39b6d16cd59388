//! Crashed-car role.
//!
//! The car watches its accelerometer. When the acceleration magnitude goes above
//! the crash threshold it latches into [`CarState::CrashActive`], lights the
//! LED and broadcasts a `crash_alert` carrying its last known position. It then
//! listens for an acknowledgement for one listen window, rebroadcasts when the
//! window runs out and keeps doing so until any `ambulance_ack` arrives.
//!
//! ```text
//!   NORMAL --(|a| > threshold)--> CRASH_ACTIVE --(ambulance_ack)--> ACK_RECEIVED
//!                                   |      ^
//!                                   +------+ listen window elapsed: rebroadcast
//! ```
//!
//! No transition leaves `AckReceived`, and nothing but power-cycling leaves
//! `CrashActive` without an acknowledgement. The radio is half-duplex: every
//! broadcast returns the modem to receive mode before the listen window opens.

use crate::codec::{Message, decode, encode};
use crate::config::{CarConfig, NodeId};
use crate::indicators::{
    ACK_BANNER, CRASH_BANNER, Display, GPS_SEARCHING, Row, STATUS_NORMAL, drive_pin, show_banner,
    write_line,
};
use crate::node::Node;
use crate::radio::{Radio, RadioLink};
use crate::sensors::{Gps, Imu, sample_or_rest};
use crate::timer::{Clock, has_elapsed};
use embedded_hal::digital::OutputPin;

/// Where the car is within a crash cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CrashPhase {
    /// An alert is due on this tick.
    Broadcast,
    /// Listening for an acknowledgement since the last alert went out.
    Listen {
        /// Clock reading right after the last alert left the radio.
        since: u32,
    },
}

/// State of the crashed car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CarState {
    /// Monitoring the accelerometer.
    Normal,
    /// Crash latched, alerting until acknowledged.
    CrashActive(CrashPhase),
    /// Help acknowledged. Terminal.
    AckReceived,
}

impl CarState {
    /// Whether a crash has been latched, acknowledged or not.
    pub fn crashed(&self) -> bool {
        !matches!(self, CarState::Normal)
    }
}

/// Everything the crashed car drives or samples.
#[derive(Debug)]
pub struct CarPeripherals<R, I, G, D, L, C> {
    /// Link to the ambulance.
    pub radio: RadioLink<R>,
    /// Accelerometer.
    pub imu: I,
    /// Position source.
    pub gps: G,
    /// Two-line display.
    pub display: D,
    /// Crash indicator LED.
    pub led: L,
    /// Millisecond clock.
    pub clock: C,
}

/// Crash details kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CrashRecord {
    /// Magnitude that triggered the crash, in g.
    pub peak_g: f32,
    /// Alerts handed to the radio successfully.
    pub alerts_sent: u16,
    /// Alerts that failed to encode or transmit.
    pub alerts_failed: u16,
}

/// The crashed-car state machine.
#[derive(Debug, Clone)]
pub struct CrashedCar {
    config: CarConfig,
    state: CarState,
    fix_announced: bool,
    record: Option<CrashRecord>,
    responder: Option<NodeId>,
}

impl CrashedCar {
    /// A car in [`CarState::Normal`].
    pub fn new(config: CarConfig) -> Self {
        Self {
            config,
            state: CarState::Normal,
            fix_announced: false,
            record: None,
            responder: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CarState {
        self.state
    }

    /// Settings in use.
    pub fn config(&self) -> &CarConfig {
        &self.config
    }

    /// Crash details, once a crash has been latched.
    pub fn crash_record(&self) -> Option<CrashRecord> {
        self.record
    }

    /// Identifier of the ambulance that acknowledged, if any.
    pub fn responder(&self) -> Option<&str> {
        self.responder.as_deref()
    }

    /// Shows the boot screen and turns the LED off.
    pub fn start<R, I, G, D, L, C>(&mut self, hw: &mut CarPeripherals<R, I, G, D, L, C>)
    where
        R: Radio,
        I: Imu,
        G: Gps,
        D: Display,
        L: OutputPin,
        C: Clock,
    {
        info!("{}: monitoring", self.config.id.as_str());
        drive_pin(&mut hw.led, false);
        if hw.display.clear().is_err() {
            warn!("display clear failed");
        }
        write_line(&mut hw.display, Row::Top, &self.config.id);
        write_line(&mut hw.display, Row::Bottom, GPS_SEARCHING);
    }

    /// Runs one iteration of the state machine.
    pub fn tick<R, I, G, D, L, C>(&mut self, hw: &mut CarPeripherals<R, I, G, D, L, C>)
    where
        R: Radio,
        I: Imu,
        G: Gps,
        D: Display,
        L: OutputPin,
        C: Clock,
    {
        match self.state {
            CarState::Normal => {
                hw.gps.poll();
                self.announce_fix(hw);
                let g = sample_or_rest(&mut hw.imu).magnitude_g();
                if g > self.config.crash_threshold_g {
                    self.latch_crash(hw, g);
                    self.broadcast(hw);
                }
            }
            CarState::CrashActive(CrashPhase::Broadcast) => {
                hw.gps.poll();
                self.broadcast(hw);
            }
            CarState::CrashActive(CrashPhase::Listen { since }) => {
                hw.gps.poll();
                if has_elapsed(hw.clock.now_ms(), since, self.config.listen_window_ms) {
                    debug!("no acknowledgement, rebroadcasting");
                    self.broadcast(hw);
                }
            }
            CarState::AckReceived => {}
        }
    }

    /// Handles one frame taken from the radio.
    ///
    /// Frames are only looked at while a crash is active; any well-formed
    /// `ambulance_ack` then ends the crash cycle. Malformed frames and other
    /// message types are dropped.
    pub fn on_frame<R, I, G, D, L, C>(
        &mut self,
        hw: &mut CarPeripherals<R, I, G, D, L, C>,
        frame: &[u8],
    ) where
        R: Radio,
        I: Imu,
        G: Gps,
        D: Display,
        L: OutputPin,
        C: Clock,
    {
        if !matches!(self.state, CarState::CrashActive(_)) {
            trace!("frame ignored outside of a crash");
            return;
        }
        match decode(frame) {
            Ok(Message::AmbulanceAck { from, status }) => {
                info!(
                    "acknowledged by {} ({})",
                    from.as_str(),
                    status.as_str()
                );
                self.state = CarState::AckReceived;
                self.responder = Some(from);
                show_banner(&mut hw.display, &ACK_BANNER);
            }
            Ok(other) => debug!("ignoring {} from {}", other.kind(), other.sender()),
            Err(e) => debug!("dropping frame: {}", e),
        }
    }

    fn announce_fix<R, I, G, D, L, C>(&mut self, hw: &mut CarPeripherals<R, I, G, D, L, C>)
    where
        G: Gps,
        D: Display,
    {
        if !self.fix_announced && hw.gps.fix().is_some() {
            self.fix_announced = true;
            write_line(&mut hw.display, Row::Bottom, STATUS_NORMAL);
        }
    }

    fn latch_crash<R, I, G, D, L, C>(&mut self, hw: &mut CarPeripherals<R, I, G, D, L, C>, g: f32)
    where
        D: Display,
        L: OutputPin,
    {
        warn!("crash detected: {} g", g);
        self.state = CarState::CrashActive(CrashPhase::Broadcast);
        self.record = Some(CrashRecord {
            peak_g: g,
            ..CrashRecord::default()
        });
        drive_pin(&mut hw.led, true);
        show_banner(&mut hw.display, &CRASH_BANNER);
    }

    /// Sends one alert and opens a new listen window, whatever the outcome.
    fn broadcast<R, I, G, D, L, C>(&mut self, hw: &mut CarPeripherals<R, I, G, D, L, C>)
    where
        R: Radio,
        G: Gps,
        C: Clock,
    {
        let (lat, lon) = hw.gps.fix().unwrap_or((0.0, 0.0));
        let alert = Message::CrashAlert {
            from: self.config.id.clone(),
            lat,
            lon,
        };
        let sent = match encode(&alert) {
            Ok(frame) => match hw.radio.send(&frame) {
                Ok(()) => {
                    info!("crash alert sent ({}, {})", lat, lon);
                    true
                }
                Err(e) => {
                    warn!("crash alert not sent: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("crash alert not encoded: {}", e);
                false
            }
        };
        if let Some(record) = self.record.as_mut() {
            if sent {
                record.alerts_sent = record.alerts_sent.wrapping_add(1);
            } else {
                record.alerts_failed = record.alerts_failed.wrapping_add(1);
            }
        }
        self.state = CarState::CrashActive(CrashPhase::Listen {
            since: hw.clock.now_ms(),
        });
    }
}

/// A crashed-car node: the state machine plus the peripherals it drives.
#[derive(Debug)]
pub struct CrashedCarNode<R, I, G, D, L, C> {
    /// State machine.
    pub fsm: CrashedCar,
    /// Peripherals.
    pub hw: CarPeripherals<R, I, G, D, L, C>,
}

impl<R, I, G, D, L, C> CrashedCarNode<R, I, G, D, L, C>
where
    R: Radio,
    I: Imu,
    G: Gps,
    D: Display,
    L: OutputPin,
    C: Clock,
{
    /// Assembles a node. Call [`start`](Self::start) before the first step.
    pub fn new(config: CarConfig, hw: CarPeripherals<R, I, G, D, L, C>) -> Self {
        Self {
            fsm: CrashedCar::new(config),
            hw,
        }
    }

    /// Shows the boot screen.
    pub fn start(&mut self) {
        self.fsm.start(&mut self.hw);
    }

    /// Current state.
    pub fn state(&self) -> CarState {
        self.fsm.state()
    }
}

impl<R, I, G, D, L, C> Node for CrashedCarNode<R, I, G, D, L, C>
where
    R: Radio,
    I: Imu,
    G: Gps,
    D: Display,
    L: OutputPin,
    C: Clock,
{
    fn step(&mut self) {
        while let Some(frame) = self.hw.radio.poll() {
            self.fsm.on_frame(&mut self.hw, &frame);
        }
        self.fsm.tick(&mut self.hw);
    }
}
