//! Ambulance role.
//!
//! The ambulance listens for `crash_alert` frames while patrolling. The first
//! alert commits it to that incident: it shows the alert banner and, for one
//! response window, pulses the buzzer and broadcasts an `ambulance_ack` every
//! ack interval. When the window closes the buzzer is silenced and the node goes
//! quiet. It stays in [`AmbulanceState::Responding`] unless
//! [`AmbulanceConfig::rearm`] is set, in which case it returns to patrolling.
//!
//! Alerts received while responding are ignored, so one event produces exactly
//! one burst of acknowledgements.
//!
//! The tick never blocks: the buzzer pulse is derived from the time elapsed in
//! the window (on for the first `buzzer_pulse_ms` of every ack interval) rather
//! than from a delay.

use crate::codec::{Message, decode, encode};
use crate::config::{AmbulanceConfig, NodeId};
use crate::indicators::{
    ALERT_BANNER, Display, Row, STATUS_PATROL, STATUS_STANDBY, drive_pin, show_banner, write_line,
};
use crate::node::Node;
use crate::radio::{Radio, RadioLink};
use crate::timer::{Clock, elapsed_ms, has_elapsed};
use embedded_hal::digital::OutputPin;

/// State of the ambulance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum AmbulanceState {
    /// Listening for crash alerts.
    Patrolling,
    /// Committed to an incident.
    Responding {
        /// Clock reading when the alert was accepted.
        started_at: u32,
        /// Clock reading of the last acknowledgement attempt.
        last_ack_at: Option<u32>,
        /// Response window closed: no more acks, buzzer off.
        quiescent: bool,
    },
}

/// The alert the ambulance is responding to.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Incident {
    /// Identifier of the crashed car.
    pub from: NodeId,
    /// Reported latitude, in degrees (0.0 when the car had no fix).
    pub lat: f32,
    /// Reported longitude, in degrees (0.0 when the car had no fix).
    pub lon: f32,
    /// Clock reading when the alert was accepted.
    pub received_at: u32,
}

/// Acknowledgement counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AckStats {
    /// Acks handed to the radio successfully.
    pub sent: u16,
    /// Acks that failed to encode or transmit.
    pub failed: u16,
    /// Alerts ignored because a response was already in progress.
    pub alerts_ignored: u16,
}

/// Everything the ambulance drives.
#[derive(Debug)]
pub struct AmbulancePeripherals<R, D, B, C> {
    /// Link to the crashed car.
    pub radio: RadioLink<R>,
    /// Two-line display.
    pub display: D,
    /// Alarm buzzer.
    pub buzzer: B,
    /// Millisecond clock.
    pub clock: C,
}

/// The ambulance state machine.
#[derive(Debug, Clone)]
pub struct Ambulance {
    config: AmbulanceConfig,
    state: AmbulanceState,
    incident: Option<Incident>,
    buzzer_on: bool,
    stats: AckStats,
}

impl Ambulance {
    /// An ambulance in [`AmbulanceState::Patrolling`].
    pub fn new(config: AmbulanceConfig) -> Self {
        Self {
            config,
            state: AmbulanceState::Patrolling,
            incident: None,
            buzzer_on: false,
            stats: AckStats::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> AmbulanceState {
        self.state
    }

    /// Settings in use.
    pub fn config(&self) -> &AmbulanceConfig {
        &self.config
    }

    /// The incident being (or last) responded to.
    pub fn incident(&self) -> Option<&Incident> {
        self.incident.as_ref()
    }

    /// Acknowledgement counters.
    pub fn stats(&self) -> AckStats {
        self.stats
    }

    /// Shows the patrol screen and silences the buzzer.
    pub fn start<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>)
    where
        R: Radio,
        D: Display,
        B: OutputPin,
        C: Clock,
    {
        info!("{}: listening for alerts", self.config.id.as_str());
        self.set_buzzer(hw, false);
        self.show_patrol(hw);
    }

    /// Runs one iteration of the state machine.
    pub fn tick<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>)
    where
        R: Radio,
        D: Display,
        B: OutputPin,
        C: Clock,
    {
        let AmbulanceState::Responding {
            started_at,
            last_ack_at,
            quiescent: false,
        } = self.state
        else {
            return;
        };

        let now = hw.clock.now_ms();
        let elapsed = elapsed_ms(now, started_at);
        if elapsed >= self.config.ack_duration_ms {
            self.close_window(hw);
            return;
        }

        let interval = self.config.ack_interval_ms.max(1);
        self.set_buzzer(hw, elapsed % interval < self.config.buzzer_pulse_ms);

        let due = match last_ack_at {
            None => true,
            Some(at) => has_elapsed(now, at, self.config.ack_interval_ms),
        };
        if due {
            self.send_ack(hw);
            self.state = AmbulanceState::Responding {
                started_at,
                last_ack_at: Some(now),
                quiescent: false,
            };
        }
    }

    /// Handles one frame taken from the radio.
    ///
    /// While patrolling, the first well-formed `crash_alert` starts a response.
    /// Anything else, and every alert received while responding, is dropped.
    pub fn on_frame<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>, frame: &[u8])
    where
        R: Radio,
        D: Display,
        B: OutputPin,
        C: Clock,
    {
        let (from, lat, lon) = match decode(frame) {
            Ok(Message::CrashAlert { from, lat, lon }) => (from, lat, lon),
            Ok(other) => {
                debug!("ignoring {} from {}", other.kind(), other.sender());
                return;
            }
            Err(e) => {
                debug!("dropping frame: {}", e);
                return;
            }
        };

        if self.state != AmbulanceState::Patrolling {
            debug!("already responding, alert from {} ignored", from.as_str());
            self.stats.alerts_ignored = self.stats.alerts_ignored.wrapping_add(1);
            return;
        }

        let now = hw.clock.now_ms();
        warn!("crash alert from {} at ({}, {})", from.as_str(), lat, lon);
        self.state = AmbulanceState::Responding {
            started_at: now,
            last_ack_at: None,
            quiescent: false,
        };
        self.incident = Some(Incident {
            from,
            lat,
            lon,
            received_at: now,
        });
        show_banner(&mut hw.display, &ALERT_BANNER);
    }

    fn send_ack<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>)
    where
        R: Radio,
    {
        let ack = Message::AmbulanceAck {
            from: self.config.id.clone(),
            status: self.config.status.clone(),
        };
        match encode(&ack) {
            Ok(frame) => match hw.radio.send(&frame) {
                Ok(()) => {
                    debug!("ack sent");
                    self.stats.sent = self.stats.sent.wrapping_add(1);
                }
                Err(e) => {
                    warn!("ack not sent: {}", e);
                    self.stats.failed = self.stats.failed.wrapping_add(1);
                }
            },
            Err(e) => {
                warn!("ack not encoded: {}", e);
                self.stats.failed = self.stats.failed.wrapping_add(1);
            }
        }
    }

    fn close_window<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>)
    where
        D: Display,
        B: OutputPin,
    {
        info!("response window closed after {} acks", self.stats.sent);
        self.set_buzzer(hw, false);
        if self.config.rearm {
            self.state = AmbulanceState::Patrolling;
            self.show_patrol(hw);
        } else {
            if let AmbulanceState::Responding { quiescent, .. } = &mut self.state {
                *quiescent = true;
            }
            write_line(&mut hw.display, Row::Bottom, STATUS_STANDBY);
        }
    }

    fn show_patrol<R, D, B, C>(&self, hw: &mut AmbulancePeripherals<R, D, B, C>)
    where
        D: Display,
    {
        if hw.display.clear().is_err() {
            warn!("display clear failed");
        }
        write_line(&mut hw.display, Row::Top, &self.config.id);
        write_line(&mut hw.display, Row::Bottom, STATUS_PATROL);
    }

    /// Drives the buzzer on level changes only.
    fn set_buzzer<R, D, B, C>(&mut self, hw: &mut AmbulancePeripherals<R, D, B, C>, on: bool)
    where
        B: OutputPin,
    {
        if self.buzzer_on != on {
            self.buzzer_on = on;
            drive_pin(&mut hw.buzzer, on);
        }
    }
}

/// An ambulance node: the state machine plus the peripherals it drives.
#[derive(Debug)]
pub struct AmbulanceNode<R, D, B, C> {
    /// State machine.
    pub fsm: Ambulance,
    /// Peripherals.
    pub hw: AmbulancePeripherals<R, D, B, C>,
}

impl<R, D, B, C> AmbulanceNode<R, D, B, C>
where
    R: Radio,
    D: Display,
    B: OutputPin,
    C: Clock,
{
    /// Assembles a node. Call [`start`](Self::start) before the first step.
    pub fn new(config: AmbulanceConfig, hw: AmbulancePeripherals<R, D, B, C>) -> Self {
        Self {
            fsm: Ambulance::new(config),
            hw,
        }
    }

    /// Shows the patrol screen.
    pub fn start(&mut self) {
        self.fsm.start(&mut self.hw);
    }

    /// Current state.
    pub fn state(&self) -> AmbulanceState {
        self.fsm.state()
    }
}

impl<R, D, B, C> Node for AmbulanceNode<R, D, B, C>
where
    R: Radio,
    D: Display,
    B: OutputPin,
    C: Clock,
{
    fn step(&mut self) {
        while let Some(frame) = self.hw.radio.poll() {
            self.fsm.on_frame(&mut self.hw, &frame);
        }
        self.fsm.tick(&mut self.hw);
    }
}
