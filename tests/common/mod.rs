//! Two-node bench: simulated peripherals plus a one-way "ether" per direction.
#![allow(dead_code)]

use std::collections::VecDeque;

use v2v433::ambulance::{AmbulanceNode, AmbulancePeripherals};
use v2v433::car::{CarPeripherals, CrashedCarNode};
use v2v433::codec::{Message, decode, encode};
use v2v433::config::{AmbulanceConfig, CarConfig, node_id};
use v2v433::mock::{
    MockClock, MockDisplay, MockGps, MockImu, MockPin, MockRadio, SentFrame,
};
use v2v433::node::Node;
use v2v433::radio::RadioLink;
use v2v433::radio::mailbox::Mailbox;
use v2v433::sensors::Acceleration;
use v2v433::timer::Clock;

/// Loop period of both simulated nodes.
pub const STEP_MS: u32 = 10;

/// Well above the 3 g threshold.
pub const HARD_HIT: Acceleration = Acceleration::new(40.0, 0.0, 9.81);

pub type CarNode = CrashedCarNode<MockRadio, MockImu, MockGps, MockDisplay, MockPin, MockClock>;
pub type AmbulanceUnit = AmbulanceNode<MockRadio, MockDisplay, MockPin, MockClock>;

/// Handles onto the crashed car's simulated hardware.
pub struct CarBench {
    pub node: CarNode,
    pub radio: MockRadio,
    pub imu: MockImu,
    pub gps: MockGps,
    pub display: MockDisplay,
    pub led: MockPin,
}

/// Handles onto the ambulance's simulated hardware.
pub struct AmbulanceBench {
    pub node: AmbulanceUnit,
    pub radio: MockRadio,
    pub display: MockDisplay,
    pub buzzer: MockPin,
}

pub fn car(clock: &MockClock, mailbox: &'static Mailbox, config: CarConfig) -> CarBench {
    let radio = MockRadio::new(clock.clone());
    let imu = MockImu::at_rest();
    let gps = MockGps::default();
    let display = MockDisplay::default();
    let led = MockPin::default();
    let hw = CarPeripherals {
        radio: RadioLink::new(radio.clone(), mailbox).unwrap(),
        imu: imu.clone(),
        gps: gps.clone(),
        display: display.clone(),
        led: led.clone(),
        clock: clock.clone(),
    };
    let mut node = CrashedCarNode::new(config, hw);
    node.start();
    CarBench {
        node,
        radio,
        imu,
        gps,
        display,
        led,
    }
}

pub fn ambulance(
    clock: &MockClock,
    mailbox: &'static Mailbox,
    config: AmbulanceConfig,
) -> AmbulanceBench {
    let radio = MockRadio::new(clock.clone());
    let display = MockDisplay::default();
    let buzzer = MockPin::default();
    let hw = AmbulancePeripherals {
        radio: RadioLink::new(radio.clone(), mailbox).unwrap(),
        display: display.clone(),
        buzzer: buzzer.clone(),
        clock: clock.clone(),
    };
    let mut node = AmbulanceNode::new(config, hw);
    node.start();
    AmbulanceBench {
        node,
        radio,
        display,
        buzzer,
    }
}

/// One direction of the channel: frames sent by `from` land in `to` after
/// `latency_ms`, unless the drop filter swallows them.
pub struct Wire {
    from: MockRadio,
    to: &'static Mailbox,
    cursor: usize,
    latency_ms: u32,
    in_flight: VecDeque<(u32, Vec<u8>)>,
    drop: Box<dyn FnMut(&SentFrame) -> bool>,
    pub delivered: usize,
    pub dropped: usize,
}

impl Wire {
    pub fn new(from: &MockRadio, to: &'static Mailbox) -> Self {
        Self {
            from: from.clone(),
            to,
            cursor: 0,
            latency_ms: 0,
            in_flight: VecDeque::new(),
            drop: Box::new(|_| false),
            delivered: 0,
            dropped: 0,
        }
    }

    pub fn with_latency(mut self, latency_ms: u32) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn dropping(mut self, filter: impl FnMut(&SentFrame) -> bool + 'static) -> Self {
        self.drop = Box::new(filter);
        self
    }

    /// Picks up newly transmitted frames and delivers those due by `now`.
    pub fn pump(&mut self, now: u32) {
        let sent = self.from.sent();
        for frame in &sent[self.cursor..] {
            if (self.drop)(frame) {
                self.dropped += 1;
            } else {
                self.in_flight
                    .push_back((frame.at_ms + self.latency_ms, frame.bytes.clone()));
            }
        }
        self.cursor = sent.len();
        while let Some((due, _)) = self.in_flight.front() {
            if *due > now {
                break;
            }
            let (_, bytes) = self.in_flight.pop_front().unwrap();
            assert!(self.to.publish(&bytes));
            self.delivered += 1;
        }
    }
}

/// Steps `nodes` every [`STEP_MS`] from the clock's current reading up to
/// (excluding) `until`, pumping `wires` before each step. `script` runs first on
/// every iteration with the current time.
pub fn run(
    clock: &MockClock,
    until: u32,
    nodes: &mut [&mut dyn Node],
    wires: &mut [&mut Wire],
    mut script: impl FnMut(u32),
) {
    while clock.now_ms() < until {
        let now = clock.now_ms();
        script(now);
        for wire in wires.iter_mut() {
            wire.pump(now);
        }
        for node in nodes.iter_mut() {
            node.step();
        }
        clock.advance(STEP_MS);
    }
}

pub fn alert_frame(from: &str, lat: f32, lon: f32) -> Vec<u8> {
    encode(&Message::CrashAlert {
        from: node_id(from).unwrap(),
        lat,
        lon,
    })
    .unwrap()
    .to_vec()
}

/// Decoded crash alerts in transmission order, with their timestamps.
pub fn alerts(radio: &MockRadio) -> Vec<(u32, f32, f32)> {
    radio
        .sent()
        .iter()
        .map(|frame| match decode(&frame.bytes).unwrap() {
            Message::CrashAlert { lat, lon, .. } => (frame.at_ms, lat, lon),
            other => panic!("car sent {other:?}"),
        })
        .collect()
}

/// Timestamps of the acknowledgements sent by `radio`.
pub fn ack_times(radio: &MockRadio) -> Vec<u32> {
    radio
        .sent()
        .iter()
        .map(|frame| match decode(&frame.bytes).unwrap() {
            Message::AmbulanceAck { .. } => frame.at_ms,
            other => panic!("ambulance sent {other:?}"),
        })
        .collect()
}
