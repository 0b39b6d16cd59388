//! End-to-end runs of both nodes on a simulated clock and radio channel.

mod common;

use common::*;
use v2v433::ambulance::AmbulanceState;
use v2v433::car::CarState;
use v2v433::config::{AmbulanceConfig, CarConfig};
use v2v433::indicators::Row;
use v2v433::mock::MockClock;
use v2v433::radio::mailbox::Mailbox;
use v2v433::sensors::Acceleration;

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn test_unacknowledged_crash_rebroadcasts_without_fix() {
    static CAR_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut car = car(&clock, &CAR_RX, CarConfig::default());

    run(&clock, 7_500, &mut [&mut car.node], &mut [], |now| {
        if now == 1_000 {
            car.imu.set(HARD_HIT);
        } else if now > 1_000 {
            car.imu.set(Acceleration::REST);
        }
    });

    let alerts = alerts(&car.radio);
    let times: Vec<u32> = alerts.iter().map(|(t, _, _)| *t).collect();
    assert_eq!(times, [1_000, 3_000, 5_000, 7_000]);
    assert!(alerts.iter().all(|&(_, lat, lon)| lat == 0.0 && lon == 0.0));
    assert!(matches!(car.node.state(), CarState::CrashActive(_)));
    assert!(car.led.is_high());
    assert_eq!(car.display.row(Row::Top), "CRASH DETECTED!");
    assert_eq!(car.display.row(Row::Bottom), "Calling for help");
}

#[test]
fn test_alert_carries_gps_fix() {
    static CAR_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut car = car(&clock, &CAR_RX, CarConfig::default());
    assert_eq!(car.display.row(Row::Bottom), "GPS: Searching..");

    run(&clock, 900, &mut [&mut car.node], &mut [], |now| {
        if now == 500 {
            car.gps.set_fix(12.97, 77.59);
        }
    });
    assert_eq!(car.display.row(Row::Bottom), "Status: NORMAL");
    assert_eq!(car.node.state(), CarState::Normal);

    run(&clock, 1_500, &mut [&mut car.node], &mut [], |now| {
        if now == 1_000 {
            car.imu.set(HARD_HIT);
        }
    });
    let (at, lat, lon) = alerts(&car.radio)[0];
    assert_eq!(at, 1_000);
    assert!(close(lat, 12.97));
    assert!(close(lon, 77.59));
}

#[test]
fn test_ambulance_ack_burst() {
    static AMBULANCE_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut ambulance = ambulance(&clock, &AMBULANCE_RX, AmbulanceConfig::default());
    let frame = alert_frame("crashed_car_01", 12.97, 77.59);

    run(&clock, 30_000, &mut [&mut ambulance.node], &mut [], |now| {
        if now == 10_000 {
            assert!(AMBULANCE_RX.publish(&frame));
        }
    });

    let expected: Vec<u32> = (0..30).map(|i| 10_000 + 500 * i).collect();
    assert_eq!(ack_times(&ambulance.radio), expected);
    assert!(!ambulance.buzzer.is_high());
    assert_eq!(ambulance.display.row(Row::Top), "CRASH ALERT RX'd");
    assert_eq!(ambulance.display.row(Row::Bottom), "Status: STANDBY");
    assert!(matches!(
        ambulance.node.state(),
        AmbulanceState::Responding {
            quiescent: true,
            ..
        }
    ));
}

#[test]
fn test_ack_within_listen_window_stops_alerts() {
    static CAR_RX: Mailbox = Mailbox::new();
    static AMBULANCE_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut car = car(&clock, &CAR_RX, CarConfig::default());
    let mut ambulance = ambulance(&clock, &AMBULANCE_RX, AmbulanceConfig::default());
    let mut uplink = Wire::new(&car.radio, &AMBULANCE_RX).with_latency(200);
    let mut downlink = Wire::new(&ambulance.radio, &CAR_RX);

    run(
        &clock,
        10_000,
        &mut [&mut car.node, &mut ambulance.node],
        &mut [&mut uplink, &mut downlink],
        |now| {
            if now == 1_000 {
                car.imu.set(HARD_HIT);
            }
        },
    );

    assert_eq!(ack_times(&ambulance.radio)[0], 1_200);
    let alert_times: Vec<u32> = alerts(&car.radio).iter().map(|(t, _, _)| *t).collect();
    assert_eq!(alert_times, [1_000]);
    assert_eq!(car.node.state(), CarState::AckReceived);
    assert_eq!(car.node.fsm.responder(), Some("ambulance_01"));
    assert_eq!(car.display.row(Row::Top), "ACK RECEIVED!");
    assert_eq!(car.display.row(Row::Bottom), "Help is on way!");
}

#[test]
fn test_lost_ack_is_covered_by_the_next_one() {
    static CAR_RX: Mailbox = Mailbox::new();
    static AMBULANCE_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut car = car(&clock, &CAR_RX, CarConfig::default());
    let mut ambulance = ambulance(&clock, &AMBULANCE_RX, AmbulanceConfig::default());
    let mut uplink = Wire::new(&car.radio, &AMBULANCE_RX).with_latency(200);
    let mut downlink = Wire::new(&ambulance.radio, &CAR_RX).dropping(|frame| frame.at_ms == 1_200);

    run(
        &clock,
        1_700,
        &mut [&mut car.node, &mut ambulance.node],
        &mut [&mut uplink, &mut downlink],
        |now| {
            if now == 1_000 {
                car.imu.set(HARD_HIT);
            }
        },
    );
    assert!(matches!(car.node.state(), CarState::CrashActive(_)));
    assert_eq!(downlink.dropped, 1);

    run(
        &clock,
        5_000,
        &mut [&mut car.node, &mut ambulance.node],
        &mut [&mut uplink, &mut downlink],
        |_| {},
    );
    assert_eq!(&ack_times(&ambulance.radio)[..2], [1_200, 1_700]);
    assert_eq!(car.node.state(), CarState::AckReceived);
    assert_eq!(car.radio.sent_count(), 1);
}

#[test]
fn test_overlapping_alerts_start_one_response() {
    static CAR_A_RX: Mailbox = Mailbox::new();
    static CAR_B_RX: Mailbox = Mailbox::new();
    static AMBULANCE_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let mut car_a = car(&clock, &CAR_A_RX, CarConfig::default());
    let mut car_b = car(&clock, &CAR_B_RX, CarConfig::new("crashed_car_02").unwrap());
    let mut ambulance = ambulance(&clock, &AMBULANCE_RX, AmbulanceConfig::default());
    let mut a_up = Wire::new(&car_a.radio, &AMBULANCE_RX);
    let mut b_up = Wire::new(&car_b.radio, &AMBULANCE_RX);
    let mut a_down = Wire::new(&ambulance.radio, &CAR_A_RX);
    let mut b_down = Wire::new(&ambulance.radio, &CAR_B_RX);

    run(
        &clock,
        20_000,
        &mut [&mut car_a.node, &mut car_b.node, &mut ambulance.node],
        &mut [&mut a_up, &mut b_up, &mut a_down, &mut b_down],
        |now| match now {
            1_000 => car_a.imu.set(HARD_HIT),
            1_500 => car_b.imu.set(HARD_HIT),
            _ => {}
        },
    );

    let incident = ambulance.node.fsm.incident().unwrap();
    assert_eq!(incident.from.as_str(), "crashed_car_01");
    assert_eq!(incident.received_at, 1_010);
    assert_eq!(ambulance.node.fsm.stats().alerts_ignored, 1);

    let acks = ack_times(&ambulance.radio);
    assert_eq!(acks.len(), 30);
    assert_eq!(*acks.last().unwrap(), 15_510);
    assert_eq!(car_a.node.state(), CarState::AckReceived);
    assert_eq!(car_b.node.state(), CarState::AckReceived);

    // Window closed, still committed to the first incident.
    let frame = alert_frame("crashed_car_03", 1.0, 2.0);
    run(&clock, 25_000, &mut [&mut ambulance.node], &mut [], |now| {
        if now == 20_000 {
            assert!(AMBULANCE_RX.publish(&frame));
        }
    });
    assert_eq!(ack_times(&ambulance.radio).len(), 30);
    assert_eq!(ambulance.node.fsm.stats().alerts_ignored, 2);
}

#[test]
fn test_rearmed_ambulance_answers_a_later_alert() {
    static AMBULANCE_RX: Mailbox = Mailbox::new();
    let clock = MockClock::default();
    let config = AmbulanceConfig {
        rearm: true,
        ..AmbulanceConfig::default()
    };
    let mut ambulance = ambulance(&clock, &AMBULANCE_RX, config);
    let first = alert_frame("crashed_car_01", 1.0, 2.0);
    let second = alert_frame("crashed_car_02", 3.0, 4.0);

    run(&clock, 40_000, &mut [&mut ambulance.node], &mut [], |now| match now {
        1_000 => assert!(AMBULANCE_RX.publish(&first)),
        20_000 => assert!(AMBULANCE_RX.publish(&second)),
        _ => {}
    });

    let acks = ack_times(&ambulance.radio);
    assert_eq!(acks.len(), 60);
    assert_eq!(acks[30], 20_000);
    assert_eq!(
        ambulance.node.fsm.incident().unwrap().from.as_str(),
        "crashed_car_02"
    );
    assert_eq!(ambulance.node.state(), AmbulanceState::Patrolling);
    assert_eq!(ambulance.display.row(Row::Bottom), "Status: PATROL");
}
