//! # v2v433
//!
//! A portable, no_std vehicle-to-vehicle crash alert protocol for two nodes
//! sharing a 433 MHz radio channel: a crashed car that beacons its position
//! after an impact, and an ambulance that acknowledges it for a bounded
//! response window.
//!
//! The crate implements the two protocol state machines and everything they
//! need around them:
//! - `embedded-hal` traits for the LED and buzzer pins
//! - a JSON wire format (`serde` + `serde-json-core`) bounded to 200 bytes
//! - an interrupt-safe single-slot receive mailbox built on `critical-section`
//! - non-blocking IMU sampling and NMEA 0183 GPS parsing (`nmea0183`)
//! - a cooperative super-loop driven through the [`node::Node`] trait
//!
//! Radio, IMU, GPS serial port and display drivers are provided by the platform
//! through the small traits in [`radio`], [`sensors`] and [`indicators`].
//!
//! ## Crate features
//! | Feature       | Description |
//! |---------------|-------------|
//! | `std`         | Disables `#![no_std]` and enables the host-side [`mock`] peripherals |
//! | `delay-loop`  | Super-loop drivers built on `embedded_hal::delay::DelayNs` |
//! | `defmt-0-3`   | Uses `defmt` logging |
//! | `log`         | Uses `log` logging |
//!
//! ## Protocol
//!
//! ```text
//! crashed car                                   ambulance
//!   NORMAL                                        PATROLLING
//!     | |a| > 3 g                                    |
//!   CRASH_ACTIVE --- crash_alert ------------------> RESPONDING (15 s window)
//!     |  ^  every 2 s until acknowledged             |
//!     |  +----------                                 |
//!   ACK_RECEIVED <-- ambulance_ack (every 500 ms) ---+
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use v2v433::car::{CarPeripherals, CrashedCarNode};
//! use v2v433::config::CarConfig;
//! use v2v433::radio::{RadioLink, mailbox::Mailbox};
//!
//! static RX_MAILBOX: Mailbox = Mailbox::new();
//!
//! let radio = match RadioLink::new(lora, &RX_MAILBOX) {
//!     Ok(radio) => radio,
//!     Err(e) => v2v433::node::halt(&mut lcd, "crashed_car_01", e),
//! };
//! let hw = CarPeripherals { radio, imu, gps, display: lcd, led, clock };
//! let mut node = CrashedCarNode::new(CarConfig::default(), hw);
//! node.start();
//! v2v433::timer::run_super_loop(&mut node, &mut delay, 10);
//! ```
//!
//! ## Integration Notes
//!
//! - The platform radio adapter must publish received payloads into the
//!   registered [`radio::mailbox::Mailbox`] from its receive interrupt.
//! - All timing is measured on a wrapping `u32` millisecond counter
//!   ([`timer::Clock`]).
//! - Only driver bring-up can fail fatally; see [`node::halt`].

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub use critical_section;
pub use heapless;

pub mod ambulance;
pub mod car;
pub mod codec;
pub mod config;
pub mod consts;
pub mod indicators;
#[cfg(feature = "std")]
pub mod mock;
pub mod node;
pub mod radio;
pub mod sensors;
pub mod timer;
