//! Constants used across the crash alert protocol.
//!
//! This module defines the protocol-wide constants used for buffer sizing,
//! timing windows, crash detection and the indicator layout.
//!
//! ## Key Concepts
//!
//! - **Frames**: a radio payload is at most [`MAX_FRAME_LEN`] bytes; a well-formed
//!   message never exceeds [`MAX_MESSAGE_LEN`] bytes of JSON.
//! - **Windows**: all durations are milliseconds measured on a free-running `u32`
//!   counter and compared with wrapping subtraction (see [`crate::timer`]).
//! - **Crash detection**: the total acceleration magnitude, in g, must exceed
//!   [`CRASH_THRESHOLD_G`].
//!
//! Both nodes must agree on the radio constants; the timing constants only shape
//! the local behaviour of each node and can be overridden through [`crate::config`].

/// Carrier frequency of the shared channel (SX1278-class link, default modulation).
pub const RADIO_FREQUENCY_HZ: u32 = 433_000_000;

/// Maximum size (in bytes) of a single radio frame.
pub const MAX_FRAME_LEN: usize = 255;

/// Maximum size (in bytes) of an encoded JSON message.
///
/// This is also the capacity of an encoded frame and of the decoder's scratch buffer.
pub const MAX_MESSAGE_LEN: usize = 200;

/// Maximum length (in bytes) of a node identifier.
pub const MAX_ID_LEN: usize = 32;

/// Maximum length (in bytes) of an acknowledgement status string.
pub const MAX_STATUS_LEN: usize = 32;

/// Standard gravity, used to convert m/s² into g.
pub const STANDARD_GRAVITY: f32 = 9.81;

/// Total acceleration (in g) above which the crashed car declares a crash.
pub const CRASH_THRESHOLD_G: f32 = 3.0;

/// How long the crashed car listens for an acknowledgement after each alert.
pub const LISTEN_WINDOW_MS: u32 = 2_000;

/// How long the ambulance keeps acknowledging after the first alert.
pub const ACK_BROADCAST_DURATION_MS: u32 = 15_000;

/// Minimum spacing between two acknowledgements.
pub const ACK_BROADCAST_INTERVAL_MS: u32 = 500;

/// Buzzer on-time at the start of every acknowledgement period.
pub const BUZZER_PULSE_MS: u32 = 100;

/// Baud rate of the GPS serial line.
pub const GPS_BAUD_RATE: u32 = 9_600;

/// Upper bound on the number of GPS bytes consumed by a single poll.
///
/// At 9600 baud roughly 10 bytes arrive per millisecond, so this drains a
/// typical UART FIFO without letting one poll starve the super-loop.
pub const GPS_MAX_BYTES_PER_POLL: usize = 128;

/// Width of a display line, in columns.
pub const DISPLAY_COLUMNS: usize = 16;

/// Default identifier of the crashed car node.
pub const DEFAULT_CAR_ID: &str = "crashed_car_01";

/// Default identifier of the ambulance node.
pub const DEFAULT_AMBULANCE_ID: &str = "ambulance_01";

/// Status carried by every acknowledgement by default.
pub const STATUS_ON_THE_WAY: &str = "on_the_way";

/// Wire discriminant of a crash alert.
pub const TYPE_CRASH_ALERT: &str = "crash_alert";

/// Wire discriminant of an ambulance acknowledgement.
pub const TYPE_AMBULANCE_ACK: &str = "ambulance_ack";
