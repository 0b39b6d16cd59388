//! Non-blocking sensor inputs.
//!
//! - [`imu`]: acceleration samples and crash magnitude
//! - [`gps`]: NMEA position tracking with a latched "fix acquired" flag
//!
//! Sensor failures never reach the state machines: a failed IMU read looks like
//! a vehicle at rest and a failed serial read looks like "no new bytes".

pub mod gps;
pub mod imu;

pub use gps::{Gps, GpsFix, NmeaGps};
pub use imu::{Acceleration, Imu, sample_or_rest};
