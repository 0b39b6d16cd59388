//! Inertial measurement unit input.

use crate::consts::STANDARD_GRAVITY;
use libm::sqrtf;

/// One acceleration sample, in m/s².
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Acceleration {
    /// X axis.
    pub x: f32,
    /// Y axis.
    pub y: f32,
    /// Z axis.
    pub z: f32,
}

impl Acceleration {
    /// The all-zero sample reported when the IMU cannot be read.
    pub const REST: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Builds a sample from its three axes.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Total acceleration magnitude, in g.
    ///
    /// `sqrt(x² + y² + z²) / 9.81`
    pub fn magnitude_g(&self) -> f32 {
        sqrtf(self.x * self.x + self.y * self.y + self.z * self.z) / STANDARD_GRAVITY
    }
}

impl From<(f32, f32, f32)> for Acceleration {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self { x, y, z }
    }
}

/// Driver interface of the accelerometer.
pub trait Imu {
    /// Error type of the underlying driver.
    type Error;

    /// Most recent acceleration sample, in m/s².
    fn read(&mut self) -> Result<Acceleration, Self::Error>;
}

/// Reads `imu`, substituting [`Acceleration::REST`] for a failed read.
///
/// A zero vector has a magnitude of 0 g and therefore can never trigger a
/// crash transition.
pub fn sample_or_rest<I: Imu>(imu: &mut I) -> Acceleration {
    match imu.read() {
        Ok(sample) => sample,
        Err(_) => {
            debug!("IMU read failed, treating as rest");
            Acceleration::REST
        }
    }
}
