//! GPS input (NMEA 0183 over a serial line).
//!
//! [`NmeaGps`] drains whatever bytes the UART has buffered, feeds them through
//! an `nmea0183` parser and keeps the last decoded position. Only the
//! location-bearing sentences (GGA and RMC) are consumed; everything else is
//! skipped by the parser.
//!
//! The fix model is [`GpsFix`]: coordinates may be updated by later sentences,
//! but once the first valid fix has been decoded the `acquired` flag stays set
//! for the rest of the power cycle.

use crate::consts::GPS_MAX_BYTES_PER_POLL;
use embedded_hal_nb::serial::Read;
use nmea0183::{ParseResult, Parser};

/// Driver interface of the position source.
pub trait Gps {
    /// Consumes any pending input and updates the fix. Never blocks.
    fn poll(&mut self);

    /// Last known `(lat, lon)` in degrees, if a fix was ever acquired.
    fn fix(&self) -> Option<(f32, f32)>;
}

/// Last known position plus the latched "fix acquired" flag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct GpsFix {
    position: Option<(f32, f32)>,
    acquired: bool,
}

impl GpsFix {
    /// No fix yet.
    pub const fn new() -> Self {
        Self {
            position: None,
            acquired: false,
        }
    }

    /// Records a decoded position. Sets `acquired` for good.
    pub fn update(&mut self, lat: f32, lon: f32) {
        self.position = Some((lat, lon));
        self.acquired = true;
    }

    /// Last known `(lat, lon)`.
    pub fn position(&self) -> Option<(f32, f32)> {
        self.position
    }

    /// Whether a valid fix has ever been decoded.
    pub fn acquired(&self) -> bool {
        self.acquired
    }
}

/// GPS parsing counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct GpsStats {
    /// Location-bearing sentences that produced a position.
    pub fixes: u16,
    /// Sentences the parser rejected (bad checksum, malformed fields).
    pub parse_errors: u16,
    /// Serial read errors (overrun, framing, noise).
    pub serial_errors: u16,
}

/// A [`Gps`] backed by an NMEA 0183 serial stream (9600 baud on the reference
/// hardware).
///
/// The serial port is any non-blocking `embedded_hal_nb::serial::Read<u8>`.
pub struct NmeaGps<S> {
    serial: S,
    parser: Parser,
    fix: GpsFix,
    stats: GpsStats,
}

impl<S> core::fmt::Debug for NmeaGps<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NmeaGps")
            .field("fix", &self.fix)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<S: Read<u8>> NmeaGps<S> {
    /// Wraps a serial port.
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            parser: Parser::new(),
            fix: GpsFix::new(),
            stats: GpsStats::default(),
        }
    }

    /// Feeds raw NMEA bytes, as if they had been read from the serial port.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.feed_byte(byte);
        }
    }

    fn feed_byte(&mut self, byte: u8) {
        let Some(result) = self.parser.parse_from_byte(byte) else {
            return;
        };
        match result {
            Ok(ParseResult::GGA(Some(gga))) => {
                self.record(gga.latitude.as_f64() as f32, gga.longitude.as_f64() as f32);
            }
            Ok(ParseResult::RMC(Some(rmc))) => {
                self.record(rmc.latitude.as_f64() as f32, rmc.longitude.as_f64() as f32);
            }
            // Sentences without a position, or reporting no fix.
            Ok(_) => {}
            Err(_) => {
                self.stats.parse_errors = self.stats.parse_errors.wrapping_add(1);
                trace!("NMEA sentence rejected");
            }
        }
    }

    fn record(&mut self, lat: f32, lon: f32) {
        if !self.fix.acquired() {
            info!("GPS fix acquired: {}, {}", lat, lon);
        }
        self.fix.update(lat, lon);
        self.stats.fixes = self.stats.fixes.wrapping_add(1);
    }

    /// Current fix state.
    pub fn state(&self) -> GpsFix {
        self.fix
    }

    /// Parsing counters.
    pub fn stats(&self) -> GpsStats {
        self.stats
    }

    /// Releases the serial port.
    pub fn release(self) -> S {
        self.serial
    }
}

impl<S: Read<u8>> Gps for NmeaGps<S> {
    fn poll(&mut self) {
        for _ in 0..GPS_MAX_BYTES_PER_POLL {
            match self.serial.read() {
                Ok(byte) => self.feed_byte(byte),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    self.stats.serial_errors = self.stats.serial_errors.wrapping_add(1);
                    break;
                }
            }
        }
    }

    fn fix(&self) -> Option<(f32, f32)> {
        self.fix.position()
    }
}
