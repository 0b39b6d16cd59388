//! Local indication: a two-line character display, an LED and a buzzer.
//!
//! The display is abstracted by [`Display`]; every line written through this
//! module is fitted to [`DISPLAY_COLUMNS`] columns first (truncated, or padded
//! with spaces so stale characters are overwritten). The LED and the buzzer are
//! plain level-driven GPIOs, used through `embedded_hal::digital::OutputPin`.
//!
//! Indicator failures are never fatal: they are logged and the caller carries on.

use crate::consts::DISPLAY_COLUMNS;
use embedded_hal::digital::{OutputPin, PinState};
use heapless::String;

/// A text line fitted to the display width.
pub type Line = String<DISPLAY_COLUMNS>;

/// Row of the two-line display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Row {
    /// First line.
    Top,
    /// Second line.
    Bottom,
}

impl Row {
    /// Zero-based row index, as most character LCD drivers expect it.
    pub const fn index(self) -> u8 {
        match self {
            Row::Top => 0,
            Row::Bottom => 1,
        }
    }
}

/// Driver interface of a 16x2 character display.
pub trait Display {
    /// Error type of the underlying driver.
    type Error;

    /// Blanks the whole display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Writes `text` at the start of `row`.
    ///
    /// `text` is at most [`DISPLAY_COLUMNS`] columns wide when it comes from
    /// this crate.
    fn line(&mut self, row: Row, text: &str) -> Result<(), Self::Error>;
}

/// Truncates or pads `text` to exactly [`DISPLAY_COLUMNS`] columns.
pub fn fit_line(text: &str) -> Line {
    let mut line = Line::new();
    for ch in text.chars() {
        if line.push(ch).is_err() {
            break;
        }
    }
    while line.len() < DISPLAY_COLUMNS {
        if line.push(' ').is_err() {
            break;
        }
    }
    line
}

/// Two lines shown together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Banner<'a> {
    /// Text of the first line.
    pub top: &'a str,
    /// Text of the second line.
    pub bottom: &'a str,
}

/// Crashed car, crash detected.
pub const CRASH_BANNER: Banner<'static> = Banner {
    top: "CRASH DETECTED!",
    bottom: "Calling for help",
};

/// Crashed car, acknowledgement received.
pub const ACK_BANNER: Banner<'static> = Banner {
    top: "ACK RECEIVED!",
    bottom: "Help is on way!",
};

/// Ambulance, alert received.
pub const ALERT_BANNER: Banner<'static> = Banner {
    top: "CRASH ALERT RX'd!",
    bottom: "Status: RESPOND",
};

/// Crashed car, waiting for the first GPS fix.
pub const GPS_SEARCHING: &str = "GPS: Searching...";

/// Crashed car, first GPS fix acquired.
pub const STATUS_NORMAL: &str = "Status: NORMAL";

/// Ambulance, listening for alerts.
pub const STATUS_PATROL: &str = "Status: PATROL";

/// Ambulance, response window closed.
pub const STATUS_STANDBY: &str = "Status: STANDBY";

/// Clears the display and shows `banner`.
pub fn show_banner<D: Display>(display: &mut D, banner: &Banner<'_>) {
    if display.clear().is_err() {
        warn!("display clear failed");
    }
    write_line(display, Row::Top, banner.top);
    write_line(display, Row::Bottom, banner.bottom);
}

/// Writes one fitted line.
pub fn write_line<D: Display>(display: &mut D, row: Row, text: &str) {
    let line = fit_line(text);
    if display.line(row, &line).is_err() {
        warn!("display write failed on row {}", row.index());
    }
}

/// Drives an LED or buzzer pin to `on`.
pub fn drive_pin<P: OutputPin>(pin: &mut P, on: bool) {
    if pin.set_state(PinState::from(on)).is_err() {
        warn!("indicator pin write failed");
    }
}
