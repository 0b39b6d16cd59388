//! Node-level plumbing shared by both roles.
//!
//! A node is one microcontroller running one role: the crashed car
//! ([`crate::car::CrashedCarNode`]) or the ambulance
//! ([`crate::ambulance::AmbulanceNode`]). Each owns its peripherals and its
//! state machine, and is advanced by calling [`Node::step`] once per
//! super-loop iteration.
//!
//! During operation no error is fatal. Only a driver that fails to come up
//! during setup stops the node, through [`halt`].

use crate::indicators::{Banner, Display, show_banner};

/// One iteration of a node's cooperative super-loop.
pub trait Node {
    /// Drains the radio mailbox into the state machine, then ticks it once.
    fn step(&mut self);
}

/// A driver failed to initialise. The only fatal error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum InitError {
    /// The radio modem did not come up.
    #[error("radio initialisation failed")]
    Radio,
    /// The accelerometer did not answer.
    #[error("IMU initialisation failed")]
    Imu,
    /// The GPS serial port could not be opened.
    #[error("GPS initialisation failed")]
    Gps,
    /// The display did not answer.
    #[error("display initialisation failed")]
    Display,
}

impl InitError {
    /// Diagnostic line shown on the display before halting.
    pub const fn diagnostic(&self) -> &'static str {
        match self {
            InitError::Radio => "LoRa FAILED!",
            InitError::Imu => "IMU FAILED!",
            InitError::Gps => "GPS FAILED!",
            InitError::Display => "LCD FAILED!",
        }
    }
}

/// Shows the diagnostic for `err` under the node's identifier.
pub fn report_init_failure<D: Display>(display: &mut D, node: &str, err: InitError) {
    error!("{}: {}", node, err.diagnostic());
    show_banner(
        display,
        &Banner {
            top: node,
            bottom: err.diagnostic(),
        },
    );
}

/// Reports `err` and stops the node for good.
pub fn halt<D: Display>(display: &mut D, node: &str, err: InitError) -> ! {
    report_init_failure(display, node, err);
    loop {
        core::hint::spin_loop();
    }
}
