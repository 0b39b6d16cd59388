//! Per-node run-time configuration.
//!
//! The design values live in [`crate::consts`]; the structs here carry them
//! into the state machines so a bench setup can shorten windows or change
//! identifiers without touching the protocol code.

use crate::consts::{
    ACK_BROADCAST_DURATION_MS, ACK_BROADCAST_INTERVAL_MS, BUZZER_PULSE_MS, CRASH_THRESHOLD_G,
    DEFAULT_AMBULANCE_ID, DEFAULT_CAR_ID, LISTEN_WINDOW_MS, MAX_ID_LEN, MAX_STATUS_LEN,
    STATUS_ON_THE_WAY,
};
use heapless::String;

/// Identifier of a node on the wire (UTF-8, at most [`MAX_ID_LEN`] bytes).
pub type NodeId = String<MAX_ID_LEN>;

/// Status text carried by an acknowledgement.
pub type Status = String<MAX_STATUS_LEN>;

/// Errors raised while building a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ConfigError {
    /// The node identifier is empty.
    #[error("node id is empty")]
    IdEmpty,
    /// The node identifier does not fit in [`MAX_ID_LEN`] bytes.
    #[error("node id exceeds {} bytes", MAX_ID_LEN)]
    IdTooLong,
    /// The status text does not fit in [`MAX_STATUS_LEN`] bytes.
    #[error("status exceeds {} bytes", MAX_STATUS_LEN)]
    StatusTooLong,
    /// The text contains a control character.
    #[error("control character in text field")]
    ControlCharacter,
}

/// Whether `text` is free of control characters.
///
/// Each control character costs six bytes on the wire (`\u00XX`), so only
/// printable text keeps a full-length field inside one frame.
pub fn is_printable(text: &str) -> bool {
    !text.chars().any(char::is_control)
}

/// Builds a [`NodeId`] from a string slice.
pub fn node_id(id: &str) -> Result<NodeId, ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::IdEmpty);
    }
    if !is_printable(id) {
        return Err(ConfigError::ControlCharacter);
    }
    NodeId::try_from(id).map_err(|_| ConfigError::IdTooLong)
}

/// Builds a [`Status`] from a string slice.
pub fn status(text: &str) -> Result<Status, ConfigError> {
    if !is_printable(text) {
        return Err(ConfigError::ControlCharacter);
    }
    Status::try_from(text).map_err(|_| ConfigError::StatusTooLong)
}

/// Settings of the crashed car node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CarConfig {
    /// Identifier placed in the `from` field of every alert.
    pub id: NodeId,
    /// Acceleration magnitude, in g, above which a crash is declared.
    pub crash_threshold_g: f32,
    /// Time spent listening for an acknowledgement after each alert.
    pub listen_window_ms: u32,
}

impl CarConfig {
    /// Design values with a custom identifier.
    pub fn new(id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            id: node_id(id)?,
            ..Self::default()
        })
    }
}

impl Default for CarConfig {
    fn default() -> Self {
        let mut id = NodeId::new();
        let _ = id.push_str(DEFAULT_CAR_ID);
        Self {
            id,
            crash_threshold_g: CRASH_THRESHOLD_G,
            listen_window_ms: LISTEN_WINDOW_MS,
        }
    }
}

/// Settings of the ambulance node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AmbulanceConfig {
    /// Identifier placed in the `from` field of every acknowledgement.
    pub id: NodeId,
    /// Length of the response window.
    pub ack_duration_ms: u32,
    /// Minimum spacing between two acknowledgements.
    pub ack_interval_ms: u32,
    /// Buzzer on-time at the start of every acknowledgement period.
    pub buzzer_pulse_ms: u32,
    /// Status text sent with every acknowledgement.
    pub status: Status,
    /// Return to patrolling once the response window has closed.
    ///
    /// Off by default: the node commits to a single incident per power cycle.
    pub rearm: bool,
}

impl AmbulanceConfig {
    /// Design values with a custom identifier.
    pub fn new(id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            id: node_id(id)?,
            ..Self::default()
        })
    }
}

impl Default for AmbulanceConfig {
    fn default() -> Self {
        let mut id = NodeId::new();
        let _ = id.push_str(DEFAULT_AMBULANCE_ID);
        let mut status = Status::new();
        let _ = status.push_str(STATUS_ON_THE_WAY);
        Self {
            id,
            ack_duration_ms: ACK_BROADCAST_DURATION_MS,
            ack_interval_ms: ACK_BROADCAST_INTERVAL_MS,
            buzzer_pulse_ms: BUZZER_PULSE_MS,
            status,
            rearm: false,
        }
    }
}
