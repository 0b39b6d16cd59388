//! JSON message codec for the radio payload.
//!
//! Every frame carries exactly one UTF-8 JSON object:
//!
//! ```text
//! {"type":"crash_alert","from":"<id>","lat":<float>,"lon":<float>}
//! {"type":"ambulance_ack","from":"<id>","status":"on_the_way"}
//! ```
//!
//! ## Rules
//!
//! - Unknown fields are ignored.
//! - A recognised `type` with a missing field yields [`DecodeError::MissingField`].
//! - Any other `type` yields [`DecodeError::UnknownType`]; callers drop the frame.
//! - Anything that is not a JSON object yields [`DecodeError::Syntax`].
//!
//! Encoding writes straight into the returned [`EncodedMessage`]; decoding
//! unescapes string fields through a [`MAX_MESSAGE_LEN`] scratch buffer and
//! copies them into fixed-capacity strings. Neither direction touches a heap.

use crate::config::{NodeId, Status, is_printable};
use crate::consts::{
    MAX_ID_LEN, MAX_MESSAGE_LEN, MAX_STATUS_LEN, TYPE_AMBULANCE_ACK, TYPE_CRASH_ALERT,
};
use core::fmt;
use heapless::{String, Vec};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// An encoded message, ready to hand to [`crate::radio::RadioLink::send`].
pub type EncodedMessage = Vec<u8, MAX_MESSAGE_LEN>;

/// A protocol message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Message {
    /// Broadcast by the crashed car until it is acknowledged.
    CrashAlert {
        /// Identifier of the crashed car.
        from: NodeId,
        /// Last known latitude, in degrees (`0.0` without a fix).
        lat: f32,
        /// Last known longitude, in degrees (`0.0` without a fix).
        lon: f32,
    },
    /// Broadcast by the ambulance while it responds.
    AmbulanceAck {
        /// Identifier of the ambulance.
        from: NodeId,
        /// Free-form status, e.g. `on_the_way`.
        status: Status,
    },
}

impl Message {
    /// The wire discriminant of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CrashAlert { .. } => TYPE_CRASH_ALERT,
            Message::AmbulanceAck { .. } => TYPE_AMBULANCE_ACK,
        }
    }

    /// Identifier of the sending node.
    pub fn sender(&self) -> &str {
        match self {
            Message::CrashAlert { from, .. } | Message::AmbulanceAck { from, .. } => from.as_str(),
        }
    }
}

/// Reasons a received frame is not a usable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DecodeError {
    /// Not a JSON object, or a field of the wrong JSON type.
    #[error("malformed JSON")]
    Syntax,
    /// The `type` discriminant is not one this node understands.
    #[error("unknown message type")]
    UnknownType,
    /// A field required by the message type is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A string field is longer than its fixed capacity.
    #[error("field `{0}` exceeds its capacity")]
    FieldTooLong(&'static str),
    /// A string field contains a control character.
    #[error("field `{0}` contains a control character")]
    ControlCharacter(&'static str),
    /// The frame is larger than any well-formed message.
    #[error("frame exceeds {} bytes", MAX_MESSAGE_LEN)]
    Oversized,
}

/// Reasons a message cannot be put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum EncodeError {
    /// A coordinate is NaN or infinite, which JSON cannot express.
    #[error("coordinate is not finite")]
    NonFinite,
    /// The JSON text does not fit in one frame.
    #[error("message exceeds {} bytes", MAX_MESSAGE_LEN)]
    Overflow,
}

// Field order here is the field order on the wire.
#[derive(Serialize)]
struct CrashAlertOut<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    from: &'a str,
    lat: f32,
    lon: f32,
}

#[derive(Serialize)]
struct AmbulanceAckOut<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    from: &'a str,
    status: &'a str,
}

/// An unescaped string field, or the note that it did not fit in `N` bytes.
enum Text<const N: usize> {
    Fits(String<N>),
    TooLong,
}

impl<'de, const N: usize> Deserialize<'de> for Text<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for TextVisitor<N> {
            type Value = Text<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Text<N>, E> {
                Ok(String::try_from(v).map_or(Text::TooLong, Text::Fits))
            }
        }

        deserializer.deserialize_str(TextVisitor::<N>)
    }
}

// Union of every known field; unknown ones are skipped by serde.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<Text<MAX_ID_LEN>>,
    #[serde(default)]
    from: Option<Text<MAX_ID_LEN>>,
    #[serde(default)]
    lat: Option<f32>,
    #[serde(default)]
    lon: Option<f32>,
    #[serde(default)]
    status: Option<Text<MAX_STATUS_LEN>>,
}

/// Encodes `msg` into its JSON wire form.
///
/// # Errors
/// - [`EncodeError::NonFinite`] if a coordinate is NaN or infinite
/// - [`EncodeError::Overflow`] if the JSON does not fit in [`MAX_MESSAGE_LEN`] bytes
pub fn encode(msg: &Message) -> Result<EncodedMessage, EncodeError> {
    let mut frame = EncodedMessage::new();
    let _ = frame.resize_default(MAX_MESSAGE_LEN);
    let len = match msg {
        Message::CrashAlert { from, lat, lon } => {
            if !lat.is_finite() || !lon.is_finite() {
                return Err(EncodeError::NonFinite);
            }
            let out = CrashAlertOut {
                kind: TYPE_CRASH_ALERT,
                from: from.as_str(),
                lat: *lat,
                lon: *lon,
            };
            serde_json_core::to_slice(&out, &mut frame)
        }
        Message::AmbulanceAck { from, status } => {
            let out = AmbulanceAckOut {
                kind: TYPE_AMBULANCE_ACK,
                from: from.as_str(),
                status: status.as_str(),
            };
            serde_json_core::to_slice(&out, &mut frame)
        }
    }
    .map_err(|_| EncodeError::Overflow)?;

    frame.truncate(len);
    Ok(frame)
}

/// Decodes a received frame into a [`Message`].
///
/// # Errors
/// See [`DecodeError`]. Every error means "drop this frame".
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    if bytes.len() > MAX_MESSAGE_LEN {
        return Err(DecodeError::Oversized);
    }
    // An unescaped string is never longer than its escaped form.
    let mut scratch = [0u8; MAX_MESSAGE_LEN];
    let (envelope, _) = serde_json_core::from_slice_escaped::<Envelope>(bytes, &mut scratch)
        .map_err(|_| DecodeError::Syntax)?;

    let kind = match envelope.kind {
        None => return Err(DecodeError::MissingField("type")),
        Some(Text::Fits(kind)) => kind,
        Some(Text::TooLong) => return Err(DecodeError::UnknownType),
    };
    match kind.as_str() {
        TYPE_CRASH_ALERT => Ok(Message::CrashAlert {
            from: required_text(envelope.from, "from")?,
            lat: envelope.lat.ok_or(DecodeError::MissingField("lat"))?,
            lon: envelope.lon.ok_or(DecodeError::MissingField("lon"))?,
        }),
        TYPE_AMBULANCE_ACK => {
            let status: Status = required_text(envelope.status, "status")?;
            Ok(Message::AmbulanceAck {
                from: required_text(envelope.from, "from")?,
                status,
            })
        }
        _ => Err(DecodeError::UnknownType),
    }
}

fn required_text<const N: usize>(
    field: Option<Text<N>>,
    name: &'static str,
) -> Result<String<N>, DecodeError> {
    match field {
        None => Err(DecodeError::MissingField(name)),
        Some(Text::TooLong) => Err(DecodeError::FieldTooLong(name)),
        Some(Text::Fits(text)) if !is_printable(&text) => Err(DecodeError::ControlCharacter(name)),
        Some(Text::Fits(text)) => Ok(text),
    }
}
