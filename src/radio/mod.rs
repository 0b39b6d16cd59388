//! Half-duplex framed radio link.
//!
//! This module provides [`RadioLink`], the framed send/receive layer both nodes
//! use to talk over the shared 433 MHz channel, on top of a platform [`Radio`]
//! adapter (an SX1278-class LoRa modem in the reference hardware).
//!
//! ## Contract
//!
//! - [`RadioLink::send`] transmits one frame and blocks until it has left the
//!   transmitter (one frame time, tens of milliseconds), then puts the radio
//!   back into receive mode.
//! - [`RadioLink::poll`] never blocks; it returns the frame buffered by the
//!   receive interrupt since the last poll, if any.
//! - The receive interrupt writes into a [`Mailbox`]: one slot, newest wins.
//!
//! ## Example
//!
//! ```rust,ignore
//! static RX_MAILBOX: Mailbox = Mailbox::new();
//!
//! let mut link = RadioLink::new(lora, &RX_MAILBOX)?;
//! link.send(b"{\"type\":\"crash_alert\",...}")?;
//! while let Some(frame) = link.poll() {
//!     // decode and dispatch
//! }
//! ```

pub mod mailbox;

use crate::consts::MAX_FRAME_LEN;
use crate::node::InitError;
use mailbox::{Mailbox, ReceivedFrame};

/// Driver interface of the sub-GHz modem.
///
/// Implemented by the platform adapter. The adapter's receive interrupt must
/// publish every received payload into the mailbox registered with
/// [`on_receive`](Radio::on_receive).
pub trait Radio {
    /// Error type of the underlying driver.
    type Error;

    /// Transmits one frame, blocking until it has left the transmitter.
    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Puts the modem into continuous receive mode.
    fn start_rx(&mut self) -> Result<(), Self::Error>;

    /// Registers the mailbox the receive interrupt publishes into.
    fn on_receive(&mut self, mailbox: &'static Mailbox);
}

/// Errors returned by [`RadioLink::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SendError {
    /// The frame is longer than [`MAX_FRAME_LEN`] bytes.
    #[error("frame exceeds {} bytes", MAX_FRAME_LEN)]
    Oversized,
    /// The driver failed to transmit the frame.
    #[error("transmit failed")]
    Transmit,
    /// The frame went out but the modem did not return to receive mode.
    #[error("failed to re-enter receive mode")]
    Receive,
}

/// Transmit/receive counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames handed to the transmitter successfully.
    pub tx_good: u16,
    /// Frames that failed to transmit.
    pub tx_bad: u16,
    /// Frames taken from the mailbox.
    pub rx_frames: u16,
}

/// A framed, half-duplex link over a [`Radio`] adapter.
#[derive(Debug)]
pub struct RadioLink<R> {
    radio: R,
    mailbox: &'static Mailbox,
    stats: LinkStats,
}

impl<R: Radio> RadioLink<R> {
    /// Wires the receive path to `mailbox` and enters receive mode.
    ///
    /// # Errors
    /// [`InitError::Radio`] if the modem refuses to enter receive mode.
    pub fn new(mut radio: R, mailbox: &'static Mailbox) -> Result<Self, InitError> {
        radio.on_receive(mailbox);
        radio.start_rx().map_err(|_| InitError::Radio)?;
        Ok(Self {
            radio,
            mailbox,
            stats: LinkStats::default(),
        })
    }

    /// Transmits one frame and returns the link to receive mode.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), SendError> {
        if frame.len() > MAX_FRAME_LEN {
            self.stats.tx_bad = self.stats.tx_bad.wrapping_add(1);
            return Err(SendError::Oversized);
        }
        let sent = self.radio.send(frame).map_err(|_| SendError::Transmit);
        // Back to listening whatever happened to the frame.
        let rx = self.radio.start_rx().map_err(|_| SendError::Receive);
        match sent {
            Ok(()) => self.stats.tx_good = self.stats.tx_good.wrapping_add(1),
            Err(_) => self.stats.tx_bad = self.stats.tx_bad.wrapping_add(1),
        }
        sent.and(rx)
    }

    /// Returns the frame received since the last poll, if any. Never blocks.
    pub fn poll(&mut self) -> Option<ReceivedFrame> {
        let frame = self.mailbox.take()?;
        self.stats.rx_frames = self.stats.rx_frames.wrapping_add(1);
        Some(frame)
    }

    /// Transmit/receive counters.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// The mailbox fed by the receive interrupt.
    pub fn mailbox(&self) -> &'static Mailbox {
        self.mailbox
    }

    /// Shared access to the underlying driver.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Exclusive access to the underlying driver.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeRadio {
        sent: u8,
        rx_starts: u8,
        fail_send: bool,
        registered: bool,
    }

    impl Radio for FakeRadio {
        type Error = ();

        fn send(&mut self, _frame: &[u8]) -> Result<(), ()> {
            if self.fail_send {
                return Err(());
            }
            self.sent += 1;
            Ok(())
        }

        fn start_rx(&mut self) -> Result<(), ()> {
            self.rx_starts += 1;
            Ok(())
        }

        fn on_receive(&mut self, _mailbox: &'static Mailbox) {
            self.registered = true;
        }
    }

    #[test]
    fn test_new_registers_and_listens() {
        static MAILBOX: Mailbox = Mailbox::new();
        let link = RadioLink::new(FakeRadio::default(), &MAILBOX).unwrap();
        assert!(link.radio().registered);
        assert_eq!(link.radio().rx_starts, 1);
    }

    #[test]
    fn test_send_returns_to_rx() {
        static MAILBOX: Mailbox = Mailbox::new();
        let mut link = RadioLink::new(FakeRadio::default(), &MAILBOX).unwrap();
        assert_eq!(link.send(b"{}"), Ok(()));
        assert_eq!(link.radio().sent, 1);
        assert_eq!(link.radio().rx_starts, 2);
        assert_eq!(link.stats().tx_good, 1);
    }

    #[test]
    fn test_send_failure_still_returns_to_rx() {
        static MAILBOX: Mailbox = Mailbox::new();
        let radio = FakeRadio {
            fail_send: true,
            ..FakeRadio::default()
        };
        let mut link = RadioLink::new(radio, &MAILBOX).unwrap();
        assert_eq!(link.send(b"{}"), Err(SendError::Transmit));
        assert_eq!(link.radio().rx_starts, 2);
        assert_eq!(link.stats().tx_bad, 1);
    }

    #[test]
    fn test_oversized_frame_is_not_sent() {
        static MAILBOX: Mailbox = Mailbox::new();
        let mut link = RadioLink::new(FakeRadio::default(), &MAILBOX).unwrap();
        assert_eq!(link.send(&[0u8; MAX_FRAME_LEN + 1]), Err(SendError::Oversized));
        assert_eq!(link.radio().sent, 0);
    }

    #[test]
    fn test_poll_drains_mailbox() {
        static MAILBOX: Mailbox = Mailbox::new();
        let mut link = RadioLink::new(FakeRadio::default(), &MAILBOX).unwrap();
        assert!(link.poll().is_none());
        assert!(MAILBOX.publish(b"hello"));
        assert_eq!(link.poll().as_deref(), Some(&b"hello"[..]));
        assert!(link.poll().is_none());
        assert_eq!(link.stats().rx_frames, 1);
    }
}
