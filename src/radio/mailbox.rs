//! Single-slot mailbox between the radio receive interrupt and the super-loop.
//!
//! The receive callback (producer, interrupt context) writes at most one frame
//! into the slot and then raises the `pending` flag. The super-loop (consumer)
//! clears the flag and copies the frame out inside the same critical section, so
//! it can never observe a half-written buffer.
//!
//! ## Overflow policy
//!
//! Newest wins: a frame published while another is still pending replaces it and
//! bumps [`MailboxStats::overwritten`]. Payloads that are empty or larger than
//! [`MAX_FRAME_LEN`] are refused in the interrupt and counted in
//! [`MailboxStats::dropped`].
//!
//! ## Example
//! ```rust
//! use v2v433::radio::mailbox::Mailbox;
//!
//! static RX_MAILBOX: Mailbox = Mailbox::new();
//!
//! // in the radio's receive interrupt
//! let _ = RX_MAILBOX.publish(br#"{"type":"ambulance_ack","from":"a","status":"ok"}"#);
//!
//! // in the super-loop
//! if let Some(frame) = RX_MAILBOX.take() {
//!     assert!(frame.starts_with(b"{"));
//! }
//! ```

use crate::consts::MAX_FRAME_LEN;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use critical_section::Mutex;
use heapless::Vec;

/// An owned copy of one received radio payload.
pub type ReceivedFrame = Vec<u8, MAX_FRAME_LEN>;

/// Receive-path counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct MailboxStats {
    /// Frames accepted into the slot.
    pub published: u16,
    /// Pending frames replaced by a newer one before the loop consumed them.
    pub overwritten: u16,
    /// Payloads refused in the interrupt (empty or oversized).
    pub dropped: u16,
}

struct Slot {
    frame: ReceivedFrame,
    stats: MailboxStats,
}

/// A single-producer/single-consumer, one-frame mailbox.
///
/// Place it in a `static` and hand the reference to the radio adapter via
/// [`crate::radio::Radio::on_receive`].
pub struct Mailbox {
    pending: AtomicBool,
    slot: Mutex<RefCell<Slot>>,
}

impl Mailbox {
    /// Creates an empty mailbox. Usable in `static` initialisers.
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            slot: Mutex::new(RefCell::new(Slot {
                frame: Vec::new(),
                stats: MailboxStats {
                    published: 0,
                    overwritten: 0,
                    dropped: 0,
                },
            })),
        }
    }

    /// Stores `payload` as the pending frame. Called from the receive interrupt.
    ///
    /// # Returns
    /// `true` if the payload was stored, `false` if it was refused.
    pub fn publish(&self, payload: &[u8]) -> bool {
        self.publish_with(payload.len(), |buf| buf.copy_from_slice(payload))
    }

    /// Stores a `len`-byte frame written in place by `fill`.
    ///
    /// Lets a driver adapter copy straight out of the radio FIFO into the slot.
    /// `fill` receives a zeroed buffer of exactly `len` bytes and runs inside the
    /// critical section, so it must be short.
    ///
    /// # Returns
    /// `true` if the frame was stored, `false` if `len` is `0` or exceeds
    /// [`MAX_FRAME_LEN`].
    pub fn publish_with<F: FnOnce(&mut [u8])>(&self, len: usize, fill: F) -> bool {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            if len == 0 || len > MAX_FRAME_LEN {
                slot.stats.dropped = slot.stats.dropped.wrapping_add(1);
                return false;
            }
            if self.pending.load(Ordering::Relaxed) {
                slot.stats.overwritten = slot.stats.overwritten.wrapping_add(1);
            }
            slot.frame.clear();
            // Cannot fail: `len` was checked against the capacity above.
            let _ = slot.frame.resize_default(len);
            fill(&mut slot.frame);
            slot.stats.published = slot.stats.published.wrapping_add(1);
            // Flag goes up only after the buffer is complete.
            self.pending.store(true, Ordering::Release);
            true
        })
    }

    /// Takes the pending frame, if any. Never blocks.
    pub fn take(&self) -> Option<ReceivedFrame> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            if !self.pending.load(Ordering::Acquire) {
                return None;
            }
            // Cleared before the copy; a later publish re-raises it.
            self.pending.store(false, Ordering::Release);
            let frame = slot.frame.clone();
            slot.frame.clear();
            Some(frame)
        })
    }

    /// Whether a frame is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Snapshot of the receive-path counters.
    pub fn stats(&self) -> MailboxStats {
        critical_section::with(|cs| self.slot.borrow_ref(cs).stats)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("pending", &self.is_pending())
            .field("stats", &self.stats())
            .finish()
    }
}
