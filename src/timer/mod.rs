//! Millisecond clock and super-loop helpers.
//!
//! Every timeout in the crate is expressed as "time since a recorded instant"
//! on a free-running `u32` millisecond counter. The counter wraps after about
//! 49.7 days, so comparisons are always done on wrapping differences and never
//! on absolute deadlines.
//!
//! Contains:
//! - [`Clock`]: the monotonic millisecond source consumed by the state machines
//! - [`elapsed_ms`] / [`has_elapsed`]: wrap-safe interval arithmetic
//! - `run_super_loop` / `run_for`: blocking super-loop drivers built on
//!   `embedded_hal::delay::DelayNs` (feature `delay-loop`)

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

/// A free-running millisecond counter.
///
/// Implementations typically wrap a hardware timer (`millis()` on Arduino-style
/// platforms, `embassy_time::Instant` or a SysTick counter elsewhere). The value
/// is allowed to wrap around `u32::MAX`.
pub trait Clock {
    /// Current value of the counter, in milliseconds.
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed between `since` and `now`, tolerating one wraparound.
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whether at least `duration` milliseconds have passed since `since`.
#[inline]
pub const fn has_elapsed(now: u32, since: u32, duration: u32) -> bool {
    elapsed_ms(now, since) >= duration
}
