//! Chamber sequencer - which chamber is live, and when it fires.
//!
//! Per boot:
//! ```text
//! BOOT → READ_CHAMBER → GRACE(safe) → ARMED(timed) → COMMIT_NEXT → DISPATCH → IDLE
//!                            │              │
//!                            └──────────────┴─ power loss: nothing committed,
//!                                              same chamber next boot
//! ```
//!
//! Firmware can't observe its own power loss, so an aborted attempt is never
//! a branch in code. It is simply the missing commit. The only explicit
//! terminal transition is commit + fire.

use embedded_hal_async::delay::DelayNs;

use crate::chamber::Chamber;
use crate::config::{GRACE_MS, INDICATOR_TICK_MS, SAFE_WINDOW_MS};
use crate::error::Error;
use crate::indicator::Indicator;
use crate::store::{HeaderStore, StateStore};

/// Time source for the arming window: a monotonic millisecond counter plus
/// the platform delay.
pub trait Clock: DelayNs {
    /// Milliseconds since an arbitrary fixed point (boot, on target).
    fn now_ms(&self) -> u64;
}

/// Timing of one arming window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmingWindow {
    window_ms: u32,
    grace_ms: u32,
    tick_ms: u32,
}

/// Which half of the window we are in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Grace,
    Armed,
}

/// How a window ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The window ran to completion; the chamber fires.
    Fired,
    /// Power was removed mid-window. Never returned by firmware code (it
    /// stops running instead); simulations use it to name the outcome.
    Aborted,
}

impl ArmingWindow {
    /// The compiled-in window from `config.rs`.
    pub const DEFAULT: ArmingWindow = ArmingWindow {
        window_ms: SAFE_WINDOW_MS,
        grace_ms: GRACE_MS,
        tick_ms: INDICATOR_TICK_MS,
    };

    /// Requires `0 < grace_ms < window_ms` and a non-zero tick.
    pub const fn new(window_ms: u32, grace_ms: u32, tick_ms: u32) -> Option<Self> {
        if grace_ms == 0 || grace_ms >= window_ms || tick_ms == 0 {
            return None;
        }
        Some(Self {
            window_ms,
            grace_ms,
            tick_ms,
        })
    }

    pub const fn window_ms(&self) -> u32 {
        self.window_ms
    }

    pub const fn grace_ms(&self) -> u32 {
        self.grace_ms
    }

    pub const fn tick_ms(&self) -> u32 {
        self.tick_ms
    }

    /// Phase at `elapsed_ms` into the window, or `None` once it has expired.
    pub fn phase_at(&self, elapsed_ms: u64) -> Option<Phase> {
        if elapsed_ms < u64::from(self.grace_ms) {
            Some(Phase::Grace)
        } else if elapsed_ms < u64::from(self.window_ms) {
            Some(Phase::Armed)
        } else {
            None
        }
    }

    /// Delay until the next indicator update: one tick, clipped so it never
    /// steps over the end of the current phase.
    fn step_ms(&self, elapsed_ms: u64, phase: Phase) -> u32 {
        let end = match phase {
            Phase::Grace => self.grace_ms,
            Phase::Armed => self.window_ms,
        };
        let remaining = u64::from(end).saturating_sub(elapsed_ms);
        remaining.min(u64::from(self.tick_ms)) as u32
    }
}

/// Owns the persisted chamber index for one boot.
pub struct ChamberSequencer<S> {
    store: StateStore<S>,
}

impl<S: HeaderStore> ChamberSequencer<S> {
    /// Sequence `total` chambers persisted on `medium`.
    ///
    /// # Panics
    ///
    /// If `total` is zero.
    pub fn new(medium: S, total: u8) -> Self {
        Self {
            store: StateStore::new(medium, total),
        }
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    /// Hand the medium back (e.g. to simulate the next power cycle).
    pub fn into_medium(self) -> S {
        self.store.into_inner()
    }

    /// Initialise storage on first boot and read the live chamber.
    pub async fn begin(&mut self) -> Chamber {
        self.store.initialize_if_absent().await;
        self.store.read_chamber().await
    }

    /// Sit out the arming window: `safe()` during the grace period, `armed()`
    /// until expiry, then dark.
    ///
    /// Only returns [`Outcome::Fired`]; unplugging is the only way out and it
    /// leaves nothing behind.
    pub async fn run_window<I, C>(
        &self,
        window: &ArmingWindow,
        indicator: &mut I,
        clock: &mut C,
    ) -> Outcome
    where
        I: Indicator,
        C: Clock,
    {
        let start = clock.now_ms();
        let mut announced_armed = false;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Window open: {} ms ({} ms grace)",
            window.window_ms,
            window.grace_ms
        );

        loop {
            let elapsed = clock.now_ms().saturating_sub(start);
            let Some(phase) = window.phase_at(elapsed) else {
                break;
            };

            match phase {
                Phase::Grace => indicator.safe(),
                Phase::Armed => {
                    if !announced_armed {
                        announced_armed = true;
                        #[cfg(feature = "defmt")]
                        defmt::info!("Armed at {} ms", elapsed);
                    }
                    indicator.armed();
                }
            }

            clock.delay_ms(window.step_ms(elapsed, phase)).await;
        }

        indicator.off();
        Outcome::Fired
    }

    /// Persist the chamber after `chamber` and return it.
    ///
    /// Must run before dispatch: a payload that hangs or resets the device
    /// must not re-arm the same chamber.
    pub async fn commit_and_advance(&mut self, chamber: Chamber) -> Result<Chamber, Error> {
        let next = chamber.next(self.store.total());
        self.store.write_chamber(next).await?;

        #[cfg(feature = "defmt")]
        defmt::info!("Committed: next chamber {}", next.index());

        Ok(next)
    }
}
