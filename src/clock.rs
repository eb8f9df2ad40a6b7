//! Embassy-backed time source for the arming window and keystroke pacing.

use embassy_time::{Instant, Timer};
use embedded_hal_async::delay::DelayNs;

use crate::sequencer::Clock;

/// Uptime clock driven by the RTC time driver.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

impl DelayNs for EmbassyClock {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after_nanos(u64::from(ns)).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(u64::from(ms)).await
    }
}
