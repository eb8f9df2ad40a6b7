//! Payload dispatch - what a chamber does once it fires.
//!
//! The sequencer only knows [`PayloadDispatcher::fire`]. The firmware's
//! dispatcher, [`ScriptDispatcher`], looks up the chamber's script, parses
//! it line by line and types it through a [`KeySink`].
//!
//! Bundled scripts live in `payloads/` and are compiled in with
//! `include_str!`; edit those files to change what each chamber does.

pub mod keymap;
pub mod script;

use core::future::Future;

use embedded_hal_async::delay::DelayNs;

use crate::chamber::Chamber;
use crate::config::{KEYSTROKE_GAP_MS, KEYSTROKE_HOLD_MS, TOTAL_CHAMBERS};
use crate::error::Error;
use crate::hid::{Key, KeyboardReport};
use script::Action;

/// Scripts for each chamber, by index.
pub const CHAMBER_SCRIPTS: [&str; TOTAL_CHAMBERS as usize] = [
    include_str!("../../payloads/chamber-one.txt"),
    include_str!("../../payloads/chamber-two.txt"),
    include_str!("../../payloads/chamber-three.txt"),
];

/// Performs a chamber's payload. Opaque to the core: no result, no retry.
pub trait PayloadDispatcher {
    fn fire(&mut self, chamber: Chamber) -> impl Future<Output = ()>;
}

/// Destination for keyboard reports (the USB HID endpoint on target).
pub trait KeySink {
    fn send(&mut self, report: &KeyboardReport) -> impl Future<Output = Result<(), Error>>;
}

/// Runs the script bound to a chamber as keystrokes.
pub struct ScriptDispatcher<'a, K, D> {
    scripts: &'a [&'a str],
    keys: K,
    delay: D,
}

impl<'a, K: KeySink, D: DelayNs> ScriptDispatcher<'a, K, D> {
    pub fn new(scripts: &'a [&'a str], keys: K, delay: D) -> Self {
        Self {
            scripts,
            keys,
            delay,
        }
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    async fn run(&mut self, script: &str) -> Result<(), Error> {
        // Start from a clean slate so the host sees a fresh key-down.
        self.keys.send(&KeyboardReport::released()).await?;

        for action in script::actions(script) {
            match action {
                Ok(Action::Delay(ms)) => self.delay.delay_ms(ms).await,
                Ok(Action::Tap(key)) => self.tap(key).await?,
                Ok(Action::Type(text)) => self.type_text(text).await?,
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Skipping script line: {}", _e);
                }
            }
        }
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> Result<(), Error> {
        for c in text.chars() {
            match keymap::ascii_to_key(c) {
                Some(key) => self.tap(key).await?,
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("No key for {=char}", c);
                }
            }
        }
        Ok(())
    }

    async fn tap(&mut self, key: Key) -> Result<(), Error> {
        self.keys.send(&KeyboardReport::press(key)).await?;
        self.delay.delay_ms(KEYSTROKE_HOLD_MS).await;
        self.keys.send(&KeyboardReport::released()).await?;
        self.delay.delay_ms(KEYSTROKE_GAP_MS).await;
        Ok(())
    }
}

impl<K: KeySink, D: DelayNs> PayloadDispatcher for ScriptDispatcher<'_, K, D> {
    async fn fire(&mut self, chamber: Chamber) {
        let Some(&script) = self.scripts.get(usize::from(chamber.index())) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("Chamber {} has no script", chamber.index());
            return;
        };

        #[cfg(feature = "defmt")]
        defmt::info!("Firing chamber {}", chamber.index());

        if let Err(_e) = self.run(script).await {
            #[cfg(feature = "defmt")]
            defmt::error!("Chamber {} payload stopped: {}", chamber.index(), _e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::*;
    use embassy_futures::block_on;

    #[derive(Default)]
    struct RecordingSink {
        reports: heapless::Vec<KeyboardReport, 128>,
        fail_after: Option<usize>,
    }

    impl KeySink for RecordingSink {
        async fn send(&mut self, report: &KeyboardReport) -> Result<(), Error> {
            if self.fail_after == Some(self.reports.len()) {
                return Err(Error::Usb);
            }
            self.reports.push(*report).map_err(|_| Error::BufferOverflow)
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u64,
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns) / 1_000_000;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
        }
    }

    fn chamber(i: u8) -> Chamber {
        Chamber::new(i, 3).unwrap()
    }

    fn press(modifier: u8, usage: u8) -> KeyboardReport {
        KeyboardReport::press(Key { modifier, usage })
    }

    const RELEASED: KeyboardReport = KeyboardReport::released();

    #[test]
    fn bundled_scripts_are_valid() {
        for (i, script) in CHAMBER_SCRIPTS.iter().enumerate() {
            assert!(script::validate(script).is_ok(), "chamber {} script invalid", i);
        }
    }

    #[test]
    fn fires_the_script_for_the_chamber() {
        let scripts = ["STRING a", "STRING B", "GUI r"];
        let mut d = ScriptDispatcher::new(&scripts, RecordingSink::default(), CountingDelay::default());

        block_on(d.fire(chamber(1)));
        assert_eq!(
            &d.keys().reports[..],
            &[RELEASED, press(MOD_LEFT_SHIFT, 0x05), RELEASED]
        );
    }

    #[test]
    fn chord_and_delay_timing() {
        let scripts = ["GUI r\nDELAY 500\nENTER"];
        let mut d = ScriptDispatcher::new(&scripts, RecordingSink::default(), CountingDelay::default());

        block_on(d.fire(chamber(0)));
        assert_eq!(
            &d.keys().reports[..],
            &[
                RELEASED,
                press(MOD_LEFT_GUI, 0x15),
                RELEASED,
                press(0, KEY_ENTER),
                RELEASED,
            ]
        );
        let per_tap = u64::from(KEYSTROKE_HOLD_MS + KEYSTROKE_GAP_MS);
        assert_eq!(d.delay.total_ms, 500 + 2 * per_tap);
    }

    #[test]
    fn bad_lines_and_unmappable_chars_are_skipped() {
        let scripts = ["NOPE\nSTRING é!"];
        let mut d = ScriptDispatcher::new(&scripts, RecordingSink::default(), CountingDelay::default());

        block_on(d.fire(chamber(0)));
        assert_eq!(
            &d.keys().reports[..],
            &[RELEASED, press(MOD_LEFT_SHIFT, KEY_1), RELEASED]
        );
    }

    #[test]
    fn missing_script_sends_nothing() {
        let scripts = ["STRING a"];
        let mut d = ScriptDispatcher::new(&scripts, RecordingSink::default(), CountingDelay::default());

        block_on(d.fire(chamber(2)));
        assert!(d.keys().reports.is_empty());
    }

    #[test]
    fn sink_error_stops_the_script() {
        let scripts = ["STRING abc"];
        let sink = RecordingSink {
            fail_after: Some(3),
            ..RecordingSink::default()
        };
        let mut d = ScriptDispatcher::new(&scripts, sink, CountingDelay::default());

        block_on(d.fire(chamber(0)));
        // Wake report plus the first tap; nothing after the failure.
        assert_eq!(d.keys().reports.len(), 3);
    }
}
