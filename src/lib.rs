//! USB roulette firmware library.
//!
//! Every plug-in advances through a fixed rotation of payload "chambers".
//! The device shows a grace period, then an armed warning, and fires the
//! live chamber's keystrokes when the window runs out. Unplugging first
//! leaves no trace: the same chamber is live again next time.
//!
//! The chamber state machine, persistence contract, indicator wiring and
//! script engine are plain `no_std` logic and run on the host:
//!
//! Usage: `cargo test`
//!
//! The hardware side (flash store, USB keyboard, Embassy clock) is only
//! compiled with the `embedded` feature and is driven from `main.rs`.

#![cfg_attr(not(test), no_std)]

pub mod chamber;
pub mod config;
pub mod error;
pub mod hid;
pub mod indicator;
pub mod payload;
pub mod roulette;
pub mod sequencer;
pub mod store;

#[cfg(feature = "embedded")]
pub mod clock;
#[cfg(feature = "embedded")]
pub mod usb;

pub use chamber::Chamber;
pub use error::Error;
pub use roulette::run_cycle;
pub use sequencer::{ArmingWindow, ChamberSequencer, Clock, Outcome};
