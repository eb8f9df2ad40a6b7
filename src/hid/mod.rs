//! HID keyboard reports sent to the host.

pub mod keyboard;

pub use keyboard::{Key, KeyboardReport};
