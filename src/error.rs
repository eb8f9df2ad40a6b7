//! Unified error type for the roulette firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use crate::payload::script::ScriptError;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Storage
    /// Flash read/write/erase failed.
    Storage,

    /// The persisted header has the wrong size or an out-of-range chamber.
    CorruptHeader,

    /// The storage region holds data the store cannot parse at all. Only
    /// erasing the region recovers it.
    CorruptStorage,

    // USB
    /// USB endpoint write failed.
    Usb,

    /// The host never configured the device within the allotted time.
    UsbNotConfigured,

    // Payload
    /// A payload script line could not be parsed.
    Script(ScriptError),

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

// Convenience conversions

impl From<ScriptError> for Error {
    fn from(e: ScriptError) -> Self {
        Error::Script(e)
    }
}
