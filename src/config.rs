//! Application-wide constants and compile-time configuration.
//!
//! Chamber count, window timings, storage placement and USB identity all
//! live here so they can be tuned in one place. Nothing in this module is
//! read at runtime from anywhere else.

// Chambers & arming window

/// Number of chambers in the rotation. The persisted index is always in
/// `0..TOTAL_CHAMBERS`.
pub const TOTAL_CHAMBERS: u8 = 3;

/// Length of the arming window (ms). Unplugging before it elapses voids the
/// attempt.
pub const SAFE_WINDOW_MS: u32 = 3000;

/// Initial part of the window shown as "safe" before the armed warning.
pub const GRACE_MS: u32 = 1000;

/// Indicator refresh period (ms). The armed blink toggles once per tick.
pub const INDICATOR_TICK_MS: u32 = 100;

const _: () = assert!(TOTAL_CHAMBERS >= 1);
const _: () = assert!(GRACE_MS > 0 && GRACE_MS < SAFE_WINDOW_MS);
const _: () = assert!(INDICATOR_TICK_MS > 0);

// Persisted header

/// Sentinel marking a header written by this firmware ("RC", little-endian).
pub const HEADER_MAGIC: u16 = 0x5243;

// Keystroke timing

/// How long a key is held down before the release report (ms).
pub const KEYSTROKE_HOLD_MS: u32 = 8;

/// Pause after each release so the host registers separate taps (ms).
pub const KEYSTROKE_GAP_MS: u32 = 8;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "usb-roulette";
pub const USB_PRODUCT: &str = "USB Roulette Keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

/// How long the dispatcher waits for the host to configure the device
/// before giving up on the payload (ms).
pub const USB_CONFIGURE_TIMEOUT_MS: u64 = 5000;

// GPIO pin assignments (nRF52840-DK defaults, LEDs are active-low)
//
// These are logical names; actual `embassy_nrf::peripherals::*` pins are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   LED 1 (green / single)  → P0.13
//   LED 2 (red)             → P0.14

// Chamber header storage

/// Flash page size for nRF52840 (4 KB).
pub const FLASH_PAGE_SIZE: u32 = 4096;

/// Flash page index where chamber storage starts. Must match `memory.x`.
pub const STORAGE_FLASH_PAGE_START: u32 = 252;

/// Number of flash pages reserved for chamber storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
