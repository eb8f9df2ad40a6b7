//! USB Device subsystem - presents a HID keyboard to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  The device exposes a single boot-protocol keyboard
//! interface; the payload dispatcher writes to it through [`UsbKeySink`].
//!
//! The device runner must be spawned as its own task so that enumeration
//! proceeds while the arming window is counting down.

pub mod hid_device;

pub use hid_device::{init, run_usb_device, UsbDriver, UsbHidDevice, UsbKeySink};
