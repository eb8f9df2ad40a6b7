//! LED indicator - the only thing the user sees during the arming window.
//!
//! The sequencer drives an [`Indicator`] with two signals and nothing else:
//!
//! - `safe()`  - grace period, unplugging now is silent
//! - `armed()` - final part of the window, called once per tick so the
//!   implementation can blink
//!
//! How those map onto GPIOs is chosen when the indicator is built:
//!
//! - [`SingleLed`] - one LED, steady for safe, blinking for armed
//! - [`DualLed`]   - green steady for safe, red blinking for armed
//!
//! Pin adapters in [`pins`] cover active-low LEDs and boards where the LED
//! pin is not known in advance ([`pins::Mirrored`]).
//!
//! GPIO errors are ignored. The indicator is cosmetic and must never stop
//! a cycle.

pub mod pins;

use embedded_hal::digital::OutputPin;

/// The two observable states of the arming window, plus rest.
pub trait Indicator {
    /// Grace period: nothing will happen if the device is unplugged now.
    fn safe(&mut self);

    /// Armed: the payload fires when the window runs out. Called once per
    /// indicator tick.
    fn armed(&mut self);

    /// Everything dark. Used at rest and as soon as the window closes.
    fn off(&mut self);
}

/// One LED shared by both signals.
pub struct SingleLed<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> SingleLed<P> {
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin, lit: false }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    fn set(&mut self, lit: bool) {
        let _ = if lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        self.lit = lit;
    }
}

impl<P: OutputPin> Indicator for SingleLed<P> {
    fn safe(&mut self) {
        self.set(true);
    }

    fn armed(&mut self) {
        self.set(!self.lit);
    }

    fn off(&mut self) {
        self.set(false);
    }
}

/// Dedicated green (safe) and red (armed) LEDs.
pub struct DualLed<G, R> {
    green: G,
    red: R,
    red_lit: bool,
}

impl<G: OutputPin, R: OutputPin> DualLed<G, R> {
    pub fn new(mut green: G, mut red: R) -> Self {
        let _ = green.set_low();
        let _ = red.set_low();
        Self {
            green,
            red,
            red_lit: false,
        }
    }

    pub fn pins(&self) -> (&G, &R) {
        (&self.green, &self.red)
    }

    fn set_red(&mut self, lit: bool) {
        let _ = if lit {
            self.red.set_high()
        } else {
            self.red.set_low()
        };
        self.red_lit = lit;
    }
}

impl<G: OutputPin, R: OutputPin> Indicator for DualLed<G, R> {
    fn safe(&mut self) {
        let _ = self.green.set_high();
        self.set_red(false);
    }

    fn armed(&mut self) {
        let _ = self.green.set_low();
        self.set_red(!self.red_lit);
    }

    fn off(&mut self) {
        let _ = self.green.set_low();
        self.set_red(false);
    }
}
