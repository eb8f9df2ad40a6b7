//! `OutputPin` adapters for indicator wiring.

use embedded_hal::digital::{ErrorType, OutputPin};

/// Inverts a pin, for LEDs wired between VDD and the GPIO.
pub struct ActiveLow<P>(pub P);

impl<P: OutputPin> ErrorType for ActiveLow<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for ActiveLow<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}

/// Drives two pins as one.
///
/// When the board revision is unknown the LED may sit on either pin, so both
/// candidates blink together.
pub struct Mirrored<A, B> {
    pub a: A,
    pub b: B,
}

impl<A, B> Mirrored<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A, B> ErrorType for Mirrored<A, B>
where
    A: OutputPin,
    B: OutputPin<Error = A::Error>,
{
    type Error = A::Error;
}

impl<A, B> OutputPin for Mirrored<A, B>
where
    A: OutputPin,
    B: OutputPin<Error = A::Error>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.a.set_low()?;
        self.b.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.a.set_high()?;
        self.b.set_high()
    }
}
