mod debounce;
mod gpio;

use std::fmt::Debug;
use crate::GpioResult;
pub use debounce::*;
pub use gpio::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Reads every key that is currently held down.
    fn read(&self) -> GpioResult<Vec<Self::Key>>;
}
