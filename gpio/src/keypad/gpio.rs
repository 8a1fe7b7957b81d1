use std::fmt::{Debug, Formatter};
use log::trace;
use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use crate::keypad::Keypad;

/// Represents the keys on a 4x4 membrane keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
}

impl KeypadKey {
    /// Physical layout, indexed by `[row][column]`.
    pub const LAYOUT: [[KeypadKey; 4]; 4] = {
        use KeypadKey::*;
        [
            [ Key1, Key2, Key3, KeyA, ],
            [ Key4, Key5, Key6, KeyB, ],
            [ Key7, Key8, Key9, KeyC, ],
            [ KeyAsterisk, Key0, KeyHash, KeyD, ],
        ]
    };

    /// Converts a position tuple (row, column) to a [KeypadKey].
    pub fn from_position(row: usize, col: usize) -> Option<KeypadKey> {
        Self::LAYOUT.get(row)?.get(col).copied()
    }

    /// Converts the [KeypadKey] to the character printed on it.
    pub fn to_char(self) -> char {
        use KeypadKey::*;

        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
            KeyA => 'A',
            KeyB => 'B',
            KeyC => 'C',
            KeyD => 'D',
        }
    }

    pub fn is_digit(self) -> bool {
        self.to_char().is_ascii_digit()
    }
}

/// A 4x4 matrix keypad scanned over GPIO.
///
/// Each column is activated in turn and the rows are read back; a held key connects its row
/// to the active column. Both buses are expected in layout order (column 0 / row 0 first), with
/// the active level configured so that `true` means "activated" and "connected".
pub struct GpioKeypad<'a> {
    cols: &'a dyn GpioBusOutput<4>,
    rows: &'a dyn GpioBusInput<4>,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.cols, self.rows)
    }
}

impl<'a> GpioKeypad<'a> {
    pub fn new(cols: &'a dyn GpioBusOutput<4>, rows: &'a dyn GpioBusInput<4>) -> Self {
        GpioKeypad { cols, rows }
    }
}

impl Keypad for GpioKeypad<'_> {
    type Key = KeypadKey;

    fn read(&self) -> GpioResult<Vec<Self::Key>> {
        let mut pressed = Vec::new();

        for col in 0..4 {
            let mut active = [false; 4];
            active[col] = true;
            self.cols.write(&active)?;

            let rows = self.rows.read()?;
            pressed.extend(
                rows.iter()
                    .enumerate()
                    .filter(|(_, connected)| **connected)
                    .filter_map(|(row, _)| KeypadKey::from_position(row, col)),
            );
        }
        self.cols.write(&[false; 4])?;

        if !pressed.is_empty() {
            trace!("Keypad scan: {:?}", pressed);
        }
        Ok(pressed)
    }
}
