//! Keypad and display capabilities used by the controllers, with their GPIO-backed
//! implementations.

use std::fmt::Debug;
use log::{debug, trace, warn};
use keyward_gpio::{GpioOutput, GpioResult};
use keyward_gpio::keypad::{Keypad, KeypadKey};
use keyward_gpio::lcd::hd44780::driver::HD44780Driver;
use crate::actuation::Actuators;
use crate::clock::Clock;
use crate::utils::{CollectionExt, DisplayExt, TryGetSingleError};

/// The key that ends a code entry.
pub const TERMINATOR: char = '#';

/// Glyph rendered for each accepted digit.
pub const MASK_GLYPH: char = '*';

/// One poll of the keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyEvent {
    Digit(char),
    Terminator,
    /// Any other symbol on the keypad. Always invalid input.
    Other(char),
    NoKey,
}

impl KeyEvent {
    pub fn from_char(c: char) -> Self {
        match c {
            TERMINATOR => KeyEvent::Terminator,
            c if c.is_ascii_digit() => KeyEvent::Digit(c),
            c => KeyEvent::Other(c),
        }
    }
}

impl From<KeypadKey> for KeyEvent {
    fn from(key: KeypadKey) -> Self {
        KeyEvent::from_char(key.to_char())
    }
}

/// Non-blocking key input.
pub trait KeySource: Debug {
    /// Returns the key pressed since the last poll, or [KeyEvent::NoKey].
    fn poll(&mut self) -> GpioResult<KeyEvent>;
}

/// Line-oriented text output.
pub trait TextDisplay: Debug {
    /// One-time setup: display on, cursor hidden, backlight on.
    fn setup(&mut self) -> GpioResult<()>;
    /// Writes the text and moves to the start of the next line.
    fn write_line(&mut self, text: &str) -> GpioResult<()>;
    fn write_char(&mut self, c: char) -> GpioResult<()>;
    fn clear(&mut self) -> GpioResult<()>;
}

impl dyn TextDisplay + '_ {
    /// Writes a line, logging a failure instead of returning it.
    pub fn show(&mut self, text: &str) {
        if let Err(e) = self.write_line(text) {
            warn!("Display write of {:?} failed: {}", text, e);
        }
    }

    /// Writes a single character, logging a failure instead of returning it.
    pub fn show_char(&mut self, c: char) {
        if let Err(e) = self.write_char(c) {
            warn!("Display write failed: {}", e);
        }
    }

    /// Clears the display, logging a failure instead of returning it.
    pub fn blank(&mut self) {
        if let Err(e) = self.clear() {
            warn!("Display clear failed: {}", e);
        }
    }
}

/// The devices shared by the boot enrollment and the access loop.
#[derive(Debug)]
pub struct Peripherals<'a> {
    pub keys: &'a mut dyn KeySource,
    pub display: &'a mut dyn TextDisplay,
    pub actuators: &'a mut dyn Actuators,
    pub clock: &'a dyn Clock,
}

/// Turns the level-based keypad reading into one event per key press.
///
/// A key held across several polls is reported once. Several keys held at once are ignored
/// until the chord is released back to one key or none.
#[derive(Debug)]
pub struct KeypadSource<'a> {
    keypad: &'a dyn Keypad<Key = KeypadKey>,
    held: Option<KeypadKey>,
}

impl<'a> KeypadSource<'a> {
    pub fn new(keypad: &'a dyn Keypad<Key = KeypadKey>) -> Self {
        KeypadSource { keypad, held: None }
    }
}

impl KeySource for KeypadSource<'_> {
    fn poll(&mut self) -> GpioResult<KeyEvent> {
        let pressed = self.keypad.read()?;
        match pressed.try_get_single() {
            Ok(&key) if self.held == Some(key) => Ok(KeyEvent::NoKey),
            Ok(&key) => {
                self.held = Some(key);
                trace!("Key pressed: {:?}", key);
                Ok(key.into())
            }
            Err(TryGetSingleError::Empty) => {
                self.held = None;
                Ok(KeyEvent::NoKey)
            }
            Err(TryGetSingleError::MoreThanOne) => Ok(KeyEvent::NoKey),
        }
    }
}

/// A character LCD used as a console: lines are written top to bottom, and after the last row
/// writing continues on the first one. A row is blanked when the first character lands on it.
#[derive(Debug)]
pub struct LcdConsole<'a> {
    lcd: &'a mut dyn HD44780Driver,
    backlight: Option<&'a dyn GpioOutput>,
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
    line_ended: bool,
}

impl<'a> LcdConsole<'a> {
    pub fn new(lcd: &'a mut dyn HD44780Driver, rows: usize, cols: usize) -> Self {
        LcdConsole {
            lcd,
            backlight: None,
            rows: rows.max(1),
            cols: cols.max(1),
            row: 0,
            col: 0,
            line_ended: false,
        }
    }

    pub fn with_backlight(mut self, backlight: Option<&'a dyn GpioOutput>) -> Self {
        self.backlight = backlight;
        self
    }

    /// Moves to the start of the next row and blanks it.
    fn next_row(&mut self) -> GpioResult<()> {
        self.row = (self.row + 1) % self.rows;
        self.col = 0;
        self.lcd.set_cursor(self.row, 0)?;
        self.lcd.print(&" ".repeat(self.cols))?;
        self.lcd.set_cursor(self.row, 0)
    }
}

impl TextDisplay for LcdConsole<'_> {
    fn setup(&mut self) -> GpioResult<()> {
        debug!("Setting up {}x{} LCD console.", self.cols, self.rows);
        self.lcd.set_display_control(true, false, true)?;
        if let Some(backlight) = self.backlight {
            backlight.write(true)?;
        }
        self.clear()
    }

    fn write_line(&mut self, text: &str) -> GpioResult<()> {
        for c in text.chars() {
            self.write_char(c)?;
        }
        self.write_char('\n')
    }

    fn write_char(&mut self, c: char) -> GpioResult<()> {
        if self.line_ended {
            self.line_ended = false;
            self.next_row()?;
        }
        if c == '\n' {
            self.line_ended = true;
            return Ok(());
        }
        if self.col >= self.cols {
            self.next_row()?;
        }
        let mut buf = [0u8; 4];
        self.lcd.print(c.encode_utf8(&mut buf))?;
        self.col += 1;
        Ok(())
    }

    fn clear(&mut self) -> GpioResult<()> {
        self.lcd.clear_display()?;
        self.row = 0;
        self.col = 0;
        self.line_ended = false;
        Ok(())
    }
}
