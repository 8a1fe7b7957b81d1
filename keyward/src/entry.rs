//! Collection of typed digits.

use crate::code::{CODE_LEN, Code};
use crate::devices::{KeyEvent, MASK_GLYPH, TextDisplay};

/// What feeding one key event into an [EntryBuffer] did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Entry {
    /// No key; nothing changed.
    Idle,
    /// A digit was accepted.
    Pending,
    /// The terminator completed a full entry. The buffer is empty again.
    Complete(Code),
    /// The event was invalid in the current state and the partial entry was dropped.
    Discarded,
}

/// Up to [CODE_LEN] digits typed on the keypad.
#[derive(Debug, Default, Clone)]
pub struct EntryBuffer {
    digits: [char; CODE_LEN],
    len: usize,
}

impl EntryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == CODE_LEN
    }

    /// Appends a digit if there is room, echoing it and then drawing the mask glyph.
    ///
    /// Returns whether the digit was taken. A full buffer ignores the digit and draws nothing.
    /// Display failures are logged and don't affect the entry.
    pub fn push(&mut self, digit: char, display: &mut dyn TextDisplay) -> bool {
        if self.is_full() {
            return false;
        }
        self.digits[self.len] = digit;
        self.len += 1;

        display.show(digit.encode_utf8(&mut [0; 4]));
        display.show_char(MASK_GLYPH);
        true
    }

    /// Takes the entry out if it is complete. The buffer is emptied either way, so `None`
    /// abandons a partial entry.
    pub fn try_finalize(&mut self) -> Option<Code> {
        let complete = self.is_full();
        let digits = self.digits;
        self.reset();
        if complete {
            Code::new(digits).ok()
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Applies one key event with the entry rules shared by enrollment and normal operation:
    /// a digit is accepted while there is room, the terminator completes a full buffer, and any
    /// other combination drops the partial entry.
    pub fn feed(&mut self, event: KeyEvent, display: &mut dyn TextDisplay) -> Entry {
        match event {
            KeyEvent::NoKey => Entry::Idle,
            KeyEvent::Digit(digit) if !self.is_full() => {
                self.push(digit, display);
                Entry::Pending
            }
            KeyEvent::Terminator if self.is_full() => self
                .try_finalize()
                .map_or(Entry::Discarded, Entry::Complete),
            _ => {
                self.reset();
                Entry::Discarded
            }
        }
    }
}
