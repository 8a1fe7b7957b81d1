//! Hardware-free stand-ins for the lock's peripherals.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use keyward_gpio::{GpioError, GpioOutput, GpioResult};
use keyward_gpio::keypad::{Keypad, KeypadKey};
use crate::clock::Clock;
use crate::code::Code;
use crate::devices::{KeyEvent, KeySource, TextDisplay};
use crate::modem::{CallStatus, Dialer};
use crate::store::{CodeStore, StoreError, StoredCode};

/// A clock that only moves when something sleeps on it.
#[derive(Debug)]
pub struct FakeClock {
    start: Instant,
    now: Cell<Instant>,
}

impl FakeClock {
    pub fn new() -> Self {
        let start = Instant::now();
        FakeClock { start, now: Cell::new(start) }
    }

    pub fn elapsed(&self) -> Duration {
        self.now.get() - self.start
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// Output line remembering every level written and when.
#[derive(Debug)]
pub struct RecordingPin<'a> {
    clock: &'a FakeClock,
    writes: RefCell<Vec<(Instant, bool)>>,
}

impl<'a> RecordingPin<'a> {
    pub fn new(clock: &'a FakeClock) -> Self {
        RecordingPin { clock, writes: RefCell::new(Vec::new()) }
    }

    pub fn writes(&self) -> Vec<(Instant, bool)> {
        self.writes.borrow().clone()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.writes.borrow().iter().map(|(_, level)| *level).collect()
    }
}

impl GpioOutput for RecordingPin<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.writes.borrow_mut().push((self.clock.now(), value));
        Ok(())
    }
}

/// Relay, camera and indicator lines sharing one clock.
#[derive(Debug)]
pub struct Pins<'a> {
    pub relay: RecordingPin<'a>,
    pub camera: RecordingPin<'a>,
    pub indicator: RecordingPin<'a>,
}

impl<'a> Pins<'a> {
    pub fn new(clock: &'a FakeClock) -> Self {
        Pins {
            relay: RecordingPin::new(clock),
            camera: RecordingPin::new(clock),
            indicator: RecordingPin::new(clock),
        }
    }
}

/// Key source replaying a typed script. `_` stands for a poll without a key; once the
/// script runs out every poll is empty.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    events: VecDeque<KeyEvent>,
    pub polls: usize,
}

impl ScriptedKeys {
    pub fn typed(script: &str) -> Self {
        let mut keys = Self::default();
        keys.type_in(script);
        keys
    }

    pub fn type_in(&mut self, script: &str) {
        self.events.extend(script.chars().map(|c| match c {
            '_' => KeyEvent::NoKey,
            c => KeyEvent::from_char(c),
        }));
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl KeySource for ScriptedKeys {
    fn poll(&mut self) -> GpioResult<KeyEvent> {
        self.polls += 1;
        Ok(self.events.pop_front().unwrap_or(KeyEvent::NoKey))
    }
}

/// Raw keypad replaying queued readings, then reading no keys.
#[derive(Debug, Default)]
pub struct ScriptedKeypad {
    pub readings: RefCell<VecDeque<Vec<KeypadKey>>>,
}

impl ScriptedKeypad {
    pub fn with(readings: &[&[KeypadKey]]) -> Self {
        ScriptedKeypad {
            readings: RefCell::new(readings.iter().map(|r| r.to_vec()).collect()),
        }
    }
}

impl Keypad for ScriptedKeypad {
    type Key = KeypadKey;

    fn read(&self) -> GpioResult<Vec<KeypadKey>> {
        Ok(self.readings.borrow_mut().pop_front().unwrap_or_default())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DisplayOp {
    Setup,
    Line(String),
    Char(char),
    Clear,
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub ops: Vec<DisplayOp>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn shows(&self, line: &str) -> bool {
        self.lines().contains(&line)
    }

    pub fn clears(&self) -> usize {
        self.ops.iter().filter(|op| **op == DisplayOp::Clear).count()
    }
}

impl TextDisplay for RecordingDisplay {
    fn setup(&mut self) -> GpioResult<()> {
        self.ops.push(DisplayOp::Setup);
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> GpioResult<()> {
        self.ops.push(DisplayOp::Line(text.to_string()));
        Ok(())
    }

    fn write_char(&mut self, c: char) -> GpioResult<()> {
        self.ops.push(DisplayOp::Char(c));
        Ok(())
    }

    fn clear(&mut self) -> GpioResult<()> {
        self.ops.push(DisplayOp::Clear);
        Ok(())
    }
}

/// A display whose every operation fails, like an unplugged LCD.
#[derive(Debug, Default)]
pub struct BrokenDisplay {
    pub attempts: usize,
}

impl BrokenDisplay {
    fn fail(&mut self) -> GpioResult<()> {
        self.attempts += 1;
        Err(GpioError::Io(std::io::ErrorKind::Other))
    }
}

impl TextDisplay for BrokenDisplay {
    fn setup(&mut self) -> GpioResult<()> {
        self.fail()
    }

    fn write_line(&mut self, _text: &str) -> GpioResult<()> {
        self.fail()
    }

    fn write_char(&mut self, _c: char) -> GpioResult<()> {
        self.fail()
    }

    fn clear(&mut self) -> GpioResult<()> {
        self.fail()
    }
}

/// In-memory code store with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub code: Option<Code>,
    pub fail_load: bool,
    pub fail_store: bool,
    pub writes: Vec<Code>,
}

impl MemoryStore {
    pub fn holding(code: Code) -> Self {
        MemoryStore { code: Some(code), ..Self::default() }
    }
}

impl CodeStore for MemoryStore {
    fn load(&mut self) -> Result<StoredCode, StoreError> {
        if self.fail_load {
            return Err(std::io::Error::other("storage offline").into());
        }
        Ok(match self.code {
            Some(code) => StoredCode::Found(code),
            None => {
                self.code = Some(Code::default());
                StoredCode::Created(Code::default())
            }
        })
    }

    fn store(&mut self, code: &Code) -> Result<(), StoreError> {
        if self.fail_store {
            return Err(std::io::Error::other("storage offline").into());
        }
        self.writes.push(*code);
        self.code = Some(*code);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeDialer {
    pub calls: Vec<String>,
    pub status: CallStatus,
}

impl Default for FakeDialer {
    fn default() -> Self {
        FakeDialer { calls: Vec::new(), status: CallStatus::Connected }
    }
}

impl Dialer for FakeDialer {
    fn place_call(&mut self, number: &str) -> CallStatus {
        self.calls.push(number.to_string());
        self.status.clone()
    }
}
