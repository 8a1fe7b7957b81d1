use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};
use crate::GpioResult;
use crate::keypad::Keypad;

/// A debounced keypad that uses a timer to filter out contact bounce.
///
/// A change of reading is reported as soon as it's seen. Further changes are suppressed until
/// [debounce_time](Self::debounce_time) has passed since, so a bouncing contact reads as one
/// press and a single poll is enough to see a key.
pub struct DebouncedKeypad<'a, K> {
    inner: &'a dyn Keypad<Key = K>,
    state: RefCell<Vec<K>>,
    changed_since: Cell<Option<Instant>>,
    pub debounce_time: Duration,
}

impl<'a, K> DebouncedKeypad<'a, K> {
    pub fn new(inner: &'a dyn Keypad<Key = K>) -> Self {
        Self {
            inner,
            state: RefCell::new(Vec::new()),
            changed_since: Cell::new(None),
            debounce_time: Duration::from_millis(30),
        }
    }

    pub fn with_debounce_time(mut self, debounce_time: Duration) -> Self {
        self.debounce_time = debounce_time;
        self
    }
}

impl<K> Debug for DebouncedKeypad<'_, K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(debounced)", self.inner)
    }
}

impl<K: Clone + PartialEq> Keypad for DebouncedKeypad<'_, K> {
    type Key = K;

    fn read(&self) -> GpioResult<Vec<K>> {
        let new_state = self.inner.read()?;
        let mut state = self.state.borrow_mut();

        if new_state == *state {
            return Ok(new_state);
        }
        if let Some(instant) = self.changed_since.get() {
            if instant.elapsed() < self.debounce_time {
                return Ok(state.clone());
            }
        }

        self.changed_since.set(Some(Instant::now()));
        *state = new_state.clone();
        Ok(new_state)
    }
}
