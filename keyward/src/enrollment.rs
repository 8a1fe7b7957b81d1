//! The boot-time decision between keeping the stored code and enrolling a new one.

use log::{debug, error, info, warn};
use crate::actuation::ActuationPlan;
use crate::code::{Code, CodePair};
use crate::config::{Config, Timings};
use crate::devices::{KeyEvent, Peripherals};
use crate::entry::{Entry, EntryBuffer};
use crate::error::LockResult;
use crate::store::{CodeStore, StoredCode};

/// Where the enrollment currently is.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    /// Blinking the status LED, waiting for the terminator.
    Prompting,
    /// Reading the new code.
    Collecting,
    /// Finished with this code.
    Done(Code),
}

/// Runs once at startup and yields the codes the access loop works with.
#[derive(Debug)]
pub struct Enrollment<'a> {
    store: &'a mut dyn CodeStore,
    timings: &'a Timings,
    default_code: Code,
    entry: EntryBuffer,
}

impl<'a> Enrollment<'a> {
    pub fn new(store: &'a mut dyn CodeStore, config: &'a Config) -> Self {
        Enrollment {
            store,
            timings: &config.timings,
            default_code: config.default_code,
            entry: EntryBuffer::new(),
        }
    }

    /// Loads the stored code, offers the enrollment prompt and returns the resulting pair.
    pub fn run(mut self, io: &mut Peripherals<'_>) -> LockResult<CodePair> {
        io.display.show("Booting...");
        let current = self.load_current(io);

        let mut phase = Phase::Prompting;
        loop {
            phase = match phase {
                Phase::Prompting => {
                    if self.prompt(io)? {
                        Phase::Collecting
                    } else {
                        info!("No enrollment requested.");
                        io.display.show("No key pressed, initializing...");
                        Phase::Done(current)
                    }
                }
                Phase::Collecting => Phase::Done(self.collect(io)?),
                Phase::Done(code) => {
                    if code.is_palindrome() {
                        warn!("The code reads the same reversed; the duress code can't raise the alarm.");
                    }
                    return Ok(CodePair::new(code));
                }
            };
        }
    }

    fn load_current(&mut self, io: &mut Peripherals<'_>) -> Code {
        match self.store.load() {
            Ok(StoredCode::Found(code)) => {
                debug!("Stored code found.");
                io.display.show("Code found, reading...");
                code
            }
            Ok(StoredCode::Created(code)) => {
                info!("No stored code, initialized with the default.");
                io.display.show("Code not found, creating...");
                code
            }
            Err(e) => {
                warn!("Could not load the stored code, using the default: {}", e);
                io.display.show("Code unavailable");
                self.default_code
            }
        }
    }

    /// Returns whether the terminator was pressed during one of the prompt windows.
    fn prompt(&mut self, io: &mut Peripherals<'_>) -> LockResult<bool> {
        let pulse = ActuationPlan::indicator_pulse(self.timings.prompt_indicator());
        for attempt in 1..=self.timings.prompt_attempts {
            debug!("Enrollment prompt {}/{}.", attempt, self.timings.prompt_attempts);
            io.actuators.run(&pulse)?;
            if io.keys.poll()? == KeyEvent::Terminator {
                info!("Enrollment requested.");
                io.clock.sleep(self.timings.debounce());
                return Ok(true);
            }
            io.clock.sleep(self.timings.prompt_window());
        }
        Ok(false)
    }

    fn collect(&mut self, io: &mut Peripherals<'_>) -> LockResult<Code> {
        io.display.show("Enter new code");
        self.entry.reset();
        loop {
            let event = io.keys.poll()?;
            match self.entry.feed(event, io.display) {
                Entry::Idle => {
                    io.clock.sleep(self.timings.idle_poll());
                    continue;
                }
                Entry::Complete(code) => {
                    io.display.show("Storing password...");
                    match self.store.store(&code) {
                        Ok(()) => info!("New code enrolled."),
                        Err(e) => {
                            error!("Could not store the new code: {}", e);
                            io.display.show("Store failed");
                        }
                    }
                    return Ok(code);
                }
                Entry::Discarded => debug!("Entry restarted."),
                Entry::Pending => {}
            }
            io.clock.sleep(self.timings.debounce());
        }
    }
}
