//! The main loop of the lock: collect codes, verify them and act on the verdict.

use std::time::Instant;
use log::{debug, error, info, warn};
use crate::actuation::ActuationPlan;
use crate::code::{CodePair, Verdict};
use crate::config::{Config, Timings};
use crate::devices::{KeyEvent, Peripherals};
use crate::entry::{Entry, EntryBuffer};
use crate::error::LockResult;
use crate::modem::{CallStatus, Dialer};
use crate::utils::timestamp;

/// The access state machine, running after enrollment for the rest of the process' life.
#[derive(Debug)]
pub struct AccessControl<'a> {
    codes: CodePair,
    entry: EntryBuffer,
    io: Peripherals<'a>,
    dialer: &'a mut dyn Dialer,
    timings: Timings,
    emergency_number: Option<String>,
    /// When the display was last cleared.
    display_since: Instant,
}

impl<'a> AccessControl<'a> {
    pub fn new(
        codes: CodePair,
        config: &Config,
        io: Peripherals<'a>,
        dialer: &'a mut dyn Dialer,
    ) -> Self {
        let display_since = io.clock.now();
        AccessControl {
            codes,
            entry: EntryBuffer::new(),
            io,
            dialer,
            timings: config.timings.clone(),
            emergency_number: config.emergency_number.clone(),
            display_since,
        }
    }

    /// Number of digits typed so far.
    #[cfg(test)]
    pub fn entry_len(&self) -> usize {
        self.entry.len()
    }

    /// Runs forever. Failures of one iteration are logged and the next one starts normally.
    pub fn run(&mut self) -> ! {
        info!("Lock ready.");
        loop {
            if let Err(e) = self.step() {
                error!("Iteration failed: {}", e);
            }
            self.io.clock.sleep(self.timings.poll());
        }
    }

    /// One iteration without the trailing poll delay: handles at most one key, then the
    /// display timer. Returns the verdict if a code was completed.
    pub fn step(&mut self) -> LockResult<Option<Verdict>> {
        let verdict = self.handle_input();
        self.check_display_timer();
        verdict
    }

    fn handle_input(&mut self) -> LockResult<Option<Verdict>> {
        let event = self.io.keys.poll()?;
        match self.entry.feed(event, self.io.display) {
            Entry::Complete(code) => {
                let verdict = self.codes.verify(&code);
                self.dispatch(verdict)?;
                Ok(Some(verdict))
            }
            Entry::Discarded => {
                match event {
                    KeyEvent::Other(symbol) => debug!("Partial entry dropped on '{}'.", symbol),
                    _ => debug!("Partial entry dropped."),
                }
                Ok(None)
            }
            Entry::Idle | Entry::Pending => Ok(None),
        }
    }

    /// Acts on a verdict. Display output never holds up the relay, the call or the camera.
    fn dispatch(&mut self, verdict: Verdict) -> LockResult<()> {
        let at = timestamp();
        match verdict {
            Verdict::Unlock => {
                info!("Access granted at {}.", at);
                self.io.display.show("Successful login");
                self.io.actuators.run(&ActuationPlan::unlock(self.timings.unlock_hold()))?;
            }
            Verdict::Alarm => {
                warn!("Duress code entered at {}.", at);
                self.io.display.show("Emergency");
                self.call_emergency();
                self.io.display.show("Enabling camera");
                self.io.actuators.run(&ActuationPlan::camera_burst())?;
            }
            Verdict::Reject => {
                warn!("Wrong code entered at {}.", at);
                self.io.display.show("Wrong Password");
            }
        }
        Ok(())
    }

    fn call_emergency(&mut self) {
        self.io.display.show("Calling emergency");
        let status = match &self.emergency_number {
            Some(number) => self.dialer.place_call(number),
            None => {
                warn!("No emergency number configured.");
                CallStatus::Unavailable("no emergency number".to_string())
            }
        };
        match &status {
            CallStatus::Unavailable(reason) => warn!("No emergency call placed: {}", reason),
            status => info!("Emergency call: {:?}", status),
        }
        self.io.display.show(&status.to_string());
    }

    /// Clears the display every `display_clear`, counted from the previous clear regardless of
    /// input. The entry buffer is left alone.
    fn check_display_timer(&mut self) {
        let now = self.io.clock.now();
        if now.duration_since(self.display_since) >= self.timings.display_clear() {
            debug!("Clearing display.");
            self.io.display.blank();
            self.display_since = now;
        }
    }
}
