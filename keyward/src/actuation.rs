//! Timed output sequences: the relay hold, the camera trigger pattern and the status blink.

use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;
use log::{debug, error, trace, warn};
use keyward_gpio::{GpioOutput, GpioResult};
use crate::clock::Clock;

/// A level-driven output of the lock.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Actuator {
    /// Door release.
    Relay,
    /// Camera trigger input.
    Camera,
    /// Status LED.
    Indicator,
}

impl Display for Actuator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Actuator::Relay => write!(f, "relay"),
            Actuator::Camera => write!(f, "camera"),
            Actuator::Indicator => write!(f, "indicator"),
        }
    }
}

/// Drive `actuator` to `level`, then wait `hold` before the next step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ActuationStep {
    pub actuator: Actuator,
    pub level: bool,
    pub hold: Duration,
}

/// An ordered list of output changes with the time to hold each one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActuationPlan {
    steps: Vec<ActuationStep>,
}

impl ActuationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, actuator: Actuator, level: bool, hold: Duration) -> Self {
        self.steps.push(ActuationStep { actuator, level, hold });
        self
    }

    pub fn steps(&self) -> &[ActuationStep] {
        &self.steps
    }

    /// Each actuator the plan touches, in order of first use.
    pub fn actuators(&self) -> Vec<Actuator> {
        let mut actuators = Vec::new();
        for step in &self.steps {
            if !actuators.contains(&step.actuator) {
                actuators.push(step.actuator);
            }
        }
        actuators
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.hold).sum()
    }

    /// Energizes the door release for `hold`, then drops it.
    pub fn unlock(hold: Duration) -> Self {
        Self::new()
            .then(Actuator::Relay, true, hold)
            .then(Actuator::Relay, false, Duration::ZERO)
    }

    /// Camera trigger pattern: on 1 s, off 1 s, on 3 s, off.
    pub fn camera_burst() -> Self {
        Self::new()
            .then(Actuator::Camera, true, Duration::from_secs(1))
            .then(Actuator::Camera, false, Duration::from_secs(1))
            .then(Actuator::Camera, true, Duration::from_secs(3))
            .then(Actuator::Camera, false, Duration::ZERO)
    }

    /// Lights the status LED for `on`.
    pub fn indicator_pulse(on: Duration) -> Self {
        Self::new()
            .then(Actuator::Indicator, true, on)
            .then(Actuator::Indicator, false, Duration::ZERO)
    }
}

/// Executes actuation plans. Runs every step to completion before returning. A plan that
/// fails part way leaves its actuators low.
pub trait Actuators: Debug {
    fn run(&mut self, plan: &ActuationPlan) -> GpioResult<()>;
}

/// Actuators wired to GPIO lines.
#[derive(Debug)]
pub struct GpioActuators<'a> {
    relay: &'a dyn GpioOutput,
    camera: &'a dyn GpioOutput,
    indicator: &'a dyn GpioOutput,
    clock: &'a dyn Clock,
}

impl<'a> GpioActuators<'a> {
    pub fn new(
        relay: &'a dyn GpioOutput,
        camera: &'a dyn GpioOutput,
        indicator: &'a dyn GpioOutput,
        clock: &'a dyn Clock,
    ) -> Self {
        GpioActuators { relay, camera, indicator, clock }
    }

    fn output(&self, actuator: Actuator) -> &'a dyn GpioOutput {
        match actuator {
            Actuator::Relay => self.relay,
            Actuator::Camera => self.camera,
            Actuator::Indicator => self.indicator,
        }
    }

    /// Drives every output low.
    pub fn release_all(&self) -> GpioResult<()> {
        self.relay.write(false)?;
        self.camera.write(false)?;
        self.indicator.write(false)
    }
}

impl Actuators for GpioActuators<'_> {
    fn run(&mut self, plan: &ActuationPlan) -> GpioResult<()> {
        debug!("Running actuation plan of {:?}.", plan.total_duration());
        for step in plan.steps() {
            trace!("{} -> {} for {:?}", step.actuator, step.level, step.hold);
            if let Err(e) = self.output(step.actuator).write(step.level) {
                error!("Driving {} to {} failed: {}", step.actuator, step.level, e);
                for actuator in plan.actuators() {
                    if let Err(e) = self.output(actuator).write(false) {
                        warn!("Releasing {} failed: {}", actuator, e);
                    }
                }
                return Err(e);
            }
            self.clock.sleep(step.hold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use keyward_gpio::GpioError;
    use crate::testing::{FakeClock, RecordingPin};

    /// Fails the first low write, then behaves like the wrapped pin.
    #[derive(Debug)]
    struct StickyPin<'a> {
        pin: RecordingPin<'a>,
        failed: Cell<bool>,
    }

    impl GpioOutput for StickyPin<'_> {
        fn write(&self, value: bool) -> GpioResult<()> {
            if !value && !self.failed.replace(true) {
                return Err(GpioError::Io(std::io::ErrorKind::Other));
            }
            self.pin.write(value)
        }
    }

    #[test]
    fn canned_plans() {
        let unlock = ActuationPlan::unlock(Duration::from_secs(5));
        assert_eq!(unlock.steps().len(), 2);
        assert_eq!(unlock.total_duration(), Duration::from_secs(5));

        let camera = ActuationPlan::camera_burst();
        let levels: Vec<bool> = camera.steps().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![true, false, true, false]);
        assert_eq!(camera.total_duration(), Duration::from_secs(5));
        assert!(camera.steps().iter().all(|s| s.actuator == Actuator::Camera));

        let pulse = ActuationPlan::indicator_pulse(Duration::from_millis(500));
        assert_eq!(pulse.steps()[0], ActuationStep {
            actuator: Actuator::Indicator,
            level: true,
            hold: Duration::from_millis(500),
        });
    }

    #[test]
    fn gpio_actuators_drive_the_right_lines_in_time() {
        let clock = FakeClock::new();
        let start = clock.now();
        let relay = RecordingPin::new(&clock);
        let camera = RecordingPin::new(&clock);
        let led = RecordingPin::new(&clock);
        let mut actuators = GpioActuators::new(&relay, &camera, &led, &clock);

        actuators.run(&ActuationPlan::camera_burst()).unwrap();

        assert!(relay.levels().is_empty());
        assert!(led.levels().is_empty());
        let offsets: Vec<(Duration, bool)> = camera
            .writes()
            .into_iter()
            .map(|(at, level)| (at - start, level))
            .collect();
        assert_eq!(offsets, vec![
            (Duration::ZERO, true),
            (Duration::from_secs(1), false),
            (Duration::from_secs(2), true),
            (Duration::from_secs(5), false),
        ]);
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }

    #[test]
    fn release_all_drives_everything_low() {
        let clock = FakeClock::new();
        let relay = RecordingPin::new(&clock);
        let camera = RecordingPin::new(&clock);
        let led = RecordingPin::new(&clock);
        let actuators = GpioActuators::new(&relay, &camera, &led, &clock);

        actuators.release_all().unwrap();

        for pin in [&relay, &camera, &led] {
            assert_eq!(pin.levels(), vec![false]);
        }
    }

    #[test]
    fn failed_release_is_retried() {
        let clock = FakeClock::new();
        let relay = StickyPin { pin: RecordingPin::new(&clock), failed: Cell::new(false) };
        let camera = RecordingPin::new(&clock);
        let led = RecordingPin::new(&clock);
        let mut actuators = GpioActuators::new(&relay, &camera, &led, &clock);

        assert!(actuators.run(&ActuationPlan::unlock(Duration::from_secs(5))).is_err());

        assert_eq!(relay.pin.levels(), vec![true, false]);
        assert!(camera.levels().is_empty());
        assert!(led.levels().is_empty());
    }

    #[test]
    fn plan_actuators_are_listed_once() {
        let plan = ActuationPlan::camera_burst().then(Actuator::Relay, true, Duration::ZERO);
        assert_eq!(plan.actuators(), vec![Actuator::Camera, Actuator::Relay]);
    }
}
