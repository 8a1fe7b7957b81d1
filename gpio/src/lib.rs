pub mod gpiod;
pub mod keypad;
pub mod lcd;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("line already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// Specifies the active level of a GPIO line.
///
/// By default, the active level is high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

/// Specifies the bias of a GPIO line, enabling the pull-up or pull-down resistors.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// Specifies the drive mode of an output line.
///
/// Open-drain and open-source modes leave the line floating when the output is high or low,
/// respectively. Keypad column scanning relies on open-drain so that two pressed keys in the
/// same row never short two driven columns together.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioDriveMode {
    /// Line is driven high or low with low impedance.
    #[default] PushPull,
    /// Line is driven low or left floating when high.
    OpenDrain,
    /// Line is driven high or left floating when low.
    OpenSource,
}

/// Electrical configuration requested together with a line or bus.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LineConfig {
    pub active_level: GpioActiveLevel,
    pub bias: GpioBias,
    /// Ignored for inputs.
    pub drive_mode: GpioDriveMode,
}

impl LineConfig {
    pub fn active_low(mut self) -> Self {
        self.active_level = GpioActiveLevel::Low;
        self
    }

    pub fn pull_up(mut self) -> Self {
        self.bias = GpioBias::PullUp;
        self
    }

    pub fn open_drain(mut self) -> Self {
        self.drive_mode = GpioDriveMode::OpenDrain;
        self
    }
}

/// A source of GPIO lines.
///
/// Lines are claimed when requested and released when the returned handle is dropped, so a
/// line can't be handed out twice at the same time.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Requests a single line as an output.
    fn output(&self, index: usize, config: LineConfig) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Requests several lines read together, in the given order.
    fn bus_input<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;

    /// Requests several lines written together, in the given order.
    fn bus_output<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the logical state of the line.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<4> + '_ {
    /// Writes the values to the lines in the bus.
    /// The values are written as a nibble, LSb first.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0b1111 {
            return Err(GpioError::InvalidArgument);
        }

        let values: [bool; 4] = std::array::from_fn(|i| value & (1 << i) != 0);
        self.write(&values)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::RecordingBus;

    #[test]
    fn nibbles_are_lsb_first() {
        let bus = RecordingBus::default();
        let out: &dyn GpioBusOutput<4> = &bus;
        out.write_nibble(0b0110).unwrap();
        assert_eq!(bus.writes.borrow()[0], [false, true, true, false]);
    }

    #[test]
    fn oversized_nibble_is_rejected() {
        let bus = RecordingBus::default();
        let out: &dyn GpioBusOutput<4> = &bus;
        assert_eq!(out.write_nibble(0x10), Err(GpioError::InvalidArgument));
        assert!(bus.writes.borrow().is_empty());
    }

    #[test]
    fn line_config_builders() {
        let config = LineConfig::default().active_low().pull_up();
        assert_eq!(config.active_level, GpioActiveLevel::Low);
        assert_eq!(config.bias, GpioBias::PullUp);
        assert_eq!(config.drive_mode, GpioDriveMode::PushPull);
        assert_eq!(LineConfig::default().open_drain().drive_mode, GpioDriveMode::OpenDrain);
    }
}
