//! [GpioDriver] implementation on top of the Linux GPIO character device, using the gpiod library.
use crate::{
    GpioActiveLevel, GpioBias, GpioBusInput, GpioBusOutput, GpioDriveMode, GpioDriver, GpioError,
    GpioOutput, GpioResult, LineConfig,
};
use bitvec::vec::BitVec;
use log::trace;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver hands out lines of a single GPIO chip (e.g. `/dev/gpiochip0`).
pub struct GpiodDriver {
    chip: gpiod::Chip,
    claimed: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            claimed: BitVec::repeat(false, n),
        }
    }

    /// Opens the chip at the given device path.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path.as_ref())?))
    }

    fn claim<const N: usize>(&self, indices: [usize; N]) -> GpioResult<Claim<'_, N>> {
        let n = self.count()?;

        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }
        if (1..N).any(|i| indices[..i].contains(&indices[i])) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.claimed[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for index in indices {
            self.claimed.set_aliased(index, true);
        }
        trace!("Claimed lines {:?}", indices);

        Ok(Claim {
            driver: self,
            indices,
        })
    }

    fn offsets<const N: usize>(indices: [usize; N]) -> [u32; N] {
        indices.map(|index| index as u32)
    }

    fn request_input<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<GpiodLines<'_, gpiod::Input, N>> {
        let claim = self.claim(indices)?;
        let lines = self.chip.request_lines(
            gpiod::Options::input(Self::offsets(indices))
                .consumer(env!("CARGO_PKG_NAME"))
                .active(config.active_level.into())
                .bias(config.bias.into()),
        )?;
        Ok(GpiodLines { claim, lines })
    }

    fn request_output<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<GpiodLines<'_, gpiod::Output, N>> {
        let claim = self.claim(indices)?;
        let lines = self.chip.request_lines(
            gpiod::Options::output(Self::offsets(indices))
                .consumer(env!("CARGO_PKG_NAME"))
                .active(config.active_level.into())
                .bias(config.bias.into())
                .drive(config.drive_mode.into()),
        )?;
        Ok(GpiodLines { claim, lines })
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn output(&self, index: usize, config: LineConfig) -> GpioResult<Box<dyn GpioOutput + '_>> {
        Ok(Box::new(self.request_output([index], config)?))
    }

    fn bus_input<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        Ok(Box::new(self.request_input(indices, config)?))
    }

    fn bus_output<const N: usize>(
        &self,
        indices: [usize; N],
        config: LineConfig,
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        Ok(Box::new(self.request_output(indices, config)?))
    }
}

impl From<GpioActiveLevel> for gpiod::Active {
    fn from(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => gpiod::Active::High,
            GpioActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

impl From<GpioDriveMode> for gpiod::Drive {
    fn from(mode: GpioDriveMode) -> Self {
        match mode {
            GpioDriveMode::PushPull => gpiod::Drive::PushPull,
            GpioDriveMode::OpenDrain => gpiod::Drive::OpenDrain,
            GpioDriveMode::OpenSource => gpiod::Drive::OpenSource,
        }
    }
}

/// Marks lines as used for as long as it lives.
struct Claim<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
}

impl<const N: usize> Drop for Claim<'_, N> {
    fn drop(&mut self) {
        for &index in &self.indices {
            self.driver.claimed.set_aliased(index, false);
        }
        trace!("Released lines {:?}", self.indices);
    }
}

/// Requested lines of one direction. A single line is just a bus of one.
struct GpiodLines<'a, D, const N: usize> {
    claim: Claim<'a, N>,
    lines: gpiod::Lines<D>,
}

impl<D, const N: usize> Debug for GpiodLines<'_, D, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.claim.driver, self.claim.indices)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodLines<'_, gpiod::Input, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.lines.get_values([false; N])?)
    }
}

impl GpioOutput for GpiodLines<'_, gpiod::Output, 1> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.lines.set_values([value])?;
        Ok(())
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodLines<'_, gpiod::Output, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.lines.set_values(*values)?;
        Ok(())
    }
}
