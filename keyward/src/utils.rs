use log::warn;
use thiserror::Error;
use time::OffsetDateTime;
use keyward_gpio::{GpioError, GpioResult};
use keyward_gpio::lcd::hd44780::driver::HD44780Driver;

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum TryGetSingleError {
    #[error("collection is empty")]
    Empty,
    #[error("collection has more than one item")]
    MoreThanOne,
}

pub trait CollectionExt {
    type Item;

    fn try_get_single(&self) -> Result<&Self::Item, TryGetSingleError>;
}

impl<T> CollectionExt for Vec<T> {
    type Item = T;

    fn try_get_single(&self) -> Result<&T, TryGetSingleError> {
        match self.as_slice() {
            [] => Err(TryGetSingleError::Empty),
            [item] => Ok(item),
            _ => Err(TryGetSingleError::MoreThanOne),
        }
    }
}

/// DDRAM address of the first column of each row on HD44780 modules with up to 4 rows.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

pub trait DisplayExt {
    fn print(&mut self, s: &str) -> GpioResult<()>;
    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()>;
}

impl<T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            if c.is_ascii() && !c.is_ascii_control() {
                self.send_data(c as u8)?;
            } else {
                warn!("Unprintable character: {:?}", c);
                self.send_data(b'?')?
            }
        }
        Ok(())
    }

    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()> {
        let offset = ROW_OFFSETS.get(row).ok_or(GpioError::InvalidArgument)?;
        if col >= 40 {
            return Err(GpioError::InvalidArgument);
        }
        self.set_ddram_address(offset + col as u8)
    }
}

/// Current local time, falling back to UTC when the local offset can't be determined.
pub fn timestamp() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
