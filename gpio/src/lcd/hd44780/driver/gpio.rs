use crate::lcd::hd44780::driver::{CursorDirection, HD44780Driver};
use crate::{GpioBusOutput, GpioOutput, GpioResult};
use log::trace;
use std::thread::sleep;
use std::time::Duration;

/// HD44780 driver using a 4-bit data bus (D4..D7, LSb first) and the E and RS lines.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: &'a dyn GpioOutput,
    pin_rs: &'a dyn GpioOutput,
    data_bus: &'a dyn GpioBusOutput<4>,
}

impl<'a> GpioHD44780Driver<'a> {
    pub fn new(
        pin_e: &'a dyn GpioOutput,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<4>,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rs,
            data_bus,
        }
    }

    fn pulse_e(&self) -> GpioResult<()> {
        self.pin_e.write(true)?;
        sleep(Duration::from_micros(1));
        self.pin_e.write(false)?;
        // Longest regular instruction takes 37 µs; give it some slack.
        sleep(Duration::from_micros(100));
        Ok(())
    }

    fn write_nibble(&self, nibble: u8) -> GpioResult<()> {
        self.data_bus.write_nibble(nibble & 0x0F)?;
        self.pulse_e()
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.pin_rs.write(rs)?;
        self.write_nibble(data >> 4)?;
        self.write_nibble(data)?;

        // Clear and return home take up to 1.52 ms.
        if !rs && data <= 0b00000011 {
            sleep(Duration::from_millis(2));
        }
        Ok(())
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn init(&mut self, multiline: bool) -> GpioResult<()> {
        // Synchronize into 8-bit mode whatever state the controller was left in, then
        // switch to 4-bit.
        sleep(Duration::from_millis(50));
        self.pin_rs.write(false)?;
        for _ in 0..3 {
            self.write_nibble(0b0011)?;
            sleep(Duration::from_millis(5));
        }
        self.write_nibble(0b0010)?;

        self.function_set(false, multiline, false)?;
        self.set_display_control(false, false, false)?;
        self.clear_display()?;
        self.set_entry_mode(CursorDirection::Right, false)?;
        self.set_display_control(true, false, false)?;
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)
    }
}
