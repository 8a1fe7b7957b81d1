mod access;
mod actuation;
mod clock;
mod code;
mod config;
mod devices;
mod enrollment;
mod entry;
mod error;
mod modem;
mod store;
mod utils;
#[cfg(test)]
mod testing;

use std::env::var;
use dotenv::dotenv;
use log::{debug, info, warn};
use sysinfo::System;
use keyward_gpio::{GpioDriver, LineConfig};
use keyward_gpio::gpiod::GpiodDriver;
use keyward_gpio::keypad::{DebouncedKeypad, GpioKeypad};
use keyward_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver};
use crate::access::AccessControl;
use crate::actuation::GpioActuators;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::devices::{KeypadSource, LcdConsole, Peripherals, TextDisplay};
use crate::enrollment::Enrollment;
use crate::modem::{open_serial_modem, Dialer, NoModem};
use crate::store::CodeFile;

fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Expected exactly 4 pins in {:?}", pin_str))
}

fn pin(name: &str) -> eyre::Result<usize> {
    Ok(var(name)?.parse()?)
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("KeyWard v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Running on {} {}, kernel {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    let config = Config::load();

    // Get pin numbers from env
    let chip_path = var("KEYWARD_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    let lcd_e_pin_no = pin("KEYWARD_LCD_PIN_E")?;
    let lcd_rs_pin_no = pin("KEYWARD_LCD_PIN_RS")?;
    let lcd_data_pin_nos = parse_pin_bus(&var("KEYWARD_LCD_PINS_DATA")?)?;
    let lcd_backlight_pin_no = match var("KEYWARD_LCD_PIN_BACKLIGHT") {
        Ok(s) => Some(s.parse::<usize>()?),
        Err(_) => None,
    };
    let keypad_pin_col_nos = parse_pin_bus(&var("KEYWARD_KEYPAD_PINS_COLS")?)?;
    let keypad_pin_row_nos = parse_pin_bus(&var("KEYWARD_KEYPAD_PINS_ROWS")?)?;
    let relay_pin_no = pin("KEYWARD_RELAY_PIN")?;
    let camera_pin_no = pin("KEYWARD_CAMERA_PIN")?;
    let led_pin_no = pin("KEYWARD_LED_PIN")?;

    info!("LCD @ E: {}, RS: {}, Data: {:?}, Backlight: {:?}",
        lcd_e_pin_no, lcd_rs_pin_no, lcd_data_pin_nos, lcd_backlight_pin_no);
    info!("Keypad @ Cols: {:?}, Rows: {:?}", keypad_pin_col_nos, keypad_pin_row_nos);
    info!("Relay @ {}, Camera @ {}, LED @ {}", relay_pin_no, camera_pin_no, led_pin_no);

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized with {} lines.", gpio, gpio.count()?);

    debug!("Initializing LCD driver...");
    let lcd_e_out = gpio.output(lcd_e_pin_no, LineConfig::default())?;
    let lcd_rs_out = gpio.output(lcd_rs_pin_no, LineConfig::default())?;
    let lcd_data_bus = gpio.bus_output(lcd_data_pin_nos, LineConfig::default())?;
    let lcd_backlight = lcd_backlight_pin_no
        .map(|pin| gpio.output(pin, LineConfig::default()))
        .transpose()?;
    let mut lcd = GpioHD44780Driver::new(&*lcd_e_out, &*lcd_rs_out, &*lcd_data_bus);
    lcd.init(config.lcd_rows > 1)?;
    debug!("{:?} initialized.", lcd);

    let mut console = LcdConsole::new(&mut lcd, config.lcd_rows, config.lcd_cols)
        .with_backlight(lcd_backlight.as_deref());
    console.setup()?;
    console.write_line("Hello")?;

    debug!("Initializing keypad driver...");
    let keypad_col_out = gpio.bus_output(
        keypad_pin_col_nos,
        LineConfig::default().active_low().open_drain(),
    )?;
    let keypad_row_in = gpio.bus_input(
        keypad_pin_row_nos,
        LineConfig::default().active_low().pull_up(),
    )?;
    let keypad = GpioKeypad::new(&*keypad_col_out, &*keypad_row_in);
    let debounced = DebouncedKeypad::new(&keypad)
        .with_debounce_time(config.timings.key_debounce());
    let mut keys = KeypadSource::new(&debounced);
    debug!("{:?} initialized.", keys);

    debug!("Initializing actuators...");
    let clock = SystemClock;
    let relay_out = gpio.output(relay_pin_no, LineConfig::default())?;
    let camera_out = gpio.output(camera_pin_no, LineConfig::default())?;
    let led_out = gpio.output(led_pin_no, LineConfig::default())?;
    let mut actuators = GpioActuators::new(&*relay_out, &*camera_out, &*led_out, &clock);
    actuators.release_all()?;

    let mut dialer: Box<dyn Dialer> = match &config.emergency_number {
        None => {
            warn!("No emergency number configured, the alarm won't place calls.");
            Box::new(NoModem::new("no emergency number configured"))
        }
        Some(_) => match open_serial_modem(&config.modem_port, config.modem_baud) {
            Ok(modem) => Box::new(modem),
            Err(e) => {
                warn!("Modem on {} unavailable: {}", config.modem_port, e);
                Box::new(NoModem::new(e.to_string()))
            }
        },
    };

    let mut store = CodeFile::new(&config.code_file, config.default_code);
    info!("Using code file {}.", store.path().display());

    let mut io = Peripherals {
        keys: &mut keys,
        display: &mut console,
        actuators: &mut actuators,
        clock: &clock,
    };
    let codes = Enrollment::new(&mut store, &config).run(&mut io)?;

    info!("KeyWard initialized. Starting main loop...");
    AccessControl::new(codes, &config, io, &mut *dialer).run()
}
