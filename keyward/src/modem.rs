//! Emergency call over a GSM modem speaking AT commands on a serial line.

use std::fmt::{Debug, Display, Formatter};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use log::{debug, info, warn};
use serialport::SerialPort;
use crate::error::LockResult;

/// Timeout for a single read from the modem. Dialing can take a while before the modem answers
/// with a result code.
pub const MODEM_TIMEOUT: Duration = Duration::from_secs(10);

/// How many non-result lines (echo, unsolicited notices) are skipped before giving up.
const MAX_SKIPPED_LINES: usize = 8;

/// Longest line accepted from the modem. Result codes and notices are far shorter.
const MAX_LINE_LEN: usize = 256;

/// Outcome of a dial attempt. Only reported, never acted upon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallStatus {
    Connected,
    Busy,
    NoCarrier,
    NoAnswer,
    NoDialtone,
    Error,
    Timeout,
    Unavailable(String),
}

impl CallStatus {
    /// Maps a final result code line to a status.
    pub fn from_result_code(line: &str) -> Option<Self> {
        match line.trim() {
            "OK" | "CONNECT" => Some(CallStatus::Connected),
            "BUSY" => Some(CallStatus::Busy),
            "NO CARRIER" => Some(CallStatus::NoCarrier),
            "NO ANSWER" => Some(CallStatus::NoAnswer),
            "NO DIALTONE" | "NO DIAL TONE" => Some(CallStatus::NoDialtone),
            "ERROR" => Some(CallStatus::Error),
            line if line.starts_with("+CME ERROR") => Some(CallStatus::Error),
            _ => None,
        }
    }
}

impl Display for CallStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Connected => write!(f, "Call placed"),
            CallStatus::Busy => write!(f, "Line busy"),
            CallStatus::NoCarrier => write!(f, "No carrier"),
            CallStatus::NoAnswer => write!(f, "No answer"),
            CallStatus::NoDialtone => write!(f, "No dialtone"),
            CallStatus::Error => write!(f, "Modem error"),
            CallStatus::Timeout => write!(f, "Modem timeout"),
            CallStatus::Unavailable(_) => write!(f, "No modem"),
        }
    }
}

/// Something that can place an outbound voice call.
pub trait Dialer: Debug {
    fn place_call(&mut self, number: &str) -> CallStatus;
}

/// A modem driven with `ATD<number>;` over any byte stream.
pub struct AtModem<T> {
    port: T,
}

impl<T> AtModem<T> {
    pub fn new(port: T) -> Self {
        AtModem { port }
    }
}

impl<T> Debug for AtModem<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtModem")
    }
}

impl<T: Read + Write> AtModem<T> {
    /// Reads one CR/LF terminated line, without the terminator. Fails with
    /// [ErrorKind::InvalidData] once the line outgrows [MAX_LINE_LEN].
    fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(ErrorKind::UnexpectedEof.into()),
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) if byte[0] == b'\r' => {}
                Ok(_) if line.len() >= MAX_LINE_LEN => {
                    return Err(std::io::Error::new(ErrorKind::InvalidData, "modem line too long"));
                }
                Ok(_) => line.push(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn dial(&mut self, number: &str) -> std::io::Result<CallStatus> {
        let command = format!("ATD{number};");
        self.port.write_all(command.as_bytes())?;
        self.port.write_all(b"\r")?;
        self.port.flush()?;

        for _ in 0..MAX_SKIPPED_LINES {
            let line = self.read_line()?;
            debug!("Modem: {:?}", line);
            if let Some(status) = CallStatus::from_result_code(&line) {
                return Ok(status);
            }
        }
        Ok(CallStatus::Timeout)
    }
}

impl<T: Read + Write> Dialer for AtModem<T> {
    fn place_call(&mut self, number: &str) -> CallStatus {
        info!("Dialing {}.", number);
        match self.dial(number) {
            Ok(status) => status,
            Err(err) if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock => {
                warn!("Modem did not answer in time.");
                CallStatus::Timeout
            }
            Err(err) => {
                warn!("Modem I/O failed: {}", err);
                CallStatus::Unavailable(err.to_string())
            }
        }
    }
}

/// Opens the modem's serial port.
pub fn open_serial_modem(path: &str, baud_rate: u32) -> LockResult<AtModem<Box<dyn SerialPort>>> {
    let port = serialport::new(path, baud_rate)
        .timeout(MODEM_TIMEOUT)
        .open()?;
    debug!("Opened modem on {} at {} baud.", path, baud_rate);
    Ok(AtModem::new(port))
}

/// Stand-in used when no modem or no number is available.
#[derive(Debug, Clone)]
pub struct NoModem {
    reason: String,
}

impl NoModem {
    pub fn new(reason: impl Into<String>) -> Self {
        NoModem { reason: reason.into() }
    }
}

impl Dialer for NoModem {
    fn place_call(&mut self, number: &str) -> CallStatus {
        warn!("Not calling {}: {}", number, self.reason);
        CallStatus::Unavailable(self.reason.clone())
    }
}
