use thiserror::Error;
use keyward_gpio::GpioError;
use crate::store::StoreError;

/// Errors surfaced by the control loop. None of them stop the lock; they're logged and the
/// loop carries on.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
    #[error("code store error: {0}")]
    Store(#[from] StoreError),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

pub type LockResult<T> = Result<T, LockError>;
