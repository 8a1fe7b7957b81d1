//! HD44780 character LCD module, driven over a 4-bit GPIO bus.
//!
//! Only the write direction is implemented: the RW line is expected to be tied low, and the
//! driver waits out the documented execution times instead of polling the busy flag.

pub mod driver;
