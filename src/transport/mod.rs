//! Byte-level channel transports.

pub mod mock;
pub mod traits;

#[cfg(feature = "linux-platform")]
pub mod i2c_dev;

pub use mock::MockTransport;
pub use traits::{I2cTransport, TransportError};

#[cfg(feature = "linux-platform")]
pub use i2c_dev::LinuxI2cDevice;
