//! Transport layer abstraction.
//!
//! Defines the `I2cTransport` trait for byte-level access to one display
//! channel, allowing different bindings (Linux i2c-dev, mock, simulator).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to open channel {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("failed to address 0x{address:02X}: {message}")]
    AddressFailed { address: u16, message: String },

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw byte access to one addressed display channel.
///
/// One instance corresponds to one physical channel; the caller addresses a
/// device on the channel per operation (the DDC/CI interface lives at 0x37,
/// the EDID EEPROM at 0x50).
pub trait I2cTransport: Send {
    /// Write `data` to `address`, prefixed with the given sub-address byte.
    fn write(&mut self, address: u16, sub_address: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `len` bytes from `address`.
    ///
    /// Unlike [`write`](Self::write), reads take no sub-address: a DDC/CI
    /// reply is fetched with a plain read transaction, and an i2c-dev read
    /// has no register preamble to carry one in.
    fn read(&mut self, address: u16, len: usize) -> Result<Vec<u8>, TransportError>;
}
