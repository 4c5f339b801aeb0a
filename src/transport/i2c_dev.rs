// SPDX-License-Identifier: GPL-3.0-only
//! Linux `/dev/i2c-N` transport binding.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use super::traits::{I2cTransport, TransportError};

/// `ioctl` request to select the slave address on an i2c-dev fd.
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// One open i2c-dev node, usable as a DDC/CI channel.
pub struct LinuxI2cDevice {
    file: File,
    path: String,
}

impl LinuxI2cDevice {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let display_path = path.as_ref().display().to_string();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .map_err(|e| TransportError::OpenFailed {
                path: display_path.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            file,
            path: display_path,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn select_address(&self, address: u16) -> Result<(), TransportError> {
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_SLAVE,
                libc::c_ulong::from(address),
            )
        };
        if ret < 0 {
            return Err(TransportError::AddressFailed {
                address,
                message: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }
}

impl I2cTransport for LinuxI2cDevice {
    fn write(&mut self, address: u16, sub_address: u8, data: &[u8]) -> Result<(), TransportError> {
        self.select_address(address)?;

        let mut buf = Vec::with_capacity(data.len() + 1);
        buf.push(sub_address);
        buf.extend_from_slice(data);

        let written = unsafe {
            libc::write(
                self.file.as_raw_fd(),
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
            )
        };
        if written < 0 {
            return Err(TransportError::WriteFailed(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        if written as usize != buf.len() {
            return Err(TransportError::WriteFailed(format!(
                "wrote {written} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }

    fn read(&mut self, address: u16, len: usize) -> Result<Vec<u8>, TransportError> {
        self.select_address(address)?;

        let mut buf = vec![0u8; len];
        let read = unsafe {
            libc::read(
                self.file.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if read < 0 {
            return Err(TransportError::ReadFailed(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        if (read as usize) < len {
            return Err(TransportError::ShortRead {
                expected: len,
                actual: read as usize,
            });
        }
        Ok(buf)
    }
}
