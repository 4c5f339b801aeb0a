use std::sync::Mutex;

use crate::protocol::VcpReply;
use crate::protocol::constants::VCP_LUMINANCE;
use crate::transport::I2cTransport;
use crate::vcp::{VcpController, VcpError};

pub type DeviceId = String;

/// Fallback brightness range when neither hardware nor a prior session
/// provides one.
pub const DEFAULT_MAX_BRIGHTNESS: u16 = 100;

/// How protocol support was established for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// A full read+write round trip succeeded.
    Full,
    /// Only writes are known to work; reads fail on this hardware.
    WriteOnly,
}

/// Cached brightness for one device.
///
/// The pair always moves together: `raw == round(percentage * max)` and both
/// fields are replaced in one step after a confirmed hardware read or write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessState {
    pub percentage: f32,
    pub raw: u16,
}

impl BrightnessState {
    pub fn from_percentage(percentage: f32, max: u16) -> Self {
        let percentage = percentage.clamp(0.0, 1.0);
        Self {
            percentage,
            raw: (percentage * f32::from(max.max(1))).round() as u16,
        }
    }

    pub fn from_raw(raw: u16, max: u16) -> Self {
        let max = max.max(1);
        let raw = raw.min(max);
        Self {
            percentage: f32::from(raw) / f32::from(max),
            raw,
        }
    }
}

/// One controllable display channel.
///
/// Identity and channel are fixed at construction; only the registry creates
/// and destroys devices.
pub struct Device {
    id: DeviceId,
    name: String,
    max_brightness: u16,
    verification: Verification,
    resolution: Option<(u32, u32)>,
    refresh_hz: Option<f32>,
    channel: Mutex<Box<dyn I2cTransport>>,
}

impl Device {
    pub(crate) fn new(
        id: DeviceId,
        name: String,
        max_brightness: u16,
        verification: Verification,
        resolution: Option<(u32, u32)>,
        refresh_hz: Option<f32>,
        channel: Box<dyn I2cTransport>,
    ) -> Self {
        Self {
            id,
            name,
            max_brightness,
            verification,
            resolution,
            refresh_hz,
            channel: Mutex::new(channel),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_brightness(&self) -> u16 {
        self.max_brightness
    }

    pub fn verification(&self) -> Verification {
        self.verification
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn refresh_hz(&self) -> Option<f32> {
        self.refresh_hz
    }

    /// Read the luminance register. The channel is lent to the controller for
    /// the duration of this one operation.
    pub fn read_brightness(&self, vcp: &VcpController) -> Result<VcpReply, VcpError> {
        let mut channel = self.channel.lock().unwrap();
        vcp.get(channel.as_mut(), VCP_LUMINANCE)
    }

    /// Write the luminance register.
    pub fn write_brightness(&self, vcp: &VcpController, raw: u16) -> Result<(), VcpError> {
        let mut channel = self.channel.lock().unwrap();
        vcp.set(channel.as_mut(), VCP_LUMINANCE, raw)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Device(id: {}, name: {}, max: {}, {:?})",
            self.id, self.name, self.max_brightness, self.verification
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_and_raw_stay_paired() {
        let state = BrightnessState::from_percentage(0.37, 100);
        assert_eq!(state.raw, 37);

        let state = BrightnessState::from_percentage(0.5, 255);
        assert_eq!(state.raw, 128);

        let state = BrightnessState::from_raw(37, 100);
        assert!((state.percentage - 0.37).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(BrightnessState::from_percentage(1.7, 100).raw, 100);
        assert_eq!(BrightnessState::from_percentage(-0.3, 100).raw, 0);
        // A reply above the resolved max is clamped, not trusted.
        assert_eq!(BrightnessState::from_raw(300, 100).raw, 100);
    }
}
