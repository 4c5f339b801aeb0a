// SPDX-License-Identifier: GPL-3.0-only
//! Linux platform binding.
//!
//! Display topology comes from the DRM connectors in sysfs; candidate control
//! services are the `/dev/i2c-N` nodes enumerated through udev, each opened
//! as a raw transport with its identity read from the EDID EEPROM.

use std::path::Path;

use crate::protocol::constants::EDID_I2C_ADDRESS;
use crate::transport::{I2cTransport, LinuxI2cDevice};

use super::edid;
use super::{ControlService, DiscoveryError, DisplayChannel, Platform, ServiceIdentity};

const DRM_SYSFS: &str = "/sys/class/drm";

/// Connector prefixes belonging to internal panels, which DDC/CI cannot drive.
const INTERNAL_CONNECTORS: [&str; 2] = ["eDP", "LVDS"];

#[derive(Debug, Default)]
pub struct LinuxPlatform;

impl LinuxPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for LinuxPlatform {
    fn display_channels(&mut self) -> Result<Vec<DisplayChannel>, DiscoveryError> {
        let mut channels = Vec::new();

        for entry in std::fs::read_dir(DRM_SYSFS)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();

            // Connector directories look like "card0-DP-1"; the card
            // directories themselves carry no dash-separated connector part.
            let Some((_, connector)) = file_name.split_once('-') else {
                continue;
            };
            if INTERNAL_CONNECTORS
                .iter()
                .any(|prefix| connector.starts_with(prefix))
            {
                continue;
            }

            let path = entry.path();
            match std::fs::read_to_string(path.join("status")) {
                Ok(status) if status.trim() == "connected" => {}
                _ => continue,
            }

            let edid_bytes = std::fs::read(path.join("edid")).unwrap_or_default();
            let Some(info) = edid::parse(&edid_bytes) else {
                debug!(connector, "connected output without usable EDID, skipping");
                continue;
            };

            channels.push(DisplayChannel {
                id: connector.to_string(),
                name: info.name.unwrap_or_else(|| connector.to_string()),
                vendor_id: info.vendor_id,
                product_id: info.product_id,
                resolution: read_preferred_mode(&path),
                refresh_hz: None,
            });
        }

        info!(count = channels.len(), "found connected external displays");
        Ok(channels)
    }

    fn control_services(&mut self) -> Result<Vec<ControlService>, DiscoveryError> {
        let mut enumerator =
            udev::Enumerator::new().map_err(|e| DiscoveryError::Services(e.to_string()))?;
        enumerator
            .match_subsystem("i2c-dev")
            .map_err(|e| DiscoveryError::Services(e.to_string()))?;

        let mut services = Vec::new();
        for device in enumerator
            .scan_devices()
            .map_err(|e| DiscoveryError::Services(e.to_string()))?
        {
            let Some(node) = device.devnode() else {
                continue;
            };
            let adapter = device
                .attribute_value("name")
                .map(|v| v.to_string_lossy().into_owned())
                .unwrap_or_default();
            if adapter.contains("SMBus") {
                debug!(node = %node.display(), %adapter, "skipping non-display adapter");
                continue;
            }

            match LinuxI2cDevice::open(node) {
                Ok(mut channel) => {
                    let identity = read_identity(&mut channel);
                    debug!(node = %node.display(), %adapter, ?identity, "candidate control service");
                    services.push(ControlService {
                        identity,
                        channel: Box::new(channel),
                    });
                }
                Err(err) => {
                    debug!(node = %node.display(), error = %err, "cannot open i2c node");
                }
            }
        }

        info!(count = services.len(), "enumerated candidate control services");
        Ok(services)
    }
}

/// Read the identity block from the EDID EEPROM on this channel, if present.
fn read_identity(channel: &mut dyn I2cTransport) -> Option<ServiceIdentity> {
    channel.write(EDID_I2C_ADDRESS, 0x00, &[]).ok()?;
    let bytes = channel.read(EDID_I2C_ADDRESS, 128).ok()?;
    edid::parse(&bytes).map(|info| ServiceIdentity {
        vendor_id: info.vendor_id,
        product_id: info.product_id,
    })
}

/// First entry of the connector's mode list, e.g. "1920x1080".
fn read_preferred_mode(connector_path: &Path) -> Option<(u32, u32)> {
    let modes = std::fs::read_to_string(connector_path.join("modes")).ok()?;
    parse_mode_line(modes.lines().next()?)
}

fn parse_mode_line(line: &str) -> Option<(u32, u32)> {
    let (width, height) = line.trim().split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_lines() {
        assert_eq!(parse_mode_line("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_mode_line("3840x2160\n"), Some((3840, 2160)));
        assert_eq!(parse_mode_line("preferred"), None);
    }
}
