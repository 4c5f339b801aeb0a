// SPDX-License-Identifier: GPL-3.0-only
//! Device registry.
//!
//! Maps the currently connected external display channels to verified,
//! controllable [`Device`] records: probe every raw service for protocol
//! support, pair verified services with display channels by identity, fall
//! back to positional assignment, and resolve each device's brightness range.

use std::sync::Arc;

use crate::config::StoredState;
use crate::platform::{ControlService, DisplayChannel, Platform, ServiceIdentity};
use crate::protocol::VcpReply;
use crate::protocol::constants::VCP_LUMINANCE;
use crate::transport::I2cTransport;
use crate::vcp::VcpController;

use super::device::{DEFAULT_MAX_BRIGHTNESS, Device, DeviceId, Verification};

/// Baseline the write probe assumes when the current value cannot be read.
const PROBE_BASELINE: u16 = 50;

struct Candidate {
    identity: Option<ServiceIdentity>,
    channel: Box<dyn I2cTransport>,
    verification: Verification,
    read: Option<VcpReply>,
    slot: Option<usize>,
}

/// The canonical list of controllable devices. Exclusively owns the device
/// records; only discovery creates or destroys them.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<Arc<Device>>,
}

impl DeviceRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Run one discovery pass against the platform.
    ///
    /// Never fails: topology or enumeration errors degrade to an empty
    /// registry, which the coordinator reports as "no display connected".
    pub fn discover(
        platform: &mut dyn Platform,
        vcp: &VcpController,
        stored: &StoredState,
    ) -> Self {
        let channels = platform.display_channels().unwrap_or_else(|err| {
            warn!(error = %err, "display topology query failed");
            Vec::new()
        });
        let services = platform.control_services().unwrap_or_else(|err| {
            warn!(error = %err, "service enumeration failed");
            Vec::new()
        });

        let mut candidates = Vec::new();
        for (index, service) in services.into_iter().enumerate() {
            let ControlService {
                identity,
                mut channel,
            } = service;
            match probe(vcp, channel.as_mut()) {
                Some((verification, read)) => {
                    debug!(index, ?identity, ?verification, "service verified");
                    candidates.push(Candidate {
                        identity,
                        channel,
                        verification,
                        read,
                        slot: None,
                    });
                }
                None => debug!(index, "service does not speak the protocol, discarding"),
            }
        }

        let mut claimed = vec![false; channels.len()];

        // Identity matches claim their channels first, so a positional
        // assignment can never steal a channel from an identity match no
        // matter the enumeration order.
        for candidate in &mut candidates {
            let Some(identity) = candidate.identity else {
                continue;
            };
            let matched = channels.iter().enumerate().position(|(i, channel)| {
                !claimed[i]
                    && channel.vendor_id == identity.vendor_id
                    && channel.product_id == identity.product_id
            });
            if let Some(slot) = matched {
                claimed[slot] = true;
                candidate.slot = Some(slot);
            }
        }

        // Remaining verified services take unclaimed channels in discovery
        // order. Accepted degraded mode, logged but not a failure.
        for candidate in &mut candidates {
            if candidate.slot.is_some() {
                continue;
            }
            match claimed.iter().position(|taken| !taken) {
                Some(slot) => {
                    claimed[slot] = true;
                    candidate.slot = Some(slot);
                    warn!(
                        channel = %channels[slot].id,
                        "service has no matching identity, assigned positionally"
                    );
                }
                None => {
                    warn!("verified service left without a display channel, dropping");
                }
            }
        }

        let mut devices: Vec<Arc<Device>> = Vec::new();
        for candidate in candidates {
            let Some(slot) = candidate.slot else {
                continue;
            };
            let channel_info = &channels[slot];

            let mut id = device_id(candidate.identity, channel_info);
            // Two identical monitors resolve to the same identity id.
            if devices.iter().any(|d| d.id() == id) {
                id = format!("{id}-{slot}");
            }

            let max_brightness = resolve_max(&id, candidate.read, stored);
            info!(
                %id,
                name = %channel_info.name,
                max_brightness,
                verification = ?candidate.verification,
                "registered controllable device"
            );
            devices.push(Arc::new(Device::new(
                id,
                channel_info.name.clone(),
                max_brightness,
                candidate.verification,
                channel_info.resolution,
                channel_info.refresh_hz,
                candidate.channel,
            )));
        }

        if devices.is_empty() {
            info!("discovery finished with no controllable devices");
        }
        Self { devices }
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<Device>> {
        self.devices.get(index).cloned()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.id() == id)
    }
}

/// Probe one service for protocol support.
///
/// A successful read marks the channel fully verified. Otherwise a one-step
/// perturbation around the assumed baseline, followed by a restore, marks it
/// write-only. A service failing both is not controllable.
fn probe(
    vcp: &VcpController,
    channel: &mut dyn I2cTransport,
) -> Option<(Verification, Option<VcpReply>)> {
    match vcp.get(channel, VCP_LUMINANCE) {
        Ok(reply) => Some((Verification::Full, Some(reply))),
        Err(err) => {
            debug!(error = %err, "read probe failed, trying write-only probe");
            vcp.set(channel, VCP_LUMINANCE, PROBE_BASELINE + 1).ok()?;
            vcp.set(channel, VCP_LUMINANCE, PROBE_BASELINE).ok()?;
            Some((Verification::WriteOnly, None))
        }
    }
}

/// Stable, identity-derived device id when possible; the bare channel
/// identifier otherwise (unstable across replug, hence the warning).
fn device_id(identity: Option<ServiceIdentity>, channel: &DisplayChannel) -> DeviceId {
    if let Some(identity) = identity {
        return format!("ddc-{:04x}{:04x}", identity.vendor_id, identity.product_id);
    }
    if channel.vendor_id != 0 || channel.product_id != 0 {
        return format!("ddc-{:04x}{:04x}", channel.vendor_id, channel.product_id);
    }
    warn!(
        channel = %channel.id,
        "no identity metadata available, falling back to unstable channel id"
    );
    channel.id.clone()
}

/// Verified read, else the prior session's value for this identity, else the
/// conservative default.
fn resolve_max(id: &str, read: Option<VcpReply>, stored: &StoredState) -> u16 {
    if let Some(max) = read.map(|r| r.max_value).filter(|&m| m > 0) {
        return max;
    }
    if let Some(max) = stored.max_brightness(id) {
        debug!(%id, max, "max brightness inherited from prior session");
        return max;
    }
    DEFAULT_MAX_BRIGHTNESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::simulate_reply;
    use crate::transport::MockTransport;
    use crate::vcp::Timing;

    use crate::monitor::testing::{MockPlatform, set_value, test_channel};

    fn vcp() -> VcpController {
        VcpController::new(Timing::immediate())
    }

    #[test]
    fn identity_match_beats_positional_order() {
        for reverse in [false, true] {
            let matched = MockTransport::new();
            matched.queue_reply(simulate_reply(VCP_LUMINANCE, 100, 40));
            let positional = MockTransport::new();
            positional.queue_reply(simulate_reply(VCP_LUMINANCE, 100, 60));

            let identity = ServiceIdentity {
                vendor_id: 0x1E6D,
                product_id: 0x0777,
            };
            let mut services = vec![
                (None, positional.clone()),
                (Some(identity), matched.clone()),
            ];
            if reverse {
                services.reverse();
            }

            let mut platform = MockPlatform {
                channels: vec![
                    test_channel("DP-1", 0x10AC, 0xA042),
                    test_channel("DP-2", 0x1E6D, 0x0777),
                ],
                services,
            };

            let registry = DeviceRegistry::discover(&mut platform, &vcp(), &StoredState::default());
            assert_eq!(registry.len(), 2);

            let matched_device = registry
                .devices()
                .iter()
                .find(|d| d.id() == "ddc-1e6d0777")
                .expect("identity-matched device present");
            assert_eq!(matched_device.name(), "Monitor DP-2");

            let positional_device = registry
                .devices()
                .iter()
                .find(|d| d.id() == "ddc-10aca042")
                .expect("positional device present");
            assert_eq!(positional_device.name(), "Monitor DP-1");
        }
    }

    #[test]
    fn unreadable_service_is_verified_by_write_probe() {
        let transport = MockTransport::new();
        transport.fail_reads(true);

        let mut platform = MockPlatform {
            channels: vec![test_channel("HDMI-1", 0x10AC, 0xA042)],
            services: vec![(None, transport.clone())],
        };

        let registry = DeviceRegistry::discover(&mut platform, &vcp(), &StoredState::default());
        assert_eq!(registry.len(), 1);
        let device = registry.get(0).unwrap();
        assert_eq!(device.verification(), Verification::WriteOnly);
        assert_eq!(device.max_brightness(), DEFAULT_MAX_BRIGHTNESS);

        // Perturbation then restore, in that order.
        let set_values: Vec<u16> = transport.writes().iter().filter_map(set_value).collect();
        assert!(set_values.starts_with(&[PROBE_BASELINE + 1]));
        assert_eq!(set_values.last(), Some(&PROBE_BASELINE));
    }

    #[test]
    fn service_failing_both_probes_is_discarded() {
        let transport = MockTransport::new();
        transport.fail_reads(true);
        transport.fail_writes(true);

        let mut platform = MockPlatform {
            channels: vec![test_channel("HDMI-1", 0x10AC, 0xA042)],
            services: vec![(None, transport)],
        };

        let registry = DeviceRegistry::discover(&mut platform, &vcp(), &StoredState::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn max_brightness_inherited_from_prior_session() {
        let transport = MockTransport::new();
        transport.fail_reads(true);

        let mut stored = StoredState::default();
        stored.remember_max("ddc-10aca042", 180);

        let mut platform = MockPlatform {
            channels: vec![test_channel("DP-1", 0x10AC, 0xA042)],
            services: vec![(None, transport)],
        };

        let registry = DeviceRegistry::discover(&mut platform, &vcp(), &stored);
        assert_eq!(registry.get(0).unwrap().max_brightness(), 180);
    }

    #[test]
    fn max_brightness_taken_from_verified_read() {
        let transport = MockTransport::new();
        transport.queue_reply(simulate_reply(VCP_LUMINANCE, 255, 128));

        let mut platform = MockPlatform {
            channels: vec![test_channel("DP-1", 0x10AC, 0xA042)],
            services: vec![(None, transport)],
        };

        let registry = DeviceRegistry::discover(&mut platform, &vcp(), &StoredState::default());
        let device = registry.get(0).unwrap();
        assert_eq!(device.verification(), Verification::Full);
        assert_eq!(device.max_brightness(), 255);
    }

    #[test]
    fn empty_topology_yields_empty_registry() {
        let transport = MockTransport::new();
        transport.queue_reply(simulate_reply(VCP_LUMINANCE, 100, 50));

        let mut platform = MockPlatform {
            channels: vec![],
            services: vec![(None, transport)],
        };

        let registry = DeviceRegistry::discover(&mut platform, &vcp(), &StoredState::default());
        assert!(registry.is_empty());
    }
}
