//! Shared fixtures for registry and coordinator tests.

use crate::platform::{ControlService, DiscoveryError, DisplayChannel, Platform, ServiceIdentity};
use crate::transport::MockTransport;

/// Scriptable platform: fixed channel list, services backed by mock
/// transports the test keeps handles to.
pub(crate) struct MockPlatform {
    pub channels: Vec<DisplayChannel>,
    pub services: Vec<(Option<ServiceIdentity>, MockTransport)>,
}

impl Platform for MockPlatform {
    fn display_channels(&mut self) -> Result<Vec<DisplayChannel>, DiscoveryError> {
        Ok(self.channels.clone())
    }

    fn control_services(&mut self) -> Result<Vec<ControlService>, DiscoveryError> {
        Ok(self
            .services
            .iter()
            .map(|(identity, transport)| ControlService {
                identity: *identity,
                channel: Box::new(transport.clone()),
            })
            .collect())
    }
}

pub(crate) fn test_channel(id: &str, vendor: u16, product: u16) -> DisplayChannel {
    DisplayChannel {
        id: id.to_string(),
        name: format!("Monitor {id}"),
        vendor_id: vendor,
        product_id: product,
        resolution: Some((1920, 1080)),
        refresh_hz: Some(60.0),
    }
}

/// Value carried by a captured write, if it is a Set VCP frame.
pub(crate) fn set_value(write: &(u16, u8, Vec<u8>)) -> Option<u16> {
    let frame = &write.2;
    if frame.len() == 6 && frame[1] == 3 {
        Some(u16::from_be_bytes([frame[3], frame[4]]))
    } else {
        None
    }
}
