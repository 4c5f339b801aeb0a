//! Host platform inputs.
//!
//! The core depends on two external inputs: the display topology (which
//! external displays are connected, with identity and geometry metadata) and
//! the raw hardware services that might speak DDC/CI. Both are behind the
//! [`Platform`] trait so the engine runs against the real host, a mock, or a
//! simulator unchanged.

use thiserror::Error;

use crate::transport::I2cTransport;

pub mod edid;

#[cfg(feature = "linux-platform")]
pub mod linux;

#[cfg(feature = "linux-platform")]
pub use linux::LinuxPlatform;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("display topology query failed: {0}")]
    Topology(String),

    #[error("service enumeration failed: {0}")]
    Services(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One connected external display channel, as reported by the host.
///
/// Geometry metadata is carried for UI display only; protocol logic never
/// looks at it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayChannel {
    /// Platform identifier for the channel (e.g. a DRM connector name).
    pub id: String,
    /// Human-readable label.
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub resolution: Option<(u32, u32)>,
    pub refresh_hz: Option<f32>,
}

/// Vendor/product identifiers attached to a raw service handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// A raw hardware service that may or may not speak DDC/CI.
pub struct ControlService {
    /// Identity block read from the service, when one is attached.
    pub identity: Option<ServiceIdentity>,
    /// The transport channel the service is reached over.
    pub channel: Box<dyn I2cTransport>,
}

/// The host platform's discovery surface.
pub trait Platform: Send {
    /// Currently connected external display channels.
    fn display_channels(&mut self) -> Result<Vec<DisplayChannel>, DiscoveryError>;

    /// Raw service handles that might support the protocol.
    fn control_services(&mut self) -> Result<Vec<ControlService>, DiscoveryError>;
}
