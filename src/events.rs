//! Observable state for UI and input layers.
//!
//! The coordinator publishes [`Snapshot`]s over a watch channel and
//! [`UiEvent`]s over a broadcast channel. UI layers subscribe explicitly and
//! drop the receiver to unregister; nothing here ties the core to a UI
//! framework.

use crate::monitor::DeviceId;

/// Per-device metadata exposed to UI layers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub resolution: Option<(u32, u32)>,
    pub refresh_hz: Option<f32>,
}

/// The full observable state, published as one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Current percentage of the active device, in `[0, 1]`.
    pub percentage: f32,
    /// Name of the active device, when one is selected.
    pub active_name: Option<String>,
    /// Whether any controllable display is connected.
    pub connected: bool,
    pub devices: Vec<DeviceInfo>,
    pub active_index: Option<usize>,
}

/// Edge-triggered feedback for UI layers.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Show or refresh the brightness overlay at this percentage.
    Overlay { percentage: f32 },
    /// The device list changed after a discovery pass.
    TopologyChanged,
}
