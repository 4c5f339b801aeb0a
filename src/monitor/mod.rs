//! Device records and the registry that discovers them.

mod device;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{BrightnessState, DEFAULT_MAX_BRIGHTNESS, Device, DeviceId, Verification};
pub use registry::DeviceRegistry;
