// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI brightness control for external monitors.
//!
//! Layered bottom-up: `protocol` speaks the DDC/CI wire format, `transport`
//! moves bytes over I2C, `vcp` adds the retry and timing discipline real
//! monitors need, `monitor` discovers and pairs devices, and `coordinator`
//! serializes all of it behind a single async handle.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod monitor;
pub mod platform;
pub mod protocol;
pub mod transport;
pub mod vcp;

#[cfg(feature = "linux-platform")]
pub mod hotplug;

pub use coordinator::{Coordinator, CoordinatorOptions};
pub use error::{Error, Result};
