// SPDX-License-Identifier: GPL-3.0-only
//! Display hotplug detection.
//!
//! Watches udev for DRM connector changes and raises one edge per event.
//! The udev socket is not Send, so the poll loop runs on a dedicated thread
//! and forwards edges into an async channel; the coordinator turns those
//! edges into settled, coalesced rescans.

mod udev_watch;

pub use udev_watch::{watch_topology, SETTLE_DELAY};
