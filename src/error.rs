// SPDX-License-Identifier: GPL-3.0-only
//! Crate-level error type.
//!
//! Each layer keeps its own focused error (frame, transport, VCP,
//! discovery); this aggregates them for callers that cross layers.

use thiserror::Error;

use crate::platform::DiscoveryError;
use crate::protocol::FrameError;
use crate::transport::TransportError;
use crate::vcp::VcpError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("display discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("VCP operation failed: {0}")]
    Vcp(#[from] VcpError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),

    #[error("display {0} not found")]
    DisplayNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
