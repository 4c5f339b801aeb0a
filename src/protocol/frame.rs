// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI frame codec.
//!
//! Builds command frames and parses reply frames, byte for byte. This module
//! does no I/O and never sleeps; retry and timing policy live in the VCP
//! controller.

use thiserror::Error;

use super::constants::{
    DATA_ADDRESS, GET_VCP_REPLY_OPCODE, LENGTH_MARKER, REPLY_CHECKSUM_SEED, VCP_REPLY_LENGTH,
    WRITE_CHECKSUM_SEED,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("reply truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("reply checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    Checksum { computed: u8, received: u8 },

    #[error("unexpected reply opcode 0x{0:02X}")]
    UnexpectedOpcode(u8),

    #[error("display reported result code 0x{0:02X}")]
    ResultCode(u8),
}

/// A DDC/CI command, fully determining one outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read a VCP control. One payload byte: the control code.
    GetVcp(u8),
    /// Write a 16-bit value to a VCP control. Three payload bytes.
    SetVcp(u8, u16),
}

impl Command {
    fn payload(&self) -> Vec<u8> {
        match *self {
            Command::GetVcp(code) => vec![code],
            Command::SetVcp(code, value) => {
                let [hi, lo] = value.to_be_bytes();
                vec![code, hi, lo]
            }
        }
    }
}

/// Parsed fields of a "Get VCP Feature" reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpReply {
    pub control_code: u8,
    pub type_code: u8,
    pub max_value: u16,
    pub current_value: u16,
}

/// Encode a command into an on-wire frame: `[length, opcode, payload.., checksum]`.
///
/// The opcode byte numerically equals the payload byte count. That is how the
/// protocol is defined (Get VCP = 0x01 with one payload byte, Set VCP = 0x03
/// with three) and real monitors reject frames where the two disagree.
pub fn encode_command(cmd: &Command) -> Vec<u8> {
    let payload = cmd.payload();
    let len = payload.len() as u8;

    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(LENGTH_MARKER | (len + 1));
    frame.push(len);
    frame.extend_from_slice(&payload);

    let mut checksum = if payload.len() > 1 {
        WRITE_CHECKSUM_SEED ^ DATA_ADDRESS
    } else {
        WRITE_CHECKSUM_SEED
    };
    for &byte in &frame {
        checksum ^= byte;
    }
    frame.push(checksum);

    frame
}

/// Decode an 11-byte "Get VCP Feature" reply.
///
/// The checksum is validated before any field is interpreted; a frame that
/// fails the check is discarded, never partially trusted.
pub fn decode_reply(bytes: &[u8]) -> Result<VcpReply, FrameError> {
    if bytes.len() < VCP_REPLY_LENGTH {
        return Err(FrameError::Truncated {
            expected: VCP_REPLY_LENGTH,
            actual: bytes.len(),
        });
    }
    let bytes = &bytes[..VCP_REPLY_LENGTH];

    let mut computed = REPLY_CHECKSUM_SEED;
    for &byte in &bytes[..VCP_REPLY_LENGTH - 1] {
        computed ^= byte;
    }
    let received = bytes[VCP_REPLY_LENGTH - 1];
    if computed != received {
        return Err(FrameError::Checksum { computed, received });
    }

    if bytes[2] != GET_VCP_REPLY_OPCODE {
        return Err(FrameError::UnexpectedOpcode(bytes[2]));
    }
    if bytes[3] != 0 {
        return Err(FrameError::ResultCode(bytes[3]));
    }

    Ok(VcpReply {
        control_code: bytes[4],
        type_code: bytes[5],
        max_value: u16::from_be_bytes([bytes[6], bytes[7]]),
        current_value: u16::from_be_bytes([bytes[8], bytes[9]]),
    })
}

/// Build a well-formed reply frame, as a monitor would send it.
#[cfg(test)]
pub(crate) fn simulate_reply(control_code: u8, max: u16, current: u16) -> Vec<u8> {
    let [max_hi, max_lo] = max.to_be_bytes();
    let [cur_hi, cur_lo] = current.to_be_bytes();
    let mut bytes = vec![
        WRITE_CHECKSUM_SEED,
        LENGTH_MARKER | 0x08,
        GET_VCP_REPLY_OPCODE,
        0x00,
        control_code,
        0x00,
        max_hi,
        max_lo,
        cur_hi,
        cur_lo,
    ];
    let mut checksum = REPLY_CHECKSUM_SEED;
    for &byte in &bytes {
        checksum ^= byte;
    }
    bytes.push(checksum);
    bytes
}
