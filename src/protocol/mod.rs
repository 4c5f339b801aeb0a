//! DDC/CI protocol: wire constants and the frame codec.

pub mod constants;
pub mod frame;

pub use frame::{Command, FrameError, VcpReply, decode_reply, encode_command};
