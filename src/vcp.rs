// SPDX-License-Identifier: GPL-3.0-only
//! VCP controller.
//!
//! Performs one logical "get" or "set" of a VCP control against a transport
//! channel, with the retry and timing discipline real monitors need. The
//! frame bytes themselves come from [`crate::protocol`].

use std::time::Duration;

use thiserror::Error;

use crate::protocol::constants::{DDC_I2C_ADDRESS, HOST_ADDRESS, VCP_REPLY_LENGTH};
use crate::protocol::{Command, FrameError, VcpReply, decode_reply, encode_command};
use crate::transport::{I2cTransport, TransportError};

#[derive(Error, Debug)]
pub enum VcpError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),
}

/// Timing and retry policy for VCP operations.
///
/// Monitors need the command frame written more than once before they latch
/// it, and settle time before the reply becomes readable. Each interval is a
/// separately tunable constant; tests inject [`Timing::immediate`] instead of
/// waiting in real time.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Times the command frame is written per attempt.
    pub write_cycles: u32,
    /// Pause between the repeated writes of one attempt.
    pub inter_write_delay: Duration,
    /// Pause between the last write and reading the reply.
    pub reply_settle_delay: Duration,
    /// Pause before retrying a failed attempt.
    pub retry_delay: Duration,
    /// Additional attempts after the first one fails.
    pub retries: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            write_cycles: 2,
            inter_write_delay: Duration::from_millis(10),
            reply_settle_delay: Duration::from_millis(40),
            retry_delay: Duration::from_millis(40),
            retries: 3,
        }
    }
}

impl Timing {
    /// Same cycle and retry counts as the default, but without real waits.
    pub fn immediate() -> Self {
        Self {
            inter_write_delay: Duration::ZERO,
            reply_settle_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Issues VCP operations over a lent channel. Holds no channel state itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcpController {
    timing: Timing,
}

impl VcpController {
    pub fn new(timing: Timing) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Read a VCP control. Returns the parsed reply (current and max value).
    pub fn get(&self, channel: &mut dyn I2cTransport, code: u8) -> Result<VcpReply, VcpError> {
        let frame = encode_command(&Command::GetVcp(code));
        let mut attempt = 0;
        loop {
            match self.try_get(channel, &frame) {
                Ok(reply) => {
                    if attempt > 0 {
                        debug!(code, attempt, "get succeeded after retry");
                    }
                    return Ok(reply);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > self.timing.retries {
                        warn!(code, attempts = attempt, error = %err, "get exhausted retries");
                        return Err(err);
                    }
                    debug!(code, attempt, error = %err, "get attempt failed, retrying");
                    std::thread::sleep(self.timing.retry_delay);
                }
            }
        }
    }

    /// Write a VCP control. Write-only: no reply is expected, so only the
    /// write step is retried.
    pub fn set(
        &self,
        channel: &mut dyn I2cTransport,
        code: u8,
        value: u16,
    ) -> Result<(), VcpError> {
        let frame = encode_command(&Command::SetVcp(code, value));
        let mut attempt = 0;
        loop {
            match self.write_cycle(channel, &frame) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.timing.retries {
                        warn!(code, value, attempts = attempt, error = %err, "set exhausted retries");
                        return Err(err.into());
                    }
                    debug!(code, value, attempt, error = %err, "set attempt failed, retrying");
                    std::thread::sleep(self.timing.retry_delay);
                }
            }
        }
    }

    fn try_get(&self, channel: &mut dyn I2cTransport, frame: &[u8]) -> Result<VcpReply, VcpError> {
        self.write_cycle(channel, frame)?;
        std::thread::sleep(self.timing.reply_settle_delay);
        let bytes = channel.read(DDC_I2C_ADDRESS, VCP_REPLY_LENGTH)?;
        Ok(decode_reply(&bytes)?)
    }

    /// One attempt's worth of writes: the frame, `write_cycles` times over.
    fn write_cycle(&self, channel: &mut dyn I2cTransport, frame: &[u8]) -> Result<(), TransportError> {
        for cycle in 0..self.timing.write_cycles {
            if cycle > 0 {
                std::thread::sleep(self.timing.inter_write_delay);
            }
            channel.write(DDC_I2C_ADDRESS, HOST_ADDRESS, frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::VCP_LUMINANCE;
    use crate::protocol::frame::simulate_reply;
    use crate::transport::MockTransport;

    fn controller() -> VcpController {
        VcpController::new(Timing::immediate())
    }

    #[test]
    fn get_parses_current_and_max() {
        let mock = MockTransport::new();
        mock.queue_reply(simulate_reply(VCP_LUMINANCE, 100, 62));

        let reply = controller()
            .get(&mut mock.clone(), VCP_LUMINANCE)
            .unwrap();
        assert_eq!(reply.current_value, 62);
        assert_eq!(reply.max_value, 100);

        // Every write of the cycle addresses the DDC interface with the
        // host sub-address and carries the same frame.
        let writes = mock.writes();
        assert_eq!(writes.len(), Timing::default().write_cycles as usize);
        for (address, sub, frame) in writes {
            assert_eq!(address, DDC_I2C_ADDRESS);
            assert_eq!(sub, HOST_ADDRESS);
            assert_eq!(frame, vec![0x82, 0x01, 0x10, 0xFD]);
        }
    }

    #[test]
    fn get_retries_on_checksum_failure() {
        let mock = MockTransport::new();
        let mut corrupt = simulate_reply(VCP_LUMINANCE, 100, 62);
        corrupt[9] ^= 0xFF;
        mock.queue_reply(corrupt);
        mock.queue_reply(simulate_reply(VCP_LUMINANCE, 100, 62));

        let reply = controller()
            .get(&mut mock.clone(), VCP_LUMINANCE)
            .unwrap();
        assert_eq!(reply.current_value, 62);
        assert_eq!(mock.read_attempts(), 2);
    }

    #[test]
    fn failing_set_makes_exactly_retries_plus_one_attempts() {
        let mock = MockTransport::new();
        mock.fail_writes(true);

        let timing = Timing::immediate();
        let err = VcpController::new(timing)
            .set(&mut mock.clone(), VCP_LUMINANCE, 40)
            .unwrap_err();
        assert!(matches!(err, VcpError::Transport(_)));
        // Each attempt fails on its first write of the cycle.
        assert_eq!(mock.write_attempts() as u32, timing.retries + 1);
    }

    #[test]
    fn failing_reads_make_exactly_retries_plus_one_attempts() {
        let mock = MockTransport::new();
        mock.fail_reads(true);

        let timing = Timing::immediate();
        let err = VcpController::new(timing)
            .get(&mut mock.clone(), VCP_LUMINANCE)
            .unwrap_err();
        assert!(matches!(err, VcpError::Transport(_)));
        assert_eq!(mock.read_attempts() as u32, timing.retries + 1);
    }

    #[test]
    fn set_is_write_only() {
        let mock = MockTransport::new();
        controller()
            .set(&mut mock.clone(), VCP_LUMINANCE, 0x0028)
            .unwrap();
        assert_eq!(mock.read_attempts(), 0);
        let writes = mock.writes();
        assert_eq!(writes.len(), Timing::default().write_cycles as usize);
        assert_eq!(writes[0].2, vec![0x84, 0x03, 0x10, 0x00, 0x28, 0x80]);
    }
}
