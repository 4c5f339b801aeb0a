//! DDC/CI wire constants.
//!
//! Derived from the VESA DDC/CI specification and observed monitor behavior.

// ============================================================================
// I2C addressing
// ============================================================================

/// 7-bit I2C address of the DDC/CI interface.
pub const DDC_I2C_ADDRESS: u16 = 0x37;

/// 7-bit I2C address of the EDID EEPROM.
pub const EDID_I2C_ADDRESS: u16 = 0x50;

/// Host ("source") address byte, sent as the sub-address of every command.
pub const HOST_ADDRESS: u8 = 0x51;

// ============================================================================
// Checksum seeds
// ============================================================================

/// Seed for command checksums: the display's I2C write address (0x37 << 1).
pub const WRITE_CHECKSUM_SEED: u8 = 0x6E;

/// Mixed into the command checksum when the payload is more than one byte.
pub const DATA_ADDRESS: u8 = 0x51;

/// Seed for reply checksums (virtual host address).
pub const REPLY_CHECKSUM_SEED: u8 = 0x50;

// ============================================================================
// Message framing
// ============================================================================

/// High bit of the length byte, always set on DDC/CI messages.
pub const LENGTH_MARKER: u8 = 0x80;

/// Reply opcode for a "Get VCP Feature" response.
pub const GET_VCP_REPLY_OPCODE: u8 = 0x02;

/// Fixed size of a "Get VCP Feature" reply.
pub const VCP_REPLY_LENGTH: usize = 11;

// ============================================================================
// VCP control codes
// ============================================================================

/// Luminance (brightness).
pub const VCP_LUMINANCE: u8 = 0x10;
