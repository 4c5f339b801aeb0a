//! Minimal EDID parsing: identity and display name.
//!
//! Only the fields the registry needs for identity matching are extracted.

/// EDID header magic.
const EDID_MAGIC: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Descriptor tag for the monitor name string.
const DESCRIPTOR_MONITOR_NAME: u8 = 0xFC;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdidInfo {
    /// Compressed three-letter PNP manufacturer id, big-endian as stored.
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: Option<String>,
}

/// Parse the base EDID block. Returns `None` when the magic or length is off.
pub fn parse(bytes: &[u8]) -> Option<EdidInfo> {
    if bytes.len() < 128 || bytes[..8] != EDID_MAGIC {
        return None;
    }

    let vendor_id = u16::from_be_bytes([bytes[8], bytes[9]]);
    let product_id = u16::from_le_bytes([bytes[10], bytes[11]]);

    // Four 18-byte descriptor blocks starting at offset 54; a display
    // descriptor starts with two zero bytes and carries its tag at byte 3.
    let mut name = None;
    for block in 0..4 {
        let offset = 54 + block * 18;
        let desc = &bytes[offset..offset + 18];
        if desc[0] == 0 && desc[1] == 0 && desc[3] == DESCRIPTOR_MONITOR_NAME {
            let text: String = desc[5..18]
                .iter()
                .take_while(|&&b| b != 0x0A)
                .map(|&b| b as char)
                .collect();
            let text = text.trim().to_string();
            if !text.is_empty() {
                name = Some(text);
            }
            break;
        }
    }

    Some(EdidInfo {
        vendor_id,
        product_id,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edid_with_name(name: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; 128];
        bytes[..8].copy_from_slice(&EDID_MAGIC);
        bytes[8] = 0x10; // vendor
        bytes[9] = 0xAC;
        bytes[10] = 0x42; // product, little-endian
        bytes[11] = 0xA0;
        // Monitor name descriptor in the first slot.
        bytes[54] = 0;
        bytes[55] = 0;
        bytes[57] = DESCRIPTOR_MONITOR_NAME;
        for (i, b) in name.bytes().chain(std::iter::once(0x0A)).enumerate() {
            bytes[59 + i] = b;
        }
        bytes
    }

    #[test]
    fn parses_identity_and_name() {
        let info = parse(&edid_with_name("U2720Q")).unwrap();
        assert_eq!(info.vendor_id, 0x10AC);
        assert_eq!(info.product_id, 0xA042);
        assert_eq!(info.name.as_deref(), Some("U2720Q"));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = edid_with_name("X");
        bytes[0] = 0xFF;
        assert!(parse(&bytes).is_none());
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(parse(&[0u8; 64]).is_none());
    }
}
