//! Per-frame header: four-char ID, size, and flag bytes. Layout differs
//! between ID3v2.3 and ID3v2.4; ID3v2.2's three-char/six-byte frames are
//! upgraded to ID3v2.3 IDs before reaching this module (see
//! `id3v2::frames::v22`).

use crate::core::raw;
use crate::error::{ParseError, ParseResult};

#[derive(Clone, Debug)]
pub struct FrameHeader {
    frame_id: String,
    frame_size: usize,
    flags: FrameFlags,
}

impl FrameHeader {
    pub fn new(frame_id: &str) -> Self {
        Self::with_flags(frame_id, FrameFlags::default())
    }

    pub fn with_flags(frame_id: &str, flags: FrameFlags) -> Self {
        if frame_id.len() != 4 || !is_frame_id(frame_id.as_bytes()) {
            panic!("a frame ID must be exactly four uppercase ASCII letters or digits");
        }

        FrameHeader {
            frame_id: frame_id.to_string(),
            frame_size: 0,
            flags,
        }
    }

    /// Parses a frame header from `data`, which must start at the header
    /// and extend at least to the end of the frame (headers peek ahead to
    /// validate the iTunes size quirk).
    pub(crate) fn parse(major_version: u8, data: &[u8]) -> ParseResult<Self> {
        if data.len() < 10 {
            return Err(ParseError::InsufficientData);
        }

        match major_version {
            3 => parse_v3(data),
            4 => parse_v4(data),
            _ => Err(ParseError::UnsupportedVersion),
        }
    }

    pub fn id(&self) -> &str {
        &self.frame_id
    }

    pub fn size(&self) -> usize {
        self.frame_size
    }

    pub(crate) fn set_size(&mut self, size: usize) {
        self.frame_size = size;
    }

    pub fn flags(&self) -> &FrameFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FrameFlags {
        &mut self.flags
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrameFlags {
    pub tag_should_discard: bool,
    pub file_should_discard: bool,
    pub read_only: bool,
    pub has_group: bool,
    pub compressed: bool,
    pub encrypted: bool,
    pub unsync: bool,
    pub has_data_len: bool,
}

fn parse_v3(data: &[u8]) -> ParseResult<FrameHeader> {
    let frame_id = new_frame_id(&data[0..4])?;

    // ID3v2.3 sizes are supposed to be plain big-endian, but iTunes wrote
    // syncsafe ID3v2.4-style sizes for a while. A big-endian size that
    // doesn't land on the start of another valid frame ID, while the
    // syncsafe reinterpretation does, is treated as the iTunes quirk.
    let be_bytes: [u8; 4] = data[4..8].try_into().unwrap();
    let mut frame_size = u32::from_be_bytes(be_bytes) as usize;

    if frame_size >= 0x80 {
        frame_size = handle_itunes_v3_size(frame_size, be_bytes, data);
    }

    let stat_flags = data[8];
    let format_flags = data[9];

    Ok(FrameHeader {
        frame_id,
        frame_size,
        flags: FrameFlags {
            tag_should_discard: raw::bit_at(7, stat_flags),
            file_should_discard: raw::bit_at(6, stat_flags),
            read_only: raw::bit_at(5, stat_flags),
            compressed: raw::bit_at(7, format_flags),
            encrypted: raw::bit_at(6, format_flags),
            has_group: raw::bit_at(5, format_flags),
            unsync: false,
            has_data_len: false,
        },
    })
}

fn parse_v4(data: &[u8]) -> ParseResult<FrameHeader> {
    let frame_id = new_frame_id(&data[0..4])?;

    // ID3v2.4 sizes are always syncsafe; there is no big-endian ambiguity
    // to resolve here (that's the ID3v2.3 iTunes quirk, see `parse_v3`).
    let sync_bytes: [u8; 4] = data[4..8].try_into().unwrap();
    let frame_size = crate::core::io::decode_syncsafe(sync_bytes)
        .map(|n| n as usize)
        .unwrap_or_else(|| u32::from_be_bytes(sync_bytes) as usize);

    let stat_flags = data[8];
    let format_flags = data[9];

    Ok(FrameHeader {
        frame_id,
        frame_size,
        flags: FrameFlags {
            tag_should_discard: raw::bit_at(6, stat_flags),
            file_should_discard: raw::bit_at(5, stat_flags),
            read_only: raw::bit_at(4, stat_flags),
            has_group: raw::bit_at(6, format_flags),
            compressed: raw::bit_at(3, format_flags),
            encrypted: raw::bit_at(2, format_flags),
            unsync: raw::bit_at(1, format_flags),
            has_data_len: raw::bit_at(0, format_flags),
        },
    })
}

fn handle_itunes_v3_size(be_size: usize, be_bytes: [u8; 4], data: &[u8]) -> usize {
    let next_id_start = be_size + 10;
    let next_id_end = be_size + 14;

    if data.len() < next_id_end || data[next_id_start] == 0 {
        return be_size;
    }

    if !is_frame_id(&data[next_id_start..next_id_end]) {
        if let Some(sync_size) = crate::core::io::decode_syncsafe(be_bytes) {
            let sync_size = sync_size as usize;
            let sync_next_start = sync_size + 10;
            let sync_next_end = sync_size + 14;

            if data.len() >= sync_next_end && is_frame_id(&data[sync_next_start..sync_next_end]) {
                return sync_size;
            }
        }
    }

    be_size
}

fn new_frame_id(frame_id: &[u8]) -> ParseResult<String> {
    if !is_frame_id(frame_id) {
        return Err(ParseError::InvalidFieldValue);
    }

    String::from_utf8(frame_id.to_vec()).map_err(|_| ParseError::InvalidFieldValue)
}

pub(crate) fn is_frame_id(frame_id: &[u8]) -> bool {
    frame_id
        .iter()
        .all(|&ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_v3_frame_header() {
        let data = b"TXXX\x00\x0A\x71\x7B\xA0\x40";
        let header = FrameHeader::parse(3, &data[..]).unwrap();
        let flags = header.flags();

        assert_eq!(header.id(), "TXXX");
        assert_eq!(header.size(), 684411);
        assert!(flags.tag_should_discard);
        assert!(!flags.file_should_discard);
        assert!(flags.read_only);
        assert!(!flags.compressed);
        assert!(flags.encrypted);
        assert!(!flags.has_group);
    }

    #[test]
    fn parse_v4_frame_header() {
        let data = b"TXXX\x00\x34\x10\x2A\x50\x4B";
        let header = FrameHeader::parse(4, &data[..]).unwrap();
        let flags = header.flags();

        assert_eq!(header.id(), "TXXX");
        assert_eq!(header.size(), 854058);
        assert!(flags.tag_should_discard);
        assert!(flags.has_group);
        assert!(flags.compressed);
        assert!(flags.unsync);
        assert!(flags.has_data_len);
    }

    #[test]
    fn rejects_lowercase_id() {
        let data = b"txxx\x00\x00\x00\x04\x00\x00";
        assert!(FrameHeader::parse(3, &data[..]).is_err());
    }

    #[test]
    fn parse_v3_handles_itunes_syncsafe_size_quirk() {
        // iTunes wrote the syncsafe ID3v2.4-style encoding of the 128-byte
        // body size into this ID3v2.3 frame header; the plain big-endian
        // reading of the same bytes (256) doesn't land on the real next
        // frame, so the syncsafe reading must win.
        let mut data = Vec::new();
        data.extend(b"TEST");
        data.extend(&[0x00, 0x00, 0x01, 0x00]);
        data.extend(&[0x00, 0x00]);
        data.extend(vec![0u8; 128]);
        data.extend(b"NEXT");
        data.extend(vec![0u8; 266 - 142]);
        data.extend(&[0xFFu8; 4]);

        let header = FrameHeader::parse(3, &data).unwrap();
        assert_eq!(header.id(), "TEST");
        assert_eq!(header.size(), 128);
    }
}
