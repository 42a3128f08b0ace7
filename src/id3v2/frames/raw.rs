//! The fallback representation for unknown, compressed, or encrypted
//! frames: an opaque (id, flags, payload) triple that round-trips verbatim.

use crate::error::ParseError;
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use std::fmt::{self, Display, Formatter};

pub struct RawFrame {
    header: FrameHeader,
    data: Vec<u8>,
}

impl RawFrame {
    pub(crate) fn with_header(header: FrameHeader) -> Self {
        RawFrame {
            header,
            data: Vec::new(),
        }
    }

    /// Builds a raw frame directly from its undecoded payload, bypassing
    /// [`Frame::parse`]. Used when the payload is opaque by construction
    /// (compressed/encrypted) rather than because the ID is unrecognized.
    pub(crate) fn with_raw(header: FrameHeader, data: &[u8]) -> Self {
        RawFrame {
            header,
            data: data.to_vec(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl Frame for RawFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        self.id().to_string()
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        self.data = data.to_vec();
        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        self.data.clone()
    }
}

impl Display for RawFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({} bytes, opaque)", self.id(), self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::header::Version;

    #[test]
    fn raw_frame_round_trip() {
        let tag_header = TagHeader::with_version(Version::V24);
        let mut frame = RawFrame::with_header(FrameHeader::new("XABC"));
        frame.parse(&tag_header, &[1, 2, 3]).unwrap();

        assert_eq!(frame.render(SaveVersion::V24), vec![1, 2, 3]);
    }
}
