//! Miscellaneous binary frames: `UFID`, `PRIV`, `POPM`, `PCNT`.

use crate::core::io::BufStream;
use crate::error::ParseError;
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

pub struct FileIdFrame {
    header: FrameHeader,
    owner: String,
    identifier: Vec<u8>,
}

impl FileIdFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("UFID"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        FileIdFrame {
            header,
            owner: String::new(),
            identifier: Vec::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn owner_mut(&mut self) -> &mut String {
        &mut self.owner
    }

    pub fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    pub fn identifier_mut(&mut self) -> &mut Vec<u8> {
        &mut self.identifier
    }
}

impl Frame for FileIdFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("UFID:{}", self.owner)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        let mut stream = BufStream::new(data);
        self.owner = string::read_terminated(Encoding::Latin1, &mut stream);
        self.identifier = stream.take_rest().to_vec();
        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        let mut out = string::render_terminated(Encoding::Latin1, &self.owner);
        out.extend(&self.identifier);
        out
    }
}

impl Display for FileIdFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.owner)
    }
}

pub struct PrivateFrame {
    header: FrameHeader,
    owner: String,
    data: Vec<u8>,
}

impl PrivateFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("PRIV"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        PrivateFrame {
            header,
            owner: String::new(),
            data: Vec::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn owner_mut(&mut self) -> &mut String {
        &mut self.owner
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl Frame for PrivateFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("PRIV:{}", self.owner)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        let mut stream = BufStream::new(data);
        self.owner = string::read_terminated(Encoding::Latin1, &mut stream);
        self.data = stream.take_rest().to_vec();
        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        let mut out = string::render_terminated(Encoding::Latin1, &self.owner);
        out.extend(&self.data);
        out
    }
}

impl Display for PrivateFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.owner, self.data.len())
    }
}

pub struct PopularimeterFrame {
    header: FrameHeader,
    email: String,
    rating: u8,
    play_count: u64,
}

impl PopularimeterFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("POPM"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        PopularimeterFrame {
            header,
            email: String::new(),
            rating: 0,
            play_count: 0,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn email_mut(&mut self) -> &mut String {
        &mut self.email
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating;
    }

    pub fn play_count(&self) -> u64 {
        self.play_count
    }

    pub fn set_play_count(&mut self, play_count: u64) {
        self.play_count = play_count;
    }
}

impl Frame for PopularimeterFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("POPM:{}", self.email)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        let mut stream = BufStream::new(data);
        self.email = string::read_terminated(Encoding::Latin1, &mut stream);
        self.rating = stream.read_u8().map_err(ParseError::from)?;

        // The play count is a variable-length (1-8 byte) big-endian integer
        // that runs to the end of the frame; most writers omit it entirely.
        let rest = stream.take_rest();
        self.play_count = rest
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));

        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        let mut out = string::render_terminated(Encoding::Latin1, &self.email);
        out.push(self.rating);

        if self.play_count > 0 {
            let bytes = self.play_count.to_be_bytes();
            let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
            out.extend(&bytes[first_nonzero..]);
        }

        out
    }
}

impl Display for PopularimeterFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({}/255)", self.email, self.rating)
    }
}

pub struct PlayCounterFrame {
    header: FrameHeader,
    play_count: u64,
}

impl PlayCounterFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("PCNT"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        PlayCounterFrame {
            header,
            play_count: 0,
        }
    }

    pub fn play_count(&self) -> u64 {
        self.play_count
    }

    pub fn set_play_count(&mut self, play_count: u64) {
        self.play_count = play_count;
    }
}

impl Frame for PlayCounterFrame {
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
        if data.len() < 4 {
            return Err(ParseError::InsufficientData);
        }

        self.play_count = data
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));

        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        // PCNT is at least 4 bytes, growing only if the count overflows that.
        let bytes = self.play_count.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        bytes[first_nonzero.min(4)..].to_vec()
    }
}

impl Display for PlayCounterFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.play_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::header::Version;

    fn tag_header() -> TagHeader {
        TagHeader::with_version(Version::V24)
    }

    #[test]
    fn parse_ufid() {
        let mut data = b"http://example.com\0".to_vec();
        data.extend(&[1, 2, 3, 4]);

        let mut frame = FileIdFrame::with_header(FrameHeader::new("UFID"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.owner(), "http://example.com");
        assert_eq!(frame.identifier(), &[1, 2, 3, 4]);
    }

    #[test]
    fn parse_popm() {
        let mut data = b"user@example.com\0".to_vec();
        data.push(196);
        data.extend(&[0, 0, 0, 5]);

        let mut frame = PopularimeterFrame::with_header(FrameHeader::new("POPM"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.email(), "user@example.com");
        assert_eq!(frame.rating(), 196);
        assert_eq!(frame.play_count(), 5);
    }

    #[test]
    fn parse_pcnt() {
        let data = [0, 0, 1, 0];
        let mut frame = PlayCounterFrame::with_header(FrameHeader::new("PCNT"));
        frame.parse(&tag_header(), &data).unwrap();
        assert_eq!(frame.play_count(), 256);
    }
}
