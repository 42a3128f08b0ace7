//! URL-bearing frames: generic `W...` frames and `WXXX`. URLs are always
//! stored as plain Latin-1 bytes with no encoding byte (except `WXXX`, which
//! gets one for its description).

use crate::error::ParseError;
use crate::id3v2::frames::text::{encoding_from_byte, encoding_to_byte};
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

pub struct UrlFrame {
    header: FrameHeader,
    url: String,
}

impl UrlFrame {
    pub fn new(frame_id: &str) -> Self {
        Self::with_flags(frame_id, FrameFlags::default())
    }

    pub fn with_flags(frame_id: &str, flags: FrameFlags) -> Self {
        assert!(
            frame_id.starts_with('W') && frame_id != "WXXX",
            "use UserUrlFrame for WXXX"
        );

        Self::with_header(FrameHeader::with_flags(frame_id, flags))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        UrlFrame {
            header,
            url: String::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut String {
        &mut self.url
    }
}

impl Frame for UrlFrame {
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
        let mut stream = crate::core::io::BufStream::new(data);
        self.url = string::read(Encoding::Latin1, &mut stream);
        Ok(())
    }

    fn render(&self, _save_version: SaveVersion) -> Vec<u8> {
        string::render(Encoding::Latin1, &self.url)
    }
}

impl Display for UrlFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

pub struct UserUrlFrame {
    header: FrameHeader,
    encoding: Encoding,
    desc: String,
    url: String,
}

impl UserUrlFrame {
    pub fn new() -> Self {
        Self::with_flags(FrameFlags::default())
    }

    pub fn with_flags(flags: FrameFlags) -> Self {
        Self::with_header(FrameHeader::with_flags("WXXX", flags))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        UserUrlFrame {
            header,
            encoding: Encoding::default(),
            desc: String::new(),
            url: String::new(),
        }
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut String {
        &mut self.url
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for UserUrlFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("{}:{}", self.id(), self.desc.to_uppercase())
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        if data.is_empty() {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let mut stream = crate::core::io::BufStream::new(&data[1..]);

        self.encoding = encoding;
        self.desc = string::read_terminated(encoding, &mut stream);
        self.url = string::read(Encoding::Latin1, &mut stream);

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        // The description may use any encoding, but the URL itself is
        // always rendered as Latin-1 regardless of save version.
        let encoding = match save_version {
            SaveVersion::V23 if matches!(self.encoding, Encoding::Utf8) => Encoding::Utf16,
            _ => self.encoding,
        };

        let mut out = vec![encoding_to_byte(encoding)];
        out.extend(string::render_terminated(encoding, &self.desc));
        out.extend(string::render(Encoding::Latin1, &self.url));
        out
    }
}

impl Display for UserUrlFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
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
    fn parse_url_frame() {
        let data = b"https://example.com/artist";
        let mut frame = UrlFrame::with_header(FrameHeader::new("WOAR"));
        frame.parse(&tag_header(), data).unwrap();
        assert_eq!(frame.url(), "https://example.com/artist");
    }

    #[test]
    fn parse_wxxx() {
        let data = b"\x00Source\0https://example.com/track";
        let mut frame = UserUrlFrame::with_header(FrameHeader::new("WXXX"));
        frame.parse(&tag_header(), data).unwrap();
        assert_eq!(frame.desc(), "Source");
        assert_eq!(frame.url(), "https://example.com/track");
    }

    #[test]
    fn url_frame_round_trip() {
        let mut frame = UrlFrame::with_header(FrameHeader::new("WOAF"));
        frame
            .parse(&tag_header(), b"https://example.org/")
            .unwrap();

        let rendered = frame.render(SaveVersion::V24);
        let mut roundtrip = UrlFrame::with_header(FrameHeader::new("WOAF"));
        roundtrip.parse(&tag_header(), &rendered).unwrap();

        assert_eq!(roundtrip.url(), "https://example.org/");
    }
}
