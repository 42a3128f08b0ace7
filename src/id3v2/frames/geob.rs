//! `GEOB`: general encapsulated (opaque) objects.

use crate::core::io::BufStream;
use crate::error::ParseError;
use crate::id3v2::frames::text::{encoding_from_byte, encoding_to_byte};
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

pub struct GeneralObjectFrame {
    header: FrameHeader,
    encoding: Encoding,
    mime: String,
    filename: String,
    desc: String,
    data: Vec<u8>,
}

impl GeneralObjectFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("GEOB"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        GeneralObjectFrame {
            header,
            encoding: Encoding::default(),
            mime: String::new(),
            filename: String::new(),
            desc: String::new(),
            data: Vec::new(),
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn mime_mut(&mut self) -> &mut String {
        &mut self.mime
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn filename_mut(&mut self) -> &mut String {
        &mut self.filename
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for GeneralObjectFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("GEOB:{}", self.desc)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        if data.is_empty() {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let mut stream = BufStream::new(&data[1..]);

        let mime = string::read_terminated(Encoding::Latin1, &mut stream);
        let filename = string::read_terminated(encoding, &mut stream);
        let desc = string::read_terminated(encoding, &mut stream);
        let object_data = stream.take_rest().to_vec();

        self.encoding = encoding;
        self.mime = mime;
        self.filename = filename;
        self.desc = desc;
        self.data = object_data;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let encoding = match save_version {
            SaveVersion::V23 if matches!(self.encoding, Encoding::Utf8 | Encoding::Utf16Be) => {
                Encoding::Utf16
            }
            _ => self.encoding,
        };

        let mut out = vec![encoding_to_byte(encoding)];
        out.extend(string::render_terminated(Encoding::Latin1, &self.mime));
        out.extend(string::render_terminated(encoding, &self.filename));
        out.extend(string::render_terminated(encoding, &self.desc));
        out.extend(&self.data);
        out
    }
}

impl Display for GeneralObjectFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.filename, self.data.len())
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
    fn parse_geob() {
        let mut data = vec![0x00u8];
        data.extend(b"application/octet-stream\0");
        data.extend(b"data.bin\0");
        data.extend(b"A description\0");
        data.extend(&[1, 2, 3]);

        let mut frame = GeneralObjectFrame::with_header(FrameHeader::new("GEOB"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.mime(), "application/octet-stream");
        assert_eq!(frame.filename(), "data.bin");
        assert_eq!(frame.desc(), "A description");
        assert_eq!(frame.data(), &[1, 2, 3]);
    }
}
