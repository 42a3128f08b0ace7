//! `APIC`: attached pictures. ID3v2.2's `PIC` (3-byte image format code
//! instead of a MIME string) is normalized into this same frame during
//! `v22` upgrading.

use crate::core::io::BufStream;
use crate::error::ParseError;
use crate::id3v2::frames::text::{encoding_from_byte, encoding_to_byte};
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

/// The ID3v2.4 picture type list, 0x00 through 0x14 inclusive (21 values).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PictureType {
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    ScreenCapture,
    BrightColoredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
}

impl PictureType {
    fn parse(byte: u8) -> Result<Self, ParseError> {
        use PictureType::*;

        Ok(match byte {
            0x00 => Other,
            0x01 => FileIcon,
            0x02 => OtherFileIcon,
            0x03 => CoverFront,
            0x04 => CoverBack,
            0x05 => LeafletPage,
            0x06 => Media,
            0x07 => LeadArtist,
            0x08 => Artist,
            0x09 => Conductor,
            0x0A => Band,
            0x0B => Composer,
            0x0C => Lyricist,
            0x0D => RecordingLocation,
            0x0E => DuringRecording,
            0x0F => DuringPerformance,
            0x10 => ScreenCapture,
            0x11 => BrightColoredFish,
            0x12 => Illustration,
            0x13 => BandLogo,
            0x14 => PublisherLogo,
            _ => return Err(ParseError::InvalidFieldValue),
        })
    }

    fn render(self) -> u8 {
        use PictureType::*;

        match self {
            Other => 0x00,
            FileIcon => 0x01,
            OtherFileIcon => 0x02,
            CoverFront => 0x03,
            CoverBack => 0x04,
            LeafletPage => 0x05,
            Media => 0x06,
            LeadArtist => 0x07,
            Artist => 0x08,
            Conductor => 0x09,
            Band => 0x0A,
            Composer => 0x0B,
            Lyricist => 0x0C,
            RecordingLocation => 0x0D,
            DuringRecording => 0x0E,
            DuringPerformance => 0x0F,
            ScreenCapture => 0x10,
            BrightColoredFish => 0x11,
            Illustration => 0x12,
            BandLogo => 0x13,
            PublisherLogo => 0x14,
        }
    }
}

pub struct AttachedPictureFrame {
    header: FrameHeader,
    encoding: Encoding,
    mime: String,
    picture_type: PictureType,
    desc: String,
    picture: Vec<u8>,
}

impl AttachedPictureFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("APIC"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        AttachedPictureFrame {
            header,
            encoding: Encoding::default(),
            mime: "image/".to_string(),
            picture_type: PictureType::CoverFront,
            desc: String::new(),
            picture: Vec::new(),
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn mime_mut(&mut self) -> &mut String {
        &mut self.mime
    }

    pub fn picture_type(&self) -> PictureType {
        self.picture_type
    }

    pub fn set_picture_type(&mut self, picture_type: PictureType) {
        self.picture_type = picture_type;
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn picture(&self) -> &[u8] {
        &self.picture
    }

    pub fn picture_mut(&mut self) -> &mut Vec<u8> {
        &mut self.picture
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for AttachedPictureFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("APIC:{}", self.desc)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        if data.len() < 2 {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let mut stream = BufStream::new(&data[1..]);

        let mime = string::read_terminated(Encoding::Latin1, &mut stream);
        let picture_type = PictureType::parse(stream.read_u8().map_err(ParseError::from)?)?;
        let desc = string::read_terminated(encoding, &mut stream);
        let picture = stream.take_rest().to_vec();

        self.encoding = encoding;
        self.mime = mime;
        self.picture_type = picture_type;
        self.desc = desc;
        self.picture = picture;

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
        out.push(self.picture_type.render());
        out.extend(string::render_terminated(encoding, &self.desc));
        out.extend(&self.picture);
        out
    }
}

impl Display for AttachedPictureFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} picture ({} bytes)", self.mime, self.picture.len())
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
    fn parse_apic() {
        let mut data = vec![0x00u8]; // Latin1
        data.extend(b"image/png\0");
        data.push(0x03); // CoverFront
        data.extend(b"Front\0");
        data.extend(&[0x89, b'P', b'N', b'G']);

        let mut frame = AttachedPictureFrame::with_header(FrameHeader::new("APIC"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.mime(), "image/png");
        assert_eq!(frame.picture_type(), PictureType::CoverFront);
        assert_eq!(frame.desc(), "Front");
        assert_eq!(frame.picture(), &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn apic_round_trip() {
        let mut frame = AttachedPictureFrame::with_header(FrameHeader::new("APIC"));
        *frame.mime_mut() = "image/jpeg".to_string();
        frame.set_picture_type(PictureType::BandLogo);
        *frame.desc_mut() = "Logo".to_string();
        *frame.picture_mut() = vec![1, 2, 3, 4];

        let rendered = frame.render(SaveVersion::V24);
        let mut roundtrip = AttachedPictureFrame::with_header(FrameHeader::new("APIC"));
        roundtrip.parse(&tag_header(), &rendered).unwrap();

        assert_eq!(roundtrip.mime(), "image/jpeg");
        assert_eq!(roundtrip.picture_type(), PictureType::BandLogo);
        assert_eq!(roundtrip.picture(), &[1, 2, 3, 4]);
    }
}
