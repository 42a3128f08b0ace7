//! ID3v2 tag header, footer, and extended header.

use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};
use log::{error, trace};
use std::fmt::{self, Display, Formatter};

const ID_HEADER: &[u8] = b"ID3";
const ID_FOOTER: &[u8] = b"3DI";

/// The version of an existing ID3v2 tag. Not used for writing; see
/// [`SaveVersion`] for that.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Version {
    V22,
    V23,
    V24,
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::V22 => write!(f, "ID3v2.2"),
            Self::V23 => write!(f, "ID3v2.3"),
            Self::V24 => write!(f, "ID3v2.4"),
        }
    }
}

impl From<SaveVersion> for Version {
    fn from(other: SaveVersion) -> Self {
        match other {
            SaveVersion::V23 => Version::V23,
            SaveVersion::V24 => Version::V24,
        }
    }
}

/// The ID3v2 version a tag should be rendered as. ID3v2.2 is read-only in
/// this crate: it is always upgraded to ID3v2.3/2.4 frame IDs on parse.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum SaveVersion {
    V23,
    V24,
}

/// The fixed 10-byte tag header (or footer, which shares this layout).
#[derive(Clone, Debug)]
pub struct TagHeader {
    version: Version,
    tag_size: u32,
    flags: TagFlags,
}

impl TagHeader {
    pub(crate) fn parse(raw: [u8; 10]) -> ParseResult<Self> {
        if &raw[0..3] != ID_HEADER {
            error!("no ID3v2 identifier found");
            return Err(ParseError::BadMagic);
        }

        let version = match (raw[3], raw[4]) {
            (2, _) => Version::V22,
            (3, _) => Version::V23,
            (4, _) => Version::V24,
            (major, _) => {
                error!("ID3v2.{} is not supported", major);
                return Err(ParseError::UnsupportedVersion);
            }
        };

        let flags_byte = raw[5];
        let unused_mask = match version {
            Version::V22 => 0x3F,
            Version::V23 => 0x1F,
            Version::V24 => 0x0F,
        };

        if flags_byte & unused_mask != 0 {
            error!("unused flag bits are set on the tag header");
            return Err(ParseError::InvalidFieldValue);
        }

        let flags = TagFlags {
            unsync: flags_byte & 0x80 != 0,
            extended: flags_byte & 0x40 != 0 && version != Version::V22,
            experimental: flags_byte & 0x20 != 0 && version != Version::V22,
            footer: flags_byte & 0x10 != 0 && version == Version::V24,
        };

        let mut size_stream = BufStream::new(&raw[6..10]);
        let tag_size = size_stream.read_syncsafe_u32().map_err(|_| {
            error!("tag size is not a valid syncsafe integer");
            ParseError::InvalidFieldValue
        })?;

        Ok(Self {
            version,
            tag_size,
            flags,
        })
    }

    pub(crate) fn parse_footer(raw: [u8; 10]) -> ParseResult<Self> {
        if &raw[0..3] != ID_FOOTER {
            return Err(ParseError::BadMagic);
        }

        let mut patched = raw;
        patched[0..3].copy_from_slice(ID_HEADER);
        Self::parse(patched)
    }

    pub(crate) fn render(&self) -> [u8; 10] {
        assert_ne!(self.version, Version::V22, "cannot render an ID3v2.2 tag");

        let mut header = [b'I', b'D', b'3', 0, 0, 0, 0, 0, 0, 0];

        header[3] = match self.version {
            Version::V24 => 4,
            Version::V23 => 3,
            Version::V22 => unreachable!(),
        };

        header[5] |= u8::from(self.flags.unsync) * 0x80;
        header[5] |= u8::from(self.flags.extended) * 0x40;
        header[5] |= u8::from(self.flags.experimental) * 0x20;
        header[5] |= u8::from(self.flags.footer) * 0x10;

        header[6..10].copy_from_slice(&crate::core::io::encode_syncsafe(self.tag_size));

        header
    }

    pub(crate) fn with_version(version: Version) -> Self {
        Self {
            version,
            tag_size: 0,
            flags: TagFlags::default(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn size(&self) -> u32 {
        self.tag_size
    }

    pub(crate) fn flags(&self) -> TagFlags {
        self.flags
    }

    pub(crate) fn size_mut(&mut self) -> &mut u32 {
        &mut self.tag_size
    }

    pub(crate) fn flags_mut(&mut self) -> &mut TagFlags {
        &mut self.flags
    }

    pub(crate) fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }
}

#[derive(Default, Clone, Copy, Debug)]
pub(crate) struct TagFlags {
    pub unsync: bool,
    pub extended: bool,
    pub experimental: bool,
    pub footer: bool,
}

/// The extended header present when `TagFlags::extended` is set.
///
/// Its contents (update marker, CRC, restrictions) describe how the tag was
/// *encoded*, not how it must be decoded, so this crate parses past it and
/// retains the fields for round-tripping rather than acting on them.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtendedHeader {
    pub padding_size: Option<u32>,
    pub crc32: Option<u32>,
    pub is_update: bool,
    pub restrictions: Option<Restrictions>,
}

impl ExtendedHeader {
    pub(crate) fn parse(stream: &mut BufStream, version: Version) -> ParseResult<Self> {
        match version {
            Version::V22 => Err(ParseError::UnsupportedVersion),
            Version::V23 => parse_ext_v3(stream),
            Version::V24 => parse_ext_v4(stream),
        }
    }

    pub(crate) fn render(&self, version: Version) -> Vec<u8> {
        assert_ne!(version, Version::V22);

        match version {
            Version::V24 => render_ext_v4(self),
            Version::V23 => render_ext_v3(self),
            Version::V22 => unreachable!(),
        }
    }

    /// Adjusts the extended header's contents to the fields the target
    /// version is able to express.
    pub(crate) fn update(&mut self, to: SaveVersion) {
        match to {
            SaveVersion::V23 => {
                self.padding_size = self.padding_size.or(Some(0));
                self.is_update = false;
                self.restrictions = None;
            }
            SaveVersion::V24 => {
                self.padding_size = None;
            }
        }
    }
}

fn parse_ext_v3(stream: &mut BufStream) -> ParseResult<ExtendedHeader> {
    let size = stream
        .read_be_u32()
        .map_err(|_| ParseError::InsufficientData)?;

    if size != 6 && size != 10 {
        error!("ID3v2.3 extended headers are 6 or 10 bytes, found {}", size);
        return Err(ParseError::InvalidFieldValue);
    }

    let flags = stream
        .read_be_u16()
        .map_err(|_| ParseError::InsufficientData)?;

    let mut header = ExtendedHeader {
        padding_size: Some(
            stream
                .read_be_u32()
                .map_err(|_| ParseError::InsufficientData)?,
        ),
        ..Default::default()
    };

    if flags & 0x8000 != 0 {
        header.crc32 = Some(
            stream
                .read_be_u32()
                .map_err(|_| ParseError::InsufficientData)?,
        );
    }

    Ok(header)
}

fn parse_ext_v4(stream: &mut BufStream) -> ParseResult<ExtendedHeader> {
    let size = stream
        .read_syncsafe_u32()
        .map_err(|_| ParseError::InvalidFieldValue)?;

    if !(6..=15).contains(&size) {
        error!("ID3v2.4 extended headers can only be 6 to 15 bytes long");
        return Err(ParseError::InvalidFieldValue);
    }

    if stream.read_u8().map_err(|_| ParseError::InsufficientData)? != 1 {
        error!("ID3v2.4 extended headers must have a flag count of 1");
        return Err(ParseError::InvalidFieldValue);
    }

    let mut header = ExtendedHeader::default();
    let flags = stream.read_u8().map_err(|_| ParseError::InsufficientData)?;

    if flags & 0x40 != 0 {
        if stream.read_u8().map_err(|_| ParseError::InsufficientData)? != 0 {
            error!("invalid is_update data length");
            return Err(ParseError::InvalidFieldValue);
        }

        header.is_update = true;
        trace!("tag is marked as an update of an earlier tag");
    }

    if flags & 0x20 != 0 {
        if stream.read_u8().map_err(|_| ParseError::InsufficientData)? != 5 {
            error!("invalid CRC-32 data length");
            return Err(ParseError::InvalidFieldValue);
        }

        let raw: [u8; 5] = stream
            .read_array()
            .map_err(|_| ParseError::InsufficientData)?;
        header.crc32 = Some(decode_syncsafe_u35(raw));
    }

    if flags & 0x10 != 0 {
        if stream.read_u8().map_err(|_| ParseError::InsufficientData)? != 1 {
            error!("invalid restrictions data length");
            return Err(ParseError::InvalidFieldValue);
        }

        let bits = stream.read_u8().map_err(|_| ParseError::InsufficientData)?;

        header.restrictions = Some(Restrictions {
            tag_size: match bits >> 6 {
                0 => TagSizeRestriction::Max128Frames1Mb,
                1 => TagSizeRestriction::Max64Frames128Kb,
                2 => TagSizeRestriction::Max32Frames40Kb,
                3 => TagSizeRestriction::Max32Frames4Kb,
                _ => unreachable!(),
            },
            text_encoding: match (bits & 0x20) >> 5 {
                0 => TextEncodingRestriction::None,
                _ => TextEncodingRestriction::Latin1OrUtf8,
            },
            text_size: match (bits & 0x18) >> 3 {
                0 => TextSizeRestriction::None,
                1 => TextSizeRestriction::LessThan1024Chars,
                2 => TextSizeRestriction::LessThan128Chars,
                3 => TextSizeRestriction::LessThan30Chars,
                _ => unreachable!(),
            },
            image_encoding: match (bits & 0x4) >> 2 {
                0 => ImageEncodingRestriction::None,
                _ => ImageEncodingRestriction::OnlyPngOrJpeg,
            },
            image_size: match bits & 0x3 {
                0 => ImageSizeRestriction::None,
                1 => ImageSizeRestriction::LessThan256x256,
                2 => ImageSizeRestriction::LessThan64x64,
                3 => ImageSizeRestriction::Exactly64x64,
                _ => unreachable!(),
            },
        });
    }

    Ok(header)
}

fn render_ext_v3(header: &ExtendedHeader) -> Vec<u8> {
    let mut data = vec![0, 0, 0, 6, 0, 0];
    data.extend(header.padding_size.unwrap_or_default().to_be_bytes());

    if let Some(crc) = header.crc32 {
        data[3] = 10;
        data[4] = 0x80;
        data.extend(crc.to_be_bytes());
    }

    data
}

fn render_ext_v4(header: &ExtendedHeader) -> Vec<u8> {
    let mut data = vec![0, 0, 0, 6, 1, 0];

    if header.is_update {
        data[3] += 1;
        data[5] |= 0x40;
        data.push(0);
    }

    if let Some(crc) = header.crc32 {
        data[3] += 6;
        data[5] |= 0x20;
        data.push(5);
        data.extend(encode_syncsafe_u35(crc));
    }

    if let Some(restrictions) = header.restrictions {
        data[3] += 2;
        data[5] |= 0x10;
        data.push(1);

        let mut bits = 0;
        bits |= (restrictions.tag_size as u8) << 6;
        bits |= (restrictions.text_encoding as u8) << 5;
        bits |= (restrictions.text_size as u8) << 3;
        bits |= (restrictions.image_encoding as u8) << 2;
        bits |= restrictions.image_size as u8;
        data.push(bits);
    }

    data
}

fn decode_syncsafe_u35(mut raw: [u8; 5]) -> u32 {
    raw[0] &= 0x7;

    let mut sum: u32 = 0;
    for (i, &byte) in raw.iter().enumerate() {
        sum |= u32::from(byte) << ((4 - i) * 7);
    }

    sum
}

fn encode_syncsafe_u35(num: u32) -> [u8; 5] {
    let mut result = [0u8; 5];

    for (i, byte) in result.iter_mut().enumerate() {
        *byte = ((num >> ((4 - i) * 7)) & 0x7F) as u8;
    }

    result
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Restrictions {
    pub tag_size: TagSizeRestriction,
    pub text_encoding: TextEncodingRestriction,
    pub text_size: TextSizeRestriction,
    pub image_encoding: ImageEncodingRestriction,
    pub image_size: ImageSizeRestriction,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TagSizeRestriction {
    Max128Frames1Mb = 0,
    Max64Frames128Kb = 1,
    Max32Frames40Kb = 2,
    Max32Frames4Kb = 3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextEncodingRestriction {
    None = 0,
    Latin1OrUtf8 = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextSizeRestriction {
    None = 0,
    LessThan1024Chars = 1,
    LessThan128Chars = 2,
    LessThan30Chars = 3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageEncodingRestriction {
    None = 0,
    OnlyPngOrJpeg = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageSizeRestriction {
    None = 0,
    LessThan256x256 = 1,
    LessThan64x64 = 2,
    Exactly64x64 = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXT_DATA_V3: &[u8] = b"\x00\x00\x00\x0A\x80\x00\xAB\xCD\xEF\x16\x16\x16\x16\x16";
    const EXT_DATA_V4: &[u8] = b"\x00\x00\x00\x0F\x01\x70\x00\x05\x07\x5E\x37\x5E\x16\x01\xB4";

    #[test]
    fn parse_v3_tag_header() {
        let data = b"\x49\x44\x33\x03\x00\xA0\x00\x08\x49\x30";
        let header = TagHeader::parse(*data).unwrap();
        let flags = header.flags();

        assert_eq!(header.size(), 140464);
        assert_eq!(header.version(), Version::V23);
        assert!(flags.unsync);
        assert!(!flags.extended);
        assert!(flags.experimental);
    }

    #[test]
    fn parse_v4_tag_header() {
        let data = b"\x49\x44\x33\x04\x00\x50\x00\x08\x49\x30";
        let header = TagHeader::parse(*data).unwrap();
        let flags = header.flags();

        assert_eq!(header.size(), 140464);
        assert_eq!(header.version(), Version::V24);
        assert!(!flags.unsync);
        assert!(flags.extended);
        assert!(!flags.experimental);
        assert!(flags.footer);
    }

    #[test]
    fn rejects_bad_magic() {
        let data = b"\x00\x00\x00\x03\x00\x00\x00\x00\x00\x00";
        assert_eq!(TagHeader::parse(*data), Err(ParseError::BadMagic));
    }

    #[test]
    fn rejects_unsupported_version() {
        let data = b"\x49\x44\x33\x05\x00\x00\x00\x00\x00\x00";
        assert_eq!(
            TagHeader::parse(*data),
            Err(ParseError::UnsupportedVersion)
        );
    }

    #[test]
    fn rejects_bad_syncsafe_size() {
        let data = b"\x49\x44\x33\x04\x00\x00\xFF\x00\x00\x00";
        assert_eq!(TagHeader::parse(*data), Err(ParseError::InvalidFieldValue));
    }

    #[test]
    fn header_round_trip() {
        let mut header = TagHeader::with_version(Version::V24);
        *header.size_mut() = 1000;
        header.flags_mut().footer = true;

        let rendered = header.render();
        let parsed = TagHeader::parse(rendered).unwrap();

        assert_eq!(parsed.size(), 1000);
        assert!(parsed.flags().footer);
    }

    #[test]
    fn parse_v3_ext_header() {
        let header = ExtendedHeader::parse(&mut BufStream::new(EXT_DATA_V3), Version::V23).unwrap();

        assert_eq!(header.padding_size, Some(0xABCDEF16));
        assert_eq!(header.crc32, Some(0x1616_1616));
        assert!(!header.is_update);
        assert_eq!(header.restrictions, None);
    }

    #[test]
    fn parse_v4_ext_header() {
        let header = ExtendedHeader::parse(&mut BufStream::new(EXT_DATA_V4), Version::V24).unwrap();

        assert_eq!(header.padding_size, None);
        assert_eq!(header.crc32, Some(0x7BCD_EF16));
        assert!(header.is_update);

        let restrictions = header.restrictions.unwrap();
        assert_eq!(restrictions.tag_size, TagSizeRestriction::Max32Frames40Kb);
        assert_eq!(
            restrictions.text_encoding,
            TextEncodingRestriction::Latin1OrUtf8
        );
        assert_eq!(restrictions.text_size, TextSizeRestriction::LessThan128Chars);
        assert_eq!(
            restrictions.image_encoding,
            ImageEncodingRestriction::OnlyPngOrJpeg
        );
        assert_eq!(restrictions.image_size, ImageSizeRestriction::None);
    }

    #[test]
    fn render_v3_ext_header() {
        let header = ExtendedHeader {
            padding_size: Some(0xABCD_EF16),
            crc32: Some(0x1616_1616),
            ..Default::default()
        };

        assert_eq!(header.render(Version::V23), EXT_DATA_V3);
    }

    #[test]
    fn render_v4_ext_header() {
        let header = ExtendedHeader {
            crc32: Some(0x7BCD_EF16),
            is_update: true,
            restrictions: Some(Restrictions {
                tag_size: TagSizeRestriction::Max32Frames40Kb,
                text_encoding: TextEncodingRestriction::Latin1OrUtf8,
                text_size: TextSizeRestriction::LessThan128Chars,
                image_encoding: ImageEncodingRestriction::OnlyPngOrJpeg,
                image_size: ImageSizeRestriction::None,
            }),
            ..Default::default()
        };

        assert_eq!(header.render(Version::V24), EXT_DATA_V4);
    }
}
