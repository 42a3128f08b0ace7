//! Per-frame parsing: the `Frame` trait, the ID-keyed dispatch table, and
//! the concrete frame types it builds.

pub mod header;

mod chapters;
mod collections;
mod geob;
mod lyrics;
mod misc;
mod picture;
mod raw;
mod text;
mod url;
mod v22;

pub use chapters::{ChapterFrame, TableOfContentsFrame};
pub use collections::{FrameMap, UnknownFrames};
pub use geob::GeneralObjectFrame;
pub use header::{FrameFlags, FrameHeader};
pub use lyrics::SyncedLyricsFrame;
pub use misc::{FileIdFrame, PlayCounterFrame, PopularimeterFrame, PrivateFrame};
pub use picture::{AttachedPictureFrame, PictureType};
pub use raw::RawFrame;
pub use text::{CommentsFrame, CreditsFrame, TextFrame, UnsyncLyricsFrame, UserTextFrame};
pub use url::{UrlFrame, UserUrlFrame};

use crate::error::ParseError;
use crate::id3v2::header::TagHeader;
use crate::id3v2::syncdata;
use log::warn;
use std::any::Any;
use std::fmt::Display;

// The `Frame` downcasting system follows the shape of `downcast-rs`
// (https://github.com/marcianx/downcast-rs) without depending on it.

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Frame> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A parsed ID3v2 frame. Unknown or unsupported (compressed/encrypted)
/// frames are represented by [`RawFrame`] rather than failing the whole tag.
pub trait Frame: Display + AsAny + dyn_clone::DynClone {
    fn id(&self) -> &str;
    fn flags(&self) -> &FrameFlags;
    /// The key this frame is stored under in a [`FrameMap`]. Multi-instance
    /// frame families (TXXX, WXXX, COMM, USLT, SYLT, APIC, GEOB, UFID, PRIV,
    /// POPM, CHAP, CTOC) fold a discriminant into the key so repeats don't
    /// collide.
    fn key(&self) -> String;
    fn parse(&mut self, tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError>;
    fn render(&self, save_version: crate::id3v2::header::SaveVersion) -> Vec<u8>;
}

dyn_clone::clone_trait_object!(Frame);

impl dyn Frame {
    pub fn is<T: Frame>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn cast<T: Frame>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn cast_mut<T: Frame>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Parses one frame starting at `data[0]`. `data` must extend to (at least)
/// the end of the tag, since header parsing peeks ahead to validate the
/// iTunes frame-size quirk.
pub(crate) fn new(tag_header: &TagHeader, data: &[u8]) -> Result<Box<dyn Frame>, ParseError> {
    let frame_header = FrameHeader::parse(major_version(tag_header), data)?;
    let end = frame_header.size() + 10;

    if end > data.len() {
        return Err(ParseError::InsufficientData);
    }

    let payload = &data[10..end];

    match decode_payload(tag_header, &frame_header, payload) {
        DecodedData::Some(decoded) => create_frame(tag_header, frame_header, &decoded),
        DecodedData::None => create_frame(tag_header, frame_header, payload),
        DecodedData::Unsupported => Ok(Box::new(RawFrame::with_raw(frame_header, payload))),
    }
}

fn major_version(tag_header: &TagHeader) -> u8 {
    match tag_header.version() {
        crate::id3v2::header::Version::V22 => 3, // v2.2 frames are upgraded before this point.
        crate::id3v2::header::Version::V23 => 3,
        crate::id3v2::header::Version::V24 => 4,
    }
}

enum DecodedData {
    Some(Vec<u8>),
    None,
    Unsupported,
}

fn decode_payload(
    tag_header: &TagHeader,
    frame_header: &FrameHeader,
    data: &[u8],
) -> DecodedData {
    let frame_flags = frame_header.flags();

    if frame_flags.compressed || frame_flags.encrypted {
        warn!(
            "frame {} uses compression or encryption, which is not supported; preserving opaquely",
            frame_header.id()
        );
        return DecodedData::Unsupported;
    }

    if frame_flags.unsync && !tag_header.flags().unsync {
        return DecodedData::Some(syncdata::decode(data));
    }

    DecodedData::None
}

fn create_frame(
    tag_header: &TagHeader,
    mut header: FrameHeader,
    data: &[u8],
) -> Result<Box<dyn Frame>, ParseError> {
    let mut start = 0;
    let frame_flags = *header.flags();

    if frame_flags.has_group && !data.is_empty() {
        start += 1;
    }

    if frame_flags.has_data_len && data.len() - start >= 4 {
        if let Some(size) = crate::core::io::decode_syncsafe(data[start..start + 4].try_into().unwrap())
        {
            let size = size as usize;
            if size > 0 && size < data.len() {
                header.set_size(size);
                start += 4;
            }
        }
    }

    if start > data.len() {
        start = 0;
    }

    let data = &data[start..];

    build_frame(tag_header, header, data)
}

fn build_frame(
    tag_header: &TagHeader,
    header: FrameHeader,
    data: &[u8],
) -> Result<Box<dyn Frame>, ParseError> {
    let mut frame: Box<dyn Frame> = match header.id() {
        "IPLS" | "TIPL" | "TMCL" => Box::new(CreditsFrame::with_header(header)),
        "TXXX" => Box::new(UserTextFrame::with_header(header)),
        id if text::TextFrame::is_text(id) => Box::new(TextFrame::with_header(header)),

        "WXXX" => Box::new(UserUrlFrame::with_header(header)),
        id if id.starts_with('W') => Box::new(UrlFrame::with_header(header)),

        "UFID" => Box::new(FileIdFrame::with_header(header)),
        "USLT" => Box::new(UnsyncLyricsFrame::with_header(header)),
        "SYLT" => Box::new(SyncedLyricsFrame::with_header(header)),
        "COMM" => Box::new(CommentsFrame::with_header(header)),
        "APIC" => Box::new(AttachedPictureFrame::with_header(header)),
        "GEOB" => Box::new(GeneralObjectFrame::with_header(header)),
        "PCNT" => Box::new(PlayCounterFrame::with_header(header)),
        "POPM" => Box::new(PopularimeterFrame::with_header(header)),
        "PRIV" => Box::new(PrivateFrame::with_header(header)),
        "CHAP" => Box::new(ChapterFrame::with_header(header)),
        "CTOC" => Box::new(TableOfContentsFrame::with_header(header)),

        _ => Box::new(RawFrame::with_header(header)),
    };

    frame.parse(tag_header, data)?;

    Ok(frame)
}

/// Upgrades an ID3v2.2 three-character frame ID and its six-byte header into
/// the ID3v2.3 shape this module otherwise assumes, so the rest of the
/// parser never has to special-case v2.2.
pub(crate) fn new_v22(data: &[u8]) -> Result<Box<dyn Frame>, ParseError> {
    if data.len() < 6 {
        return Err(ParseError::InsufficientData);
    }

    let id3 = std::str::from_utf8(&data[0..3])
        .ok()
        .filter(|s| header::is_frame_id(s.as_bytes()))
        .ok_or(ParseError::InvalidFieldValue)?;

    let size = u32::from_be_bytes([0, data[3], data[4], data[5]]) as usize;
    let end = 6 + size;

    if end > data.len() {
        return Err(ParseError::InsufficientData);
    }

    let payload = &data[6..end];
    let upgraded_id = v22::upgrade(id3);

    let mut header = FrameHeader::new(&upgraded_id);

    let tag_header = TagHeader::with_version(crate::id3v2::header::Version::V22);

    if id3 == "PIC" {
        let rewritten = rewrite_pic_payload(payload)?;
        header.set_size(rewritten.len());
        return build_frame(&tag_header, header, &rewritten);
    }

    header.set_size(size);
    build_frame(&tag_header, header, payload)
}

/// ID3v2.2's `PIC` carries a three-byte image-format code (`"PNG"`, `"JPG"`,
/// ...) instead of `APIC`'s null-terminated MIME string. Rewrites the
/// payload into `APIC`'s shape so [`picture::AttachedPictureFrame::parse`]
/// doesn't need a v2.2-specific code path.
fn rewrite_pic_payload(payload: &[u8]) -> Result<Vec<u8>, ParseError> {
    if payload.len() < 4 {
        return Err(ParseError::InsufficientData);
    }

    let encoding_byte = payload[0];
    let format_code = &payload[1..4];

    let mime = match format_code {
        b"PNG" => "image/png",
        b"JPG" => "image/jpeg",
        b"BMP" => "image/bmp",
        b"GIF" => "image/gif",
        _ => "image/",
    };

    let mut rewritten = vec![encoding_byte];
    rewritten.extend(mime.as_bytes());
    rewritten.push(0);
    rewritten.extend(&payload[4..]);

    Ok(rewritten)
}
