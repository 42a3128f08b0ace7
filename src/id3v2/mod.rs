//! ID3v2.2/2.3/2.4 tags: header, optional extended header, and a sequence
//! of frames. ID3v2.2's three-character IDs are upgraded to their
//! ID3v2.3/2.4 equivalents while parsing, so [`Tag`] always exposes the
//! later shape regardless of what was on disk.

pub mod frames;
pub mod header;
mod syncdata;

use crate::core::io::BufStream;
use crate::error::ParseError;
use frames::{Frame, FrameMap, RawFrame, UnknownFrames};
use header::{ExtendedHeader, SaveVersion, TagHeader, Version};
use log::warn;

/// A fully parsed ID3v2 tag.
pub struct Tag {
    header: TagHeader,
    extended_header: Option<ExtendedHeader>,
    frames: FrameMap,
    unknown_frames: UnknownFrames,
    /// Set when another valid ID3v2 header was found immediately after this
    /// tag's declared end. The first tag is authoritative; this crate makes
    /// no attempt to merge the two.
    has_duplicate_tag: bool,
}

impl Tag {
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 10 {
            return Err(ParseError::InsufficientData);
        }

        let raw_header: [u8; 10] = data[0..10].try_into().unwrap();
        let header = TagHeader::parse(raw_header)?;

        let tag_size = header.size() as usize;
        let end = 10 + tag_size;

        if end > data.len() {
            return Err(ParseError::InsufficientData);
        }

        let body = if header.flags().unsync {
            syncdata::decode(&data[10..end])
        } else {
            data[10..end].to_vec()
        };

        let mut stream = BufStream::new(&body);

        let extended_header = if header.flags().extended {
            Some(ExtendedHeader::parse(&mut stream, header.version())?)
        } else {
            None
        };

        let rest = stream.take_rest().to_vec();

        let mut frame_map = FrameMap::new();
        let mut unknown_frames = UnknownFrames::new();

        match header.version() {
            Version::V22 => parse_v22_frames(&rest, &mut frame_map, &mut unknown_frames),
            _ => parse_frames(&header, &rest, &mut frame_map, &mut unknown_frames),
        }

        let has_duplicate_tag = data
            .get(end..end + 3)
            .map(|bytes| bytes == b"ID3")
            .unwrap_or(false);

        Ok(Tag {
            header,
            extended_header,
            frames: frame_map,
            unknown_frames,
            has_duplicate_tag,
        })
    }

    pub fn render(&self, save_version: SaveVersion, options: &crate::RenderOptions) -> Vec<u8> {
        let mut header = self.header.clone();
        *header.version_mut() = Version::from(save_version);

        let mut body = Vec::new();

        if let Some(mut ext) = self.extended_header.clone() {
            ext.update(save_version);
            let rendered_ext = ext.render(header.version());
            body.extend(rendered_ext);
            header.flags_mut().extended = true;
        } else {
            header.flags_mut().extended = false;
        }

        for frame in self.frames.iter() {
            body.extend(render_frame(frame, save_version));
        }

        for frame in self.unknown_frames.iter() {
            body.extend(render_frame(frame, save_version));
        }

        body.resize(body.len() + options.padding_size, 0);

        if options.unsynchronize {
            body = syncdata::encode(&body);
            header.flags_mut().unsync = true;
        } else {
            header.flags_mut().unsync = false;
        }

        *header.size_mut() = body.len() as u32;

        let mut out = header.render().to_vec();
        out.extend(body);
        out
    }

    pub fn version(&self) -> Version {
        self.header.version()
    }

    pub fn extended_header(&self) -> Option<&ExtendedHeader> {
        self.extended_header.as_ref()
    }

    pub fn frames(&self) -> &FrameMap {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameMap {
        &mut self.frames
    }

    pub fn unknown_frames(&self) -> &UnknownFrames {
        &self.unknown_frames
    }

    pub fn has_duplicate_tag(&self) -> bool {
        self.has_duplicate_tag
    }
}

fn render_frame(frame: &dyn Frame, save_version: SaveVersion) -> Vec<u8> {
    let major_version = match save_version {
        SaveVersion::V24 => 4,
        SaveVersion::V23 => 3,
    };

    let payload = frame.render(save_version);

    let mut out = Vec::with_capacity(payload.len() + 10);
    out.extend(frame.id().as_bytes());

    if major_version == 4 {
        out.extend(&crate::core::io::encode_syncsafe(payload.len() as u32));
    } else {
        out.extend(&(payload.len() as u32).to_be_bytes());
    }

    out.extend(&[0u8, 0u8]);
    out.extend(payload);
    out
}

fn major_version(tag_header: &TagHeader) -> u8 {
    match tag_header.version() {
        Version::V24 => 4,
        _ => 3,
    }
}

fn parse_frames(
    tag_header: &TagHeader,
    mut data: &[u8],
    frame_map: &mut FrameMap,
    unknown_frames: &mut UnknownFrames,
) {
    while data.len() >= 10 && data[0] != 0 {
        let header = match frames::header::FrameHeader::parse(major_version(tag_header), data) {
            Ok(header) => header,
            Err(err) => {
                warn!("stopping frame parse: {}", err);
                break;
            }
        };

        let consumed = header.size() + 10;

        if consumed > data.len() {
            warn!("frame {} claims more data than remains in the tag", header.id());
            break;
        }

        match frames::new(tag_header, data) {
            Ok(frame) => store_frame(frame, frame_map, unknown_frames),
            Err(err) => warn!("failed to parse frame {}: {}", header.id(), err),
        }

        data = &data[consumed..];
    }
}

fn parse_v22_frames(mut data: &[u8], frame_map: &mut FrameMap, unknown_frames: &mut UnknownFrames) {
    while data.len() >= 6 && data[0] != 0 {
        let size = u32::from_be_bytes([0, data[3], data[4], data[5]]) as usize;
        let consumed = 6 + size;

        if consumed > data.len() {
            warn!("ID3v2.2 frame claims more data than remains in the tag");
            break;
        }

        match frames::new_v22(data) {
            Ok(frame) => store_frame(frame, frame_map, unknown_frames),
            Err(err) => warn!("failed to parse ID3v2.2 frame: {}", err),
        }

        data = &data[consumed..];
    }
}

fn store_frame(
    frame: Box<dyn Frame>,
    frame_map: &mut FrameMap,
    unknown_frames: &mut UnknownFrames,
) {
    if frame.is::<RawFrame>() {
        unknown_frames.push(frame);
    } else {
        frame_map.insert(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderOptions;

    fn sample_tag_bytes() -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend(b"TIT2");
        frame.extend(&[0, 0, 0, 6]);
        frame.extend(&[0, 0]);
        frame.extend(b"\x03Hello");

        let mut data = Vec::new();
        data.extend(b"ID3");
        data.push(3); // v2.3
        data.push(0);
        data.push(0); // flags
        let size = frame.len() as u32;
        data.extend(&crate::core::io::encode_syncsafe(size));
        data.extend(frame);

        data
    }

    #[test]
    fn parse_simple_tag() {
        let data = sample_tag_bytes();
        let tag = Tag::parse(&data).unwrap();

        assert_eq!(tag.version(), Version::V23);
        assert!(!tag.has_duplicate_tag());

        let frame = tag.frames().get("TIT2").unwrap();
        let text = frame.cast::<frames::TextFrame>().unwrap();
        assert_eq!(text.text()[0], "Hello");
    }

    #[test]
    fn detects_duplicate_tag() {
        let mut data = sample_tag_bytes();
        data.extend(sample_tag_bytes());

        let tag = Tag::parse(&data).unwrap();
        assert!(tag.has_duplicate_tag());
    }

    #[test]
    fn render_round_trip() {
        let data = sample_tag_bytes();
        let tag = Tag::parse(&data).unwrap();

        let rendered = tag.render(SaveVersion::V24, &RenderOptions::default());
        let roundtrip = Tag::parse(&rendered).unwrap();

        assert_eq!(roundtrip.version(), Version::V24);
        let frame = roundtrip.frames().get("TIT2").unwrap();
        let text = frame.cast::<frames::TextFrame>().unwrap();
        assert_eq!(text.text()[0], "Hello");
    }
}
