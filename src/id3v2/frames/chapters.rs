//! `CHAP`/`CTOC`: chapter markers and the table of contents tree that
//! groups them. Both carry a nested list of ordinary frames, so these
//! unlike every other frame type parse recursively back into
//! [`crate::id3v2::frames::new`].

use crate::core::io::BufStream;
use crate::error::ParseError;
use crate::id3v2::frames::{self, Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

fn parse_sub_frames(tag_header: &TagHeader, data: &[u8]) -> Vec<Box<dyn Frame>> {
    let mut frames = Vec::new();
    let mut pos = 0;

    while pos + 10 <= data.len() {
        match frames::new(tag_header, &data[pos..]) {
            Ok(frame) => {
                // +10 for the frame header itself; re-derive the consumed
                // length from the header rather than trusting the frame.
                let header_len = match FrameHeader::parse(
                    match tag_header.version() {
                        crate::id3v2::header::Version::V24 => 4,
                        _ => 3,
                    },
                    &data[pos..],
                ) {
                    Ok(h) => h.size() + 10,
                    Err(_) => break,
                };

                pos += header_len;
                frames.push(frame);
            }
            Err(_) => break,
        }
    }

    frames
}

fn render_sub_frames(frames: &[Box<dyn Frame>], save_version: SaveVersion) -> Vec<u8> {
    let major_version = match save_version {
        SaveVersion::V24 => 4,
        SaveVersion::V23 => 3,
    };

    let mut out = Vec::new();

    for frame in frames {
        let payload = frame.render(save_version);
        out.extend(frame.id().as_bytes());

        if major_version == 4 {
            out.extend(&crate::core::io::encode_syncsafe(payload.len() as u32));
        } else {
            out.extend(&(payload.len() as u32).to_be_bytes());
        }

        out.extend(&[0u8, 0u8]); // flags: none set on re-render.
        out.extend(payload);
    }

    out
}

#[derive(Clone)]
pub struct ChapterFrame {
    header: FrameHeader,
    element_id: String,
    start_time_ms: u32,
    end_time_ms: u32,
    start_offset: u32,
    end_offset: u32,
    sub_frames: Vec<Box<dyn Frame>>,
}

impl ChapterFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("CHAP"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        ChapterFrame {
            header,
            element_id: String::new(),
            start_time_ms: 0,
            end_time_ms: 0,
            start_offset: 0xFFFF_FFFF,
            end_offset: 0xFFFF_FFFF,
            sub_frames: Vec::new(),
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn element_id_mut(&mut self) -> &mut String {
        &mut self.element_id
    }

    pub fn start_time_ms(&self) -> u32 {
        self.start_time_ms
    }

    pub fn end_time_ms(&self) -> u32 {
        self.end_time_ms
    }

    pub fn set_times(&mut self, start_ms: u32, end_ms: u32) {
        self.start_time_ms = start_ms;
        self.end_time_ms = end_ms;
    }

    pub fn sub_frames(&self) -> &[Box<dyn Frame>] {
        &self.sub_frames
    }

    pub fn sub_frames_mut(&mut self) -> &mut Vec<Box<dyn Frame>> {
        &mut self.sub_frames
    }
}

impl Frame for ChapterFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("CHAP:{}", self.element_id)
    }

    fn parse(&mut self, tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        let mut stream = BufStream::new(data);
        let element_id = string::read_terminated(Encoding::Latin1, &mut stream);

        let start_time_ms = stream.read_be_u32().map_err(ParseError::from)?;
        let end_time_ms = stream.read_be_u32().map_err(ParseError::from)?;
        let start_offset = stream.read_be_u32().map_err(ParseError::from)?;
        let end_offset = stream.read_be_u32().map_err(ParseError::from)?;

        let sub_frames = parse_sub_frames(tag_header, stream.take_rest());

        self.element_id = element_id;
        self.start_time_ms = start_time_ms;
        self.end_time_ms = end_time_ms;
        self.start_offset = start_offset;
        self.end_offset = end_offset;
        self.sub_frames = sub_frames;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let mut out = string::render_terminated(Encoding::Latin1, &self.element_id);
        out.extend(&self.start_time_ms.to_be_bytes());
        out.extend(&self.end_time_ms.to_be_bytes());
        out.extend(&self.start_offset.to_be_bytes());
        out.extend(&self.end_offset.to_be_bytes());
        out.extend(render_sub_frames(&self.sub_frames, save_version));
        out
    }
}

impl Display for ChapterFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}ms-{}ms]",
            self.element_id, self.start_time_ms, self.end_time_ms
        )
    }
}

#[derive(Clone)]
pub struct TableOfContentsFrame {
    header: FrameHeader,
    element_id: String,
    top_level: bool,
    ordered: bool,
    children: Vec<String>,
    sub_frames: Vec<Box<dyn Frame>>,
}

impl TableOfContentsFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("CTOC"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        TableOfContentsFrame {
            header,
            element_id: String::new(),
            top_level: false,
            ordered: true,
            children: Vec::new(),
            sub_frames: Vec::new(),
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn element_id_mut(&mut self) -> &mut String {
        &mut self.element_id
    }

    pub fn top_level(&self) -> bool {
        self.top_level
    }

    pub fn set_top_level(&mut self, top_level: bool) {
        self.top_level = top_level;
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn set_ordered(&mut self, ordered: bool) {
        self.ordered = ordered;
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<String> {
        &mut self.children
    }

    pub fn sub_frames(&self) -> &[Box<dyn Frame>] {
        &self.sub_frames
    }

    pub fn sub_frames_mut(&mut self) -> &mut Vec<Box<dyn Frame>> {
        &mut self.sub_frames
    }
}

impl Frame for TableOfContentsFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("CTOC:{}", self.element_id)
    }

    fn parse(&mut self, tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        let mut stream = BufStream::new(data);
        let element_id = string::read_terminated(Encoding::Latin1, &mut stream);

        let flags = stream.read_u8().map_err(ParseError::from)?;
        let top_level = flags & 0x02 != 0;
        let ordered = flags & 0x01 != 0;

        let child_count = stream.read_u8().map_err(ParseError::from)?;
        let mut children = Vec::with_capacity(child_count as usize);

        for _ in 0..child_count {
            children.push(string::read_terminated(Encoding::Latin1, &mut stream));
        }

        let sub_frames = parse_sub_frames(tag_header, stream.take_rest());

        self.element_id = element_id;
        self.top_level = top_level;
        self.ordered = ordered;
        self.children = children;
        self.sub_frames = sub_frames;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let mut out = string::render_terminated(Encoding::Latin1, &self.element_id);

        let mut flags = 0u8;
        if self.top_level {
            flags |= 0x02;
        }
        if self.ordered {
            flags |= 0x01;
        }
        out.push(flags);

        out.push(self.children.len() as u8);
        for child in &self.children {
            out.extend(string::render_terminated(Encoding::Latin1, child));
        }

        out.extend(render_sub_frames(&self.sub_frames, save_version));
        out
    }
}

impl Display for TableOfContentsFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({} children)", self.element_id, self.children.len())
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
    fn parse_chap() {
        let mut data = b"chp1\0".to_vec();
        data.extend(&0u32.to_be_bytes());
        data.extend(&5000u32.to_be_bytes());
        data.extend(&0xFFFF_FFFFu32.to_be_bytes());
        data.extend(&0xFFFF_FFFFu32.to_be_bytes());
        data.extend(b"TIT2");
        data.extend(&crate::core::io::encode_syncsafe(6));
        data.extend(&[0, 0]);
        data.extend(b"\x00Intro");

        let mut frame = ChapterFrame::with_header(FrameHeader::new("CHAP"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.element_id(), "chp1");
        assert_eq!(frame.start_time_ms(), 0);
        assert_eq!(frame.end_time_ms(), 5000);
        assert_eq!(frame.sub_frames().len(), 1);
        assert_eq!(frame.sub_frames()[0].id(), "TIT2");
    }

    #[test]
    fn parse_ctoc() {
        let mut data = b"toc\0".to_vec();
        data.push(0x03); // top-level, ordered
        data.push(2);
        data.extend(b"chp1\0");
        data.extend(b"chp2\0");

        let mut frame = TableOfContentsFrame::with_header(FrameHeader::new("CTOC"));
        frame.parse(&tag_header(), &data).unwrap();

        assert!(frame.top_level());
        assert!(frame.ordered());
        assert_eq!(frame.children(), &["chp1".to_string(), "chp2".to_string()]);
    }
}
