//! `SYLT`: lyrics or text synchronized to playback time.

use crate::core::io::BufStream;
use crate::error::ParseError;
use crate::id3v2::frames::text::{encoding_from_byte, encoding_to_byte};
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::fmt::{self, Display, Formatter};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimestampFormat {
    Unknown,
    Mpeg,
    Milliseconds,
}

impl TimestampFormat {
    fn parse(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0 => Ok(TimestampFormat::Unknown),
            1 => Ok(TimestampFormat::Mpeg),
            2 => Ok(TimestampFormat::Milliseconds),
            _ => Err(ParseError::InvalidFieldValue),
        }
    }

    fn render(self) -> u8 {
        match self {
            TimestampFormat::Unknown => 0,
            TimestampFormat::Mpeg => 1,
            TimestampFormat::Milliseconds => 2,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContentType {
    Other,
    Lyrics,
    TextTranscription,
    Movement,
    Events,
    Chord,
    Trivia,
    WebpageUrls,
    ImageUrls,
}

impl ContentType {
    fn parse(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0 => Ok(ContentType::Other),
            1 => Ok(ContentType::Lyrics),
            2 => Ok(ContentType::TextTranscription),
            3 => Ok(ContentType::Movement),
            4 => Ok(ContentType::Events),
            5 => Ok(ContentType::Chord),
            6 => Ok(ContentType::Trivia),
            7 => Ok(ContentType::WebpageUrls),
            8 => Ok(ContentType::ImageUrls),
            _ => Err(ParseError::InvalidFieldValue),
        }
    }

    fn render(self) -> u8 {
        match self {
            ContentType::Other => 0,
            ContentType::Lyrics => 1,
            ContentType::TextTranscription => 2,
            ContentType::Movement => 3,
            ContentType::Events => 4,
            ContentType::Chord => 5,
            ContentType::Trivia => 6,
            ContentType::WebpageUrls => 7,
            ContentType::ImageUrls => 8,
        }
    }
}

pub struct SyncedLyricsFrame {
    header: FrameHeader,
    encoding: Encoding,
    lang: String,
    timestamp_format: TimestampFormat,
    content_type: ContentType,
    desc: String,
    lyrics: Vec<(String, u32)>,
}

impl SyncedLyricsFrame {
    pub fn new() -> Self {
        Self::with_header(FrameHeader::new("SYLT"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        SyncedLyricsFrame {
            header,
            encoding: Encoding::default(),
            lang: "eng".to_string(),
            timestamp_format: TimestampFormat::Milliseconds,
            content_type: ContentType::Lyrics,
            desc: String::new(),
            lyrics: Vec::new(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn lang_mut(&mut self) -> &mut String {
        &mut self.lang
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format
    }

    pub fn set_timestamp_format(&mut self, format: TimestampFormat) {
        self.timestamp_format = format;
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn lyrics(&self) -> &[(String, u32)] {
        &self.lyrics
    }

    pub fn lyrics_mut(&mut self) -> &mut Vec<(String, u32)> {
        &mut self.lyrics
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for SyncedLyricsFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        format!("{}:{}:{}", self.id(), self.desc, self.lang)
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        if data.len() < 6 {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let lang = String::from_utf8_lossy(&data[1..4]).to_string();
        let timestamp_format = TimestampFormat::parse(data[4])?;
        let content_type = ContentType::parse(data[5])?;

        let mut stream = BufStream::new(&data[6..]);
        let desc = string::read_terminated(encoding, &mut stream);

        let mut lyrics = Vec::new();
        while !stream.is_empty() {
            let text = string::read_terminated(encoding, &mut stream);
            let timestamp = stream.read_be_u32().map_err(ParseError::from)?;
            lyrics.push((text, timestamp));
        }

        self.encoding = encoding;
        self.lang = lang;
        self.timestamp_format = timestamp_format;
        self.content_type = content_type;
        self.desc = desc;
        self.lyrics = lyrics;

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

        let mut lang = self.lang.clone().into_bytes();
        lang.resize(3, b' ');
        out.extend(lang);

        out.push(self.timestamp_format.render());
        out.push(self.content_type.render());
        out.extend(string::render_terminated(encoding, &self.desc));

        for (text, timestamp) in &self.lyrics {
            out.extend(string::render_terminated(encoding, text));
            out.extend(&timestamp.to_be_bytes());
        }

        out
    }
}

impl Display for SyncedLyricsFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (i, (text, _)) in self.lyrics.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", text)?;
        }

        Ok(())
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
    fn parse_sylt() {
        let mut data = vec![0x03u8]; // UTF-8
        data.extend(b"eng");
        data.push(2); // milliseconds
        data.push(1); // lyrics
        data.extend(b"\0"); // empty desc, terminated
        data.extend(b"Hello\0");
        data.extend(&1000u32.to_be_bytes());
        data.extend(b"World\0");
        data.extend(&2000u32.to_be_bytes());

        let mut frame = SyncedLyricsFrame::with_header(FrameHeader::new("SYLT"));
        frame.parse(&tag_header(), &data).unwrap();

        assert_eq!(frame.lang(), "eng");
        assert_eq!(frame.timestamp_format(), TimestampFormat::Milliseconds);
        assert_eq!(frame.content_type(), ContentType::Lyrics);
        assert_eq!(frame.lyrics()[0], ("Hello".to_string(), 1000));
        assert_eq!(frame.lyrics()[1], ("World".to_string(), 2000));
    }

    #[test]
    fn sylt_round_trip() {
        let mut frame = SyncedLyricsFrame::with_header(FrameHeader::new("SYLT"));
        frame.lyrics_mut().push(("Verse one".to_string(), 500));
        frame.lyrics_mut().push(("Verse two".to_string(), 1500));

        let rendered = frame.render(SaveVersion::V24);
        let mut roundtrip = SyncedLyricsFrame::with_header(FrameHeader::new("SYLT"));
        roundtrip.parse(&tag_header(), &rendered).unwrap();

        assert_eq!(roundtrip.lyrics(), frame.lyrics());
    }
}
