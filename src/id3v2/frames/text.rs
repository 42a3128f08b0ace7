//! Text-bearing frames: generic text frames, `TXXX`, credits lists
//! (`TIPL`/`TMCL`/`IPLS`), and the lang+description+text family
//! (`COMM`/`USLT`).

use crate::error::ParseError;
use crate::id3v2::frames::{Frame, FrameFlags, FrameHeader};
use crate::id3v2::header::{SaveVersion, TagHeader};
use crate::string::{self, Encoding};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Picks the encoding a render targets: `Utf8`/`Utf16Be` are ID3v2.4-only,
/// so anything else downgrades to `Utf16` (with BOM) for ID3v2.3.
fn render_encoding(preferred: Encoding, save_version: SaveVersion) -> Encoding {
    match (save_version, preferred) {
        (SaveVersion::V23, Encoding::Utf8 | Encoding::Utf16Be | Encoding::Utf16Le) => {
            Encoding::Utf16
        }
        _ => preferred,
    }
}

pub struct TextFrame {
    header: FrameHeader,
    encoding: Encoding,
    text: Vec<String>,
}

impl TextFrame {
    pub fn new(frame_id: &str) -> Self {
        Self::with_flags(frame_id, FrameFlags::default())
    }

    pub fn with_flags(frame_id: &str, flags: FrameFlags) -> Self {
        assert!(
            Self::is_text(frame_id) && frame_id != "TXXX",
            "TextFrame IDs must start with T (except TXXX); use UserTextFrame for that"
        );

        Self::with_header(FrameHeader::with_flags(frame_id, flags))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        TextFrame {
            header,
            encoding: Encoding::default(),
            text: Vec::new(),
        }
    }

    pub(crate) fn is_text(frame_id: &str) -> bool {
        // WFED (podcast URL), MVNM/MVIN (movement name/number) and GRP1
        // (grouping) are text frames despite not starting with T.
        frame_id.starts_with('T') || matches!(frame_id, "WFED" | "MVNM" | "MVIN" | "GRP1")
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut Vec<String> {
        &mut self.text
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for TextFrame {
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
        if data.len() < 2 {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let mut stream = crate::core::io::BufStream::new(&data[1..]);
        let mut text = Vec::new();

        while !stream.is_empty() {
            text.push(string::read_terminated(encoding, &mut stream));
        }

        if text.is_empty() {
            text.push(String::new());
        }

        self.encoding = encoding;
        self.text = text;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let encoding = render_encoding(self.encoding, save_version);
        let mut out = vec![encoding_to_byte(encoding)];

        match save_version {
            // v2.3 readers only reliably consolidate to a single value.
            SaveVersion::V23 if self.text.len() > 1 => {
                out.extend(string::render(encoding, &self.text.join("/")));
            }
            _ => {
                for (i, value) in self.text.iter().enumerate() {
                    if i > 0 {
                        out.extend(vec![0u8; encoding.nul_size()]);
                    }
                    out.extend(string::render(encoding, value));
                }
            }
        }

        out
    }
}

impl Display for TextFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt_text(&self.text, f)
    }
}

#[derive(Default)]
pub struct UserTextFrame {
    header: Option<FrameHeader>,
    encoding: Encoding,
    desc: String,
    text: Vec<String>,
}

impl UserTextFrame {
    pub fn new() -> Self {
        Self::with_flags(FrameFlags::default())
    }

    pub fn with_flags(flags: FrameFlags) -> Self {
        Self::with_header(FrameHeader::with_flags("TXXX", flags))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        UserTextFrame {
            header: Some(header),
            encoding: Encoding::default(),
            desc: String::new(),
            text: Vec::new(),
        }
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut Vec<String> {
        &mut self.text
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn header(&self) -> &FrameHeader {
        self.header.as_ref().expect("UserTextFrame always has a header")
    }
}

impl Frame for UserTextFrame {
    fn id(&self) -> &str {
        self.header().id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header().flags()
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
        let desc = string::read_terminated(encoding, &mut stream);

        let mut text = Vec::new();
        while !stream.is_empty() {
            text.push(string::read_terminated(encoding, &mut stream));
        }

        if text.is_empty() {
            text.push(String::new());
        }

        self.encoding = encoding;
        self.desc = desc;
        self.text = text;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let encoding = render_encoding(self.encoding, save_version);
        let mut out = vec![encoding_to_byte(encoding)];
        out.extend(string::render_terminated(encoding, &self.desc));

        for (i, value) in self.text.iter().enumerate() {
            if i > 0 {
                out.extend(vec![0u8; encoding.nul_size()]);
            }
            out.extend(string::render(encoding, value));
        }

        out
    }
}

impl Display for UserTextFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt_text(&self.text, f)
    }
}

pub struct CreditsFrame {
    header: FrameHeader,
    encoding: Encoding,
    people: BTreeMap<String, String>,
}

impl CreditsFrame {
    pub fn new_tipl() -> Self {
        Self::with_header(FrameHeader::new("TIPL"))
    }

    pub fn new_tmcl() -> Self {
        Self::with_header(FrameHeader::new("TMCL"))
    }

    pub(crate) fn with_header(header: FrameHeader) -> Self {
        CreditsFrame {
            header,
            encoding: Encoding::default(),
            people: BTreeMap::new(),
        }
    }

    pub fn people(&self) -> &BTreeMap<String, String> {
        &self.people
    }

    pub fn people_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.people
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Frame for CreditsFrame {
    fn id(&self) -> &str {
        self.header.id()
    }

    fn flags(&self) -> &FrameFlags {
        self.header.flags()
    }

    fn key(&self) -> String {
        // IPLS and TIPL can technically coexist under this scheme, but no
        // real-world tag should contain both.
        self.id().to_string()
    }

    fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
        if data.is_empty() {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let mut stream = crate::core::io::BufStream::new(&data[1..]);
        let mut people = BTreeMap::new();

        while !stream.is_empty() {
            let role = string::read_terminated(encoding, &mut stream);
            let role_people = string::read_terminated(encoding, &mut stream);

            if !role.is_empty() {
                people.insert(role, role_people);
            }
        }

        self.encoding = encoding;
        self.people = people;

        Ok(())
    }

    fn render(&self, save_version: SaveVersion) -> Vec<u8> {
        let encoding = render_encoding(self.encoding, save_version);
        let mut out = vec![encoding_to_byte(encoding)];

        for (role, people) in &self.people {
            out.extend(string::render_terminated(encoding, role));
            out.extend(string::render_terminated(encoding, people));
        }

        out
    }
}

impl Display for CreditsFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (role, people) in self.people.iter() {
            write!(f, "\n{}: {}", role, people)?;
        }

        Ok(())
    }
}

/// Shared layout for `COMM` and `USLT`: encoding byte, 3-byte language code,
/// terminated description, text to end.
pub struct LangTextFrame {
    header: FrameHeader,
    encoding: Encoding,
    lang: String,
    desc: String,
    text: String,
}

impl LangTextFrame {
    pub(crate) fn with_header(header: FrameHeader) -> Self {
        LangTextFrame {
            header,
            encoding: Encoding::default(),
            lang: "eng".to_string(),
            desc: String::new(),
            text: String::new(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn lang_mut(&mut self) -> &mut String {
        &mut self.lang
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut String {
        &mut self.desc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn parse_inner(&mut self, data: &[u8]) -> Result<(), ParseError> {
        if data.len() < 5 {
            return Err(ParseError::InsufficientData);
        }

        let encoding = encoding_from_byte(data[0])?;
        let lang = String::from_utf8_lossy(&data[1..4]).to_string();

        let mut stream = crate::core::io::BufStream::new(&data[4..]);
        let desc = string::read_terminated(encoding, &mut stream);
        let text = string::read(encoding, &mut stream);

        self.encoding = encoding;
        self.lang = lang;
        self.desc = desc;
        self.text = text;

        Ok(())
    }

    fn render_inner(&self, save_version: SaveVersion) -> Vec<u8> {
        let encoding = render_encoding(self.encoding, save_version);
        let mut out = vec![encoding_to_byte(encoding)];

        let mut lang = self.lang.clone().into_bytes();
        lang.resize(3, b' ');
        out.extend(lang);

        out.extend(string::render_terminated(encoding, &self.desc));
        out.extend(string::render(encoding, &self.text));

        out
    }
}

macro_rules! lang_text_frame {
    ($name:ident, $default_id:literal) => {
        pub struct $name(LangTextFrame);

        impl $name {
            pub fn new() -> Self {
                Self::with_header(FrameHeader::new($default_id))
            }

            pub(crate) fn with_header(header: FrameHeader) -> Self {
                Self(LangTextFrame::with_header(header))
            }

            pub fn lang(&self) -> &str {
                self.0.lang()
            }

            pub fn lang_mut(&mut self) -> &mut String {
                self.0.lang_mut()
            }

            pub fn desc(&self) -> &str {
                self.0.desc()
            }

            pub fn desc_mut(&mut self) -> &mut String {
                self.0.desc_mut()
            }

            pub fn text(&self) -> &str {
                self.0.text()
            }

            pub fn text_mut(&mut self) -> &mut String {
                self.0.text_mut()
            }

            pub fn encoding(&self) -> Encoding {
                self.0.encoding()
            }
        }

        impl Frame for $name {
            fn id(&self) -> &str {
                self.0.header.id()
            }

            fn flags(&self) -> &FrameFlags {
                self.0.header.flags()
            }

            fn key(&self) -> String {
                format!("{}:{}:{}", self.id(), self.0.desc, self.0.lang)
            }

            fn parse(&mut self, _tag_header: &TagHeader, data: &[u8]) -> Result<(), ParseError> {
                self.0.parse_inner(data)
            }

            fn render(&self, save_version: SaveVersion) -> Vec<u8> {
                self.0.render_inner(save_version)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                // Some taggers (e.g. kid3) write only the description; fall
                // back to it so the frame doesn't render as empty.
                if self.0.text.is_empty() {
                    write!(f, "{}", self.0.desc)
                } else {
                    write!(f, "{}", self.0.text)
                }
            }
        }
    };
}

lang_text_frame!(CommentsFrame, "COMM");
lang_text_frame!(UnsyncLyricsFrame, "USLT");

pub(crate) fn encoding_from_byte(byte: u8) -> Result<Encoding, ParseError> {
    match byte {
        0 => Ok(Encoding::Latin1),
        1 => Ok(Encoding::Utf16),
        2 => Ok(Encoding::Utf16Be),
        3 => Ok(Encoding::Utf8),
        _ => Err(ParseError::InvalidFieldValue),
    }
}

pub(crate) fn encoding_to_byte(encoding: Encoding) -> u8 {
    match encoding {
        Encoding::Latin1 => 0,
        Encoding::Utf16 => 1,
        Encoding::Utf16Be => 2,
        Encoding::Utf8 => 3,
        Encoding::Utf16Le => 1, // Not directly addressable; render as Utf16 w/ BOM.
    }
}

fn fmt_text(text: &[String], f: &mut Formatter) -> fmt::Result {
    if text.is_empty() {
        return Ok(());
    }

    write!(f, "{}", text[0])?;

    for string in &text[1..] {
        write!(f, " {}", string)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::header::Version;

    fn tag_header() -> TagHeader {
        TagHeader::with_version(Version::V24)
    }

    #[test]
    fn parse_text_frame() {
        let data = b"\x03Electronica\0Ambient";
        let mut frame = TextFrame::with_header(FrameHeader::new("TCON"));
        frame.parse(&tag_header(), data).unwrap();

        assert_eq!(frame.encoding(), Encoding::Utf8);
        assert_eq!(frame.text()[0], "Electronica");
        assert_eq!(frame.text()[1], "Ambient");
    }

    #[test]
    fn parse_txxx() {
        let data = b"\x00replaygain_track_gain\0-7.429688 dB";
        let mut frame = UserTextFrame::with_header(FrameHeader::new("TXXX"));
        frame.parse(&tag_header(), data).unwrap();

        assert_eq!(frame.desc(), "replaygain_track_gain");
        assert_eq!(frame.text()[0], "-7.429688 dB");
    }

    #[test]
    fn parse_credits() {
        let data = b"\x00Violinist\0Vanessa Evans\0Bassist\0John Smith";
        let mut frame = CreditsFrame::with_header(FrameHeader::new("TMCL"));
        frame.parse(&tag_header(), data).unwrap();

        assert_eq!(frame.people()["Violinist"], "Vanessa Evans");
        assert_eq!(frame.people()["Bassist"], "John Smith");
    }

    #[test]
    fn parse_comm() {
        let data = b"\x03engDescription\0Text";
        let mut frame = CommentsFrame::with_header(FrameHeader::new("COMM"));
        frame.parse(&tag_header(), data).unwrap();

        assert_eq!(frame.lang(), "eng");
        assert_eq!(frame.desc(), "Description");
        assert_eq!(frame.text(), "Text");
    }

    #[test]
    fn text_frame_round_trip_v24() {
        let mut frame = TextFrame::with_header(FrameHeader::new("TIT2"));
        frame.parse(&tag_header(), b"\x03Hello").unwrap();

        let rendered = frame.render(SaveVersion::V24);
        let mut roundtrip = TextFrame::with_header(FrameHeader::new("TIT2"));
        roundtrip.parse(&tag_header(), &rendered).unwrap();

        assert_eq!(roundtrip.text()[0], "Hello");
    }
}
