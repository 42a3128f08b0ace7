//! FLAC: a `fLaC` magic followed by a chain of typed metadata blocks, then
//! the audio frames this crate never touches.

use crate::core::io::{BufBuilder, BufStream};
use crate::error::{ParseError, ParseResult};
use crate::xiph::VorbisComment;
use log::warn;

const MAGIC: &[u8] = b"fLaC";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Unknown(u8),
}

impl BlockType {
    fn from_byte(b: u8) -> Self {
        match b {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            n => BlockType::Unknown(n),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            BlockType::StreamInfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::CueSheet => 5,
            BlockType::Picture => 6,
            BlockType::Unknown(n) => n,
        }
    }
}

/// `STREAMINFO`: the one mandatory, fixed-size metadata block.
#[derive(Clone, Debug)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfo {
    fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.len() != 34 {
            return Err(ParseError::InsufficientData);
        }

        let mut stream = BufStream::new(data);
        let min_block_size = stream.read_be_u16()?;
        let max_block_size = stream.read_be_u16()?;
        let min_frame_size = stream.read_be_u24()?;
        let max_frame_size = stream.read_be_u24()?;

        // 20 bits sample rate, 3 bits channels-1, 5 bits bps-1, 36 bits
        // total samples, packed across 8 bytes.
        let packed = stream.read_array::<8>()?;
        let bits = u64::from_be_bytes(packed);

        let sample_rate = (bits >> 44) as u32;
        let channels = ((bits >> 41) & 0x7) as u8 + 1;
        let bits_per_sample = ((bits >> 36) & 0x1F) as u8 + 1;
        let total_samples = bits & 0xF_FFFF_FFFF;

        let md5: [u8; 16] = stream.read_array()?;

        Ok(StreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }

    fn render(&self) -> Vec<u8> {
        let mut out = BufBuilder::new();
        out.push_be_u16(self.min_block_size);
        out.push_be_u16(self.max_block_size);
        out.push_be_u24(self.min_frame_size);
        out.push_be_u24(self.max_frame_size);

        let bits = (u64::from(self.sample_rate) << 44)
            | (u64::from(self.channels.saturating_sub(1) & 0x7) << 41)
            | (u64::from(self.bits_per_sample.saturating_sub(1) & 0x1F) << 36)
            | (self.total_samples & 0xF_FFFF_FFFF);

        out.push_be_u64(bits);
        out.push_bytes(&self.md5);
        out.into_vec()
    }

    /// Duration in whole seconds, derived from `total_samples` and
    /// `sample_rate`.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / f64::from(self.sample_rate)
    }
}

/// `PICTURE` block: shares its binary layout with Xiph's
/// `METADATA_BLOCK_PICTURE` comment field.
pub type Picture = crate::xiph::Picture;

/// Any metadata block this crate doesn't give first-class treatment to
/// (`APPLICATION`, `SEEKTABLE`, `CUESHEET`, `PADDING`, unrecognized types)
/// preserved verbatim for round-tripping.
#[derive(Clone)]
pub struct OpaqueBlock {
    pub block_type: BlockType,
    pub data: Vec<u8>,
}

/// A parsed FLAC file's metadata chain. Audio frame data after the last
/// metadata block is left untouched by this crate.
pub struct FlacFile {
    pub stream_info: StreamInfo,
    pub vorbis_comment: Option<VorbisComment>,
    pub pictures: Vec<Picture>,
    pub other_blocks: Vec<OpaqueBlock>,
}

impl FlacFile {
    /// Parses the `fLaC` magic and metadata-block chain at the start of
    /// `data`. Does not attempt to parse anything after the last block.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.len() < 4 || &data[0..4] != MAGIC {
            return Err(ParseError::BadMagic);
        }

        let mut stream = BufStream::new(&data[4..]);

        let mut stream_info = None;
        let mut vorbis_comment = None;
        let mut pictures = Vec::new();
        let mut other_blocks = Vec::new();
        let mut first_block = true;

        loop {
            let flag_and_type = stream.read_u8()?;
            let is_last = flag_and_type & 0x80 != 0;
            let block_type = BlockType::from_byte(flag_and_type & 0x7F);
            let len = stream.read_be_u24()? as usize;
            let body = stream.slice(len)?;

            if first_block && block_type != BlockType::StreamInfo {
                return Err(ParseError::Inconsistent);
            }
            first_block = false;

            match block_type {
                BlockType::StreamInfo => stream_info = Some(StreamInfo::parse(body)?),
                BlockType::VorbisComment => match VorbisComment::parse(body) {
                    Ok(comment) => vorbis_comment = Some(comment),
                    Err(err) => warn!("skipping malformed VORBIS_COMMENT block: {}", err),
                },
                BlockType::Picture => match Picture::parse(body) {
                    Ok(picture) => pictures.push(picture),
                    Err(err) => warn!("skipping malformed PICTURE block: {}", err),
                },
                BlockType::Padding | BlockType::Unknown(_) => {}
                other => other_blocks.push(OpaqueBlock {
                    block_type: other,
                    data: body.to_vec(),
                }),
            }

            if is_last {
                break;
            }

            if stream.is_empty() {
                warn!("FLAC metadata chain ended without a last-block flag");
                break;
            }
        }

        Ok(FlacFile {
            stream_info: stream_info.ok_or(ParseError::Inconsistent)?,
            vorbis_comment,
            pictures,
            other_blocks,
        })
    }

    /// Renders the magic and metadata chain: `STREAMINFO`, then the
    /// preserved opaque blocks in their original order, then
    /// `VORBIS_COMMENT` and any `PICTURE` blocks, then a final `PADDING`
    /// block sized by `padding_size`. The caller is responsible for
    /// appending the original audio-frame bytes after this.
    pub fn render(&self, padding_size: usize) -> Vec<u8> {
        let mut blocks: Vec<(BlockType, Vec<u8>)> = Vec::new();
        blocks.push((BlockType::StreamInfo, self.stream_info.render()));

        for block in &self.other_blocks {
            blocks.push((block.block_type, block.data.clone()));
        }

        if let Some(comment) = &self.vorbis_comment {
            blocks.push((BlockType::VorbisComment, comment.render()));
        }

        for picture in &self.pictures {
            blocks.push((BlockType::Picture, picture.render()));
        }

        if padding_size > 0 {
            blocks.push((BlockType::Padding, vec![0u8; padding_size]));
        }

        let mut out = Vec::new();
        out.extend(MAGIC);

        let last_index = blocks.len() - 1;
        for (i, (block_type, body)) in blocks.into_iter().enumerate() {
            let mut flag_and_type = block_type.to_byte();
            if i == last_index {
                flag_and_type |= 0x80;
            }

            out.push(flag_and_type);
            let len = body.len() as u32;
            out.extend(&len.to_be_bytes()[1..]);
            out.extend(body);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stream_info() -> StreamInfo {
        StreamInfo {
            min_block_size: 4096,
            max_block_size: 4096,
            min_frame_size: 100,
            max_frame_size: 200,
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            total_samples: 44100 * 10,
            md5: [0u8; 16],
        }
    }

    #[test]
    fn stream_info_round_trip() {
        let info = sample_stream_info();
        let rendered = info.render();
        assert_eq!(rendered.len(), 34);

        let parsed = StreamInfo::parse(&rendered).unwrap();
        assert_eq!(parsed.sample_rate, 44100);
        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.bits_per_sample, 16);
        assert_eq!(parsed.total_samples, 441000);
    }

    #[test]
    fn duration_from_stream_info() {
        let info = sample_stream_info();
        assert!((info.duration_secs() - 10.0).abs() < 0.001);
    }

    #[test]
    fn parses_minimal_file() {
        let info = sample_stream_info();
        let mut data = MAGIC.to_vec();
        let rendered_info = info.render();
        data.push(0x80); // STREAMINFO, last block
        data.extend(&(rendered_info.len() as u32).to_be_bytes()[1..]);
        data.extend(rendered_info);

        let flac = FlacFile::parse(&data).unwrap();
        assert_eq!(flac.stream_info.sample_rate, 44100);
        assert!(flac.vorbis_comment.is_none());
    }

    #[test]
    fn rejects_non_streaminfo_first_block() {
        let mut data = MAGIC.to_vec();
        data.push(0x81); // PADDING, last block
        data.extend(&4u32.to_be_bytes()[1..]);
        data.extend(&[0u8; 4]);

        assert!(matches!(FlacFile::parse(&data), Err(ParseError::Inconsistent)));
    }

    #[test]
    fn render_round_trip_with_comment() {
        let mut comment = VorbisComment::new("musikr");
        comment.push("TITLE", "Song");

        let flac = FlacFile {
            stream_info: sample_stream_info(),
            vorbis_comment: Some(comment),
            pictures: Vec::new(),
            other_blocks: Vec::new(),
        };

        let rendered = flac.render(1024);
        let parsed = FlacFile::parse(&rendered).unwrap();

        assert_eq!(
            parsed.vorbis_comment.unwrap().get("TITLE"),
            Some("Song")
        );
    }

    #[test]
    fn padding_is_dropped_on_parse_not_preserved() {
        let info = sample_stream_info();
        let rendered_info = info.render();

        let mut data = MAGIC.to_vec();
        data.push(0x00); // STREAMINFO, not last
        data.extend(&(rendered_info.len() as u32).to_be_bytes()[1..]);
        data.extend(&rendered_info);
        data.push(0x81); // PADDING, last block
        data.extend(&16u32.to_be_bytes()[1..]);
        data.extend(&[0u8; 16]);

        let flac = FlacFile::parse(&data).unwrap();
        assert!(flac.other_blocks.is_empty());

        let rendered = flac.render(8);
        // magic + STREAMINFO block (4-byte header + 34-byte body) + a single
        // freshly generated 8-byte PADDING block (4-byte header + body).
        assert_eq!(rendered.len(), 4 + (4 + 34) + (4 + 8));
    }
}
