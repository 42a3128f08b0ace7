//! MPEG-1/2/2.5 audio frame headers plus the Xing/Info and VBRI VBR headers
//! embedded in the first frame, for deriving duration and bitrate without a
//! full decode.

use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Layer {
    L1,
    L2,
    L3,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

// index [version][layer] -> table of kbps, 0 = free, None = reserved.
const BITRATE_V1_L1: [u16; 16] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0xFFFF,
];
const BITRATE_V1_L2: [u16; 16] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0xFFFF,
];
const BITRATE_V1_L3: [u16; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0xFFFF,
];
const BITRATE_V2_L1: [u16; 16] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0xFFFF,
];
const BITRATE_V2_L23: [u16; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0xFFFF,
];

const SAMPLE_RATE_V1: [u32; 4] = [44100, 48000, 32000, 0];
const SAMPLE_RATE_V2: [u32; 4] = [22050, 24000, 16000, 0];
const SAMPLE_RATE_V2_5: [u32; 4] = [11025, 12000, 8000, 0];

/// A decoded MPEG audio frame header (the 4 sync+field bytes, not the
/// frame body).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    pub has_crc: bool,
    pub bitrate_kbps: u16,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

impl FrameHeader {
    /// Parses a 4-byte MPEG frame header starting at `data[0]`. `data` must
    /// have at least 4 bytes; the sync pattern is validated.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.len() < 4 {
            return Err(ParseError::InsufficientData);
        }

        let mut stream = BufStream::new(&data[0..4]);
        let bytes: [u8; 4] = stream.read_array()?;

        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return Err(ParseError::BadMagic);
        }

        let version = match (bytes[1] >> 3) & 0x3 {
            0b11 => MpegVersion::V1,
            0b10 => MpegVersion::V2,
            0b00 => MpegVersion::V2_5,
            _ => return Err(ParseError::UnsupportedVersion),
        };

        let layer = match (bytes[1] >> 1) & 0x3 {
            0b11 => Layer::L1,
            0b10 => Layer::L2,
            0b01 => Layer::L3,
            _ => return Err(ParseError::InvalidFieldValue),
        };

        let has_crc = bytes[1] & 0x1 == 0;

        let bitrate_index = (bytes[2] >> 4) & 0xF;
        let table = match (version, layer) {
            (MpegVersion::V1, Layer::L1) => &BITRATE_V1_L1,
            (MpegVersion::V1, Layer::L2) => &BITRATE_V1_L2,
            (MpegVersion::V1, Layer::L3) => &BITRATE_V1_L3,
            (_, Layer::L1) => &BITRATE_V2_L1,
            (_, _) => &BITRATE_V2_L23,
        };
        let bitrate_kbps = table[bitrate_index as usize];
        if bitrate_kbps == 0xFFFF {
            return Err(ParseError::InvalidFieldValue);
        }

        let sample_rate_index = (bytes[2] >> 2) & 0x3;
        let sample_rate = match version {
            MpegVersion::V1 => SAMPLE_RATE_V1[sample_rate_index as usize],
            MpegVersion::V2 => SAMPLE_RATE_V2[sample_rate_index as usize],
            MpegVersion::V2_5 => SAMPLE_RATE_V2_5[sample_rate_index as usize],
        };
        if sample_rate == 0 {
            return Err(ParseError::InvalidFieldValue);
        }

        let padding = bytes[2] & 0x2 != 0;

        let channel_mode = match (bytes[3] >> 6) & 0x3 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            0b11 => ChannelMode::Mono,
            _ => unreachable!(),
        };

        Ok(FrameHeader {
            version,
            layer,
            has_crc,
            bitrate_kbps,
            sample_rate,
            padding,
            channel_mode,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.version, self.layer) {
            (MpegVersion::V1, Layer::L1) => 384,
            (MpegVersion::V1, Layer::L2) => 1152,
            (MpegVersion::V1, Layer::L3) => 1152,
            (_, Layer::L1) => 384,
            (_, Layer::L2) => 1152,
            (_, Layer::L3) => 576,
        }
    }

    /// Frame size in bytes, including the header.
    pub fn frame_size(&self) -> u32 {
        let pad = u32::from(self.padding);
        let bitrate = u32::from(self.bitrate_kbps);

        match self.layer {
            Layer::L1 => (12000 * bitrate / self.sample_rate + pad) * 4,
            _ => 144000 * bitrate / self.sample_rate + pad,
        }
    }

    /// Byte offset from the start of the frame to where a VBR side-info
    /// block (and thus a Xing/Info header) would begin.
    fn side_info_size(&self) -> usize {
        match (self.version, self.channel_mode) {
            (MpegVersion::V1, ChannelMode::Mono) => 17,
            (MpegVersion::V1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        }
    }

    fn xing_offset(&self) -> usize {
        4 + if self.has_crc { 2 } else { 0 } + self.side_info_size()
    }
}

/// Locates and decodes the first valid MPEG frame header in `data`, starting
/// the scan at `start` (typically just past any leading ID3v2 tag).
/// Validates a candidate by also finding a sync pattern at the following
/// frame boundary, when there's enough data to check.
pub fn find_first_frame(data: &[u8], start: usize) -> Option<(usize, FrameHeader)> {
    let mut pos = start;

    while pos + 4 <= data.len() {
        if let Ok(header) = FrameHeader::parse(&data[pos..]) {
            let next = pos + header.frame_size() as usize;

            if next + 4 > data.len() {
                return Some((pos, header));
            }

            if data[next] == 0xFF && data[next + 1] & 0xE0 == 0xE0 {
                return Some((pos, header));
            }
        }

        pos += 1;
    }

    None
}

/// The Xing/Info VBR header embedded in the first frame's side-info region.
#[derive(Clone, Copy, Debug)]
pub struct XingHeader {
    pub is_vbr: bool,
    pub frame_count: Option<u32>,
    pub byte_count: Option<u32>,
}

/// Parses a Xing or Info header (they share a layout; only the magic and
/// VBR-vs-CBR semantics differ) out of the first frame of `frame_data`.
pub fn parse_xing(frame_data: &[u8], header: &FrameHeader) -> ParseResult<XingHeader> {
    let offset = header.xing_offset();

    if offset + 4 > frame_data.len() {
        return Err(ParseError::NotFound);
    }

    let magic = &frame_data[offset..offset + 4];
    let is_vbr = match magic {
        b"Xing" => true,
        b"Info" => false,
        _ => return Err(ParseError::NotFound),
    };

    let mut stream = BufStream::new(&frame_data[offset + 4..]);
    let flags = stream.read_be_u32().map_err(ParseError::from)?;

    let frame_count = if flags & 0x1 != 0 {
        Some(stream.read_be_u32().map_err(ParseError::from)?)
    } else {
        None
    };

    let byte_count = if flags & 0x2 != 0 {
        Some(stream.read_be_u32().map_err(ParseError::from)?)
    } else {
        None
    };

    Ok(XingHeader {
        is_vbr,
        frame_count,
        byte_count,
    })
}

/// The VBRI VBR header, found at a fixed offset inside the first frame.
#[derive(Clone, Copy, Debug)]
pub struct VbriHeader {
    pub total_bytes: u32,
    pub total_frames: u32,
}

const VBRI_OFFSET: usize = 36;

pub fn parse_vbri(frame_data: &[u8]) -> ParseResult<VbriHeader> {
    if VBRI_OFFSET + 4 > frame_data.len() || &frame_data[VBRI_OFFSET..VBRI_OFFSET + 4] != b"VBRI" {
        return Err(ParseError::NotFound);
    }

    let mut stream = BufStream::new(&frame_data[VBRI_OFFSET + 4..]);
    stream.skip(6).map_err(ParseError::from)?; // version, delay, quality (u16 each)
    let total_bytes = stream.read_be_u32().map_err(ParseError::from)?;
    let total_frames = stream.read_be_u32().map_err(ParseError::from)?;

    Ok(VbriHeader {
        total_bytes,
        total_frames,
    })
}

/// Audio properties derived from an MPEG stream: the first frame's header,
/// plus whichever VBR header (if any) is present, plus the total size of
/// the audio region (file size minus any leading/trailing tags).
pub struct MpegProperties {
    pub duration_secs: f64,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub channel_mode: ChannelMode,
}

/// Derives audio properties for an MPEG stream starting at `audio_start`
/// (past any leading ID3v2 tag) and covering `audio_len` bytes.
pub fn extract_properties(data: &[u8], audio_start: usize, audio_len: usize) -> ParseResult<MpegProperties> {
    let (frame_pos, header) = find_first_frame(data, audio_start).ok_or(ParseError::BadMagic)?;
    let frame_data = &data[frame_pos..];

    let samples_per_frame = f64::from(header.samples_per_frame());
    let sample_rate = f64::from(header.sample_rate);

    if let Ok(xing) = parse_xing(frame_data, &header) {
        if let Some(frames) = xing.frame_count {
            let duration_secs = f64::from(frames) * samples_per_frame / sample_rate;
            let bitrate_kbps = match xing.byte_count {
                Some(bytes) if duration_secs > 0.0 => {
                    (f64::from(bytes) * 8.0 / (duration_secs * 1000.0)) as u32
                }
                _ => u32::from(header.bitrate_kbps),
            };

            return Ok(MpegProperties {
                duration_secs,
                bitrate_kbps,
                sample_rate: header.sample_rate,
                channel_mode: header.channel_mode,
            });
        }
    }

    if let Ok(vbri) = parse_vbri(frame_data) {
        let duration_secs = f64::from(vbri.total_frames) * samples_per_frame / sample_rate;
        let bitrate_kbps = if duration_secs > 0.0 {
            (f64::from(vbri.total_bytes) * 8.0 / (duration_secs * 1000.0)) as u32
        } else {
            u32::from(header.bitrate_kbps)
        };

        return Ok(MpegProperties {
            duration_secs,
            bitrate_kbps,
            sample_rate: header.sample_rate,
            channel_mode: header.channel_mode,
        });
    }

    let duration_secs = (audio_len as f64 * 8.0) / (f64::from(header.bitrate_kbps) * 1000.0);

    Ok(MpegProperties {
        duration_secs,
        bitrate_kbps: u32::from(header.bitrate_kbps),
        sample_rate: header.sample_rate,
        channel_mode: header.channel_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v1_l3_128kbps_44100_stereo() {
        let data = [0xFF, 0xFB, 0x90, 0x00];
        let header = FrameHeader::parse(&data).unwrap();

        assert_eq!(header.version, MpegVersion::V1);
        assert_eq!(header.layer, Layer::L3);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channel_mode, ChannelMode::Stereo);
        assert!(header.has_crc);
    }

    #[test]
    fn rejects_bad_sync() {
        let data = [0x00, 0x00, 0x00, 0x00];
        assert_eq!(FrameHeader::parse(&data), Err(ParseError::BadMagic));
    }

    #[test]
    fn frame_size_matches_formula() {
        let data = [0xFF, 0xFB, 0x90, 0x00];
        let header = FrameHeader::parse(&data).unwrap();
        // 144000*128/44100 = 417 (no padding bit set here)
        assert_eq!(header.frame_size(), 417);
    }

    #[test]
    fn finds_first_frame_skipping_junk() {
        let mut data = vec![0x00; 10];
        data.extend(&[0xFF, 0xFB, 0x90, 0x00]);

        let (pos, header) = find_first_frame(&data, 0).unwrap();
        assert_eq!(pos, 10);
        assert_eq!(header.sample_rate, 44100);
    }
}
