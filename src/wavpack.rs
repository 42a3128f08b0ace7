//! WavPack block header parsing, plus the metadata sub-blocks this crate
//! cares about (custom sample rate, multi-channel count).

use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};

const MAGIC: &[u8] = b"wvpk";

const SAMPLE_RATE_TABLE: [u32; 15] = [
    6000, 8000, 9600, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200,
    96000, 192000,
];

pub struct WavPackBlockHeader {
    pub block_size: u32,
    pub version: u16,
    pub total_samples: u32,
    pub bytes_per_sample: u8,
    pub mono: bool,
    pub sample_rate: Option<u32>,
}

/// Parses a WavPack block header (32 bytes) plus any metadata sub-blocks
/// that follow, to recover a custom sample rate or multi-channel count.
pub fn parse_block(data: &[u8]) -> ParseResult<WavPackBlockHeader> {
    if data.len() < 32 || &data[0..4] != MAGIC {
        return Err(ParseError::BadMagic);
    }

    let mut stream = BufStream::new(data);
    stream.skip(4).map_err(ParseError::from)?; // magic

    let block_size = stream.read_le_u32().map_err(ParseError::from)?;
    let version = stream.read_le_u16().map_err(ParseError::from)?;
    stream.skip(2).map_err(ParseError::from)?; // bytes to offset 12: track no, index no
    let total_samples = stream.read_le_u32().map_err(ParseError::from)?;
    stream.skip(8).map_err(ParseError::from)?; // block index, block samples
    let flags = stream.read_le_u32().map_err(ParseError::from)?;

    let bytes_per_sample = ((flags & 0x3) + 1) as u8;
    let mono = flags & 0x4 != 0;
    let sample_rate_index = ((flags >> 23) & 0xF) as usize;

    let sample_rate = if sample_rate_index == 15 {
        parse_custom_sample_rate(&data[32..])
    } else {
        SAMPLE_RATE_TABLE.get(sample_rate_index).copied()
    };

    Ok(WavPackBlockHeader {
        block_size,
        version,
        total_samples,
        bytes_per_sample,
        mono,
        sample_rate,
    })
}

struct SubBlock<'a> {
    id: u8,
    data: &'a [u8],
}

fn iter_sub_blocks(mut data: &[u8]) -> Vec<SubBlock> {
    let mut blocks = Vec::new();

    while data.len() >= 2 {
        let id_byte = data[0];
        let odd_size = id_byte & 0x20 != 0;
        let large = id_byte & 0x80 != 0;
        let id = id_byte & 0x1F;

        let (word_count, header_len) = if large {
            if data.len() < 4 {
                break;
            }
            let count = u32::from_le_bytes([data[1], data[2], data[3], 0]);
            (count as usize, 4)
        } else {
            (data[1] as usize, 2)
        };

        let byte_len = word_count * 2;

        if data.len() < header_len + byte_len {
            break;
        }

        let mut body = &data[header_len..header_len + byte_len];
        if odd_size && !body.is_empty() {
            body = &body[..body.len() - 1];
        }

        blocks.push(SubBlock { id, data: body });
        data = &data[header_len + byte_len..];
    }

    blocks
}

/// Sub-block 0x07: a custom sample rate, little-endian, up to 3 bytes.
fn parse_custom_sample_rate(metadata: &[u8]) -> Option<u32> {
    iter_sub_blocks(metadata).into_iter().find_map(|block| {
        if block.id == 0x07 && !block.data.is_empty() {
            let mut bytes = [0u8; 4];
            let len = block.data.len().min(4);
            bytes[..len].copy_from_slice(&block.data[..len]);
            Some(u32::from_le_bytes(bytes))
        } else {
            None
        }
    })
}

/// Sub-block 0x0D: multi-channel count, carried in its first byte.
pub fn parse_channel_count(metadata: &[u8]) -> Option<u8> {
    iter_sub_blocks(metadata)
        .into_iter()
        .find_map(|block| if block.id == 0x0D { block.data.first().copied() } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(flags: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(MAGIC);
        data.extend(&64u32.to_le_bytes()); // block size
        data.extend(&0x0410u16.to_le_bytes()); // version
        data.extend(&[0u8; 2]); // track/index
        data.extend(&44100u32.to_le_bytes() /* placeholder total samples */);
        data.extend(&[0u8; 8]); // block index, block samples
        data.extend(&flags.to_le_bytes());
        data
    }

    #[test]
    fn parses_standard_sample_rate() {
        // index 9 => 44100, stereo, 2 bytes per sample
        let flags = (9u32 << 23) | 0x1;
        let data = sample_block(flags);

        let header = parse_block(&data).unwrap();
        assert_eq!(header.sample_rate, Some(44100));
        assert_eq!(header.bytes_per_sample, 2);
        assert!(!header.mono);
    }

    #[test]
    fn parses_mono_flag() {
        let flags = (9u32 << 23) | 0x4;
        let data = sample_block(flags);

        let header = parse_block(&data).unwrap();
        assert!(header.mono);
    }

    #[test]
    fn reads_custom_sample_rate_sub_block() {
        let flags = 15u32 << 23; // custom rate
        let mut data = sample_block(flags);

        // sub-block id 0x07, small header, word_count=2 (4 bytes payload)
        data.push(0x07);
        data.push(2);
        data.extend(&48000u32.to_le_bytes());

        let header = parse_block(&data).unwrap();
        assert_eq!(header.sample_rate, Some(48000));
    }

    #[test]
    fn reads_multichannel_sub_block() {
        let mut metadata = Vec::new();
        metadata.push(0x0D);
        metadata.push(1);
        metadata.extend(&[6u8, 0u8]);

        assert_eq!(parse_channel_count(&metadata), Some(6));
    }

    #[test]
    fn rejects_bad_magic() {
        let data = vec![0u8; 32];
        assert_eq!(parse_block(&data).unwrap_err(), ParseError::BadMagic);
    }
}
