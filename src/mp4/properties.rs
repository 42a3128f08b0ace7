//! Audio-property extraction: `mvhd`/`mdhd` duration, the `stsd` sample
//! entry, `esds`'s AAC descriptor chain, and the ALAC magic cookie.

use super::{read_full_box_prefix, Atom};
use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Codec {
    Aac,
    Alac,
    Flac,
    Opus,
    Ac3,
    Ec3,
    Other,
}

impl Codec {
    fn from_sample_entry_type(t: &str) -> Self {
        match t {
            "mp4a" => Codec::Aac,
            "alac" => Codec::Alac,
            "fLaC" => Codec::Flac,
            "Opus" => Codec::Opus,
            "ac-3" => Codec::Ac3,
            "ec-3" => Codec::Ec3,
            _ => Codec::Other,
        }
    }
}

pub struct Mp4AudioProperties {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub codec: Codec,
    pub avg_bitrate_kbps: Option<u32>,
}

/// Walks `moov/mvhd`, the first audio `trak`, and that track's `stsd`
/// sample entry, refining with `esds`/`alac` where present.
pub fn extract(moov: &Atom) -> ParseResult<Mp4AudioProperties> {
    let mvhd = moov.find("mvhd").ok_or(ParseError::NotFound)?;
    let (movie_timescale, movie_duration) = parse_mvhd(mvhd)?;

    let trak = moov
        .children
        .iter()
        .find(|t| t.atom_type == "trak" && is_audio_track(t))
        .ok_or(ParseError::NotFound)?;

    let mdia = trak.find("mdia").ok_or(ParseError::NotFound)?;
    let mdhd = mdia.find("mdhd").ok_or(ParseError::NotFound)?;
    let (track_timescale, track_duration) = parse_mdhd(mdhd)?;

    let (timescale, duration) = if track_timescale > 65535 {
        (track_timescale, track_duration)
    } else {
        (movie_timescale, movie_duration)
    };

    let duration_secs = if timescale > 0 {
        duration as f64 / f64::from(timescale)
    } else {
        0.0
    };

    let stsd = mdia
        .find_path(&["minf", "stbl", "stsd"])
        .ok_or(ParseError::NotFound)?;

    let entry = parse_stsd(stsd)?;

    let mut properties = Mp4AudioProperties {
        duration_secs,
        sample_rate: entry.sample_rate,
        channels: entry.channels,
        bits_per_sample: entry.sample_size,
        codec: Codec::from_sample_entry_type(&entry.entry_type),
        avg_bitrate_kbps: None,
    };

    if properties.codec == Codec::Aac {
        if let Some(esds) = entry.atom.find("esds") {
            if let Ok(aac) = parse_esds(esds) {
                if let Some(rate) = aac.sample_rate {
                    properties.sample_rate = rate;
                }
                if let Some(channels) = aac.channels {
                    properties.channels = channels;
                }
                properties.avg_bitrate_kbps = aac.avg_bitrate.map(|b| b / 1000);
                properties.bits_per_sample = 0;
            }
        }
    } else if properties.codec == Codec::Alac {
        if let Some(alac) = entry.atom.find("alac") {
            if let Ok(cookie) = parse_alac_cookie(alac) {
                properties.sample_rate = cookie.sample_rate;
                properties.channels = u16::from(cookie.channels);
                properties.bits_per_sample = u16::from(cookie.bit_depth);
                properties.avg_bitrate_kbps = Some(cookie.avg_bitrate / 1000);
            }
        }
    }

    Ok(properties)
}

fn is_audio_track(trak: &Atom) -> bool {
    trak.find_path(&["mdia", "hdlr"])
        .map(|hdlr| hdlr.data.len() >= 12 && &hdlr.data[8..12] == b"soun")
        .unwrap_or(false)
}

fn parse_mvhd(mvhd: &Atom) -> ParseResult<(u32, u64)> {
    let mut stream = BufStream::new(&mvhd.data);
    let (version, _flags) = read_full_box_prefix(&mut stream)?;

    if version == 1 {
        stream.skip(16).map_err(ParseError::from)?; // creation/modification time, 8 bytes each
        let timescale = stream.read_be_u32().map_err(ParseError::from)?;
        let duration = stream.read_be_u64().map_err(ParseError::from)?;
        Ok((timescale, duration))
    } else {
        stream.skip(8).map_err(ParseError::from)?; // creation/modification time, 4 bytes each
        let timescale = stream.read_be_u32().map_err(ParseError::from)?;
        let duration = stream.read_be_u32().map_err(ParseError::from)?;
        Ok((timescale, u64::from(duration)))
    }
}

fn parse_mdhd(mdhd: &Atom) -> ParseResult<(u32, u64)> {
    parse_mvhd(mdhd)
}

struct SampleEntry {
    entry_type: String,
    channels: u16,
    sample_size: u16,
    sample_rate: u32,
    atom: Atom,
}

fn parse_stsd(stsd: &Atom) -> ParseResult<SampleEntry> {
    let mut stream = BufStream::new(&stsd.data);
    let (_version, _flags) = read_full_box_prefix(&mut stream)?;
    let _entry_count = stream.read_be_u32().map_err(ParseError::from)?;

    let rest = stream.take_rest();
    let entries = super::parse_atoms(rest)?;
    let entry = entries.into_iter().next().ok_or(ParseError::NotFound)?;

    if entry.data.len() < 28 {
        return Err(ParseError::InsufficientData);
    }

    let mut fields = BufStream::new(&entry.data);
    fields.skip(6).map_err(ParseError::from)?; // reserved
    fields.skip(2).map_err(ParseError::from)?; // data reference index
    fields.skip(8).map_err(ParseError::from)?; // reserved
    let channels = fields.read_be_u16().map_err(ParseError::from)?;
    let sample_size = fields.read_be_u16().map_err(ParseError::from)?;
    fields.skip(4).map_err(ParseError::from)?; // reserved
    let sample_rate_fixed = fields.read_be_u32().map_err(ParseError::from)?;
    let sample_rate = sample_rate_fixed >> 16;

    Ok(SampleEntry {
        entry_type: entry.atom_type.clone(),
        channels,
        sample_size,
        sample_rate,
        atom: entry,
    })
}

struct AacConfig {
    sample_rate: Option<u32>,
    channels: Option<u16>,
    avg_bitrate: Option<u32>,
}

const ASC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Walks the `esds` FullBox's ISO/IEC-14496-1 descriptor chain: ES_Descriptor
/// (0x03) -> DecoderConfigDescriptor (0x04) -> DecoderSpecificInfo (0x05),
/// the latter carrying the Audio Specific Config bitstream.
fn parse_esds(esds: &Atom) -> ParseResult<AacConfig> {
    let mut stream = BufStream::new(&esds.data);
    let (_version, _flags) = read_full_box_prefix(&mut stream)?;

    let mut avg_bitrate = None;
    let mut asc = None;

    while !stream.is_empty() {
        let tag = match stream.read_u8() {
            Ok(t) => t,
            Err(_) => break,
        };
        let len = match read_descriptor_length(&mut stream) {
            Ok(len) => len,
            Err(_) => break,
        };
        let body = match stream.slice(len) {
            Ok(b) => b,
            Err(_) => break,
        };

        match tag {
            0x03 => {
                // ES_Descriptor: skip ES_ID (2) + flags (1), recurse into body.
                if body.len() > 3 {
                    let mut inner = BufStream::new(&body[3..]);
                    while !inner.is_empty() {
                        let inner_tag = match inner.read_u8() {
                            Ok(t) => t,
                            Err(_) => break,
                        };
                        let inner_len = match read_descriptor_length(&mut inner) {
                            Ok(l) => l,
                            Err(_) => break,
                        };
                        let inner_body = match inner.slice(inner_len) {
                            Ok(b) => b,
                            Err(_) => break,
                        };

                        if inner_tag == 0x04 && inner_body.len() >= 13 {
                            avg_bitrate = Some(u32::from_be_bytes([
                                inner_body[9],
                                inner_body[10],
                                inner_body[11],
                                inner_body[12],
                            ]));

                            let mut dcd = BufStream::new(&inner_body[13..]);
                            if let Ok(dsi_tag) = dcd.read_u8() {
                                if dsi_tag == 0x05 {
                                    if let Ok(dsi_len) = read_descriptor_length(&mut dcd) {
                                        if let Ok(dsi) = dcd.slice(dsi_len) {
                                            asc = parse_audio_specific_config(dsi);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(AacConfig {
        sample_rate: asc.as_ref().map(|a| a.0),
        channels: asc.as_ref().map(|a| a.1),
        avg_bitrate,
    })
}

/// MPEG-4 expandable descriptor length: up to 4 bytes, each with a
/// continuation bit in the MSB and 7 data bits.
fn read_descriptor_length(stream: &mut BufStream) -> ParseResult<usize> {
    let mut len = 0usize;

    for _ in 0..4 {
        let byte = stream.read_u8().map_err(ParseError::from)?;
        len = (len << 7) | usize::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(len);
        }
    }

    Ok(len)
}

fn parse_audio_specific_config(data: &[u8]) -> Option<(u32, u16)> {
    if data.len() < 2 {
        return None;
    }

    let bits = u16::from_be_bytes([data[0], data[1]]);
    let freq_index = ((bits >> 7) & 0xF) as usize;
    let channel_config = ((bits >> 3) & 0xF) as u16;

    let sample_rate = if freq_index == 15 {
        if data.len() < 5 {
            return None;
        }
        (u32::from(data[1] & 0x7F) << 17)
            | (u32::from(data[2]) << 9)
            | (u32::from(data[3]) << 1)
            | (u32::from(data[4] >> 7))
    } else {
        *ASC_SAMPLE_RATES.get(freq_index)?
    };

    let channels = match channel_config {
        7 => 8,
        n @ 1..=6 => n,
        _ => return None,
    };

    Some((sample_rate, channels))
}

pub struct AlacCookie {
    pub avg_bitrate: u32,
    pub sample_rate: u32,
    pub bit_depth: u8,
    pub channels: u8,
}

/// The 36-byte ALAC magic cookie inside the `alac` sample entry's nested
/// `alac` atom.
fn parse_alac_cookie(alac: &Atom) -> ParseResult<AlacCookie> {
    if alac.data.len() < 4 + 24 {
        return Err(ParseError::InsufficientData);
    }

    let body = &alac.data[4..]; // skip FullBox version+flags
    let mut stream = BufStream::new(body);

    stream.skip(4).map_err(ParseError::from)?; // frameLength
    stream.skip(1).map_err(ParseError::from)?; // compatibleVersion
    let bit_depth = stream.read_u8().map_err(ParseError::from)?;
    stream.skip(3).map_err(ParseError::from)?; // pb, mb, kb
    let channels = stream.read_u8().map_err(ParseError::from)?;
    stream.skip(2).map_err(ParseError::from)?; // maxRun
    stream.skip(4).map_err(ParseError::from)?; // maxFrameBytes
    let avg_bitrate = stream.read_be_u32().map_err(ParseError::from)?;
    let sample_rate = stream.read_be_u32().map_err(ParseError::from)?;

    Ok(AlacCookie {
        avg_bitrate,
        sample_rate,
        bit_depth,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fullbox(atom_type: &str, mut payload: Vec<u8>) -> Atom {
        let mut data = vec![0u8; 4];
        data.append(&mut payload);
        Atom {
            atom_type: atom_type.to_string(),
            data,
            children: Vec::new(),
        }
    }

    #[test]
    fn parses_mvhd_v0() {
        let mut payload = vec![0u8; 8]; // creation/modification
        payload.extend(&44100u32.to_be_bytes()); // timescale... reused field name loosely
        payload.extend(&441000u32.to_be_bytes()); // duration
        let mvhd = fullbox("mvhd", payload);

        let (timescale, duration) = parse_mvhd(&mvhd).unwrap();
        assert_eq!(timescale, 44100);
        assert_eq!(duration, 441000);
    }

    #[test]
    fn asc_parses_standard_rate_and_stereo() {
        // audio object type=2 (AAC LC, 5 bits), freq index=4 (44100, 4 bits), channels=2 (4 bits)
        let byte0 = (2u8 << 3) | (4u8 >> 1);
        let byte1 = ((4u8 & 1) << 7) | (2u8 << 3);
        let (rate, channels) = parse_audio_specific_config(&[byte0, byte1]).unwrap();
        assert_eq!(rate, 44100);
        assert_eq!(channels, 2);
    }

    #[test]
    fn alac_cookie_round_trip_fields() {
        let mut payload = Vec::new();
        payload.extend(&1024u32.to_be_bytes()); // frameLength
        payload.push(0); // compatibleVersion
        payload.push(16); // bitDepth
        payload.extend(&[40, 10, 14]); // pb, mb, kb
        payload.push(2); // channels
        payload.extend(&0u16.to_be_bytes()); // maxRun
        payload.extend(&0u32.to_be_bytes()); // maxFrameBytes
        payload.extend(&256000u32.to_be_bytes()); // avgBitRate
        payload.extend(&44100u32.to_be_bytes()); // sampleRate

        let alac = fullbox("alac", payload);
        let cookie = parse_alac_cookie(&alac).unwrap();

        assert_eq!(cookie.sample_rate, 44100);
        assert_eq!(cookie.channels, 2);
        assert_eq!(cookie.bit_depth, 16);
        assert_eq!(cookie.avg_bitrate, 256000);
    }
}
