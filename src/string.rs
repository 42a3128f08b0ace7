//! Tag string handling: text encodings shared across every codec.

use crate::core::io::BufStream;

/// The text encodings a tag frame or atom can declare.
///
/// Not every format uses every variant: Xiph tags are always UTF-8, while
/// ID3v2 exposes all five depending on version. Prefer [`Utf8`](Encoding::Utf8)
/// when a caller has the choice.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    /// ISO-8859-1 / Latin-1. Round-trips only code points <= 0xFF; anything
    /// else is flattened to `?` on render.
    Latin1,
    /// UTF-16 with a leading BOM. `FF FE` is LE, `FE FF` is BE; any other
    /// pair, including no BOM at all, is treated as LE.
    Utf16,
    /// UTF-16BE with no BOM. Only legal in ID3v2.4.
    Utf16Be,
    /// UTF-8. Only legal in ID3v2.4 and natively in Xiph/APE/MP4.
    Utf8,
    /// UTF-16LE with no BOM.
    Utf16Le,
}

impl Encoding {
    pub(crate) fn nul_size(&self) -> usize {
        match self {
            Self::Utf8 | Self::Latin1 => 1,
            _ => 2,
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::Utf8
    }
}

/// Consumes the rest of `stream` and decodes it according to `encoding`.
pub(crate) fn read(encoding: Encoding, stream: &mut BufStream) -> String {
    decode(encoding, stream.take_rest())
}

/// Consumes `stream` up to (and including) a NUL terminator and decodes the
/// portion before it. The terminator is two 0x00 bytes for UTF-16 variants,
/// one for Latin-1/UTF-8.
pub(crate) fn read_terminated(encoding: Encoding, stream: &mut BufStream) -> String {
    let string_data = match encoding.nul_size() {
        1 => stream.search(&[0]),
        2 => stream.search(&[0, 0]),
        _ => unreachable!(),
    };

    decode(encoding, string_data)
}

/// Renders `string` according to `encoding`.
pub(crate) fn render(encoding: Encoding, string: &str) -> Vec<u8> {
    match encoding {
        Encoding::Latin1 => encode_latin1(string),
        Encoding::Utf16 => encode_utf16(string),
        Encoding::Utf16Be => encode_utf16be(string),
        Encoding::Utf8 => string.as_bytes().to_vec(),
        Encoding::Utf16Le => encode_utf16le(string),
    }
}

/// Renders `string` plus a NUL terminator in `encoding`.
pub(crate) fn render_terminated(encoding: Encoding, string: &str) -> Vec<u8> {
    let mut result = render(encoding, string);
    result.resize(result.len() + encoding.nul_size(), 0);
    result
}

fn decode(encoding: Encoding, data: &[u8]) -> String {
    // Non-terminated string data is frequently still NUL-padded by writers
    // that expect to serialize into a C string; trim it so it doesn't leak
    // into the decoded value.
    let data = match encoding.nul_size() {
        1 => data.strip_suffix(&[0]).unwrap_or(data),
        2 => data.strip_suffix(&[0, 0]).unwrap_or(data),
        _ => unreachable!(),
    };

    match encoding {
        Encoding::Latin1 => decode_latin1(data),
        Encoding::Utf16 => decode_utf16(data),
        Encoding::Utf16Be => decode_utf16be(data),
        Encoding::Utf8 => String::from_utf8_lossy(data).to_string(),
        Encoding::Utf16Le => decode_utf16le(data),
    }
}

fn decode_latin1(data: &[u8]) -> String {
    // Every Latin-1 byte is numerically identical to its Unicode code point.
    data.iter().map(|&byte| char::from(byte)).collect()
}

fn decode_utf16(data: &[u8]) -> String {
    if data.len() < 2 {
        return String::new();
    }

    match (data[0], data[1]) {
        (0xFF, 0xFE) => decode_utf16le(&data[2..]),
        (0xFE, 0xFF) => decode_utf16be(&data[2..]),
        _ => decode_utf16le(data),
    }
}

fn decode_utf16be(data: &[u8]) -> String {
    String::from_utf16_lossy(
        data.chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>()
            .as_slice(),
    )
}

fn decode_utf16le(data: &[u8]) -> String {
    String::from_utf16_lossy(
        data.chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>()
            .as_slice(),
    )
}

fn encode_latin1(string: &str) -> Vec<u8> {
    string
        .chars()
        .map(|ch| if u32::from(ch) > 0xFF { b'?' } else { ch as u8 })
        .collect()
}

fn encode_utf16(string: &str) -> Vec<u8> {
    let mut result: Vec<u8> = vec![0xFF, 0xFE];
    result.extend(encode_utf16le(string));
    result
}

fn encode_utf16be(string: &str) -> Vec<u8> {
    string
        .encode_utf16()
        .flat_map(|cp| cp.to_be_bytes())
        .collect()
}

fn encode_utf16le(string: &str) -> Vec<u8> {
    string
        .encode_utf16()
        .flat_map(|cp| cp.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STR_LATIN1: &str = "Like a while loop with no escape";
    const DATA_LATIN1: &[u8] = b"Like a while loop with no escape";

    const STR_UNICODE: &str = "caf\u{e9} \u{1d568}";
    const DATA_UTF16LE: &[u8] = b"c\x00a\x00f\x00\xe9\x00 \x005\xd8\x68\xdd";
    const DATA_UTF16BE: &[u8] = b"\x00c\x00a\x00f\x00\xe9\x00 \xd85\xdd\x68";

    #[test]
    fn parse_latin1() {
        assert_eq!(decode(Encoding::Latin1, DATA_LATIN1), STR_LATIN1);
    }

    #[test]
    fn render_latin1_lossy() {
        assert_eq!(render(Encoding::Latin1, "caf\u{e9}"), b"caf\xe9");
    }

    #[test]
    fn parse_utf16_le_bom() {
        let mut data = vec![0xFF, 0xFE];
        data.extend_from_slice(DATA_UTF16LE);
        assert_eq!(decode(Encoding::Utf16, &data), STR_UNICODE);
    }

    #[test]
    fn parse_utf16_be_bom() {
        let mut data = vec![0xFE, 0xFF];
        data.extend_from_slice(DATA_UTF16BE);
        assert_eq!(decode(Encoding::Utf16, &data), STR_UNICODE);
    }

    #[test]
    fn parse_utf16_no_bom_defaults_le() {
        // Per spec, an absent or unrecognized BOM means LE.
        assert_eq!(decode(Encoding::Utf16, DATA_UTF16LE), STR_UNICODE);
    }

    #[test]
    fn parse_utf16be_no_bom() {
        assert_eq!(decode(Encoding::Utf16Be, DATA_UTF16BE), STR_UNICODE);
    }

    #[test]
    fn render_utf16_emits_le_bom() {
        let mut expected = vec![0xFF, 0xFE];
        expected.extend_from_slice(DATA_UTF16LE);
        assert_eq!(render(Encoding::Utf16, STR_UNICODE), expected);
    }

    #[test]
    fn terminated_round_trip() {
        let data = b"hello\0world\0";
        let mut stream = BufStream::new(data);

        assert_eq!(read_terminated(Encoding::Latin1, &mut stream), "hello");
        assert_eq!(read_terminated(Encoding::Latin1, &mut stream), "world");
    }

    #[test]
    fn render_terminated_appends_nul() {
        assert_eq!(render_terminated(Encoding::Utf8, "hi"), b"hi\0");
    }
}
