//! Unsynchronization: byte stuffing that keeps the MPEG sync pattern out of
//! tag data. Syncsafe integer math itself lives in [`crate::core::io`].

/// Removes unsynchronization stuffing from `src`: every `0xFF 0x00` pair
/// becomes a lone `0xFF`.
///
/// This is Taglib's single-pass algorithm: both guarded patterns
/// (`FF XX` where `XX & 0xE0 != 0`, and `FF 00`) share the same `FF 00`
/// prefix, so a lookbehind on the previous byte is enough.
pub(crate) fn decode(src: &[u8]) -> Vec<u8> {
    let mut dest = Vec::with_capacity(src.len());
    let mut last = 0u8;

    for &cur in src {
        if !(last == 0xFF && cur == 0x00) {
            dest.push(cur);
        }

        last = cur;
    }

    dest.shrink_to_fit();
    dest
}

/// Applies unsynchronization stuffing to `src`: every `0xFF` byte followed by
/// a byte with its top three bits set, or that is the last byte of the
/// buffer, is followed by an inserted `0x00`.
pub(crate) fn encode(src: &[u8]) -> Vec<u8> {
    let mut dest = Vec::with_capacity(src.len());

    for (i, &byte) in src.iter().enumerate() {
        dest.push(byte);

        if byte == 0xFF {
            let next_is_dangerous = match src.get(i + 1) {
                Some(&next) => next & 0xE0 == 0xE0 || next == 0x00,
                None => true,
            };

            if next_is_dangerous {
                dest.push(0x00);
            }
        }
    }

    dest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_basic() {
        assert_eq!(decode(&[0xFF, 0x00, 0xE0]), vec![0xFF, 0xE0]);
        assert_eq!(decode(&[0xFF, 0x00, 0x00]), vec![0xFF, 0x00]);
    }

    #[test]
    fn encode_guards_dangerous_bytes() {
        assert_eq!(encode(&[0xFF, 0xE0]), vec![0xFF, 0x00, 0xE0]);
        assert_eq!(encode(&[0xFF]), vec![0xFF, 0x00]);
        assert_eq!(encode(&[0xFF, 0x01]), vec![0xFF, 0x01]);
        assert_eq!(encode(&[0xFF, 0x00]), vec![0xFF, 0x00, 0x00]);
    }

    #[test]
    fn round_trips_arbitrary_buffers() {
        let samples: [&[u8]; 4] = [
            b"hello world",
            &[0xFF, 0xFF, 0xE0, 0x00, 0xFF],
            &[],
            &[0x00, 0xFF, 0xD0],
        ];

        for sample in samples {
            let encoded = encode(sample);
            assert!(
                !encoded
                    .windows(2)
                    .any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0),
                "encoded buffer still contains a raw sync pattern"
            );
            assert_eq!(decode(&encoded), sample);
        }
    }
}
