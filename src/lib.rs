//! Audio-file metadata: ID3v2, APEv2, Xiph Vorbis Comment, FLAC, MP4/iTunes,
//! and a cross-format [`tag`] facade over all of them, plus audio-property
//! extraction for MP4, MPEG, FLAC, Monkey's Audio, and WavPack.

pub mod ape;
pub mod core;
pub mod error;
pub mod flac;
pub mod id3v2;
pub mod monkeysaudio;
pub mod mp4;
pub mod mpeg;
pub mod string;
pub mod tag;
pub mod wavpack;
pub mod xiph;

pub use error::{ParseError, ParseResult};
pub use tag::Tag;

/// Options controlling how a tag is rendered back to bytes.
///
/// Only [`id3v2::Tag`] consults `unsynchronize`; every format honors
/// `padding_size` where its wire format has a notion of padding.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Trailing padding to reserve so future edits can grow in place without
    /// rewriting the whole file. 1024 bytes is a conservative default; large
    /// tags may want to scale this to ~10% of their rendered size.
    pub padding_size: usize,
    /// Whether to apply the ID3v2 unsynchronization scheme. Most modern
    /// readers don't need it; off by default.
    pub unsynchronize: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            padding_size: 1024,
            unsynchronize: false,
        }
    }
}
