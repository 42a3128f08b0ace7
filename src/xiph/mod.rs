//! Xiph Vorbis Comment: the tagging format shared by Vorbis, Opus, and
//! FLAC's `VORBIS_COMMENT` metadata block.

use crate::core::io::{BufBuilder, BufStream};
use crate::error::{ParseError, ParseResult};
use log::warn;

/// One `NAME=value` field, keyed with the uppercase field name per the
/// Vorbis comment spec's case-insensitive-but-conventionally-uppercase
/// field names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    value: String,
}

impl Field {
    pub fn new(name: &str, value: &str) -> Self {
        Field {
            name: name.to_uppercase(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A parsed Vorbis comment block: a vendor string plus an ordered list of
/// `NAME=value` fields (repeats allowed, e.g. multiple `ARTIST` fields).
pub struct VorbisComment {
    vendor: String,
    fields: Vec<Field>,
}

impl VorbisComment {
    pub fn new(vendor: &str) -> Self {
        VorbisComment {
            vendor: vendor.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_uppercase();
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_uppercase();
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn push(&mut self, name: &str, value: &str) {
        self.fields.push(Field::new(name, value));
    }

    pub fn remove(&mut self, name: &str) {
        let name = name.to_uppercase();
        self.fields.retain(|f| f.name != name);
    }

    /// Parses a Vorbis comment block body: a length-prefixed vendor string
    /// followed by a field count and that many length-prefixed fields, all
    /// little-endian. Fields that don't split cleanly on `=` or aren't valid
    /// UTF-8 are skipped with a warning rather than failing the whole block.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut stream = BufStream::new(data);

        let vendor_len = stream.read_le_u32()? as usize;
        let vendor_bytes = stream.slice(vendor_len)?;
        let vendor = String::from_utf8(vendor_bytes.to_vec())
            .map_err(|_| ParseError::InvalidFieldValue)?;

        let field_count = stream.read_le_u32()?;
        let mut fields = Vec::with_capacity(field_count.min(4096) as usize);

        for _ in 0..field_count {
            let field_len = match stream.read_le_u32() {
                Ok(len) => len as usize,
                Err(_) => break,
            };

            let field_bytes = match stream.slice(field_len) {
                Ok(bytes) => bytes,
                Err(_) => {
                    warn!("vorbis comment field claims more data than remains");
                    break;
                }
            };

            let field_str = match std::str::from_utf8(field_bytes) {
                Ok(s) => s,
                Err(_) => {
                    warn!("skipping non-UTF-8 vorbis comment field");
                    continue;
                }
            };

            match field_str.split_once('=') {
                Some((name, value)) if !name.is_empty() => fields.push(Field::new(name, value)),
                _ => warn!("skipping malformed vorbis comment field: {:?}", field_str),
            }
        }

        Ok(VorbisComment { vendor, fields })
    }

    /// Renders this comment block back to its wire form.
    pub fn render(&self) -> Vec<u8> {
        let mut out = BufBuilder::new();

        let vendor_bytes = self.vendor.as_bytes();
        out.push_le_u32(vendor_bytes.len() as u32);
        out.push_bytes(vendor_bytes);

        out.push_le_u32(self.fields.len() as u32);
        for field in &self.fields {
            let rendered = format!("{}={}", field.name, field.value);
            let bytes = rendered.as_bytes();
            out.push_le_u32(bytes.len() as u32);
            out.push_bytes(bytes);
        }

        out.into_vec()
    }
}

/// A picture carried in a `METADATA_BLOCK_PICTURE` comment field: the same
/// binary layout as a FLAC `PICTURE` metadata block, base64-encoded as the
/// field value.
pub struct Picture {
    pub picture_type: u32,
    pub mime: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

impl Picture {
    pub fn parse_base64(encoded: &str) -> ParseResult<Self> {
        let raw = base64::decode(encoded.trim()).map_err(|_| ParseError::InvalidFieldValue)?;
        Self::parse(&raw)
    }

    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut stream = BufStream::new(data);

        let picture_type = stream.read_be_u32()?;
        let mime_len = stream.read_be_u32()? as usize;
        let mime = String::from_utf8(stream.slice(mime_len)?.to_vec())
            .map_err(|_| ParseError::InvalidFieldValue)?;
        let desc_len = stream.read_be_u32()? as usize;
        let description = String::from_utf8(stream.slice(desc_len)?.to_vec())
            .map_err(|_| ParseError::InvalidFieldValue)?;
        let width = stream.read_be_u32()?;
        let height = stream.read_be_u32()?;
        let depth = stream.read_be_u32()?;
        let colors = stream.read_be_u32()?;
        let data_len = stream.read_be_u32()? as usize;
        let data = stream.slice(data_len)?.to_vec();

        Ok(Picture {
            picture_type,
            mime,
            description,
            width,
            height,
            depth,
            colors,
            data,
        })
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = BufBuilder::new();
        out.push_be_u32(self.picture_type);
        out.push_be_u32(self.mime.len() as u32);
        out.push_bytes(self.mime.as_bytes());
        out.push_be_u32(self.description.len() as u32);
        out.push_bytes(self.description.as_bytes());
        out.push_be_u32(self.width);
        out.push_be_u32(self.height);
        out.push_be_u32(self.depth);
        out.push_be_u32(self.colors);
        out.push_be_u32(self.data.len() as u32);
        out.push_bytes(&self.data);
        out.into_vec()
    }

    pub fn render_base64(&self) -> String {
        base64::encode(self.render())
    }
}

/// Maps a Vorbis comment field name to the tag-facade property it
/// represents, for the fields spec.md enumerates a dedicated mapping for.
/// Everything else round-trips verbatim through [`VorbisComment::fields`].
pub fn canonical_property(field_name: &str) -> Option<&'static str> {
    match field_name.to_uppercase().as_str() {
        "TITLE" => Some("title"),
        "ARTIST" => Some("artist"),
        "ALBUM" => Some("album"),
        "ALBUMARTIST" => Some("album_artist"),
        "COMPOSER" => Some("composer"),
        "CONDUCTOR" => Some("conductor"),
        "GENRE" => Some("genre"),
        "DATE" => Some("year"),
        "COMMENT" => Some("comment"),
        "TRACKNUMBER" => Some("track"),
        "TRACKTOTAL" => Some("total_tracks"),
        "DISCNUMBER" => Some("disc"),
        "DISCTOTAL" => Some("total_discs"),
        "BPM" => Some("bpm"),
        "GROUPING" => Some("grouping"),
        "ISRC" => Some("isrc"),
        "LABEL" | "PUBLISHER" => Some("publisher"),
        "COPYRIGHT" => Some("copyright"),
        "ENCODED-BY" => Some("encoded_by"),
        "ENCODER" => Some("encoder_settings"),
        "COMPILATION" => Some("compilation"),
        "REMIXER" => Some("remixer"),
        "LANGUAGE" => Some("language"),
        "DESCRIPTION" => Some("description"),
        "BARCODE" => Some("barcode"),
        "CATALOGNUMBER" => Some("catalog_number"),
        "LYRICS" | "UNSYNCEDLYRICS" => Some("lyrics"),
        "REPLAYGAIN_TRACK_GAIN" => Some("replaygain_track_gain"),
        "REPLAYGAIN_TRACK_PEAK" => Some("replaygain_track_peak"),
        "REPLAYGAIN_ALBUM_GAIN" => Some("replaygain_album_gain"),
        "REPLAYGAIN_ALBUM_PEAK" => Some("replaygain_album_peak"),
        "R128_TRACK_GAIN" => Some("r128_track_gain"),
        "R128_ALBUM_GAIN" => Some("r128_album_gain"),
        "MUSICBRAINZ_TRACKID" => Some("musicbrainz_track_id"),
        "MUSICBRAINZ_ALBUMID" => Some("musicbrainz_album_id"),
        "MUSICBRAINZ_ARTISTID" => Some("musicbrainz_artist_id"),
        "MUSICBRAINZ_ALBUMARTISTID" => Some("musicbrainz_album_artist_id"),
        "MUSICBRAINZ_RELEASEGROUPID" => Some("musicbrainz_release_group_id"),
        "ACOUSTID_ID" => Some("acoustid_id"),
        "ACOUSTID_FINGERPRINT" => Some("acoustid_fingerprint"),
        "PODCASTURL" => Some("podcast_url"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_fields() {
        let mut comment = VorbisComment::new("musikr 1.0");
        comment.push("ARTIST", "Example Artist");
        comment.push("artist", "Second Artist");
        comment.push("TITLE", "Song");

        let rendered = comment.render();
        let parsed = VorbisComment::parse(&rendered).unwrap();

        assert_eq!(parsed.vendor(), "musikr 1.0");
        assert_eq!(parsed.get_all("ARTIST"), vec!["Example Artist", "Second Artist"]);
        assert_eq!(parsed.get("title"), Some("Song"));
    }

    #[test]
    fn skips_malformed_field_without_failing() {
        let mut data = Vec::new();
        data.extend(&0u32.to_le_bytes()); // empty vendor
        data.extend(&2u32.to_le_bytes()); // 2 fields claimed

        let good = b"TITLE=Ok";
        data.extend(&(good.len() as u32).to_le_bytes());
        data.extend(good);

        let bad = b"NOEQUALSSIGN";
        data.extend(&(bad.len() as u32).to_le_bytes());
        data.extend(bad);

        let parsed = VorbisComment::parse(&data).unwrap();
        assert_eq!(parsed.fields().len(), 1);
        assert_eq!(parsed.get("TITLE"), Some("Ok"));
    }

    #[test]
    fn picture_base64_round_trip() {
        let picture = Picture {
            picture_type: 3,
            mime: "image/jpeg".to_string(),
            description: "cover".to_string(),
            width: 100,
            height: 100,
            depth: 24,
            colors: 0,
            data: vec![0xFF, 0xD8, 0xFF],
        };

        let encoded = picture.render_base64();
        let decoded = Picture::parse_base64(&encoded).unwrap();

        assert_eq!(decoded.mime, "image/jpeg");
        assert_eq!(decoded.data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn maps_canonical_properties() {
        assert_eq!(canonical_property("tracknumber"), Some("track"));
        assert_eq!(canonical_property("UNKNOWN_FIELD"), None);
    }
}
