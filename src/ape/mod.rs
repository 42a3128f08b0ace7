//! APEv2 tags: a 32-byte header/footer framing an ordered list of
//! key/value items.

use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};
use indexmap::IndexMap;
use log::warn;
use std::fmt::{self, Display, Formatter};

const MAGIC: &[u8] = b"APETAGEX";
const RESERVED_KEYS: &[&str] = &["ID3", "TAG", "OGGS", "MP+"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApeVersion {
    V1000,
    V2000,
}

#[derive(Clone, Debug)]
pub enum ItemValue {
    Text(Vec<String>),
    Binary(Vec<u8>),
    Locator(Vec<String>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemType {
    Text,
    Binary,
    Locator,
}

#[derive(Clone, Debug)]
pub struct Item {
    key: String,
    read_only: bool,
    value: ItemValue,
}

impl Item {
    pub fn new(key: &str, value: ItemValue) -> ParseResult<Self> {
        validate_key(key)?;

        Ok(Item {
            key: key.to_string(),
            read_only: false,
            value,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn value(&self) -> &ItemValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut ItemValue {
        &mut self.value
    }

    pub fn item_type(&self) -> ItemType {
        match self.value {
            ItemValue::Text(_) => ItemType::Text,
            ItemValue::Binary(_) => ItemType::Binary,
            ItemValue::Locator(_) => ItemType::Locator,
        }
    }

    fn parse(stream: &mut BufStream) -> ParseResult<Self> {
        let value_size = stream.read_le_u32()? as usize;
        let flags = stream.read_le_u32()?;

        let key_bytes = stream.search(&[0]);
        let key_bytes = key_bytes
            .strip_suffix(&[0])
            .ok_or(ParseError::InsufficientData)?;
        let key = std::str::from_utf8(key_bytes).map_err(|_| ParseError::InvalidFieldValue)?;
        validate_key(key)?;

        let raw_value = stream.slice(value_size)?;
        let read_only = flags & 0x1 != 0;

        let value = match (flags >> 1) & 0x3 {
            0 => ItemValue::Text(
                String::from_utf8_lossy(raw_value)
                    .split('\0')
                    .map(|s| s.to_string())
                    .collect(),
            ),
            1 => ItemValue::Binary(raw_value.to_vec()),
            2 => ItemValue::Locator(
                String::from_utf8_lossy(raw_value)
                    .split('\0')
                    .map(|s| s.to_string())
                    .collect(),
            ),
            _ => return Err(ParseError::InvalidFieldValue),
        };

        Ok(Item {
            key: key.to_string(),
            read_only,
            value,
        })
    }

    fn render(&self) -> Vec<u8> {
        let mut value = Vec::new();
        let type_bits: u32;

        match &self.value {
            ItemValue::Text(values) => {
                type_bits = 0;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        value.push(0);
                    }
                    value.extend(v.as_bytes());
                }
            }
            ItemValue::Binary(bytes) => {
                type_bits = 1;
                value.extend(bytes);
            }
            ItemValue::Locator(values) => {
                type_bits = 2;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        value.push(0);
                    }
                    value.extend(v.as_bytes());
                }
            }
        }

        let mut flags = type_bits << 1;
        if self.read_only {
            flags |= 0x1;
        }

        let mut out = Vec::with_capacity(value.len() + self.key.len() + 9);
        out.extend(&(value.len() as u32).to_le_bytes());
        out.extend(&flags.to_le_bytes());
        out.extend(self.key.as_bytes());
        out.push(0);
        out.extend(&value);
        out
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.value {
            ItemValue::Text(values) => write!(f, "{}", values.join("; ")),
            ItemValue::Locator(values) => write!(f, "{}", values.join("; ")),
            ItemValue::Binary(data) => write!(f, "<{} bytes>", data.len()),
        }
    }
}

fn validate_key(key: &str) -> ParseResult<()> {
    if !(2..=255).contains(&key.len()) {
        return Err(ParseError::InvalidFieldValue);
    }

    if !key.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(ParseError::InvalidFieldValue);
    }

    if RESERVED_KEYS.contains(&key.to_uppercase().as_str()) {
        return Err(ParseError::InvalidFieldValue);
    }

    Ok(())
}

/// A parsed APEv2 tag.
pub struct Tag {
    version: ApeVersion,
    items: IndexMap<String, Item>,
}

impl Tag {
    /// Locates and parses an APEv2 tag trailing `data` (scans the final 32
    /// bytes for the footer magic).
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.len() < 32 {
            return Err(ParseError::InsufficientData);
        }

        let footer = &data[data.len() - 32..];

        if &footer[0..8] != MAGIC {
            return Err(ParseError::BadMagic);
        }

        let mut stream = BufStream::new(&footer[8..]);
        let version = parse_version(stream.read_le_u32()?)?;
        let tag_size = stream.read_le_u32()? as usize;
        let item_count = stream.read_le_u32()?;
        let flags = stream.read_le_u32()?;

        if flags & (1 << 29) != 0 {
            // This is a header, not a footer; callers should locate the
            // footer instead. Treated as a structural mismatch.
            return Err(ParseError::Inconsistent);
        }

        if tag_size < 32 || tag_size > data.len() {
            return Err(ParseError::InsufficientData);
        }

        let items_start = data.len() - tag_size;
        let items_data = &data[items_start..data.len() - 32];

        let mut items = IndexMap::new();
        let mut item_stream = BufStream::new(items_data);

        for _ in 0..item_count {
            if item_stream.is_empty() {
                warn!("APE tag claims {} items but ran out of data", item_count);
                break;
            }

            match Item::parse(&mut item_stream) {
                Ok(item) => {
                    items.insert(item.key.to_uppercase(), item);
                }
                Err(err) => {
                    warn!("skipping malformed APE item: {}", err);
                    break;
                }
            }
        }

        Ok(Tag { version, items })
    }

    pub fn version(&self) -> ApeVersion {
        self.version
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(&key.to_uppercase())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        self.items.get_mut(&key.to_uppercase())
    }

    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.key.to_uppercase(), item);
    }

    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.items.shift_remove(&key.to_uppercase())
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Renders this tag, sorting items by rendered length ascending per the
    /// APEv2 spec's recommendation. `with_header` prepends the optional
    /// 32-byte header.
    pub fn render(&self, with_header: bool) -> Vec<u8> {
        let mut rendered_items: Vec<Vec<u8>> = self.items.values().map(Item::render).collect();
        rendered_items.sort_by_key(|item| item.len());

        let items_len: usize = rendered_items.iter().map(Vec::len).sum();
        let tag_size = items_len + 32;

        let mut out = Vec::new();

        if with_header {
            out.extend(render_frame(
                tag_size as u32,
                self.items.len() as u32,
                true,
                with_header,
            ));
        }

        for item in rendered_items {
            out.extend(item);
        }

        out.extend(render_frame(
            tag_size as u32,
            self.items.len() as u32,
            false,
            with_header,
        ));

        out
    }
}

fn render_frame(tag_size: u32, item_count: u32, is_header: bool, has_header: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend(MAGIC);
    out.extend(&2000u32.to_le_bytes());
    out.extend(&tag_size.to_le_bytes());
    out.extend(&item_count.to_le_bytes());

    let mut flags = 0u32;
    if has_header {
        flags |= 1 << 31; // tag has a header
    }
    flags |= 1 << 30; // this footer/header belongs to a tag that has a footer
    if is_header {
        flags |= 1 << 29;
    }
    out.extend(&flags.to_le_bytes());
    out.extend(&[0u8; 8]);
    out
}

fn parse_version(raw: u32) -> ParseResult<ApeVersion> {
    match raw {
        1000 => Ok(ApeVersion::V1000),
        2000 => Ok(ApeVersion::V2000),
        _ => Err(ParseError::UnsupportedVersion),
    }
}

/// Picture kind derived from an APE `Cover Art (<Kind>)` item key.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApePictureKind {
    FrontCover,
    BackCover,
    Media,
    Artist,
    Other,
}

pub struct ApePicture {
    pub kind: ApePictureKind,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Parses an APE cover-art item's binary value (`filename\0data`). A missing
/// terminator is tolerated; the whole value is treated as image data.
pub fn parse_cover_art(key: &str, data: &[u8]) -> ApePicture {
    let kind = match key
        .trim_start_matches("Cover Art (")
        .trim_end_matches(')')
        .to_lowercase()
        .as_str()
    {
        "front cover" | "front" => ApePictureKind::FrontCover,
        "back cover" | "back" => ApePictureKind::BackCover,
        "media" => ApePictureKind::Media,
        "artist" => ApePictureKind::Artist,
        _ => ApePictureKind::Other,
    };

    match data.iter().position(|&b| b == 0) {
        Some(nul) => ApePicture {
            kind,
            filename: String::from_utf8_lossy(&data[..nul]).to_string(),
            data: data[nul + 1..].to_vec(),
        },
        None => ApePicture {
            kind,
            filename: String::new(),
            data: data.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_tag(items: &[(&str, ItemValue)]) -> Vec<u8> {
        let mut tag = Tag {
            version: ApeVersion::V2000,
            items: IndexMap::new(),
        };

        for (key, value) in items {
            tag.insert(Item::new(key, value.clone()).unwrap());
        }

        tag.render(false)
    }

    #[test]
    fn parse_single_text_item() {
        let data = build_tag(&[("Artist", ItemValue::Text(vec!["Unknown".to_string()]))]);
        let tag = Tag::parse(&data).unwrap();

        assert_eq!(tag.len(), 1);
        match tag.get("ARTIST").unwrap().value() {
            ItemValue::Text(values) => assert_eq!(values, &["Unknown".to_string()]),
            _ => panic!("wrong item type"),
        }
    }

    #[test]
    fn rejects_reserved_key() {
        assert!(Item::new("TAG", ItemValue::Text(vec!["x".to_string()])).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let data = vec![0u8; 32];
        assert_eq!(Tag::parse(&data), Err(ParseError::BadMagic));
    }

    #[test]
    fn parses_cover_art_key() {
        let mut data = b"cover.jpg\0".to_vec();
        data.extend(&[0xFF, 0xD8]);

        let picture = parse_cover_art("Cover Art (Front Cover)", &data);
        assert_eq!(picture.kind, ApePictureKind::FrontCover);
        assert_eq!(picture.filename, "cover.jpg");
        assert_eq!(picture.data, vec![0xFF, 0xD8]);
    }

    #[test]
    fn items_render_sorted_by_length() {
        let data = build_tag(&[
            ("LongKeyName", ItemValue::Text(vec!["value".to_string()])),
            ("Id", ItemValue::Text(vec!["v".to_string()])),
        ]);

        let tag = Tag::parse(&data).unwrap();
        assert_eq!(tag.len(), 2);

        // `render` sorts items ascending by rendered length, and `parse`
        // inserts items in the order it reads them from the stream, so the
        // shorter item (key "Id") must come first.
        let keys: Vec<&str> = tag.items().map(Item::key).collect();
        assert_eq!(keys, vec!["Id", "LongKeyName"]);
    }
}
