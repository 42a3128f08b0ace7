//! The `ilst` iTunes metadata list: a flat map from atom-id (or
//! `"----:mean:name"` for freeform atoms) to an ordered list of typed
//! "data" values.

use super::{read_full_box_prefix, Atom};
use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};
use indexmap::IndexMap;
use log::warn;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataType {
    Binary,
    Utf8,
    Utf16,
    Jpeg,
    Png,
    BeInteger,
}

impl DataType {
    fn from_indicator(indicator: u32) -> Self {
        match indicator {
            1 => DataType::Utf8,
            2 => DataType::Utf16,
            13 => DataType::Jpeg,
            14 => DataType::Png,
            21 => DataType::BeInteger,
            _ => DataType::Binary,
        }
    }

    fn indicator(self) -> u32 {
        match self {
            DataType::Binary => 0,
            DataType::Utf8 => 1,
            DataType::Utf16 => 2,
            DataType::Jpeg => 13,
            DataType::Png => 14,
            DataType::BeInteger => 21,
        }
    }
}

/// One `data` sub-atom's decoded payload.
#[derive(Clone, Debug)]
pub struct DataValue {
    pub data_type: DataType,
    pub bytes: Vec<u8>,
}

impl DataValue {
    pub fn text(text: &str) -> Self {
        DataValue {
            data_type: DataType::Utf8,
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn integer(value: i64, byte_width: usize) -> Self {
        let full = value.to_be_bytes();
        DataValue {
            data_type: DataType::BeInteger,
            bytes: full[8 - byte_width..].to_vec(),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self.data_type {
            DataType::Utf8 => String::from_utf8(self.bytes.clone()).ok(),
            DataType::Utf16 => {
                let units: Vec<u16> = self
                    .bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            }
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if self.data_type != DataType::BeInteger {
            return None;
        }

        let mut buf = [0u8; 8];
        let len = self.bytes.len().min(8);
        buf[8 - len..].copy_from_slice(&self.bytes[self.bytes.len() - len..]);
        Some(i64::from_be_bytes(buf))
    }
}

fn parse_data_atom(atom: &Atom) -> ParseResult<DataValue> {
    let mut stream = BufStream::new(&atom.data);
    let (_version, type_indicator) = read_full_box_prefix(&mut stream)?;
    stream.skip(4).map_err(ParseError::from)?; // locale, unused
    let bytes = stream.take_rest().to_vec();

    Ok(DataValue {
        data_type: DataType::from_indicator(type_indicator),
        bytes,
    })
}

fn render_data_atom(value: &DataValue) -> Atom {
    let mut data = Vec::with_capacity(value.bytes.len() + 8);
    data.push(0); // version
    let indicator = value.data_type.indicator();
    data.extend(&indicator.to_be_bytes()[1..]);
    data.extend(&[0u8; 4]); // locale
    data.extend(&value.bytes);

    Atom {
        atom_type: "data".to_string(),
        data,
        children: Vec::new(),
    }
}

/// A freeform (`----`) atom's namespace and key, parsed out of its nested
/// `mean`/`name` FullBox children.
fn parse_freeform_key(atom: &Atom) -> Option<String> {
    let mean = atom.find("mean")?;
    let name = atom.find("name")?;

    let mean_str = fullbox_text(mean)?;
    let name_str = fullbox_text(name)?;

    Some(format!("----:{}:{}", mean_str, name_str))
}

fn fullbox_text(atom: &Atom) -> Option<String> {
    if atom.data.len() < 4 {
        return None;
    }
    String::from_utf8(atom.data[4..].to_vec()).ok()
}

fn render_freeform_key_children(key: &str) -> (String, Atom, Atom) {
    let mut parts = key.splitn(3, ':');
    parts.next(); // "----"
    let mean = parts.next().unwrap_or("com.apple.iTunes");
    let name = parts.next().unwrap_or("");

    let mut mean_data = vec![0u8; 4];
    mean_data.extend(mean.as_bytes());
    let mean_atom = Atom {
        atom_type: "mean".to_string(),
        data: mean_data,
        children: Vec::new(),
    };

    let mut name_data = vec![0u8; 4];
    name_data.extend(name.as_bytes());
    let name_atom = Atom {
        atom_type: "name".to_string(),
        data: name_data,
        children: Vec::new(),
    };

    ("----".to_string(), mean_atom, name_atom)
}

/// The parsed `ilst` subtree: an insertion-ordered map from atom id (or
/// `----:mean:name`) to its list of data values.
#[derive(Default)]
pub struct Ilst {
    entries: IndexMap<String, Vec<DataValue>>,
}

impl Ilst {
    pub fn new() -> Self {
        Ilst {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[DataValue]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: &str, values: Vec<DataValue>) {
        self.entries.insert(key.to_string(), values);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<DataValue>> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn parse(ilst_atom: &Atom) -> Self {
        let mut entries = IndexMap::new();

        for child in &ilst_atom.children {
            let key = if child.atom_type == "----" {
                match parse_freeform_key(child) {
                    Some(key) => key,
                    None => {
                        warn!("skipping freeform atom with missing mean/name");
                        continue;
                    }
                }
            } else {
                child.atom_type.clone()
            };

            let values: Vec<DataValue> = child
                .children
                .iter()
                .filter(|c| c.atom_type == "data")
                .filter_map(|c| match parse_data_atom(c) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!("skipping malformed data atom under {}: {}", key, err);
                        None
                    }
                })
                .collect();

            if !values.is_empty() {
                entries.insert(key, values);
            }
        }

        Ilst { entries }
    }

    pub fn render(&self) -> Atom {
        let mut children = Vec::with_capacity(self.entries.len());

        for (key, values) in &self.entries {
            let data_children: Vec<Atom> = values.iter().map(render_data_atom).collect();

            let entry = if let Some(rest) = key.strip_prefix("----:") {
                let (atom_type, mean_atom, name_atom) = render_freeform_key_children(&format!("----:{}", rest));
                let mut entry_children = vec![mean_atom, name_atom];
                entry_children.extend(data_children);

                Atom {
                    atom_type,
                    data: Vec::new(),
                    children: entry_children,
                }
            } else {
                Atom {
                    atom_type: key.clone(),
                    data: Vec::new(),
                    children: data_children,
                }
            };

            children.push(entry);
        }

        Atom {
            atom_type: "ilst".to_string(),
            data: Vec::new(),
            children,
        }
    }
}

/// `trkn`/`disk` binary layout: `[0 0][u16 BE number][u16 BE total][0 0]`.
pub fn parse_track_disc_pair(bytes: &[u8]) -> Option<(u16, u16)> {
    if bytes.len() < 6 {
        return None;
    }
    let number = u16::from_be_bytes([bytes[2], bytes[3]]);
    let total = u16::from_be_bytes([bytes[4], bytes[5]]);
    Some((number, total))
}

pub fn render_track_disc_pair(number: u16, total: u16) -> Vec<u8> {
    let mut out = vec![0u8, 0u8];
    out.extend(&number.to_be_bytes());
    out.extend(&total.to_be_bytes());
    out.extend(&[0u8, 0u8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_atom() {
        let mut ilst = Ilst::new();
        ilst.insert("\u{a9}nam", vec![DataValue::text("Song")]);

        let atom = ilst.render();
        let parsed = Ilst::parse(&atom);

        assert_eq!(parsed.get("\u{a9}nam").unwrap()[0].as_text().unwrap(), "Song");
    }

    #[test]
    fn round_trips_freeform_atom() {
        let mut ilst = Ilst::new();
        ilst.insert(
            "----:com.apple.iTunes:MusicBrainz Track Id",
            vec![DataValue::text("abc-123")],
        );

        let atom = ilst.render();
        let parsed = Ilst::parse(&atom);

        let values = parsed
            .get("----:com.apple.iTunes:MusicBrainz Track Id")
            .unwrap();
        assert_eq!(values[0].as_text().unwrap(), "abc-123");
    }

    #[test]
    fn empty_nam_atom_yields_absent() {
        let atom = Atom {
            atom_type: "\u{a9}nam".to_string(),
            data: Vec::new(),
            children: Vec::new(),
        };

        let ilst_atom = Atom {
            atom_type: "ilst".to_string(),
            data: Vec::new(),
            children: vec![atom],
        };

        let parsed = Ilst::parse(&ilst_atom);
        assert!(parsed.get("\u{a9}nam").is_none());
    }

    #[test]
    fn track_disc_pair_round_trip() {
        let bytes = render_track_disc_pair(3, 12);
        assert_eq!(parse_track_disc_pair(&bytes), Some((3, 12)));
    }
}
