//! MP4/ISO-BMFF: a nested box tree, with a dedicated path for the
//! `moov/udta/meta/ilst` iTunes metadata subtree and for the audio-property
//! atoms (`mvhd`/`mdhd`/`stsd`/`esds`/`alac`).

pub mod ilst;
pub mod properties;

use crate::core::io::BufStream;
use crate::error::{ParseError, ParseResult};
use log::warn;

/// Container box types whose payload is itself a sequence of child boxes.
/// `meta` is special-cased: its first four payload bytes are a FullBox
/// version+flags prefix before the child boxes begin.
const CONTAINER_TYPES: &[&str] = &[
    "moov", "trak", "mdia", "minf", "stbl", "udta", "meta", "ilst", "edts", "mvex", "moof",
    "traf", "mfra", "dinf",
];

/// One parsed box: its four-character type, raw payload, and (for container
/// types) the recursively parsed children.
#[derive(Clone)]
pub struct Atom {
    pub atom_type: String,
    pub data: Vec<u8>,
    pub children: Vec<Atom>,
}

impl Atom {
    pub fn is_container(&self) -> bool {
        !self.children.is_empty() || CONTAINER_TYPES.contains(&self.atom_type.as_str())
    }

    pub fn find(&self, atom_type: &str) -> Option<&Atom> {
        self.children.iter().find(|a| a.atom_type == atom_type)
    }

    pub fn find_path(&self, path: &[&str]) -> Option<&Atom> {
        let mut current = self;
        for &segment in path {
            current = current.find(segment)?;
        }
        Some(current)
    }
}

/// Parses a top-level sequence of boxes (the whole file, or any box's raw
/// child region).
pub fn parse_atoms(data: &[u8]) -> ParseResult<Vec<Atom>> {
    let mut atoms = Vec::new();
    let mut stream = BufStream::new(data);

    while !stream.is_empty() {
        if stream.remaining() < 8 {
            warn!("trailing {} bytes too small for a box header", stream.remaining());
            break;
        }

        match parse_one_atom(&mut stream) {
            Ok(atom) => atoms.push(atom),
            Err(err) => {
                warn!("stopping atom parse: {}", err);
                break;
            }
        }
    }

    Ok(atoms)
}

fn parse_one_atom(stream: &mut BufStream) -> ParseResult<Atom> {
    let size32 = stream.read_be_u32().map_err(ParseError::from)?;
    let atom_type_bytes = stream.read_array::<4>().map_err(ParseError::from)?;
    let atom_type = String::from_utf8_lossy(&atom_type_bytes).to_string();

    let header_len;
    let payload_len;

    if size32 == 1 {
        let size64 = stream.read_be_u64().map_err(ParseError::from)?;
        header_len = 16u64;
        payload_len = size64.checked_sub(header_len).ok_or(ParseError::Inconsistent)?;
    } else if size32 == 0 {
        header_len = 8;
        payload_len = stream.remaining() as u64;
    } else {
        header_len = 8;
        payload_len = u64::from(size32).checked_sub(header_len).ok_or(ParseError::Inconsistent)?;
    }

    let payload = stream.slice(payload_len as usize).map_err(ParseError::from)?;

    let children = if atom_type == "meta" {
        if payload.len() < 4 {
            Vec::new()
        } else {
            parse_atoms(&payload[4..]).unwrap_or_default()
        }
    } else if CONTAINER_TYPES.contains(&atom_type.as_str()) {
        parse_atoms(payload).unwrap_or_default()
    } else {
        Vec::new()
    };

    Ok(Atom {
        atom_type,
        data: payload.to_vec(),
        children,
    })
}

/// Renders a single box (header + payload, recursing into children for
/// container types). `meta`'s 4-byte FullBox prefix is reconstructed as
/// all-zero version+flags, matching what this crate writes.
pub fn render_atom(atom: &Atom) -> Vec<u8> {
    let body = render_atom_body(atom);
    let total_len = body.len() + 8;

    let mut out = Vec::with_capacity(total_len);

    if total_len > u32::MAX as usize {
        out.extend(&1u32.to_be_bytes());
        out.extend(atom.atom_type.as_bytes());
        out.extend(&((total_len + 8) as u64).to_be_bytes());
    } else {
        out.extend(&(total_len as u32).to_be_bytes());
        out.extend(atom.atom_type.as_bytes());
    }

    out.extend(body);
    out
}

fn render_atom_body(atom: &Atom) -> Vec<u8> {
    if atom.atom_type == "meta" {
        let mut out = vec![0u8; 4];
        for child in &atom.children {
            out.extend(render_atom(child));
        }
        out
    } else if !atom.children.is_empty() {
        let mut out = Vec::new();
        for child in &atom.children {
            out.extend(render_atom(child));
        }
        out
    } else {
        atom.data.clone()
    }
}

/// FullBox prefix: one version byte and a 24-bit BE flags field.
pub(crate) fn read_full_box_prefix(stream: &mut BufStream) -> ParseResult<(u8, u32)> {
    let version = stream.read_u8().map_err(ParseError::from)?;
    let flags = stream.read_be_u24().map_err(ParseError::from)?;
    Ok((version, flags))
}

/// Rewrites only the `moov/udta/meta/ilst` subtree of a top-level atom list,
/// leaving everything else byte-identical. `ftyp`/`mdat`/`free`/etc. are
/// passed through untouched; the caller supplies the already-rendered ilst
/// atom (see [`ilst::render`]).
pub fn splice_ilst(top_level: &[Atom], new_ilst: Atom) -> Vec<u8> {
    let mut out = Vec::new();

    for atom in top_level {
        if atom.atom_type == "moov" {
            out.extend(render_atom(&rebuild_moov(atom, new_ilst.clone())));
        } else {
            out.extend(render_atom(atom));
        }
    }

    out
}

fn rebuild_moov(moov: &Atom, new_ilst: Atom) -> Atom {
    let mut children = Vec::with_capacity(moov.children.len());
    let mut found_udta = false;

    for child in &moov.children {
        if child.atom_type == "udta" {
            found_udta = true;
            children.push(rebuild_udta(child, new_ilst.clone()));
        } else {
            children.push(child.clone());
        }
    }

    if !found_udta {
        children.push(Atom {
            atom_type: "udta".to_string(),
            data: Vec::new(),
            children: vec![fresh_meta(new_ilst)],
        });
    }

    Atom {
        atom_type: moov.atom_type.clone(),
        data: Vec::new(),
        children,
    }
}

fn rebuild_udta(udta: &Atom, new_ilst: Atom) -> Atom {
    let mut children = Vec::with_capacity(udta.children.len());
    let mut found_meta = false;

    for child in &udta.children {
        if child.atom_type == "meta" {
            found_meta = true;
            children.push(rebuild_meta(child, new_ilst.clone()));
        } else {
            children.push(child.clone());
        }
    }

    if !found_meta {
        children.push(fresh_meta(new_ilst));
    }

    Atom {
        atom_type: udta.atom_type.clone(),
        data: Vec::new(),
        children,
    }
}

fn rebuild_meta(meta: &Atom, new_ilst: Atom) -> Atom {
    let mut children: Vec<Atom> = meta
        .children
        .iter()
        .filter(|c| c.atom_type != "ilst")
        .cloned()
        .collect();

    if !children.iter().any(|c| c.atom_type == "hdlr") {
        children.insert(0, fresh_hdlr());
    }

    children.push(new_ilst);

    Atom {
        atom_type: "meta".to_string(),
        data: Vec::new(),
        children,
    }
}

fn fresh_meta(new_ilst: Atom) -> Atom {
    Atom {
        atom_type: "meta".to_string(),
        data: Vec::new(),
        children: vec![fresh_hdlr(), new_ilst],
    }
}

/// A minimal `hdlr` atom declaring the "mdir"/"appl" metadata handler, as
/// written by a freshly authored `meta` box.
fn fresh_hdlr() -> Atom {
    let mut data = vec![0u8; 4]; // FullBox version+flags
    data.extend(&[0u8; 4]); // predefined
    data.extend(b"mdir");
    data.extend(b"appl");
    data.extend(&[0u8; 8]); // rest of the 12-byte reserved field
    data.push(0); // empty component name, null-terminated

    Atom {
        atom_type: "hdlr".to_string(),
        data,
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(atom_type: &str, data: &[u8]) -> Atom {
        Atom {
            atom_type: atom_type.to_string(),
            data: data.to_vec(),
            children: Vec::new(),
        }
    }

    #[test]
    fn parses_flat_box() {
        let atom = leaf("ftyp", b"isomiso2mp41");
        let rendered = render_atom(&atom);

        let parsed = parse_atoms(&rendered).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].atom_type, "ftyp");
        assert_eq!(parsed[0].data, b"isomiso2mp41");
    }

    #[test]
    fn parses_nested_moov() {
        let mvhd = leaf("mvhd", &[0u8; 4]);
        let moov = Atom {
            atom_type: "moov".to_string(),
            data: Vec::new(),
            children: vec![mvhd],
        };

        let rendered = render_atom(&moov);
        let parsed = parse_atoms(&rendered).unwrap();

        assert_eq!(parsed[0].atom_type, "moov");
        assert_eq!(parsed[0].children[0].atom_type, "mvhd");
    }

    #[test]
    fn parses_extended_64_bit_size() {
        let mut rendered = Vec::new();
        rendered.extend(&1u32.to_be_bytes());
        rendered.extend(b"mdat");
        rendered.extend(&24u64.to_be_bytes());
        rendered.extend(&[0xAB; 16]);

        let parsed = parse_atoms(&rendered).unwrap();
        assert_eq!(parsed[0].atom_type, "mdat");
        assert_eq!(parsed[0].data, vec![0xAB; 16]);
    }

    #[test]
    fn splices_ilst_preserving_other_boxes() {
        let ftyp = leaf("ftyp", b"isom");
        let moov = Atom {
            atom_type: "moov".to_string(),
            data: Vec::new(),
            children: vec![leaf("mvhd", &[0u8; 4])],
        };
        let mdat = leaf("mdat", b"AUDIODATA");

        let new_ilst = Atom {
            atom_type: "ilst".to_string(),
            data: Vec::new(),
            children: Vec::new(),
        };

        let out = splice_ilst(&[ftyp.clone(), moov, mdat.clone()], new_ilst);
        let parsed = parse_atoms(&out).unwrap();

        assert_eq!(parsed[0].atom_type, "ftyp");
        assert_eq!(parsed[0].data, b"isom");
        assert_eq!(parsed[2].atom_type, "mdat");
        assert_eq!(parsed[2].data, b"AUDIODATA");

        let meta = parsed[1].find_path(&["udta", "meta"]).unwrap();
        assert!(meta.find("hdlr").is_some());
        assert!(meta.find("ilst").is_some());
    }
}
