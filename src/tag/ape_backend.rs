//! Maps the façade's properties onto APEv2 items, sharing key names with
//! the Xiph backend (both ecosystems converged on the same plain
//! `NAME=value` conventions in practice).

use super::{plain_key, BackendKind, PairProperty, PictureKind, Property, TagBackend, TagPicture};
use crate::ape::{parse_cover_art, ApePictureKind, Item, ItemValue, Tag as ApeTag};

fn pair_key(property: PairProperty) -> (&'static str, Option<&'static str>) {
    match property {
        PairProperty::Track => ("TRACK", Some("TRACKTOTAL")),
        PairProperty::Disc => ("DISC", Some("DISCTOTAL")),
        PairProperty::Movement => ("MOVEMENT", Some("MOVEMENTTOTAL")),
    }
}

fn cover_art_key(kind: PictureKind) -> &'static str {
    match kind {
        PictureKind::CoverFront => "Cover Art (Front Cover)",
        PictureKind::CoverBack => "Cover Art (Back Cover)",
        PictureKind::Other => "Cover Art (Other)",
    }
}

fn ape_picture_kind_to_tag(kind: ApePictureKind) -> PictureKind {
    match kind {
        ApePictureKind::FrontCover => PictureKind::CoverFront,
        ApePictureKind::BackCover => PictureKind::CoverBack,
        _ => PictureKind::Other,
    }
}

fn mime_from_filename(filename: &str) -> String {
    let lower = filename.to_lowercase();
    if lower.ends_with(".png") {
        "image/png".to_string()
    } else if lower.ends_with(".gif") {
        "image/gif".to_string()
    } else {
        "image/jpeg".to_string()
    }
}

/// Adapts [`crate::ape::Tag`] to the façade's [`TagBackend`] trait.
pub struct ApeBackend {
    tag: ApeTag,
}

impl ApeBackend {
    pub fn new(tag: ApeTag) -> Self {
        ApeBackend { tag }
    }

    pub fn tag(&self) -> &ApeTag {
        &self.tag
    }

    pub fn into_tag(self) -> ApeTag {
        self.tag
    }
}

impl TagBackend for ApeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ape
    }

    fn get(&self, property: Property) -> Vec<String> {
        let key = match plain_key(property) {
            Some(key) => key,
            None => return Vec::new(),
        };

        match self.tag.get(key).map(Item::value) {
            Some(ItemValue::Text(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    fn set(&mut self, property: Property, values: &[String]) {
        let key = match plain_key(property) {
            Some(key) => key,
            None => return,
        };

        if let Ok(item) = Item::new(key, ItemValue::Text(values.to_vec())) {
            self.tag.insert(item);
        }
    }

    fn clear(&mut self, property: Property) {
        if let Some(key) = plain_key(property) {
            self.tag.remove(key);
        }
    }

    fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)> {
        let (number_key, total_key) = pair_key(property);

        let number = match self.tag.get(number_key)?.value() {
            ItemValue::Text(values) => values.first()?.parse().ok()?,
            _ => return None,
        };

        let total = total_key.and_then(|key| {
            self.tag.get(key).and_then(|item| match item.value() {
                ItemValue::Text(values) => values.first()?.parse().ok(),
                _ => None,
            })
        });

        Some((number, total))
    }

    fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>) {
        let (number_key, total_key) = pair_key(property);

        if let Ok(item) = Item::new(number_key, ItemValue::Text(vec![number.to_string()])) {
            self.tag.insert(item);
        }

        if let Some(total_key) = total_key {
            match total {
                Some(total) => {
                    if let Ok(item) = Item::new(total_key, ItemValue::Text(vec![total.to_string()])) {
                        self.tag.insert(item);
                    }
                }
                None => {
                    self.tag.remove(total_key);
                }
            }
        }
    }

    fn pictures(&self) -> Vec<TagPicture> {
        self.tag
            .items()
            .filter(|item| item.key().starts_with("Cover Art ("))
            .filter_map(|item| match item.value() {
                ItemValue::Binary(data) => Some((item.key(), data)),
                _ => None,
            })
            .map(|(key, data)| {
                let picture = parse_cover_art(key, data);
                TagPicture {
                    kind: ape_picture_kind_to_tag(picture.kind),
                    mime: mime_from_filename(&picture.filename),
                    description: picture.filename,
                    data: picture.data,
                }
            })
            .collect()
    }

    fn set_pictures(&mut self, pictures: Vec<TagPicture>) {
        for key in [
            "Cover Art (Front Cover)",
            "Cover Art (Back Cover)",
            "Cover Art (Other)",
        ] {
            self.tag.remove(key);
        }

        for picture in pictures {
            let mut value = picture.description.into_bytes();
            value.push(0);
            value.extend(picture.data);

            if let Ok(item) = Item::new(cover_art_key(picture.kind), ItemValue::Binary(value)) {
                self.tag.insert(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_ape_tag() -> ApeTag {
        ApeTag::parse(&build_empty_tag()).unwrap()
    }

    fn build_empty_tag() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(b"APETAGEX");
        out.extend(&2000u32.to_le_bytes());
        out.extend(&32u32.to_le_bytes());
        out.extend(&0u32.to_le_bytes());
        out.extend(&(1u32 << 30).to_le_bytes());
        out.extend(&[0u8; 8]);
        out
    }

    #[test]
    fn round_trips_title() {
        let mut backend = ApeBackend::new(empty_ape_tag());
        backend.set(Property::Title, &["Song".to_string()]);

        assert_eq!(backend.get(Property::Title), vec!["Song".to_string()]);
    }

    #[test]
    fn track_pair_round_trips() {
        let mut backend = ApeBackend::new(empty_ape_tag());
        backend.set_pair(PairProperty::Track, 3, Some(12));

        assert_eq!(backend.get_pair(PairProperty::Track), Some((3, Some(12))));
    }

    #[test]
    fn pictures_round_trip() {
        let mut backend = ApeBackend::new(empty_ape_tag());
        backend.set_pictures(vec![TagPicture {
            kind: PictureKind::CoverFront,
            mime: "image/jpeg".to_string(),
            description: "cover.jpg".to_string(),
            data: vec![0xFF, 0xD8],
        }]);

        let pictures = backend.pictures();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].kind, PictureKind::CoverFront);
        assert_eq!(pictures[0].data, vec![0xFF, 0xD8]);
    }
}
