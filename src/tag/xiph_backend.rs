//! Maps the façade's properties onto Xiph Vorbis comment fields, and
//! `METADATA_BLOCK_PICTURE` for pictures.

use super::{plain_key, BackendKind, PairProperty, PictureKind, Property, TagBackend, TagPicture};
use crate::xiph::{Picture, VorbisComment};

const PICTURE_FIELD: &str = "METADATA_BLOCK_PICTURE";

fn pair_keys(property: PairProperty) -> (&'static str, &'static str) {
    match property {
        PairProperty::Track => ("TRACKNUMBER", "TRACKTOTAL"),
        PairProperty::Disc => ("DISCNUMBER", "DISCTOTAL"),
        PairProperty::Movement => ("MOVEMENTNUMBER", "MOVEMENTTOTAL"),
    }
}

fn picture_kind_from(picture_type: u32) -> PictureKind {
    match picture_type {
        3 => PictureKind::CoverFront,
        4 => PictureKind::CoverBack,
        _ => PictureKind::Other,
    }
}

fn picture_type_from(kind: PictureKind) -> u32 {
    match kind {
        PictureKind::CoverFront => 3,
        PictureKind::CoverBack => 4,
        PictureKind::Other => 0,
    }
}

/// Adapts [`crate::xiph::VorbisComment`] to the façade's [`TagBackend`]
/// trait.
pub struct XiphBackend {
    comment: VorbisComment,
}

impl XiphBackend {
    pub fn new(comment: VorbisComment) -> Self {
        XiphBackend { comment }
    }

    pub fn comment(&self) -> &VorbisComment {
        &self.comment
    }

    pub fn into_comment(self) -> VorbisComment {
        self.comment
    }
}

impl TagBackend for XiphBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Xiph
    }

    fn get(&self, property: Property) -> Vec<String> {
        match plain_key(property) {
            Some(key) => self
                .comment
                .get_all(key)
                .into_iter()
                .map(|v| v.to_string())
                .collect(),
            None => Vec::new(),
        }
    }

    fn set(&mut self, property: Property, values: &[String]) {
        let key = match plain_key(property) {
            Some(key) => key,
            None => return,
        };

        self.comment.remove(key);
        for value in values {
            self.comment.push(key, value);
        }
    }

    fn clear(&mut self, property: Property) {
        if let Some(key) = plain_key(property) {
            self.comment.remove(key);
        }
    }

    fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)> {
        let (number_key, total_key) = pair_keys(property);
        let number = self.comment.get(number_key)?.parse().ok()?;
        let total = self.comment.get(total_key).and_then(|v| v.parse().ok());
        Some((number, total))
    }

    fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>) {
        let (number_key, total_key) = pair_keys(property);

        self.comment.remove(number_key);
        self.comment.push(number_key, &number.to_string());

        self.comment.remove(total_key);
        if let Some(total) = total {
            self.comment.push(total_key, &total.to_string());
        }
    }

    fn pictures(&self) -> Vec<TagPicture> {
        self.comment
            .get_all(PICTURE_FIELD)
            .into_iter()
            .filter_map(|encoded| Picture::parse_base64(encoded).ok())
            .map(|picture| TagPicture {
                kind: picture_kind_from(picture.picture_type),
                mime: picture.mime,
                description: picture.description,
                data: picture.data,
            })
            .collect()
    }

    fn set_pictures(&mut self, pictures: Vec<TagPicture>) {
        self.comment.remove(PICTURE_FIELD);

        for picture in pictures {
            let rendered = Picture {
                picture_type: picture_type_from(picture.kind),
                mime: picture.mime,
                description: picture.description,
                width: 0,
                height: 0,
                depth: 0,
                colors: 0,
                data: picture.data,
            };
            self.comment.push(PICTURE_FIELD, &rendered.render_base64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_title() {
        let mut backend = XiphBackend::new(VorbisComment::new("musikr"));
        backend.set(Property::Title, &["Song".to_string()]);

        assert_eq!(backend.get(Property::Title), vec!["Song".to_string()]);
    }

    #[test]
    fn multi_value_artist_round_trips() {
        let mut backend = XiphBackend::new(VorbisComment::new("musikr"));
        backend.set(
            Property::Artist,
            &["First".to_string(), "Second".to_string()],
        );

        assert_eq!(
            backend.get(Property::Artist),
            vec!["First".to_string(), "Second".to_string()]
        );
    }

    #[test]
    fn track_pair_round_trips() {
        let mut backend = XiphBackend::new(VorbisComment::new("musikr"));
        backend.set_pair(PairProperty::Track, 3, Some(12));

        assert_eq!(backend.get_pair(PairProperty::Track), Some((3, Some(12))));
    }

    #[test]
    fn pictures_round_trip() {
        let mut backend = XiphBackend::new(VorbisComment::new("musikr"));
        backend.set_pictures(vec![TagPicture {
            kind: PictureKind::CoverFront,
            mime: "image/jpeg".to_string(),
            description: "cover".to_string(),
            data: vec![0xFF, 0xD8],
        }]);

        let pictures = backend.pictures();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].kind, PictureKind::CoverFront);
        assert_eq!(pictures[0].data, vec![0xFF, 0xD8]);
    }
}
