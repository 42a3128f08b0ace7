//! Maps the façade's properties onto MP4 `ilst` atoms: the standard
//! iTunes 4CC atoms where one exists, `----:com.apple.iTunes:<NAME>`
//! freeform atoms otherwise, `trkn`/`disk` for the numbered pairs, and
//! `covr` for pictures.

use super::{plain_key, BackendKind, PairProperty, PictureKind, Property, TagBackend, TagPicture};
use crate::mp4::ilst::{parse_track_disc_pair, render_track_disc_pair, DataType, DataValue, Ilst};

fn standard_text_atom(property: Property) -> Option<&'static str> {
    use Property::*;

    Some(match property {
        Title => "\u{a9}nam",
        Artist => "\u{a9}ART",
        Album => "\u{a9}alb",
        AlbumArtist => "aART",
        Composer => "\u{a9}wrt",
        Genre => "\u{a9}gen",
        Year => "\u{a9}day",
        Comment => "\u{a9}cmt",
        Grouping => "\u{a9}grp",
        Copyright => "cprt",
        EncoderSettings => "\u{a9}too",
        Lyrics => "\u{a9}lyr",
        _ => return None,
    })
}

fn freeform_key(property: Property) -> Option<String> {
    plain_key(property).map(|name| format!("----:com.apple.iTunes:{}", name))
}

fn pair_atom(property: PairProperty) -> Option<&'static str> {
    match property {
        PairProperty::Track => Some("trkn"),
        PairProperty::Disc => Some("disk"),
        PairProperty::Movement => None,
    }
}

/// Adapts [`crate::mp4::ilst::Ilst`] to the façade's [`TagBackend`] trait.
pub struct Mp4Backend {
    ilst: Ilst,
}

impl Mp4Backend {
    pub fn new(ilst: Ilst) -> Self {
        Mp4Backend { ilst }
    }

    pub fn ilst(&self) -> &Ilst {
        &self.ilst
    }

    pub fn into_ilst(self) -> Ilst {
        self.ilst
    }

    fn text_values(&self, key: &str) -> Vec<String> {
        self.ilst
            .get(key)
            .map(|values| values.iter().filter_map(DataValue::as_text).collect())
            .unwrap_or_default()
    }

    fn set_text_values(&mut self, key: &str, values: &[String]) {
        self.ilst
            .insert(key, values.iter().map(|v| DataValue::text(v)).collect());
    }
}

impl TagBackend for Mp4Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mp4Ilst
    }

    fn get(&self, property: Property) -> Vec<String> {
        if property == Property::Bpm {
            return self
                .ilst
                .get("tmpo")
                .and_then(|v| v.first())
                .and_then(DataValue::as_integer)
                .map(|n| vec![n.to_string()])
                .unwrap_or_default();
        }

        if property == Property::Compilation {
            return self
                .ilst
                .get("cpil")
                .and_then(|v| v.first())
                .and_then(DataValue::as_integer)
                .map(|n| vec![if n != 0 { "1".to_string() } else { "0".to_string() }])
                .unwrap_or_default();
        }

        if let Some(atom) = standard_text_atom(property) {
            return self.text_values(atom);
        }

        if let Some(key) = freeform_key(property) {
            return self.text_values(&key);
        }

        Vec::new()
    }

    fn set(&mut self, property: Property, values: &[String]) {
        if property == Property::Bpm {
            if let Some(value) = values.first().and_then(|v| v.parse::<i64>().ok()) {
                self.ilst.insert("tmpo", vec![DataValue::integer(value, 2)]);
            }
            return;
        }

        if property == Property::Compilation {
            let on = values.first().map(|v| v == "1").unwrap_or(false);
            self.ilst
                .insert("cpil", vec![DataValue::integer(on as i64, 1)]);
            return;
        }

        if let Some(atom) = standard_text_atom(property) {
            self.set_text_values(atom, values);
            return;
        }

        if let Some(key) = freeform_key(property) {
            self.set_text_values(&key, values);
        }
    }

    fn clear(&mut self, property: Property) {
        if property == Property::Bpm {
            self.ilst.remove("tmpo");
            return;
        }
        if property == Property::Compilation {
            self.ilst.remove("cpil");
            return;
        }
        if let Some(atom) = standard_text_atom(property) {
            self.ilst.remove(atom);
            return;
        }
        if let Some(key) = freeform_key(property) {
            self.ilst.remove(&key);
        }
    }

    fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)> {
        let atom = pair_atom(property)?;
        let bytes = &self.ilst.get(atom)?.first()?.bytes;
        let (number, total) = parse_track_disc_pair(bytes)?;
        Some((
            u32::from(number),
            if total == 0 { None } else { Some(u32::from(total)) },
        ))
    }

    fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>) {
        let atom = match pair_atom(property) {
            Some(atom) => atom,
            None => return,
        };

        let bytes = render_track_disc_pair(number as u16, total.unwrap_or(0) as u16);
        self.ilst.insert(
            atom,
            vec![DataValue {
                data_type: DataType::Binary,
                bytes,
            }],
        );
    }

    fn pictures(&self) -> Vec<TagPicture> {
        self.ilst
            .get("covr")
            .map(|values| {
                values
                    .iter()
                    .map(|value| TagPicture {
                        kind: PictureKind::CoverFront,
                        mime: match value.data_type {
                            DataType::Png => "image/png".to_string(),
                            _ => "image/jpeg".to_string(),
                        },
                        description: String::new(),
                        data: value.bytes.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_pictures(&mut self, pictures: Vec<TagPicture>) {
        let values = pictures
            .into_iter()
            .map(|picture| DataValue {
                data_type: if picture.mime == "image/png" {
                    DataType::Png
                } else {
                    DataType::Jpeg
                },
                bytes: picture.data,
            })
            .collect();

        self.ilst.insert("covr", values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_title() {
        let mut backend = Mp4Backend::new(Ilst::new());
        backend.set(Property::Title, &["Song".to_string()]);

        assert_eq!(backend.get(Property::Title), vec!["Song".to_string()]);
    }

    #[test]
    fn round_trips_musicbrainz_id_through_freeform() {
        let mut backend = Mp4Backend::new(Ilst::new());
        backend.set(Property::MusicBrainzTrackId, &["abc-123".to_string()]);

        assert_eq!(
            backend.get(Property::MusicBrainzTrackId),
            vec!["abc-123".to_string()]
        );
    }

    #[test]
    fn track_pair_round_trips() {
        let mut backend = Mp4Backend::new(Ilst::new());
        backend.set_pair(PairProperty::Track, 3, Some(12));

        assert_eq!(backend.get_pair(PairProperty::Track), Some((3, Some(12))));
    }

    #[test]
    fn bpm_round_trips_as_integer() {
        let mut backend = Mp4Backend::new(Ilst::new());
        backend.set(Property::Bpm, &["128".to_string()]);

        assert_eq!(backend.get(Property::Bpm), vec!["128".to_string()]);
    }

    #[test]
    fn pictures_round_trip() {
        let mut backend = Mp4Backend::new(Ilst::new());
        backend.set_pictures(vec![TagPicture {
            kind: PictureKind::CoverFront,
            mime: "image/jpeg".to_string(),
            description: String::new(),
            data: vec![0xFF, 0xD8],
        }]);

        let pictures = backend.pictures();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].data, vec![0xFF, 0xD8]);
    }
}
