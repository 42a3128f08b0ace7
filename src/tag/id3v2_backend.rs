//! Maps the façade's properties onto ID3v2 frames: dedicated text frames
//! where the standard has one, `TXXX:<DESC>` otherwise, `COMM`/`USLT` for
//! comment/lyrics, and `APIC` for pictures.

use super::{BackendKind, PairProperty, PictureKind, Property, TagBackend, TagPicture};
use crate::id3v2::frames::{
    AttachedPictureFrame, CommentsFrame, Frame, PictureType, TextFrame, UnsyncLyricsFrame,
    UserTextFrame,
};
use crate::id3v2::Tag as Id3v2Tag;

/// A dedicated ID3v2 text frame ID for properties the standard defines one
/// for.
fn text_frame_id(property: Property) -> Option<&'static str> {
    use Property::*;

    Some(match property {
        Title => "TIT2",
        Artist => "TPE1",
        Album => "TALB",
        AlbumArtist => "TPE2",
        PerformersSort => "TSOP",
        Composer => "TCOM",
        ComposersSort => "TSOC",
        Conductor => "TPE3",
        Genre => "TCON",
        Year => "TDRC",
        OriginalReleaseDate => "TDOR",
        Bpm => "TBPM",
        Key => "TKEY",
        Mood => "TMOO",
        Grouping => "TIT1",
        Subtitle => "TIT3",
        MovementName => "MVNM",
        Isrc => "TSRC",
        Publisher => "TPUB",
        Copyright => "TCOP",
        EncodedBy => "TENC",
        EncoderSettings => "TSSE",
        Compilation => "TCMP",
        Remixer => "TPE4",
        MediaType => "TMED",
        Language => "TLAN",
        DateTagged => "TDTG",
        PodcastUrl => "WFED",
        _ => return None,
    })
}

/// Legacy ID3v2.3 frame a reader might find a value under when the
/// ID3v2.4 frame above is absent.
fn legacy_text_frame_id(property: Property) -> Option<&'static str> {
    match property {
        Property::Year => Some("TYER"),
        Property::OriginalReleaseDate => Some("TORY"),
        _ => None,
    }
}

/// `TXXX` description for properties with no dedicated frame. Case carried
/// for rendering; lookups uppercase it to match [`UserTextFrame::key`].
fn txxx_desc(property: Property) -> Option<&'static str> {
    use Property::*;

    Some(match property {
        Work => "WORK",
        Description => "DESCRIPTION",
        Barcode => "BARCODE",
        CatalogNumber => "CATALOGNUMBER",
        AmazonId => "ASIN",
        ReplayGainTrackGain => "REPLAYGAIN_TRACK_GAIN",
        ReplayGainTrackPeak => "REPLAYGAIN_TRACK_PEAK",
        ReplayGainAlbumGain => "REPLAYGAIN_ALBUM_GAIN",
        ReplayGainAlbumPeak => "REPLAYGAIN_ALBUM_PEAK",
        R128TrackGain => "R128_TRACK_GAIN",
        R128AlbumGain => "R128_ALBUM_GAIN",
        MusicBrainzTrackId => "MusicBrainz Track Id",
        MusicBrainzRecordingId => "MusicBrainz Release Track Id",
        MusicBrainzReleaseId => "MusicBrainz Album Id",
        MusicBrainzReleaseGroupId => "MusicBrainz Release Group Id",
        MusicBrainzArtistId => "MusicBrainz Artist Id",
        MusicBrainzAlbumArtistId => "MusicBrainz Album Artist Id",
        MusicBrainzWorkId => "MusicBrainz Work Id",
        MusicBrainzDiscId => "MusicBrainz Disc Id",
        MusicBrainzReleaseStatus => "MusicBrainz Album Status",
        MusicBrainzReleaseType => "MusicBrainz Album Type",
        MusicBrainzReleaseCountry => "MusicBrainz Album Release Country",
        AcoustidId => "Acoustid Id",
        AcoustidFingerprint => "Acoustid Fingerprint",
        _ => return None,
    })
}

fn pair_frame_id(property: PairProperty) -> &'static str {
    match property {
        PairProperty::Track => "TRCK",
        PairProperty::Disc => "TPOS",
        PairProperty::Movement => "MVIN",
    }
}

fn parse_pair(text: &str) -> Option<(u32, Option<u32>)> {
    let mut parts = text.splitn(2, '/');
    let number = parts.next()?.trim().parse().ok()?;
    let total = parts
        .next()
        .and_then(|t| t.trim().parse().ok());
    Some((number, total))
}

fn format_pair(number: u32, total: Option<u32>) -> String {
    match total {
        Some(total) => format!("{}/{}", number, total),
        None => number.to_string(),
    }
}

fn picture_kind_from(picture_type: PictureType) -> PictureKind {
    match picture_type {
        PictureType::CoverFront => PictureKind::CoverFront,
        PictureType::CoverBack => PictureKind::CoverBack,
        _ => PictureKind::Other,
    }
}

fn picture_type_from(kind: PictureKind) -> PictureType {
    match kind {
        PictureKind::CoverFront => PictureType::CoverFront,
        PictureKind::CoverBack => PictureType::CoverBack,
        PictureKind::Other => PictureType::Other,
    }
}

/// Adapts [`crate::id3v2::Tag`] to the façade's [`TagBackend`] trait.
pub struct Id3v2Backend {
    tag: Id3v2Tag,
}

impl Id3v2Backend {
    pub fn new(tag: Id3v2Tag) -> Self {
        Id3v2Backend { tag }
    }

    pub fn tag(&self) -> &Id3v2Tag {
        &self.tag
    }

    pub fn into_tag(self) -> Id3v2Tag {
        self.tag
    }

    fn first_comment(&self) -> Option<&CommentsFrame> {
        self.tag
            .frames()
            .get_all("COMM")
            .into_iter()
            .find_map(|f| f.cast::<CommentsFrame>())
    }

    fn first_lyrics(&self) -> Option<&UnsyncLyricsFrame> {
        self.tag
            .frames()
            .get_all("USLT")
            .into_iter()
            .find_map(|f| f.cast::<UnsyncLyricsFrame>())
    }

    fn clear_family(&mut self, id: &str) {
        let keys: Vec<String> = self
            .tag
            .frames()
            .get_all(id)
            .iter()
            .map(|f| f.key())
            .collect();
        for key in keys {
            self.tag.frames_mut().remove(&key);
        }
    }
}

impl TagBackend for Id3v2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Id3v2
    }

    fn get(&self, property: Property) -> Vec<String> {
        if property == Property::Comment {
            return self
                .first_comment()
                .map(|c| vec![c.text().to_string()])
                .unwrap_or_default();
        }

        if property == Property::Lyrics {
            return self
                .first_lyrics()
                .map(|l| vec![l.text().to_string()])
                .unwrap_or_default();
        }

        if let Some(id) = text_frame_id(property) {
            if let Some(frame) = self.tag.frames().get(id).and_then(|f| f.cast::<TextFrame>()) {
                if !frame.text().is_empty() {
                    return frame.text().to_vec();
                }
            }
            if let Some(legacy_id) = legacy_text_frame_id(property) {
                if let Some(frame) = self
                    .tag
                    .frames()
                    .get(legacy_id)
                    .and_then(|f| f.cast::<TextFrame>())
                {
                    return frame.text().to_vec();
                }
            }
            return Vec::new();
        }

        if let Some(desc) = txxx_desc(property) {
            let key = format!("TXXX:{}", desc.to_uppercase());
            return self
                .tag
                .frames()
                .get(&key)
                .and_then(|f| f.cast::<UserTextFrame>())
                .map(|f| f.text().to_vec())
                .unwrap_or_default();
        }

        Vec::new()
    }

    fn set(&mut self, property: Property, values: &[String]) {
        if property == Property::Comment {
            self.clear_family("COMM");
            let mut frame = CommentsFrame::new();
            if let Some(value) = values.first() {
                *frame.text_mut() = value.clone();
            }
            self.tag.frames_mut().insert(Box::new(frame));
            return;
        }

        if property == Property::Lyrics {
            self.clear_family("USLT");
            let mut frame = UnsyncLyricsFrame::new();
            if let Some(value) = values.first() {
                *frame.text_mut() = value.clone();
            }
            self.tag.frames_mut().insert(Box::new(frame));
            return;
        }

        if let Some(id) = text_frame_id(property) {
            self.tag.frames_mut().remove(id);
            let mut frame = TextFrame::new(id);
            frame.text_mut().extend(values.iter().cloned());
            self.tag.frames_mut().insert(Box::new(frame));
            return;
        }

        if let Some(desc) = txxx_desc(property) {
            let key = format!("TXXX:{}", desc.to_uppercase());
            self.tag.frames_mut().remove(&key);
            let mut frame = UserTextFrame::new();
            *frame.desc_mut() = desc.to_string();
            frame.text_mut().extend(values.iter().cloned());
            self.tag.frames_mut().insert(Box::new(frame));
        }
    }

    fn clear(&mut self, property: Property) {
        if property == Property::Comment {
            self.clear_family("COMM");
            return;
        }
        if property == Property::Lyrics {
            self.clear_family("USLT");
            return;
        }
        if let Some(id) = text_frame_id(property) {
            self.tag.frames_mut().remove(id);
            if let Some(legacy_id) = legacy_text_frame_id(property) {
                self.tag.frames_mut().remove(legacy_id);
            }
            return;
        }
        if let Some(desc) = txxx_desc(property) {
            self.tag
                .frames_mut()
                .remove(&format!("TXXX:{}", desc.to_uppercase()));
        }
    }

    fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)> {
        let id = pair_frame_id(property);
        let frame = self.tag.frames().get(id)?.cast::<TextFrame>()?;
        parse_pair(frame.text().first()?)
    }

    fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>) {
        let id = pair_frame_id(property);
        self.tag.frames_mut().remove(id);
        let mut frame = TextFrame::new(id);
        frame.text_mut().push(format_pair(number, total));
        self.tag.frames_mut().insert(Box::new(frame));
    }

    fn pictures(&self) -> Vec<TagPicture> {
        self.tag
            .frames()
            .get_all("APIC")
            .into_iter()
            .filter_map(|f| f.cast::<AttachedPictureFrame>())
            .map(|p| TagPicture {
                kind: picture_kind_from(p.picture_type()),
                mime: p.mime().to_string(),
                description: p.desc().to_string(),
                data: p.picture().to_vec(),
            })
            .collect()
    }

    fn set_pictures(&mut self, pictures: Vec<TagPicture>) {
        self.clear_family("APIC");
        for picture in pictures {
            let mut frame = AttachedPictureFrame::new();
            *frame.mime_mut() = picture.mime;
            frame.set_picture_type(picture_type_from(picture.kind));
            *frame.desc_mut() = picture.description;
            *frame.picture_mut() = picture.data;
            self.tag.frames_mut().insert(Box::new(frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::header::Version;

    fn empty_id3v2_tag() -> Id3v2Tag {
        let mut header = Vec::new();
        header.extend(b"ID3");
        header.push(4);
        header.push(0);
        header.push(0);
        header.extend(&crate::core::io::encode_syncsafe(0));
        Id3v2Tag::parse(&header).unwrap()
    }

    #[test]
    fn round_trips_title_through_dedicated_frame() {
        let mut backend = Id3v2Backend::new(empty_id3v2_tag());
        backend.set(Property::Title, &["Song".to_string()]);

        assert_eq!(backend.get(Property::Title), vec!["Song".to_string()]);
        assert_eq!(backend.tag().version(), Version::V24);
    }

    #[test]
    fn round_trips_musicbrainz_id_through_txxx() {
        let mut backend = Id3v2Backend::new(empty_id3v2_tag());
        backend.set(
            Property::MusicBrainzTrackId,
            &["abc-123".to_string()],
        );

        assert_eq!(
            backend.get(Property::MusicBrainzTrackId),
            vec!["abc-123".to_string()]
        );
    }

    #[test]
    fn track_pair_round_trips() {
        let mut backend = Id3v2Backend::new(empty_id3v2_tag());
        backend.set_pair(PairProperty::Track, 3, Some(12));

        assert_eq!(backend.get_pair(PairProperty::Track), Some((3, Some(12))));
    }

    #[test]
    fn setting_idempotently_leaves_value_unchanged() {
        let mut backend = Id3v2Backend::new(empty_id3v2_tag());
        backend.set(Property::Artist, &["Example Artist".to_string()]);

        let value = backend.get(Property::Artist);
        backend.set(Property::Artist, &value);

        assert_eq!(backend.get(Property::Artist), value);
    }
}
