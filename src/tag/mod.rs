//! A cross-format tag façade: a fixed set of named properties, each backend
//! translating to its own native key space, composed into a priority-ordered
//! multi-tag view.

mod ape_backend;
mod id3v2_backend;
mod mp4_backend;
mod xiph_backend;

pub use ape_backend::ApeBackend;
pub use id3v2_backend::Id3v2Backend;
pub use mp4_backend::Mp4Backend;
pub use xiph_backend::XiphBackend;

/// The named properties every backend maps onto its own native keys.
/// Properties without a dedicated native slot for a given backend fall back
/// to that backend's freeform/user-text convention; a backend that has no
/// convention at all for a property returns `None`/empty for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[non_exhaustive]
pub enum Property {
    Title,
    Artist,
    Album,
    AlbumArtist,
    PerformersSort,
    Composer,
    ComposersSort,
    Conductor,
    Genre,
    Year,
    OriginalReleaseDate,
    Comment,
    Bpm,
    Key,
    Mood,
    Grouping,
    Subtitle,
    Work,
    MovementName,
    Isrc,
    Publisher,
    Copyright,
    EncodedBy,
    EncoderSettings,
    Compilation,
    Remixer,
    MediaType,
    Language,
    Description,
    DateTagged,
    Barcode,
    CatalogNumber,
    AmazonId,
    Lyrics,
    ReplayGainTrackGain,
    ReplayGainTrackPeak,
    ReplayGainAlbumGain,
    ReplayGainAlbumPeak,
    R128TrackGain,
    R128AlbumGain,
    MusicBrainzTrackId,
    MusicBrainzRecordingId,
    MusicBrainzReleaseId,
    MusicBrainzReleaseGroupId,
    MusicBrainzArtistId,
    MusicBrainzAlbumArtistId,
    MusicBrainzWorkId,
    MusicBrainzDiscId,
    MusicBrainzReleaseStatus,
    MusicBrainzReleaseType,
    MusicBrainzReleaseCountry,
    AcoustidId,
    AcoustidFingerprint,
    PodcastUrl,
}

/// Properties carrying both a value and a total (`track`/`total_tracks`,
/// `disc`/`total_discs`, `movement`/`movement_total`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PairProperty {
    Track,
    Disc,
    Movement,
}

/// A picture attached to a tag, normalized across ID3v2's `APIC`, APE's
/// `Cover Art (...)` convention, Xiph's `METADATA_BLOCK_PICTURE`, and MP4's
/// `covr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPicture {
    pub kind: PictureKind,
    pub mime: String,
    pub description: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PictureKind {
    CoverFront,
    CoverBack,
    Other,
}

/// Canonical uppercase key shared by the plain `NAME=value` conventions
/// (APE items and Xiph Vorbis comment fields use the same key names in
/// practice). Returns `None` for properties that have no conventional key
/// in either format (these still round-trip if a file already has one, just
/// not through this façade).
fn plain_key(property: Property) -> Option<&'static str> {
    use Property::*;

    Some(match property {
        Title => "TITLE",
        Artist => "ARTIST",
        Album => "ALBUM",
        AlbumArtist => "ALBUMARTIST",
        PerformersSort => "ARTISTSORT",
        Composer => "COMPOSER",
        ComposersSort => "COMPOSERSORT",
        Conductor => "CONDUCTOR",
        Genre => "GENRE",
        Year => "DATE",
        OriginalReleaseDate => "ORIGINALDATE",
        Comment => "COMMENT",
        Bpm => "BPM",
        Key => "INITIALKEY",
        Mood => "MOOD",
        Grouping => "GROUPING",
        Subtitle => "SUBTITLE",
        Work => "WORK",
        MovementName => "MOVEMENTNAME",
        Isrc => "ISRC",
        Publisher => "LABEL",
        Copyright => "COPYRIGHT",
        EncodedBy => "ENCODED-BY",
        EncoderSettings => "ENCODER",
        Compilation => "COMPILATION",
        Remixer => "REMIXER",
        MediaType => "MEDIA",
        Language => "LANGUAGE",
        Description => "DESCRIPTION",
        DateTagged => "DATETAGGED",
        Barcode => "BARCODE",
        CatalogNumber => "CATALOGNUMBER",
        AmazonId => "ASIN",
        Lyrics => "LYRICS",
        ReplayGainTrackGain => "REPLAYGAIN_TRACK_GAIN",
        ReplayGainTrackPeak => "REPLAYGAIN_TRACK_PEAK",
        ReplayGainAlbumGain => "REPLAYGAIN_ALBUM_GAIN",
        ReplayGainAlbumPeak => "REPLAYGAIN_ALBUM_PEAK",
        R128TrackGain => "R128_TRACK_GAIN",
        R128AlbumGain => "R128_ALBUM_GAIN",
        MusicBrainzTrackId => "MUSICBRAINZ_TRACKID",
        MusicBrainzRecordingId => "MUSICBRAINZ_RELEASETRACKID",
        MusicBrainzReleaseId => "MUSICBRAINZ_ALBUMID",
        MusicBrainzReleaseGroupId => "MUSICBRAINZ_RELEASEGROUPID",
        MusicBrainzArtistId => "MUSICBRAINZ_ARTISTID",
        MusicBrainzAlbumArtistId => "MUSICBRAINZ_ALBUMARTISTID",
        MusicBrainzWorkId => "MUSICBRAINZ_WORKID",
        MusicBrainzDiscId => "MUSICBRAINZ_DISCID",
        MusicBrainzReleaseStatus => "MUSICBRAINZ_ALBUMSTATUS",
        MusicBrainzReleaseType => "MUSICBRAINZ_ALBUMTYPE",
        MusicBrainzReleaseCountry => "RELEASECOUNTRY",
        AcoustidId => "ACOUSTID_ID",
        AcoustidFingerprint => "ACOUSTID_FINGERPRINT",
        PodcastUrl => "PODCASTURL",
    })
}

/// A single concrete tag's mapping onto the façade's property surface. Text
/// properties are multi-valued throughout (most backends round-trip a
/// single value as a one-element list); callers that only want one value
/// take the first entry.
pub trait TagBackend {
    fn kind(&self) -> BackendKind;

    fn get(&self, property: Property) -> Vec<String>;
    fn set(&mut self, property: Property, values: &[String]);
    fn clear(&mut self, property: Property);

    fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)>;
    fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>);

    fn pictures(&self) -> Vec<TagPicture>;
    fn set_pictures(&mut self, pictures: Vec<TagPicture>);
}

/// The priority order the façade composes backends in: getters return the
/// first non-absent value found walking this order; setters write through
/// to every backend present on the tag. ID3v1 is listed in the spec this is
/// drawn from but isn't implemented by this crate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum BackendKind {
    Id3v2,
    Ape,
    Xiph,
    Mp4Ilst,
}

/// A composed view over however many concrete tags a file carries.
///
/// Construct by pushing each backend found on read; [`Tag::get`] returns the
/// highest-priority backend's value, while [`Tag::set`] writes the property
/// to every backend currently present (never creating a new one).
#[derive(Default)]
pub struct Tag {
    backends: Vec<Box<dyn TagBackend>>,
}

impl Tag {
    pub fn new() -> Self {
        Tag {
            backends: Vec::new(),
        }
    }

    /// Adds a backend, keeping the list sorted by [`BackendKind`] priority.
    pub fn push(&mut self, backend: Box<dyn TagBackend>) {
        let pos = self
            .backends
            .iter()
            .position(|b| b.kind() > backend.kind())
            .unwrap_or(self.backends.len());
        self.backends.insert(pos, backend);
    }

    pub fn backends(&self) -> &[Box<dyn TagBackend>] {
        &self.backends
    }

    pub fn backends_mut(&mut self) -> &mut [Box<dyn TagBackend>] {
        &mut self.backends
    }

    /// The first non-empty value for `property`, in backend priority order.
    pub fn get(&self, property: Property) -> Option<String> {
        self.backends
            .iter()
            .find_map(|b| b.get(property).into_iter().next())
    }

    /// All values the highest-priority backend carrying `property` has.
    pub fn get_all(&self, property: Property) -> Vec<String> {
        self.backends
            .iter()
            .map(|b| b.get(property))
            .find(|values| !values.is_empty())
            .unwrap_or_default()
    }

    /// Writes `value` to `property` on every backend present.
    pub fn set(&mut self, property: Property, value: &str) {
        for backend in &mut self.backends {
            backend.set(property, &[value.to_string()]);
        }
    }

    /// Writes a multi-value property to every backend present.
    pub fn set_all(&mut self, property: Property, values: &[String]) {
        for backend in &mut self.backends {
            backend.set(property, values);
        }
    }

    pub fn remove(&mut self, property: Property) {
        for backend in &mut self.backends {
            backend.clear(property);
        }
    }

    pub fn get_pair(&self, property: PairProperty) -> Option<(u32, Option<u32>)> {
        self.backends.iter().find_map(|b| b.get_pair(property))
    }

    pub fn set_pair(&mut self, property: PairProperty, number: u32, total: Option<u32>) {
        for backend in &mut self.backends {
            backend.set_pair(property, number, total);
        }
    }

    pub fn pictures(&self) -> Vec<TagPicture> {
        self.backends
            .iter()
            .map(|b| b.pictures())
            .find(|pictures| !pictures.is_empty())
            .unwrap_or_default()
    }

    pub fn set_pictures(&mut self, pictures: Vec<TagPicture>) {
        for backend in &mut self.backends {
            backend.set_pictures(pictures.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend {
        kind: BackendKind,
        value: Option<String>,
    }

    impl TagBackend for StubBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn get(&self, property: Property) -> Vec<String> {
            if property == Property::Title {
                self.value.clone().into_iter().collect()
            } else {
                Vec::new()
            }
        }

        fn set(&mut self, property: Property, values: &[String]) {
            if property == Property::Title {
                self.value = values.first().cloned();
            }
        }

        fn clear(&mut self, property: Property) {
            if property == Property::Title {
                self.value = None;
            }
        }

        fn get_pair(&self, _property: PairProperty) -> Option<(u32, Option<u32>)> {
            None
        }

        fn set_pair(&mut self, _property: PairProperty, _number: u32, _total: Option<u32>) {}

        fn pictures(&self) -> Vec<TagPicture> {
            Vec::new()
        }

        fn set_pictures(&mut self, _pictures: Vec<TagPicture>) {}
    }

    #[test]
    fn priority_order_wins_on_get() {
        let mut tag = Tag::new();
        tag.push(Box::new(StubBackend {
            kind: BackendKind::Xiph,
            value: Some("Xiph title".to_string()),
        }));
        tag.push(Box::new(StubBackend {
            kind: BackendKind::Id3v2,
            value: Some("ID3 title".to_string()),
        }));

        assert_eq!(tag.get(Property::Title), Some("ID3 title".to_string()));
    }

    #[test]
    fn set_writes_through_to_every_backend() {
        let mut tag = Tag::new();
        tag.push(Box::new(StubBackend {
            kind: BackendKind::Xiph,
            value: None,
        }));
        tag.push(Box::new(StubBackend {
            kind: BackendKind::Ape,
            value: None,
        }));

        tag.set(Property::Title, "New Title");

        for backend in tag.backends() {
            assert_eq!(backend.get(Property::Title), vec!["New Title".to_string()]);
        }
    }
}
