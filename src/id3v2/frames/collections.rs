//! Frame storage: an insertion-ordered, key-merging map plus a side table
//! for frames whose IDs this crate doesn't assign special meaning to.

use crate::id3v2::frames::text::{CreditsFrame, TextFrame, UserTextFrame};
use crate::id3v2::frames::Frame;
use indexmap::IndexMap;

/// Frames keyed by [`Frame::key`], preserving insertion order. Re-inserting
/// under a key that already exists merges rather than replaces for the
/// multi-value text families, matching how most taggers expect repeated
/// `TXXX`/`TIPL`/`TMCL` frames to behave.
#[derive(Default)]
pub struct FrameMap {
    frames: IndexMap<String, Box<dyn Frame>>,
}

impl FrameMap {
    pub fn new() -> Self {
        FrameMap {
            frames: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&dyn Frame> {
        self.frames.get(key).map(|f| f.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Box<dyn Frame>> {
        self.frames.get_mut(key)
    }

    pub fn get_all(&self, id: &str) -> Vec<&dyn Frame> {
        self.frames
            .values()
            .filter(|f| f.id() == id)
            .map(|f| f.as_ref())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.frames.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Frame> {
        self.frames.values().map(|f| f.as_ref())
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Frame>> {
        self.frames.shift_remove(key)
    }

    /// Inserts `frame`, merging into an existing entry under the same key
    /// when both sides are a mergeable multi-value text family.
    pub fn insert(&mut self, frame: Box<dyn Frame>) {
        let key = frame.key();

        if let Some(existing) = self.frames.get_mut(&key) {
            if try_merge(existing.as_mut(), frame.as_ref()) {
                return;
            }
        }

        self.frames.insert(key, frame);
    }
}

/// Merges `incoming` into `existing` in place if both are the same
/// multi-value text frame type. Returns whether a merge happened.
fn try_merge(existing: &mut dyn Frame, incoming: &dyn Frame) -> bool {
    if let (Some(existing), Some(incoming)) =
        (existing.cast_mut::<TextFrame>(), incoming.cast::<TextFrame>())
    {
        existing.text_mut().extend(incoming.text().iter().cloned());
        return true;
    }

    if let (Some(existing), Some(incoming)) = (
        existing.cast_mut::<UserTextFrame>(),
        incoming.cast::<UserTextFrame>(),
    ) {
        existing.text_mut().extend(incoming.text().iter().cloned());
        return true;
    }

    if let (Some(existing), Some(incoming)) = (
        existing.cast_mut::<CreditsFrame>(),
        incoming.cast::<CreditsFrame>(),
    ) {
        existing
            .people_mut()
            .extend(incoming.people().iter().map(|(k, v)| (k.clone(), v.clone())));
        return true;
    }

    false
}

/// Frames this crate parsed but doesn't model as a dedicated type (preserved
/// as [`crate::id3v2::frames::RawFrame`]), plus any frame that failed to
/// parse but should still round-trip.
#[derive(Default)]
pub struct UnknownFrames {
    frames: Vec<Box<dyn Frame>>,
}

impl UnknownFrames {
    pub fn new() -> Self {
        UnknownFrames { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: Box<dyn Frame>) {
        self.frames.push(frame);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Frame> {
        self.frames.iter().map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::frames::header::FrameHeader;
    use crate::id3v2::header::{TagHeader, Version};

    fn tag_header() -> TagHeader {
        TagHeader::with_version(Version::V24)
    }

    #[test]
    fn insert_and_get() {
        let mut map = FrameMap::new();
        let mut frame = TextFrame::with_header(FrameHeader::new("TIT2"));
        frame.parse(&tag_header(), b"\x03Title").unwrap();
        map.insert(Box::new(frame));

        assert_eq!(map.get("TIT2").unwrap().id(), "TIT2");
    }

    #[test]
    fn duplicate_txxx_merges_by_description() {
        let mut map = FrameMap::new();

        let mut a = UserTextFrame::with_header(FrameHeader::new("TXXX"));
        a.parse(&tag_header(), b"\x00KEY\0one").unwrap();
        map.insert(Box::new(a));

        let mut b = UserTextFrame::with_header(FrameHeader::new("TXXX"));
        b.parse(&tag_header(), b"\x00KEY\0two").unwrap();
        map.insert(Box::new(b));

        assert_eq!(map.len(), 1);
        let merged = map.get("TXXX:KEY").unwrap().cast::<UserTextFrame>().unwrap();
        assert_eq!(merged.text(), &["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn distinct_comm_descriptions_do_not_collide() {
        use crate::id3v2::frames::text::CommentsFrame;

        let mut map = FrameMap::new();

        let mut a = CommentsFrame::with_header(FrameHeader::new("COMM"));
        a.parse(&tag_header(), b"\x00engFirst\0one").unwrap();
        map.insert(Box::new(a));

        let mut b = CommentsFrame::with_header(FrameHeader::new("COMM"));
        b.parse(&tag_header(), b"\x00engSecond\0two").unwrap();
        map.insert(Box::new(b));

        assert_eq!(map.len(), 2);
    }
}
