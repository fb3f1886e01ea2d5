//! Metadata models and extraction of every tag attached to a bitmap.

pub mod tag;

use std::collections::BTreeMap;

use tracing::trace;

use crate::engine::{Engine, RawTag};

pub use tag::{Scalar, TagType, TagValue};

/// A named category of tags. Keys are unique within a model.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MetadataModel {
    Comments = 0,
    ExifMain = 1,
    ExifExif = 2,
    ExifGps = 3,
    ExifMakernote = 4,
    ExifInterop = 5,
    Iptc = 6,
    Xmp = 7,
    GeoTiff = 8,
    Animation = 9,
}

impl MetadataModel {
    /// Every model, in code order.
    pub const ALL: [Self; 10] = [
        Self::Comments,
        Self::ExifMain,
        Self::ExifExif,
        Self::ExifGps,
        Self::ExifMakernote,
        Self::ExifInterop,
        Self::Iptc,
        Self::Xmp,
        Self::GeoTiff,
        Self::Animation,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Comments => "COMMENTS",
            Self::ExifMain => "EXIF_MAIN",
            Self::ExifExif => "EXIF_EXIF",
            Self::ExifGps => "EXIF_GPS",
            Self::ExifMakernote => "EXIF_MAKERNOTE",
            Self::ExifInterop => "EXIF_INTEROP",
            Self::Iptc => "IPTC",
            Self::Xmp => "XMP",
            Self::GeoTiff => "GEOTIFF",
            Self::Animation => "ANIMATION",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Whether this is one of the five EXIF models.
    pub const fn is_exif(self) -> bool {
        matches!(
            self,
            Self::ExifMain | Self::ExifExif | Self::ExifGps | Self::ExifMakernote | Self::ExifInterop
        )
    }
}

impl core::fmt::Display for MetadataModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every tag of one image, keyed by `(model, key)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataMap {
    entries: BTreeMap<(MetadataModel, String), TagValue>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, returning the value it replaced.
    pub fn insert(
        &mut self,
        model: MetadataModel,
        key: impl Into<String>,
        value: TagValue,
    ) -> Option<TagValue> {
        self.entries.insert((model, key.into()), value)
    }

    pub fn get(&self, model: MetadataModel, key: &str) -> Option<&TagValue> {
        self.entries.get(&(model, key.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataModel, &str, &TagValue)> {
        self.entries.iter().map(|((m, k), v)| (*m, k.as_str(), v))
    }

    /// Tags of one model, in key order.
    pub fn model(&self, model: MetadataModel) -> impl Iterator<Item = (&str, &TagValue)> {
        self.iter()
            .filter(move |(m, _, _)| *m == model)
            .map(|(_, k, v)| (k, v))
    }

    pub fn contains_model(&self, model: MetadataModel) -> bool {
        self.model(model).next().is_some()
    }
}

impl IntoIterator for MetadataMap {
    type Item = ((MetadataModel, String), TagValue);
    type IntoIter = std::collections::btree_map::IntoIter<(MetadataModel, String), TagValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Closes a tag cursor when dropped.
struct CursorGuard<'e, 'b, E: Engine + 'b> {
    engine: &'e E,
    cursor: Option<E::TagCursor<'b>>,
}

impl<'b, E: Engine + 'b> CursorGuard<'_, 'b, E> {
    fn next(&mut self) -> Option<RawTag<'b>> {
        let cursor = self.cursor.as_mut()?;
        self.engine.find_next_metadata(cursor)
    }
}

impl<'b, E: Engine + 'b> Drop for CursorGuard<'_, 'b, E> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.engine.find_close_metadata(cursor);
        }
    }
}

/// Collect every tag of every model attached to `bitmap`.
///
/// Models without tags are skipped. Each model's cursor is closed before
/// the next model is visited.
pub fn extract<'b, E: Engine + 'b>(engine: &E, bitmap: &'b E::Bitmap) -> MetadataMap {
    let mut map = MetadataMap::new();
    for model in MetadataModel::ALL {
        let Some((cursor, first)) = engine.find_first_metadata(model, bitmap) else {
            continue;
        };
        let mut guard = CursorGuard {
            engine,
            cursor: Some(cursor),
        };
        let mut current = Some(first);
        while let Some(raw) = current {
            trace!(
                model = model.name(),
                key = raw.key,
                type_code = raw.type_code,
                len = raw.value.len(),
                "metadata tag"
            );
            map.insert(model, raw.key, tag::decode(raw.type_code, raw.value));
            current = guard.next();
        }
    }
    map
}
