//! Field entries: raw schema input and the validated form stored in a [ResolvedMapping].

use std::rc::Rc;

use crate::{range::BitRange, schema::ResolvedMapping};

/// Key that carries a nested block's own range inside its [RawMapping].
pub const INDEX_KEY: &str = "_index_";

/// A field entry as supplied by a schema definition, before validation.
///
/// Indices are signed so that malformed input can be represented and reported
/// instead of being rejected by the type system at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawField {
    /// Single bit index.
    Bit(i64),
    /// Two-element `[start, stop)` pair.
    Pair(i64, i64),
    /// Slice with optional bounds. `stop == None` is open-ended; a step is never valid.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// Nested block: must contain [INDEX_KEY] plus its own fields.
    Nested(RawMapping),
    /// Anything else the definition layer could not classify.
    Unrecognized(String),
}

/// Ordered set of raw field entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMapping {
    entries: Vec<(String, RawField)>,
}

impl RawMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn field(mut self, name: impl Into<String>, field: RawField) -> Self {
        self.entries.push((name.into(), field));
        self
    }

    /// Appends a single-bit field.
    pub fn bit(self, name: impl Into<String>, index: i64) -> Self {
        self.field(name, RawField::Bit(index))
    }

    /// Appends a `[start, stop)` field.
    pub fn range(self, name: impl Into<String>, start: i64, stop: i64) -> Self {
        self.field(name, RawField::Pair(start, stop))
    }

    /// Appends an open-ended field running from `start` to the end of the value.
    pub fn open(self, name: impl Into<String>, start: i64) -> Self {
        self.field(
            name,
            RawField::Slice {
                start: Some(start),
                stop: None,
                step: None,
            },
        )
    }

    /// Appends a nested block occupying `[start, stop)`, whose `fields` are
    /// relative to the block's bit 0.
    pub fn nested(self, name: impl Into<String>, start: i64, stop: i64, fields: RawMapping) -> Self {
        self.field(name, RawField::Nested(RawMapping::block(start, stop, fields)))
    }

    /// Contents of a nested block: [INDEX_KEY] first, then `fields`.
    pub fn block(start: i64, stop: i64, fields: RawMapping) -> Self {
        let mut block = RawMapping::new().range(INDEX_KEY, start, stop);
        block.entries.extend(fields.entries);
        block
    }

    pub fn get(&self, name: &str) -> Option<&RawField> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, field)| field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawField)> {
        self.entries.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, RawField)> for RawMapping {
    fn from_iter<I: IntoIterator<Item = (S, RawField)>>(iter: I) -> Self {
        RawMapping {
            entries: iter
                .into_iter()
                .map(|(name, field)| (name.into(), field))
                .collect(),
        }
    }
}

/// A validated field: bit, range or nested block with its own mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldSpec {
    Bit(u32),
    Range(BitRange),
    /// `index` is absolute within the parent; `mapping` is relative to `index.start`.
    Nested {
        index: BitRange,
        mapping: Rc<ResolvedMapping>,
    },
}

impl FieldSpec {
    /// Range the field occupies in its parent.
    pub fn range(&self) -> BitRange {
        match self {
            FieldSpec::Bit(index) => BitRange::bit(*index),
            FieldSpec::Range(range) => *range,
            FieldSpec::Nested { index, .. } => *index,
        }
    }

    pub fn start(&self) -> u32 {
        self.range().start
    }

    /// Sub-mapping threaded into views of this field.
    pub fn mapping(&self) -> Option<&Rc<ResolvedMapping>> {
        match self {
            FieldSpec::Nested { mapping, .. } => Some(mapping),
            _ => None,
        }
    }
}
