//! Mapping resolution: validates raw field sets and produces an ordered, overlap-free table.

use std::{collections::HashSet, rc::Rc};

use crate::{
    bits::MAX_WIDTH,
    errors::SchemaError,
    field::{FieldSpec, INDEX_KEY, RawField, RawMapping},
    range::BitRange,
};

/// Validated mapping: field name to [FieldSpec], ordered by start bit.
///
/// No two entries overlap and at most one entry is open-ended, in which case it
/// is the last one. Built once per view type and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResolvedMapping {
    entries: Vec<(String, FieldSpec)>,
}

impl ResolvedMapping {
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, spec)| spec)
    }

    /// Entries in resolved (start bit) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.entries.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a top-level mapping. Fails if any entry is malformed, if two
/// entries overlap, or if an entry follows an open-ended one.
pub fn resolve(raw: &RawMapping) -> Result<ResolvedMapping, SchemaError> {
    if raw.get(INDEX_KEY).is_some() {
        return Err(SchemaError::ReservedKey);
    }

    let mut unrecognized = Vec::new();
    collect_unrecognized(raw, "", false, &mut unrecognized);
    if !unrecognized.is_empty() {
        return Err(SchemaError::UnrecognizedField(unrecognized));
    }

    let mapping = resolve_level(raw, None)?;
    log::debug!("resolved mapping with {} fields", mapping.len());

    Ok(mapping)
}

/// Field shape after classification, before overlap checks.
enum Candidate<'a> {
    Bit(u32),
    Range(BitRange),
    Nested(BitRange, &'a RawMapping),
}

impl Candidate<'_> {
    fn range(&self) -> BitRange {
        match self {
            Candidate::Bit(index) => BitRange::bit(*index),
            Candidate::Range(range) | Candidate::Nested(range, _) => *range,
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_')
}

fn to_bit(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

fn classify_bounded(start: i64, stop: i64) -> Option<BitRange> {
    let (start, stop) = (to_bit(start)?, to_bit(stop)?);
    (start < stop).then(|| BitRange::new(start, stop))
}

fn classify_slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Option<BitRange> {
    if step.is_some() {
        return None;
    }

    let start = start.unwrap_or(0);
    match stop {
        Some(stop) => classify_bounded(start, stop),
        None => to_bit(start).map(BitRange::open),
    }
}

/// The range a nested block declares under [INDEX_KEY]; must be bounded.
fn nested_index(block: &RawMapping) -> Option<BitRange> {
    match block.get(INDEX_KEY)? {
        RawField::Pair(start, stop) => classify_bounded(*start, *stop),
        RawField::Slice {
            start,
            stop: Some(stop),
            step: None,
        } => classify_bounded(start.unwrap_or(0), *stop),
        _ => None,
    }
}

fn classify(field: &RawField) -> Option<Candidate<'_>> {
    match field {
        RawField::Bit(index) => to_bit(*index).map(Candidate::Bit),
        RawField::Pair(start, stop) => classify_bounded(*start, *stop).map(Candidate::Range),
        RawField::Slice { start, stop, step } => {
            classify_slice(*start, *stop, *step).map(Candidate::Range)
        }
        RawField::Nested(block) => nested_index(block).map(|index| Candidate::Nested(index, block)),
        RawField::Unrecognized(_) => None,
    }
}

fn collect_unrecognized(raw: &RawMapping, prefix: &str, nested: bool, out: &mut Vec<String>) {
    for (name, field) in raw.iter() {
        if nested && name == INDEX_KEY {
            continue;
        }

        let path = format!("{prefix}{name}");
        if !is_valid_name(name) || classify(field).is_none() {
            out.push(path);
            continue;
        }

        if let RawField::Nested(block) = field {
            collect_unrecognized(block, &format!("{path}."), true, out);
        }
    }
}

/// Resolves one mapping level. `width` bounds field starts inside nested blocks.
fn resolve_level(raw: &RawMapping, width: Option<u32>) -> Result<ResolvedMapping, SchemaError> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(raw.len());

    for (name, field) in raw.iter() {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateField(name.to_string()));
        }
        if width.is_some() && name == INDEX_KEY {
            continue;
        }

        let candidate = classify(field)
            .ok_or_else(|| SchemaError::UnrecognizedField(vec![name.to_string()]))?;
        candidates.push((name, candidate));
    }

    candidates.sort_by_key(|(_, candidate)| candidate.range().start);

    let mut claimed = 0u128;
    let mut open_ended = false;
    let mut entries = Vec::with_capacity(candidates.len());

    for (name, candidate) in candidates {
        if open_ended {
            return Err(SchemaError::TrailingAfterOpenEnded {
                field: name.to_string(),
            });
        }

        let range = candidate.range();
        let limit = width.unwrap_or(MAX_WIDTH);
        if range.start >= limit || range.stop.is_some_and(|stop| stop > limit) {
            return Err(SchemaError::FieldBeyondSize {
                field: name.to_string(),
                size: limit,
            });
        }

        let spec = match candidate {
            Candidate::Bit(index) => FieldSpec::Bit(index),
            Candidate::Range(range) => FieldSpec::Range(range),
            Candidate::Nested(index, block) => {
                let mapping = resolve_level(block, index.len())?;
                FieldSpec::Nested {
                    index,
                    mapping: Rc::new(mapping),
                }
            }
        };

        let mask = range.mask();
        if claimed & mask != 0 {
            return Err(SchemaError::Overlap {
                field: name.to_string(),
                colliding_bits: claimed & mask,
            });
        }
        claimed |= mask;
        open_ended = range.is_open();

        entries.push((name.to_string(), spec));
    }

    Ok(ResolvedMapping { entries })
}
