//! Bit views: integers read and written whole, by bit range, or by field name.
//!
//! Slicing a view produces a child view linked to its parent. A linked child
//! recomputes its value from the parent on every read and pushes every write
//! up through the parent chain, so all views over one root stay consistent.

use std::{
    cell::Cell,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
    rc::Rc,
};

use crate::{
    bits::{MAX_WIDTH, bit_length, byte_length, mask_for, sign_extend, width_of},
    errors::{Error, LookupError, PersistenceError, RangeError, SchemaError, TypeError},
    field::FieldSpec,
    schema::ResolvedMapping,
    view_type::ViewType,
};

/// Link from a child view to the parent it aliases.
#[derive(Debug)]
struct Link {
    parent: Rc<Slot>,
    offset: u32,
    /// Child bits in parent coordinates.
    span: u128,
}

#[derive(Debug)]
struct Slot {
    ty: Rc<ViewType>,
    value: Cell<u128>,
    link: Option<Link>,
}

impl Slot {
    fn value(&self) -> u128 {
        if let Some(link) = &self.link {
            self.value
                .set((link.parent.value() & link.span) >> link.offset);
        }
        self.value.get()
    }

    /// Masks and writes `value`, propagating it to the parent chain.
    fn store(&self, value: u128) {
        let value = self.ty.mask().map_or(value, |mask| value & mask);

        if let Some(link) = &self.link {
            let parent = link.parent.value();
            let updated = (parent & !link.span) | ((value << link.offset) & link.span);
            log::trace!(
                "write-through {:#x} at bit {} into {}",
                value,
                link.offset,
                link.parent.ty.name()
            );
            link.parent.store(updated);
        }

        self.value.set(value);
    }
}

/// Key accepted by [BitView::get] and [BitView::set].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    /// Single bit.
    Index(i64),
    /// `[start, stop)`; both `None` means the whole value.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
    },
    /// Field name from the view's mapping.
    Name(&'a str),
}

fn to_key_bound<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

macro_rules! impl_int_keys {
    ($($int:ty),*) => {$(
        impl From<$int> for Key<'_> {
            fn from(index: $int) -> Self {
                Key::Index(to_key_bound(index))
            }
        }

        impl From<Range<$int>> for Key<'_> {
            fn from(range: Range<$int>) -> Self {
                Key::Slice {
                    start: Some(to_key_bound(range.start)),
                    stop: Some(to_key_bound(range.end)),
                }
            }
        }

        impl From<RangeFrom<$int>> for Key<'_> {
            fn from(range: RangeFrom<$int>) -> Self {
                Key::Slice {
                    start: Some(to_key_bound(range.start)),
                    stop: None,
                }
            }
        }

        impl From<RangeTo<$int>> for Key<'_> {
            fn from(range: RangeTo<$int>) -> Self {
                Key::Slice {
                    start: None,
                    stop: Some(to_key_bound(range.end)),
                }
            }
        }

        impl From<($int, $int)> for Key<'_> {
            fn from((start, stop): ($int, $int)) -> Self {
                Key::Slice {
                    start: Some(to_key_bound(start)),
                    stop: Some(to_key_bound(stop)),
                }
            }
        }
    )*};
}

impl_int_keys!(i32, i64, u32, usize);

impl From<RangeFull> for Key<'_> {
    fn from(_: RangeFull) -> Self {
        Key::Slice {
            start: None,
            stop: None,
        }
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Key::Name(name)
    }
}

/// Validated slice bounds.
fn bounds(start: Option<i64>, stop: Option<i64>) -> Result<(Option<u32>, Option<u32>), RangeError> {
    let invalid = RangeError::InvalidRange { start, stop };
    let to_bit = |bound: i64| {
        if bound < 0 {
            Err(invalid.clone())
        } else {
            Ok(u32::try_from(bound).unwrap_or(u32::MAX))
        }
    };

    let start = start.map(to_bit).transpose()?;
    let stop = stop.map(to_bit).transpose()?;
    if let (Some(start), Some(stop)) = (start, stop)
        && start >= stop
    {
        return Err(invalid);
    }

    Ok((start, stop))
}

/// Raw integer state of a detached view, enough to rebuild an equal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewState {
    pub x: u128,
}

/// An integer with an optional width, mask and field mapping.
///
/// Views returned by [BitView::get] alias a range of their parent: reads
/// recompute from the parent and writes go through to it. A child holds a
/// strong reference to its parent, so it keeps the whole chain up to its root
/// alive after the root binding is dropped. [Clone] always produces a detached
/// copy.
pub struct BitView {
    slot: Rc<Slot>,
}

impl BitView {
    /// Untyped view: no size, mask or mapping.
    pub fn new(value: u128) -> Self {
        ViewType::untyped().view(value)
    }

    /// View with a fixed size; the value is masked to `size` bits.
    pub fn with_size(value: u128, size: u32) -> Result<Self, SchemaError> {
        Ok(ViewType::new("BitView", None, None, Some(size))?.view(value))
    }

    /// View with an explicit mask; the value is reduced to `value & mask`.
    pub fn with_mask(value: u128, mask: u128) -> Result<Self, SchemaError> {
        Ok(ViewType::new("BitView", None, Some(mask), None)?.view(value))
    }

    pub(crate) fn from_type(ty: Rc<ViewType>, value: u128) -> Self {
        let value = ty.mask().map_or(value, |mask| value & mask);
        BitView {
            slot: Rc::new(Slot {
                ty,
                value: Cell::new(value),
                link: None,
            }),
        }
    }

    pub fn view_type(&self) -> &Rc<ViewType> {
        &self.slot.ty
    }

    /// Current value; linked views always re-read their parent.
    pub fn value(&self) -> u128 {
        self.slot.value()
    }

    /// Replaces the whole value. Fails if it is wider than the configured size.
    pub fn set_value(&mut self, value: u128) -> Result<(), RangeError> {
        if let Some(size) = self.size()
            && bit_length(value) > size
        {
            return Err(RangeError::Overflow {
                bits: bit_length(value),
                size,
            });
        }

        self.store(value);
        Ok(())
    }

    /// Masks and writes without size checks.
    pub(crate) fn store(&self, value: u128) {
        self.slot.store(value);
    }

    pub fn size(&self) -> Option<u32> {
        self.slot.ty.size()
    }

    pub fn mask(&self) -> Option<u128> {
        self.slot.ty.mask()
    }

    pub fn mapping(&self) -> Option<&Rc<ResolvedMapping>> {
        self.slot.ty.mapping()
    }

    /// Configured size, or the bit length of the current value.
    pub fn bit_width(&self) -> u32 {
        width_of(self.size(), self.value())
    }

    /// Bytes needed for [BitView::bit_width], at least 1.
    pub fn byte_len(&self) -> u32 {
        byte_length(self.bit_width())
    }

    pub fn is_linked(&self) -> bool {
        self.slot.link.is_some()
    }

    /// Bit offset inside the parent for linked views.
    pub fn offset(&self) -> Option<u32> {
        self.slot.link.as_ref().map(|link| link.offset)
    }

    pub fn is_zero(&self) -> bool {
        self.value() == 0
    }

    /// Value read as a two's complement number of [BitView::bit_width] bits.
    pub fn signed(&self) -> i128 {
        sign_extend(self.value(), self.bit_width())
    }

    /// Mapping keys in sorted order; empty without a mapping.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .mapping()
            .map(|mapping| mapping.names().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Plain value of a single bit.
    pub fn get_bit(&self, index: u32) -> Result<bool, RangeError> {
        if let Some(size) = self.size()
            && index >= size
        {
            return Err(RangeError::OutOfBounds { index, size });
        }

        Ok(index < MAX_WIDTH && (self.value() >> index) & 1 == 1)
    }

    /// Child view for a bit index, a range or a field name.
    ///
    /// The whole-value slice `..` returns a detached copy; every other key
    /// returns a view linked to `self`.
    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<BitView, Error> {
        match key.into() {
            Key::Index(index) => {
                let (start, _) = bounds(Some(index), None)?;
                let start = start.unwrap_or(0);
                let name = format!("{}_index_{start}", self.slot.ty.name());
                Ok(self.slice(start, Some(start.saturating_add(1)), None, &name)?)
            }
            Key::Slice { start, stop } => {
                let (start, stop) = bounds(start, stop)?;
                if start.is_none() && stop.is_none() {
                    return Ok(self.clone());
                }

                let start = start.unwrap_or(0);
                let stop = match self.size() {
                    Some(size) => Some(stop.map_or(size, |stop| stop.min(size))),
                    None => stop,
                };
                let name = format!(
                    "{}_slice_{start}_{}",
                    self.slot.ty.name(),
                    stop.map_or_else(|| "end".to_string(), |stop| stop.to_string())
                );
                Ok(self.slice(start, stop, None, &name)?)
            }
            Key::Name(name) => {
                let spec = self.lookup(name)?;
                let range = spec.range();
                let mapping = spec.mapping().cloned();
                Ok(self.slice(range.start, range.stop, mapping, name)?)
            }
        }
    }

    /// Writes `value` to the bits addressed by `key`.
    ///
    /// Rejected writes leave the value untouched.
    pub fn set<'k, V: TryInto<u128>>(
        &mut self,
        key: impl Into<Key<'k>>,
        value: V,
    ) -> Result<(), Error> {
        let value: u128 = value.try_into().map_err(|_| {
            TypeError::NonIntegerValue(format!(
                "a value of type {} outside 0..=u128::MAX",
                std::any::type_name::<V>()
            ))
        })?;

        match key.into() {
            Key::Index(index) => {
                let (start, _) = bounds(Some(index), None)?;
                let start = start.unwrap_or(0);
                self.write_range(start, Some(start.saturating_add(1)), value)?;
            }
            Key::Slice { start, stop } => match bounds(start, stop)? {
                (None, None) => self.set_value(value)?,
                (start, stop) => self.write_range(start.unwrap_or(0), stop, value)?,
            },
            Key::Name(name) => {
                let range = self.lookup(name)?.range();
                self.write_range(range.start, range.stop, value)?;
            }
        }

        Ok(())
    }

    /// Snapshot for persistence. Linked views refuse.
    pub fn state(&self) -> Result<ViewState, PersistenceError> {
        if self.is_linked() {
            return Err(PersistenceError::LinkedView);
        }

        Ok(ViewState { x: self.value() })
    }

    fn lookup(&self, name: &str) -> Result<&FieldSpec, LookupError> {
        if name.starts_with('_') {
            return Err(LookupError::UnknownField(name.to_string()));
        }

        self.mapping()
            .ok_or(LookupError::NoMapping)?
            .get(name)
            .ok_or_else(|| LookupError::UnknownField(name.to_string()))
    }

    /// Derives the child view over `[start, stop)`, clamping `stop` to the size.
    /// An open `stop` on an unsized view covers at least the start bit.
    fn slice(
        &self,
        start: u32,
        stop: Option<u32>,
        mapping: Option<Rc<ResolvedMapping>>,
        name: &str,
    ) -> Result<BitView, RangeError> {
        let size = self.size();
        if let Some(size) = size
            && start >= size
        {
            return Err(RangeError::OutOfBounds { index: start, size });
        }

        let stop = match (stop, size) {
            (Some(stop), Some(size)) => stop.min(size),
            (Some(stop), None) => stop,
            (None, _) => self.bit_width().max(start.saturating_add(1)),
        };
        if stop > MAX_WIDTH {
            return Err(RangeError::OutOfBounds {
                index: stop,
                size: MAX_WIDTH,
            });
        }
        if start >= stop {
            return Err(RangeError::InvalidRange {
                start: Some(start.into()),
                stop: Some(stop.into()),
            });
        }

        let mut slice_mask = mask_for(start, stop);
        if let Some(mask) = self.mask() {
            slice_mask &= mask;
        }

        let ty = self
            .slot
            .ty
            .derive(name, slice_mask, start, stop - start, mapping);
        let value = (self.value() & slice_mask) >> start;

        Ok(BitView {
            slot: Rc::new(Slot {
                ty,
                value: Cell::new(value),
                link: Some(Link {
                    parent: Rc::clone(&self.slot),
                    offset: start,
                    span: slice_mask,
                }),
            }),
        })
    }

    /// Writes `value` into `[start, stop)`; an open `stop` means the size, or
    /// [MAX_WIDTH] on an unsized view.
    fn write_range(&mut self, start: u32, stop: Option<u32>, value: u128) -> Result<(), RangeError> {
        if let (Some(size), Some(stop)) = (self.size(), stop)
            && stop > size
        {
            return Err(RangeError::Overflow { bits: stop, size });
        }

        let stop = stop.or(self.size()).unwrap_or(MAX_WIDTH);
        if stop > MAX_WIDTH {
            return Err(RangeError::Overflow {
                bits: stop,
                size: MAX_WIDTH,
            });
        }

        let bits = bit_length(value);
        let width = stop.saturating_sub(start);
        if bits > width {
            return Err(RangeError::DataTooWide { bits, width });
        }

        let mut mask = mask_for(start, stop);
        if let Some(own) = self.mask() {
            mask &= own;
        }
        let shifted = value.checked_shl(start).unwrap_or(0);

        self.store((self.value() & !mask) | shifted);
        Ok(())
    }
}

impl Clone for BitView {
    /// Detached copy: same type and value, no parent link.
    fn clone(&self) -> Self {
        BitView::from_type(Rc::clone(&self.slot.ty), self.value())
    }
}
