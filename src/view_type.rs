//! View types: the shared size, mask and mapping every view of one schema uses.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    bits::{MAX_WIDTH, bit_length, low_mask, range_of},
    errors::{SchemaError, TypeError},
    field::RawMapping,
    schema::{ResolvedMapping, resolve},
    view::{BitView, ViewState},
};

/// Structural key of a type derived by slicing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DerivedKey {
    mask: u128,
    size: u32,
    name: String,
}

/// Size, mask and mapping shared by every view of one schema.
///
/// Types are handed out as `Rc<ViewType>`. Slicing a view derives child types,
/// which are memoized per parent type by `(mask, size, name)`.
#[derive(Debug)]
pub struct ViewType {
    name: String,
    size: Option<u32>,
    mask: Option<u128>,
    mapping: Option<Rc<ResolvedMapping>>,
    derived: RefCell<HashMap<DerivedKey, Rc<ViewType>>>,
}

thread_local! {
    static UNTYPED: Rc<ViewType> = Rc::new(ViewType::bare("BitView", None, None, None));
}

impl ViewType {
    fn bare(
        name: &str,
        size: Option<u32>,
        mask: Option<u128>,
        mapping: Option<Rc<ResolvedMapping>>,
    ) -> Self {
        ViewType {
            name: name.to_string(),
            size,
            mask,
            mapping,
            derived: RefCell::default(),
        }
    }

    /// Builds a type from an already resolved mapping.
    ///
    /// A size without a mask implies `mask = (1 << size) - 1`; a mask without a
    /// size implies `size = bit_length(mask)`. An empty mapping counts as none.
    pub fn new(
        name: &str,
        mapping: Option<ResolvedMapping>,
        mask: Option<u128>,
        size: Option<u32>,
    ) -> Result<Rc<Self>, SchemaError> {
        if let Some(size) = size
            && (size == 0 || size > MAX_WIDTH)
        {
            return Err(SchemaError::InvalidSize(size));
        }

        let (size, mask) = match (size, mask) {
            (_, Some(0)) => return Err(SchemaError::InvalidMask(0)),
            (Some(size), Some(mask)) if bit_length(mask) > size => {
                return Err(SchemaError::InvalidMask(mask));
            }
            (Some(size), Some(mask)) => (Some(size), Some(mask)),
            (Some(size), None) => (Some(size), Some(low_mask(size))),
            (None, Some(mask)) => (range_of(mask).map(|(_, stop)| stop), Some(mask)),
            (None, None) => (None, None),
        };

        let mapping = mapping.filter(|mapping| !mapping.is_empty());
        if let (Some(size), Some(mapping)) = (size, &mapping)
            && let Some((field, _)) = mapping.iter().find(|(_, spec)| {
                let range = spec.range();
                range.start >= size || range.stop.is_some_and(|stop| stop > size)
            })
        {
            return Err(SchemaError::FieldBeyondSize {
                field: field.to_string(),
                size,
            });
        }

        log::debug!(
            "built view type {name} (size {size:?}, mask {mask:?}, {} fields)",
            mapping.as_ref().map_or(0, ResolvedMapping::len)
        );

        Ok(Rc::new(ViewType::bare(name, size, mask, mapping.map(Rc::new))))
    }

    /// Starts configuring a type named `name`.
    pub fn builder(name: impl Into<String>) -> ViewTypeBuilder {
        ViewTypeBuilder {
            name: name.into(),
            size: None,
            mask: None,
            fields: None,
        }
    }

    /// Type without size, mask or mapping, shared per thread.
    pub fn untyped() -> Rc<Self> {
        UNTYPED.with(Rc::clone)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn mask(&self) -> Option<u128> {
        self.mask
    }

    pub fn mapping(&self) -> Option<&Rc<ResolvedMapping>> {
        self.mapping.as_ref()
    }

    /// Creates a detached view holding `value & mask`.
    pub fn view(self: &Rc<Self>, value: u128) -> BitView {
        BitView::from_type(Rc::clone(self), value)
    }

    /// Parses `text` in `base` (2..=36, or 0 to detect a `0x`/`0o`/`0b` prefix).
    pub fn parse(self: &Rc<Self>, text: &str, base: u32) -> Result<BitView, TypeError> {
        Ok(self.view(parse_integer(text, base)?))
    }

    /// Rebuilds a detached view from a stored [ViewState].
    pub fn restore(self: &Rc<Self>, state: ViewState) -> BitView {
        self.view(state.x)
    }

    /// Type of the slice `slice_mask` (parent coordinates) starting at `start`.
    pub(crate) fn derive(
        &self,
        name: &str,
        slice_mask: u128,
        start: u32,
        size: u32,
        mapping: Option<Rc<ResolvedMapping>>,
    ) -> Rc<ViewType> {
        let key = DerivedKey {
            mask: slice_mask,
            size,
            name: name.to_string(),
        };

        if let Some(derived) = self.derived.borrow().get(&key) {
            return Rc::clone(derived);
        }

        log::trace!("deriving view type {name} from {} with mask {slice_mask:#x}", self.name);
        let derived = Rc::new(ViewType::bare(
            name,
            Some(size),
            Some(slice_mask >> start),
            mapping,
        ));
        self.derived.borrow_mut().insert(key, Rc::clone(&derived));

        derived
    }

    #[cfg(test)]
    pub(crate) fn derived_count(&self) -> usize {
        self.derived.borrow().len()
    }
}

/// Declarative layer entry point: builds a [ViewType] from a resolved mapping.
pub fn make_view_type(
    name: &str,
    mapping: Option<ResolvedMapping>,
    mask: Option<u128>,
    size: Option<u32>,
) -> Result<Rc<ViewType>, SchemaError> {
    ViewType::new(name, mapping, mask, size)
}

/// Configuration for a [ViewType]: optional size, mask and raw fields.
#[derive(Debug, Clone)]
pub struct ViewTypeBuilder {
    name: String,
    size: Option<u32>,
    mask: Option<u128>,
    fields: Option<RawMapping>,
}

impl ViewTypeBuilder {
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn mask(mut self, mask: u128) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn fields(mut self, fields: RawMapping) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Resolves the fields and validates size and mask.
    pub fn build(self) -> Result<Rc<ViewType>, SchemaError> {
        let mapping = self.fields.as_ref().map(resolve).transpose()?;
        ViewType::new(&self.name, mapping, self.mask, self.size)
    }
}

fn parse_integer(text: &str, base: u32) -> Result<u128, TypeError> {
    let invalid = || TypeError::NonIntegerValue(format!("{text:?} in base {base}"));

    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    let prefixed = |prefix: &str| cleaned.strip_prefix(prefix);
    let (radix, digits) = match base {
        0 => {
            if let Some(digits) = prefixed("0x") {
                (16, digits)
            } else if let Some(digits) = prefixed("0o") {
                (8, digits)
            } else if let Some(digits) = prefixed("0b") {
                (2, digits)
            } else {
                (10, cleaned.as_str())
            }
        }
        16 => (16, prefixed("0x").unwrap_or(&cleaned)),
        8 => (8, prefixed("0o").unwrap_or(&cleaned)),
        2 => (2, prefixed("0b").unwrap_or(&cleaned)),
        2..=36 => (base, cleaned.as_str()),
        _ => return Err(invalid()),
    };

    u128::from_str_radix(digits, radix).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_from_size() {
        let ty = ViewType::builder("MaskFromSize").size(8).build().unwrap();
        assert_eq!(ty.mask(), Some(0b11111111));
    }

    #[test]
    fn test_size_from_mask() {
        let ty = ViewType::builder("SizeFromMask").mask(0b1111).build().unwrap();
        assert_eq!(ty.size(), Some(4));

        let holes = ViewType::builder("Holes").mask(0b1010_0000).build().unwrap();
        assert_eq!(holes.size(), Some(8));
    }

    #[test]
    fn test_explicit_mask_overrides_size_mask() {
        let ty = ViewType::builder("Both").size(8).mask(0b1010).build().unwrap();
        assert_eq!(ty.size(), Some(8));
        assert_eq!(ty.mask(), Some(0b1010));
    }

    #[test]
    fn test_invalid_size() {
        assert_eq!(
            ViewType::builder("Zero").size(0).build().unwrap_err(),
            SchemaError::InvalidSize(0)
        );
        assert_eq!(
            ViewType::builder("Wide").size(129).build().unwrap_err(),
            SchemaError::InvalidSize(129)
        );
    }

    #[test]
    fn test_invalid_mask() {
        assert_eq!(
            ViewType::builder("Zero").mask(0).build().unwrap_err(),
            SchemaError::InvalidMask(0)
        );
        assert_eq!(
            ViewType::builder("Wider").size(4).mask(0b10000).build().unwrap_err(),
            SchemaError::InvalidMask(0b10000)
        );
    }

    #[test]
    fn test_field_beyond_size() {
        let err = ViewType::builder("Small")
            .size(4)
            .fields(RawMapping::new().bit("low", 0).bit("far", 4))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::FieldBeyondSize {
                field: "far".to_string(),
                size: 4,
            }
        );
    }

    #[test]
    fn test_field_running_past_size() {
        let err = ViewType::builder("Small")
            .size(8)
            .fields(RawMapping::new().range("f", 6, 12))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::FieldBeyondSize {
                field: "f".to_string(),
                size: 8,
            }
        );

        let fits = ViewType::builder("Fits")
            .size(8)
            .fields(RawMapping::new().range("f", 6, 8))
            .build();
        assert!(fits.is_ok());
    }

    #[test]
    fn test_empty_mapping_is_none() {
        let ty = ViewType::builder("Empty").fields(RawMapping::new()).build().unwrap();
        assert!(ty.mapping().is_none());
    }

    #[test]
    fn test_make_view_type() {
        let mapping = resolve(&RawMapping::new().range("a", 0, 4)).unwrap();
        let ty = make_view_type("Typed", Some(mapping), None, Some(8)).unwrap();
        assert_eq!(ty.name(), "Typed");
        assert_eq!(ty.mapping().unwrap().len(), 1);
    }

    #[test]
    fn test_derive_is_memoized() {
        let ty = ViewType::builder("Parent").size(8).build().unwrap();
        let first = ty.derive("low", 0b1111, 0, 4, None);
        let second = ty.derive("low", 0b1111, 0, 4, None);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(ty.derived_count(), 1);

        let other = ty.derive("high", 0b1111_0000, 4, 4, None);
        assert_eq!(other.mask(), Some(0b1111));
        assert_eq!(ty.derived_count(), 2);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42", 10).unwrap(), 42);
        assert_eq!(parse_integer("ff", 16).unwrap(), 255);
        assert_eq!(parse_integer("0xFF", 16).unwrap(), 255);
        assert_eq!(parse_integer("0b1010", 0).unwrap(), 10);
        assert_eq!(parse_integer("0o17", 0).unwrap(), 15);
        assert_eq!(parse_integer("1_000", 0).unwrap(), 1000);
        assert_eq!(parse_integer(" z ", 36).unwrap(), 35);
    }

    #[test]
    fn test_parse_integer_rejects_garbage() {
        assert!(matches!(
            parse_integer("-1", 10),
            Err(TypeError::NonIntegerValue(_))
        ));
        assert!(parse_integer("12", 1).is_err());
        assert!(parse_integer("0x", 0).is_err());
        assert!(parse_integer("g", 16).is_err());
    }

    #[test]
    fn test_parse_masks_value() {
        let ty = ViewType::builder("Nibble").size(4).build().unwrap();
        let view = ty.parse("0xFF", 16).unwrap();
        assert_eq!(view.value(), 0xF);
    }
}
