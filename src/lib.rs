//! # bitview
//!
//! Named, self-validating access to bit ranges of an integer.
//!
//! Describe a layout once as a set of fields (single bits, `[start, stop)`
//! ranges, open-ended tails or nested blocks with their own fields), build a
//! [ViewType] from it, then read and write values through field names or bit
//! ranges. Slices of a view are live: writing to a field writes through to the
//! value it was taken from.
//!
//! ## Example
//!
//! ```
//! use bitview::{RawMapping, ViewType};
//!
//! let status = ViewType::builder("Status")
//!     .size(8)
//!     .fields(
//!         RawMapping::new()
//!             .bit("flag", 0)
//!             .nested("block", 1, 6, RawMapping::new().bit("bit", 0).range("pair", 1, 3)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let view = status.view(0xFF);
//! assert_eq!(view.get("block").unwrap().value(), 0b11111);
//!
//! view.get("block").unwrap().set_value(0).unwrap();
//! assert_eq!(view.value(), 0b11000001);
//!
//! view.get("block").unwrap().set("pair", 3).unwrap();
//! assert_eq!(view.value(), 0b11001101);
//! ```

pub mod bits;
pub mod errors;
pub mod field;
pub mod ops;
pub mod range;
pub mod render;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod view;
pub mod view_type;

pub use bits::MAX_WIDTH;
pub use errors::{Error, LookupError, PersistenceError, RangeError, SchemaError, TypeError};
pub use field::{FieldSpec, INDEX_KEY, RawField, RawMapping};
pub use ops::Arith;
pub use range::BitRange;
pub use render::Formatter;
pub use schema::{ResolvedMapping, resolve as resolve_schema};
pub use view::{BitView, Key, ViewState};
pub use view_type::{ViewType, ViewTypeBuilder, make_view_type};
