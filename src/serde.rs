//! JSON‑deserializable schema description and view persistence.
//!
//! These types describe the *layout* of a bit view type. They are intended to
//! be loaded from JSON (for example a register map shipped with your
//! application) and then compiled into a [`ViewType`].
//!
//! ```json
//! {
//!   "name": "Status",
//!   "size": 8,
//!   "fields": [
//!     { "name": "flag", "kind": { "type": "Bit", "index": 0 } },
//!     { "name": "block", "kind": { "type": "Nested", "start": 1, "stop": 6,
//!       "fields": [{ "name": "pair", "kind": { "type": "Range", "start": 1, "stop": 3 } }] } }
//!   ]
//! }
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize, Serializer, ser::Error as _};

use crate::{
    errors::{Error, SchemaError},
    field::{RawField, RawMapping},
    view::BitView,
    view_type::ViewType,
};

/// Top‑level schema definition: a named type with optional size, mask and fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    /// Type name, used in debug output and derived type names.
    pub name: String,
    /// Fixed width in bits.
    #[serde(default)]
    pub size: Option<u32>,
    /// Explicit mask; defaults to all `size` bits.
    #[serde(default)]
    pub mask: Option<u128>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Description of a single named field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKindDef,
}

/// Kind of field in the schema.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum FieldKindDef {
    /// Single bit.
    Bit { index: i64 },
    /// Bits `[start, stop)`.
    Range { start: i64, stop: i64 },
    /// Slice with optional bounds; a missing `stop` runs to the end of the value.
    Slice {
        #[serde(default)]
        start: Option<i64>,
        #[serde(default)]
        stop: Option<i64>,
        #[serde(default)]
        step: Option<i64>,
    },
    /// Block `[start, stop)` whose own fields are relative to `start`.
    Nested {
        start: i64,
        stop: i64,
        fields: Vec<FieldDef>,
    },
    /// Any other tag; reported as an unrecognized field.
    #[serde(other)]
    Unknown,
}

impl From<Vec<FieldDef>> for RawMapping {
    fn from(fields: Vec<FieldDef>) -> Self {
        fields
            .into_iter()
            .map(|field| (field.name, RawField::from(field.kind)))
            .collect()
    }
}

impl From<FieldKindDef> for RawField {
    fn from(kind: FieldKindDef) -> Self {
        match kind {
            FieldKindDef::Bit { index } => RawField::Bit(index),
            FieldKindDef::Range { start, stop } => RawField::Pair(start, stop),
            FieldKindDef::Slice { start, stop, step } => RawField::Slice { start, stop, step },
            FieldKindDef::Nested {
                start,
                stop,
                fields,
            } => RawField::Nested(RawMapping::block(start, stop, fields.into())),
            FieldKindDef::Unknown => RawField::Unrecognized("unknown field kind".to_string()),
        }
    }
}

impl SchemaDef {
    /// Resolves the fields and builds the view type.
    pub fn compile(self) -> Result<Rc<ViewType>, SchemaError> {
        let mut builder = ViewType::builder(self.name).fields(self.fields.into());
        if let Some(size) = self.size {
            builder = builder.size(size);
        }
        if let Some(mask) = self.mask {
            builder = builder.mask(mask);
        }
        builder.build()
    }
}

impl ViewType {
    /// Parses a [SchemaDef] from JSON and compiles it.
    pub fn from_json(json: &str) -> Result<Rc<ViewType>, Error> {
        let def: SchemaDef = serde_json::from_str(json)?;
        Ok(def.compile()?)
    }
}

/// Serializes the view's [crate::view::ViewState]; linked views fail.
impl Serialize for BitView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.state().map_err(S::Error::custom)?.serialize(serializer)
    }
}
