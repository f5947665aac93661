// Copyright (C) 2024 Parity Technologies (UK) Ltd. (admin@parity.io)
// This file is a part of the scale-registry crate.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//         http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! This module provides a [`TypeShape`] enum, which describes the shape of a type, or in other
//! words, how it should be SCALE encoded/decoded, as well as the [`TypeId`] used to point at
//! types in a [`crate::TypeRegistry`].

use alloc::string::String;
use alloc::vec::Vec;

/// An identifier pointing at exactly one type in a [`crate::TypeRegistry`].
///
/// Identifiers are plain numbers with no structure of their own; a shape stored under one
/// id is free to reference ids which haven't been inserted yet (forward references are
/// checked when the registry is resolved, not when it is built).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl core::fmt::Display for TypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(id: u32) -> Self {
        TypeId(id)
    }
}

/// A primitive type; a leaf in the shape graph.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Primitive {
    U8,
    U16,
    U32,
    U64,
    U128,
    I8,
    I16,
    I32,
    I64,
    I128,
    Bool,
    Str,
    Bytes,
}

impl Primitive {
    /// The number of bytes a value of this primitive occupies on the wire, or `None`
    /// for primitives whose encoding is length-prefixed (`Str` and `Bytes`).
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Primitive::U8 | Primitive::I8 => Some(1),
            Primitive::U16 | Primitive::I16 => Some(2),
            Primitive::U32 | Primitive::I32 => Some(4),
            Primitive::U64 | Primitive::I64 => Some(8),
            Primitive::U128 | Primitive::I128 => Some(16),
            Primitive::Bool => Some(1),
            Primitive::Str | Primitive::Bytes => None,
        }
    }

    /// Is this primitive an unsigned integer?
    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::U128
        )
    }

    /// Is this primitive a signed integer?
    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::I128
        )
    }
}

/// This describes the shape of a type, with the aim of providing enough information
/// that we know how to SCALE encode or decode values of it.
///
/// Shapes never own other shapes; anything nested is referenced by [`TypeId`] and lives
/// as its own entry in the registry. This keeps recursive and mutually recursive types
/// finite in memory.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TypeShape {
    /// A primitive type.
    Primitive(Primitive),
    /// A compact encoded integer. The target type must resolve (through aliases)
    /// to an unsigned integer primitive.
    Compact(TypeId),
    /// A named composite type. This contains a list of fields whose declared order
    /// is the wire order.
    StructOf(Vec<Field>),
    /// An enum containing a list of variants. The variant index is the wire
    /// discriminant; `reserved` indices consume a discriminant value but have no
    /// active variant, so that retired variants keep their slot.
    EnumOf {
        /// The active variants.
        variants: Vec<Variant>,
        /// Discriminant values that must not be produced or accepted.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reserved: Vec<u8>,
    },
    /// A fixed length array of some type. No length prefix is encoded.
    ArrayOf(TypeId, usize),
    /// A sequence of some type, prefixed with a compact encoded count.
    SequenceOf(TypeId),
    /// An optional value; one tag byte and then the value if the tag is 1.
    OptionOf(TypeId),
    /// An unnamed composite type.
    TupleOf(Vec<TypeId>),
    /// A map from some key type to some value type. The canonical encoding stores
    /// entries sorted by the encoded bytes of the key, with no duplicate keys.
    MapOf(TypeId, TypeId),
    /// A set of some type. The canonical encoding stores elements sorted by their
    /// encoded bytes, with no duplicates.
    SetOf(TypeId),
    /// A transparent alias to some other type in the registry; encodes identically
    /// to its target.
    AliasOf(TypeId),
}

/// A struct (or named variant) field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    /// The field name as it appears on the wire definition.
    pub name: String,
    /// An optional rename to use when surfacing the decoded field (eg because the
    /// wire name collides with a reserved word). Has no effect on the encoded bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// The type of the field value.
    pub ty: TypeId,
}

impl Field {
    /// Construct a new field.
    pub fn new(name: impl Into<String>, ty: TypeId) -> Field {
        Field { name: name.into(), alias: None, ty }
    }

    /// Construct a new field which is surfaced under a different name when decoded.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>, ty: TypeId) -> Field {
        Field { name: name.into(), alias: Some(alias.into()), ty }
    }

    /// The name this field is surfaced under when decoded.
    pub fn surfaced_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An enum variant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    /// The variant index, ie the wire discriminant.
    pub index: u8,
    /// The variant name.
    pub name: String,
    /// Shape of the variant's arguments.
    pub fields: VariantFields,
}

impl Variant {
    /// A variant carrying no payload.
    pub fn unit(index: u8, name: impl Into<String>) -> Variant {
        Variant { index, name: name.into(), fields: VariantFields::Unit }
    }

    /// A variant carrying a single unnamed payload.
    pub fn single(index: u8, name: impl Into<String>, ty: TypeId) -> Variant {
        Variant { index, name: name.into(), fields: VariantFields::Single(ty) }
    }

    /// A variant carrying named fields.
    pub fn named(index: u8, name: impl Into<String>, fields: Vec<Field>) -> Variant {
        Variant { index, name: name.into(), fields: VariantFields::Named(fields) }
    }
}

/// The shape of a variant's payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum VariantFields {
    /// No payload follows the discriminant.
    Unit,
    /// A single unnamed payload follows the discriminant.
    Single(TypeId),
    /// Named fields follow the discriminant, encoded like a struct.
    Named(Vec<Field>),
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec;

    #[test]
    fn primitive_widths() {
        assert_eq!(Primitive::U8.fixed_width(), Some(1));
        assert_eq!(Primitive::I64.fixed_width(), Some(8));
        assert_eq!(Primitive::U128.fixed_width(), Some(16));
        assert_eq!(Primitive::Bool.fixed_width(), Some(1));
        assert_eq!(Primitive::Str.fixed_width(), None);
        assert_eq!(Primitive::Bytes.fixed_width(), None);
    }

    #[test]
    fn surfaced_name_prefers_alias() {
        let plain = Field::new("new", TypeId(0));
        let renamed = Field::aliased("new", "new_", TypeId(0));
        assert_eq!(plain.surfaced_name(), "new");
        assert_eq!(renamed.surfaced_name(), "new_");
    }

    #[test]
    fn shapes_deserialize_from_json() {
        let shape: TypeShape = serde_json::from_str(r#"{ "Primitive": "U32" }"#).unwrap();
        assert_eq!(shape, TypeShape::Primitive(Primitive::U32));

        let shape: TypeShape = serde_json::from_str(r#"{ "ArrayOf": [7, 32] }"#).unwrap();
        assert_eq!(shape, TypeShape::ArrayOf(TypeId(7), 32));

        let shape: TypeShape = serde_json::from_str(
            r#"{ "EnumOf": {
                "variants": [
                    { "index": 0, "name": "A", "fields": "Unit" },
                    { "index": 2, "name": "C", "fields": { "Single": 1 } }
                ],
                "reserved": [1]
            }}"#,
        )
        .unwrap();
        assert_eq!(
            shape,
            TypeShape::EnumOf {
                variants: vec![Variant::unit(0, "A"), Variant::single(2, "C", TypeId(1))],
                reserved: vec![1],
            }
        );

        // `reserved` and field aliases can be omitted entirely.
        let shape: TypeShape = serde_json::from_str(
            r#"{ "EnumOf": { "variants": [
                { "index": 0, "name": "Only", "fields": { "Named": [
                    { "name": "new", "alias": "new_", "ty": 3 }
                ]}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(
            shape,
            TypeShape::EnumOf {
                variants: vec![Variant::named(
                    0,
                    "Only",
                    vec![Field::aliased("new", "new_", TypeId(3))]
                )],
                reserved: vec![],
            }
        );
    }
}
