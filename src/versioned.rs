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

//! Support for versioned envelopes: enums whose variants are successive protocol
//! versions of one logical type (`V2`, `V3`, ... in ascending index order), the way
//! types like locations and assets evolve across runtime upgrades.
//!
//! An envelope is an ordinary [`crate::TypeShape::EnumOf`] as far as the codec is
//! concerned; the discriminant byte selects exactly one version's layout and no
//! cross-version conversion ever happens. What this module adds is addressing:
//! [`ResolvedRegistry::resolve_version()`] finds the payload type of one version arm,
//! and [`ResolvedRegistry::peek_version()`] reads the discriminant off the front of
//! some bytes without decoding the payload, which is all a version negotiation step
//! needs.

use crate::codec::DecodeError;
use crate::resolver::ResolvedRegistry;
use crate::type_shape::{TypeId, TypeShape, Variant, VariantFields};
use alloc::string::{String, ToString};
use smallvec::SmallVec;

/// An error addressing a versioned envelope.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum VersionError {
    #[display(fmt = "No type named '{_0}' found in the registry")]
    TypeNotFound(String),
    #[display(fmt = "The type '{_0}' is not a versioned envelope")]
    NotAnEnvelope(String),
    #[display(fmt = "The envelope '{name}' has no arm for version {version}")]
    VersionNotFound { name: String, version: u64 },
    #[display(fmt = "Version {version} of '{name}' does not carry a single payload type")]
    NoVersionPayload { name: String, version: u64 },
    #[display(fmt = "{_0}")]
    Decode(DecodeError),
}

#[cfg(feature = "std")]
impl std::error::Error for VersionError {}

impl From<DecodeError> for VersionError {
    fn from(e: DecodeError) -> Self {
        VersionError::Decode(e)
    }
}

impl ResolvedRegistry {
    /// Find the payload [`TypeId`] of one version arm of the named envelope. This is
    /// how callers get at the layout of a specific protocol version, eg to encode a
    /// value of just that version rather than the whole envelope.
    pub fn resolve_version(&self, name: &str, version: u64) -> Result<TypeId, VersionError> {
        let id = self
            .lookup_name(name)
            .ok_or_else(|| VersionError::TypeNotFound(name.to_string()))?;
        let (_, shape) = self
            .get_unaliased(id)
            .ok_or_else(|| VersionError::TypeNotFound(name.to_string()))?;
        let TypeShape::EnumOf { variants, .. } = shape else {
            return Err(VersionError::NotAnEnvelope(name.to_string()));
        };

        let arms = envelope_arms(variants)
            .ok_or_else(|| VersionError::NotAnEnvelope(name.to_string()))?;

        let arm = arms
            .iter()
            .find(|(v, _)| *v == version)
            .ok_or_else(|| VersionError::VersionNotFound { name: name.to_string(), version })?;

        match &arm.1.fields {
            VariantFields::Single(ty) => Ok(*ty),
            _ => Err(VersionError::NoVersionPayload { name: name.to_string(), version }),
        }
    }

    /// Read the version discriminant off the front of `bytes` without decoding the
    /// payload behind it. The shape under `id` must be a versioned envelope (aliases
    /// are looked through). Reserved or out-of-range discriminants fail the same way
    /// a full decode would.
    pub fn peek_version(&self, id: TypeId, bytes: &[u8]) -> Result<u8, VersionError> {
        let (enum_id, shape) = self
            .get_unaliased(id)
            .ok_or(VersionError::Decode(DecodeError::TypeNotFound(id)))?;
        let TypeShape::EnumOf { variants, reserved } = shape else {
            return Err(VersionError::NotAnEnvelope(enum_id.to_string()));
        };
        if envelope_arms(variants).is_none() {
            return Err(VersionError::NotAnEnvelope(enum_id.to_string()));
        }

        let discriminant = *bytes.first().ok_or(DecodeError::TruncatedInput)?;
        if reserved.contains(&discriminant) || !variants.iter().any(|v| v.index == discriminant) {
            return Err(DecodeError::InvalidDiscriminant { id: enum_id, discriminant }.into());
        }
        Ok(discriminant)
    }
}

// Hand back the `(version, variant)` arms if this list of variants follows the
// envelope convention: every arm named `V<n>`, with versions strictly ascending
// in discriminant order.
fn envelope_arms(variants: &[Variant]) -> Option<SmallVec<[(u64, &Variant); 8]>> {
    let mut arms: SmallVec<[(u64, &Variant); 8]> =
        variants.iter().map(|v| Some((parse_version(&v.name)?, v))).collect::<Option<_>>()?;
    arms.sort_by_key(|(_, v)| v.index);
    let ascending = arms.windows(2).all(|w| w[0].0 < w[1].0);
    ascending.then_some(arms)
}

fn parse_version(name: &str) -> Option<u64> {
    name.strip_prefix('V')?.parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{decode_exact, encode};
    use crate::test_utils::to_resolved_named;
    use crate::type_shape::{Field, Primitive};
    use crate::value::Value;
    use alloc::vec;

    // A "Location" type that went through three protocol versions, with the V3
    // slot retired and reserved.
    fn location_registry() -> ResolvedRegistry {
        to_resolved_named(
            vec![
                (0, TypeShape::Primitive(Primitive::U32)),
                (1, TypeShape::Primitive(Primitive::U64)),
                // V2 payload: a single index.
                (2, TypeShape::StructOf(vec![Field::new("index", TypeId(0))])),
                // V4 payload: a wider index plus a flag.
                (3, TypeShape::Primitive(Primitive::Bool)),
                (
                    4,
                    TypeShape::StructOf(vec![
                        Field::new("index", TypeId(1)),
                        Field::new("relative", TypeId(3)),
                    ]),
                ),
                (6, TypeShape::AliasOf(TypeId(5))),
            ],
            vec![(
                5,
                "Location",
                TypeShape::EnumOf {
                    variants: vec![
                        Variant::single(0, "V2", TypeId(2)),
                        Variant::single(2, "V4", TypeId(4)),
                    ],
                    reserved: vec![1],
                },
            )],
        )
    }

    #[test]
    fn resolve_version_finds_the_arm_payload() {
        let types = location_registry();
        assert_eq!(types.resolve_version("Location", 2), Ok(TypeId(2)));
        assert_eq!(types.resolve_version("Location", 4), Ok(TypeId(4)));
    }

    #[test]
    fn missing_versions_and_names_fail() {
        let types = location_registry();
        assert_eq!(
            types.resolve_version("Location", 3),
            Err(VersionError::VersionNotFound { name: "Location".into(), version: 3 })
        );
        assert_eq!(
            types.resolve_version("Junctions", 2),
            Err(VersionError::TypeNotFound("Junctions".into()))
        );
    }

    #[test]
    fn non_envelope_types_are_rejected() {
        let types = to_resolved_named(
            vec![],
            vec![
                (0, "PlainStruct", TypeShape::StructOf(vec![])),
                (
                    1,
                    "PlainEnum",
                    TypeShape::EnumOf {
                        variants: vec![Variant::unit(0, "A"), Variant::unit(1, "B")],
                        reserved: vec![],
                    },
                ),
            ],
        );
        assert_eq!(
            types.resolve_version("PlainStruct", 1),
            Err(VersionError::NotAnEnvelope("PlainStruct".into()))
        );
        assert_eq!(
            types.resolve_version("PlainEnum", 1),
            Err(VersionError::NotAnEnvelope("PlainEnum".into()))
        );
    }

    #[test]
    fn peek_version_reads_only_the_discriminant() {
        let types = location_registry();
        let envelope = TypeId(5);

        let v4 = Value::variant(
            "V4",
            Value::composite([
                ("index", Value::uint(12u8)),
                ("relative", Value::Bool(true)),
            ]),
        );
        let bytes = encode(&types, envelope, &v4).unwrap();
        assert_eq!(types.peek_version(envelope, &bytes), Ok(2));

        // Peeking doesn't care that the payload is garbage or missing.
        assert_eq!(types.peek_version(envelope, &[2]), Ok(2));

        // But a reserved or unknown discriminant fails like a full decode would.
        assert_eq!(
            types.peek_version(envelope, &[1]),
            Err(VersionError::Decode(DecodeError::InvalidDiscriminant {
                id: envelope,
                discriminant: 1
            }))
        );
        assert_eq!(
            types.peek_version(envelope, &[]),
            Err(VersionError::Decode(DecodeError::TruncatedInput))
        );

        // The full decode agrees with the peeked arm.
        assert_eq!(decode_exact(&types, envelope, &bytes).unwrap(), v4);
    }

    #[test]
    fn peek_version_looks_through_aliases() {
        let types = location_registry();
        let v2 = Value::variant("V2", Value::composite([("index", Value::uint(7u8))]));
        let bytes = encode(&types, TypeId(5), &v2).unwrap();
        assert_eq!(types.peek_version(TypeId(6), &bytes), Ok(0));
    }
}
