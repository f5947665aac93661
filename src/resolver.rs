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

//! This module provides [`resolve()`], which validates a raw [`TypeRegistry`] into a
//! [`ResolvedRegistry`]: an immutable graph of type shapes where every referenced
//! [`TypeId`] is known to exist, every enum's discriminant space is contiguous, and
//! every recursive type is known to make byte progress. The codec in [`crate::codec`]
//! only ever operates on resolved registries.

use crate::type_registry::{NameStr, TypeRegistry};
use crate::type_shape::{Field, TypeId, TypeShape, Variant, VariantFields};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

/// An error validating a [`TypeRegistry`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ResolveError {
    #[display(fmt = "Type {_0} is referenced but never declared")]
    UnresolvedReference(TypeId),
    #[display(fmt = "Type {_0} recursively contains itself without consuming any bytes")]
    UnproductiveRecursion(TypeId),
    #[display(fmt = "The variant indices of type {_0} (including reserved slots) are not contiguous from 0")]
    NonContiguousVariants(TypeId),
    #[display(fmt = "Type {id} declares the variant index {index} more than once")]
    DuplicateVariantIndex { id: TypeId, index: u8 },
    #[display(fmt = "Type {id} declares a variant at index {index}, which is a reserved slot")]
    ReservedIndexOccupied { id: TypeId, index: u8 },
    #[display(fmt = "Type {id} declares the variant name '{name}' more than once")]
    DuplicateVariantName { id: TypeId, name: String },
    #[display(fmt = "Type {id} declares the field name '{name}' more than once")]
    DuplicateFieldName { id: TypeId, name: String },
    #[display(fmt = "The compact type {id} does not point at an unsigned integer primitive")]
    CompactNotNumeric { id: TypeId },
}

#[cfg(feature = "std")]
impl std::error::Error for ResolveError {}

/// A validated, immutable registry of type shapes.
///
/// Every id reachable from any declared shape is guaranteed to exist, so codec walks
/// never hit dangling references. The registry is never mutated after construction and
/// can be shared freely across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRegistry {
    types: HashMap<TypeId, TypeShape>,
    names: HashMap<NameStr, TypeId>,
}

impl ResolvedRegistry {
    /// Fetch the shape stored under an id.
    pub fn get(&self, id: TypeId) -> Option<&TypeShape> {
        self.types.get(&id)
    }

    /// Fetch the id registered under a name, if any.
    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// The number of types in the registry.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follow alias indirections from the given id until a non-alias shape is reached.
    /// Alias chains are known to be finite after resolution.
    pub(crate) fn get_unaliased(&self, id: TypeId) -> Option<(TypeId, &TypeShape)> {
        let mut id = id;
        loop {
            match self.types.get(&id)? {
                TypeShape::AliasOf(target) => id = *target,
                shape => return Some((id, shape)),
            }
        }
    }
}

/// Validate a raw [`TypeRegistry`], consuming it and handing back an immutable
/// [`ResolvedRegistry`] that the codec can work against.
///
/// Cycles are fine (recursive types are a fact of life) so long as every cycle passes
/// through at least one shape that consumes bytes of its own (a sequence, option,
/// compact, enum, map or set). Structs, tuples, arrays and aliases add no framing, so
/// a cycle made only of those describes a type with no finite encoding and fails with
/// [`ResolveError::UnproductiveRecursion`]. Such cycles are found by walking the
/// subgraph of frame-free edges on its own, so one is caught even when other paths
/// into it do consume bytes.
pub fn resolve(registry: TypeRegistry) -> Result<ResolvedRegistry, ResolveError> {
    let (types, names) = registry.into_parts();

    // Sorting ids first makes error reporting deterministic.
    let mut ids: Vec<TypeId> = types.keys().copied().collect();
    ids.sort();

    // Per-shape checks and reference existence first, so the walks below can assume
    // every edge lands on a declared shape.
    for &id in &ids {
        if let Some(shape) = types.get(&id) {
            check_shape(id, shape, &types)?;
        }
    }

    let mut marks = HashMap::new();
    for &id in &ids {
        check_unframed_cycles(&types, &mut marks, id)?;
    }

    // Compact targets last: alias chains are known to terminate by this point.
    for &id in &ids {
        if let Some(TypeShape::Compact(inner)) = types.get(&id) {
            check_compact_target(&types, id, *inner)?;
        }
    }

    Ok(ResolvedRegistry { types, names })
}

// Validate one shape in isolation: name and index uniqueness, and that every id it
// references is declared somewhere in the registry.
fn check_shape(
    id: TypeId,
    shape: &TypeShape,
    types: &HashMap<TypeId, TypeShape>,
) -> Result<(), ResolveError> {
    match shape {
        TypeShape::StructOf(fields) => check_field_names(id, fields)?,
        TypeShape::EnumOf { variants, reserved } => {
            check_variant_indices(id, variants, reserved)?;
            for variant in variants {
                if let VariantFields::Named(fields) = &variant.fields {
                    check_field_names(id, fields)?;
                }
            }
        }
        _ => {}
    }

    for target in referenced_ids(shape) {
        if !types.contains_key(&target) {
            return Err(ResolveError::UnresolvedReference(target));
        }
    }
    Ok(())
}

enum Mark {
    // The id is on the current walk path.
    InProgress,
    Done,
}

// Walk only the edges that add no framing of their own. A cycle made purely of such
// edges can never finish encoding; any other cycle passes through a byte-consuming
// shape and is productive. `Done` is sound to memoize here because "no frame-free
// cycle is reachable from this id" does not depend on how the id was reached.
fn check_unframed_cycles(
    types: &HashMap<TypeId, TypeShape>,
    marks: &mut HashMap<TypeId, Mark>,
    id: TypeId,
) -> Result<(), ResolveError> {
    match marks.get(&id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => return Err(ResolveError::UnproductiveRecursion(id)),
        None => {}
    }

    let shape = types.get(&id).ok_or(ResolveError::UnresolvedReference(id))?;
    marks.insert(id, Mark::InProgress);
    for next in unframed_edges(shape) {
        check_unframed_cycles(types, marks, next)?;
    }
    marks.insert(id, Mark::Done);
    Ok(())
}

// The edges that consume no bytes of their own: struct and tuple fields, array
// elements and alias targets. Sequences, options, compacts, enums, maps and sets all
// put at least one byte on the wire before recursing into their children.
fn unframed_edges(shape: &TypeShape) -> SmallVec<[TypeId; 8]> {
    match shape {
        TypeShape::StructOf(fields) => fields.iter().map(|f| f.ty).collect(),
        TypeShape::TupleOf(tys) => SmallVec::from_slice(tys),
        TypeShape::ArrayOf(ty, _) | TypeShape::AliasOf(ty) => smallvec::smallvec![*ty],
        _ => SmallVec::new(),
    }
}

// Every id a shape refers to, framing or not.
fn referenced_ids(shape: &TypeShape) -> SmallVec<[TypeId; 8]> {
    match shape {
        TypeShape::Primitive(_) => SmallVec::new(),
        TypeShape::Compact(ty)
        | TypeShape::ArrayOf(ty, _)
        | TypeShape::SequenceOf(ty)
        | TypeShape::OptionOf(ty)
        | TypeShape::SetOf(ty)
        | TypeShape::AliasOf(ty) => smallvec::smallvec![*ty],
        TypeShape::StructOf(fields) => fields.iter().map(|f| f.ty).collect(),
        TypeShape::TupleOf(tys) => SmallVec::from_slice(tys),
        TypeShape::MapOf(key, value) => smallvec::smallvec![*key, *value],
        TypeShape::EnumOf { variants, .. } => variants
            .iter()
            .flat_map(|v| match &v.fields {
                VariantFields::Unit => SmallVec::new(),
                VariantFields::Single(ty) => smallvec::smallvec![*ty],
                VariantFields::Named(fields) => {
                    fields.iter().map(|f| f.ty).collect::<SmallVec<[TypeId; 8]>>()
                }
            })
            .collect(),
    }
}

// The inner type of a compact must be an unsigned integer primitive, possibly behind
// aliases. Alias chains are already known to be cycle-free when this runs.
fn check_compact_target(
    types: &HashMap<TypeId, TypeShape>,
    id: TypeId,
    inner: TypeId,
) -> Result<(), ResolveError> {
    let mut target = inner;
    loop {
        match types.get(&target).ok_or(ResolveError::UnresolvedReference(target))? {
            TypeShape::AliasOf(next) => target = *next,
            TypeShape::Primitive(p) if p.is_unsigned_int() => return Ok(()),
            _ => return Err(ResolveError::CompactNotNumeric { id }),
        }
    }
}

// Every name a field can be addressed by (its wire name or its alias) must be unique
// across the whole composite, else an encoded entry could match more than one field.
// Wire names and aliases share one namespace here: one field's alias colliding with
// another field's wire name is just as ambiguous as two equal wire names.
fn check_field_names(id: TypeId, fields: &[Field]) -> Result<(), ResolveError> {
    let mut names = HashSet::new();
    for field in fields {
        if !names.insert(field.surfaced_name()) {
            return Err(ResolveError::DuplicateFieldName {
                id,
                name: field.surfaced_name().to_string(),
            });
        }
        if field.surfaced_name() != field.name && !names.insert(field.name.as_str()) {
            return Err(ResolveError::DuplicateFieldName { id, name: field.name.clone() });
        }
    }
    Ok(())
}

fn check_variant_indices(
    id: TypeId,
    variants: &[Variant],
    reserved: &[u8],
) -> Result<(), ResolveError> {
    let total = variants.len() + reserved.len();

    // Discriminants are single bytes, so more than 256 slots can never be contiguous.
    if total > 256 {
        return Err(ResolveError::NonContiguousVariants(id));
    }

    let mut occupied: SmallVec<[bool; 16]> = smallvec::smallvec![false; total];
    let mut names = HashSet::new();

    for variant in variants {
        if !names.insert(variant.name.as_str()) {
            return Err(ResolveError::DuplicateVariantName {
                id,
                name: variant.name.clone(),
            });
        }
        let index = variant.index as usize;
        if index >= total {
            return Err(ResolveError::NonContiguousVariants(id));
        }
        if occupied[index] {
            return Err(ResolveError::DuplicateVariantIndex { id, index: variant.index });
        }
        occupied[index] = true;
    }

    for &index in reserved {
        let idx = index as usize;
        if idx >= total {
            return Err(ResolveError::NonContiguousVariants(id));
        }
        if occupied[idx] {
            // Either the slot is both reserved and declared, or reserved twice.
            if variants.iter().any(|v| v.index == index) {
                return Err(ResolveError::ReservedIndexOccupied { id, index });
            }
            return Err(ResolveError::DuplicateVariantIndex { id, index });
        }
        occupied[idx] = true;
    }

    // Every slot from 0 to total-1 is accounted for at this point, since `total`
    // entries each landed on a distinct in-range slot.
    Ok(())
}
