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

//! This module provides a [`TypeRegistry`]: the raw `TypeId -> TypeShape` mapping that is
//! loaded once from some external metadata source and then handed to
//! [`crate::resolver::resolve()`] to be validated into a [`crate::ResolvedRegistry`].

use crate::type_shape::{TypeId, TypeShape};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;
use serde::de::Deserialize;
use smallstr::SmallString;

/// Most type names are short, so store them inline where possible.
pub(crate) type NameStr = SmallString<[u8; 16]>;

/// An error building or querying a [`TypeRegistry`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RegistryError {
    #[display(fmt = "Two types are declared with the id {_0}")]
    DuplicateTypeId(TypeId),
    #[display(fmt = "Two types are declared with the name '{_0}'")]
    DuplicateTypeName(String),
    #[display(fmt = "Type {_0} not found in the registry")]
    UnknownTypeId(TypeId),
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryError {}

/// A registry of raw, not-yet-validated type shapes keyed by [`TypeId`].
///
/// Build one with [`TypeRegistry::from_entries()`] (or [`TypeRegistry::insert()`] calls, or
/// by deserializing from an entry list; see the module tests for the expected JSON shape),
/// then call [`crate::resolver::resolve()`] to validate it and start encoding/decoding.
/// Once resolved, nothing is ever mutated again.
///
/// # Example
///
/// ```rust
/// use scale_registry::{TypeRegistry, TypeShape, TypeId};
/// use scale_registry::type_shape::Primitive;
///
/// let registry = TypeRegistry::from_entries([
///     (TypeId(0), TypeShape::Primitive(Primitive::U32)),
///     (TypeId(1), TypeShape::SequenceOf(TypeId(0))),
/// ]).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, TypeShape>,
    names: HashMap<NameStr, TypeId>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        TypeRegistry { types: HashMap::new(), names: HashMap::new() }
    }

    /// Build a registry from an ordered list of `(TypeId, TypeShape)` entries, as handed
    /// back from some external metadata source.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (TypeId, TypeShape)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = TypeRegistry::empty();
        for (id, shape) in entries {
            registry.insert(id, shape)?;
        }
        Ok(registry)
    }

    /// Insert a type shape under the given id.
    pub fn insert(&mut self, id: TypeId, shape: TypeShape) -> Result<(), RegistryError> {
        if self.types.contains_key(&id) {
            return Err(RegistryError::DuplicateTypeId(id));
        }
        self.types.insert(id, shape);
        Ok(())
    }

    /// Insert a type shape under the given id, also registering a name for it. Named
    /// entries can be found again with [`TypeRegistry::lookup_name()`], and are how
    /// versioned envelopes are addressed (see [`crate::ResolvedRegistry::resolve_version()`]).
    pub fn insert_named(
        &mut self,
        id: TypeId,
        name: &str,
        shape: TypeShape,
    ) -> Result<(), RegistryError> {
        if self.names.contains_key(name) {
            return Err(RegistryError::DuplicateTypeName(name.to_string()));
        }
        self.insert(id, shape)?;
        self.names.insert(NameStr::from_str(name), id);
        Ok(())
    }

    /// Fetch the raw shape stored under an id.
    pub fn get(&self, id: TypeId) -> Result<&TypeShape, RegistryError> {
        self.types.get(&id).ok_or(RegistryError::UnknownTypeId(id))
    }

    /// Fetch the id registered under a name, if any.
    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Iterate over every `(TypeId, TypeShape)` entry in the registry, in no
    /// particular order.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeShape)> {
        self.types.iter().map(|(id, shape)| (*id, shape))
    }

    /// The number of types in the registry.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub(crate) fn into_parts(self) -> (HashMap<TypeId, TypeShape>, HashMap<NameStr, TypeId>) {
        (self.types, self.names)
    }
}

// The entry list format handed back by external metadata sources. Tuned to work
// well with serde_json, but any self describing format of the right shape works.
#[derive(serde::Deserialize)]
struct RegistryEntry {
    id: TypeId,
    #[serde(default)]
    name: Option<String>,
    ty: TypeShape,
}

impl<'de> Deserialize<'de> for TypeRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let entries = <Vec<RegistryEntry>>::deserialize(deserializer)?;
        let mut registry = TypeRegistry::empty();
        for entry in entries {
            let res = match &entry.name {
                Some(name) => registry.insert_named(entry.id, name, entry.ty),
                None => registry.insert(entry.id, entry.ty),
            };
            res.map_err(|e| D::Error::custom(format!("could not deserialize into TypeRegistry: {e}")))?;
        }
        Ok(registry)
    }
}
