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

//! Helpers for building resolved registries in tests.

use crate::resolver::{resolve, ResolvedRegistry};
use crate::type_registry::TypeRegistry;
use crate::type_shape::{TypeId, TypeShape};
use alloc::vec::Vec;

/// Build and resolve a registry from plain `(id, shape)` entries.
pub fn to_resolved(entries: Vec<(u32, TypeShape)>) -> ResolvedRegistry {
    to_resolved_named(entries, Vec::new())
}

/// Build and resolve a registry from plain `(id, shape)` entries plus
/// `(id, name, shape)` named entries.
pub fn to_resolved_named(
    entries: Vec<(u32, TypeShape)>,
    named: Vec<(u32, &str, TypeShape)>,
) -> ResolvedRegistry {
    let mut registry = TypeRegistry::empty();
    for (id, shape) in entries {
        registry.insert(TypeId(id), shape).expect("test ids should be unique");
    }
    for (id, name, shape) in named {
        registry.insert_named(TypeId(id), name, shape).expect("test ids should be unique");
    }
    resolve(registry).expect("test registry should resolve")
}
