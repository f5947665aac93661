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

//! This crate provides a numbered registry of type descriptions ([`TypeRegistry`]) and a
//! codec that can encode and decode SCALE bytes against it, for working with types that
//! are described by runtime metadata rather than known at compile time.
//!
//! The flow is load once, resolve once, then share:
//!
//! 1. Build a [`TypeRegistry`] from `(TypeId, TypeShape)` entries handed back by some
//!    external metadata source (or deserialize one; see [`TypeRegistry`]).
//! 2. Call [`resolve()`] to validate it (no dangling references, contiguous enum
//!    discriminants, no recursion that fails to consume bytes) into an immutable
//!    [`ResolvedRegistry`], which is then shared read-only by any number of callers.
//! 3. Use [`codec::encode()`] and [`codec::decode()`] to move between [`Value`]s and
//!    canonical SCALE bytes for any id in the resolved registry.
//!
//! Enums whose variants are successive protocol versions of one logical type get a
//! little extra support in the [`versioned`] module.
//!
//! # Example
//!
//! ```rust
//! use scale_registry::type_shape::{Field, Primitive};
//! use scale_registry::{codec, resolve, TypeId, TypeRegistry, TypeShape, Value};
//!
//! let registry = TypeRegistry::from_entries([
//!     (TypeId(0), TypeShape::Primitive(Primitive::U32)),
//!     (TypeId(1), TypeShape::StructOf(vec![Field::new("number", TypeId(0))])),
//! ]).unwrap();
//! let types = resolve(registry).unwrap();
//!
//! let value = Value::composite([("number", Value::uint(1234u32))]);
//! let bytes = codec::encode(&types, TypeId(1), &value).unwrap();
//! assert_eq!(bytes, [210, 4, 0, 0]);
//! assert_eq!(codec::decode_exact(&types, TypeId(1), &bytes).unwrap(), value);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

extern crate alloc;

pub mod codec;
pub mod compact;
pub mod resolver;
pub mod type_registry;
pub mod type_shape;
pub mod value;
pub mod versioned;

#[cfg(test)]
mod test_utils;

// Export the main types here for ease of use:
pub use {
    codec::{DecodeError, EncodeError},
    resolver::{resolve, ResolveError, ResolvedRegistry},
    type_registry::{RegistryError, TypeRegistry},
    type_shape::{TypeId, TypeShape},
    value::Value,
    versioned::VersionError,
};
