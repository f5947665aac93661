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

//! This module provides a [`Value`]: a dynamic, self-describing representation of anything
//! the codec can encode or decode. There is one arm per shape kind, so a [`Value`] tree
//! mirrors the [`crate::TypeShape`] graph it was decoded against.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// A dynamically shaped value. Hand one to [`crate::codec::encode()`] along with the
/// [`crate::TypeId`] describing its layout, or get one back from [`crate::codec::decode()`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// An unsigned integer of any width up to 128 bits. The shape being encoded
    /// against decides the wire width.
    U128(u128),
    /// A signed integer of any width up to 128 bits.
    I128(i128),
    /// A UTF-8 string.
    Str(String),
    /// An opaque blob.
    Bytes(Vec<u8>),
    /// Named fields, in wire order. Decoding surfaces each field under its alias
    /// when the shape declares one.
    Composite(Vec<(String, Value)>),
    /// Unnamed fields, in wire order.
    Tuple(Vec<Value>),
    /// An enum variant, addressed by name. Unit variants carry `None`; single-payload
    /// variants carry their value; named-field variants carry a [`Value::Composite`].
    Variant(String, Option<Box<Value>>),
    /// Elements of a sequence or fixed length array.
    Seq(Vec<Value>),
    /// An optional value.
    Option(Option<Box<Value>>),
    /// Map entries. Order is irrelevant on encode (entries are sorted into canonical
    /// order by encoded key bytes); decoded maps come back in canonical order.
    Map(Vec<(Value, Value)>),
    /// Set elements. Same ordering rules as maps.
    Set(Vec<Value>),
}

impl Value {
    /// An unsigned integer value.
    pub fn uint(value: impl Into<u128>) -> Value {
        Value::U128(value.into())
    }

    /// A signed integer value.
    pub fn int(value: impl Into<i128>) -> Value {
        Value::I128(value.into())
    }

    /// A string value.
    pub fn string(value: impl Into<String>) -> Value {
        Value::Str(value.into())
    }

    /// A variant carrying no payload.
    pub fn unit_variant(name: impl Into<String>) -> Value {
        Value::Variant(name.into(), None)
    }

    /// A variant carrying a payload.
    pub fn variant(name: impl Into<String>, payload: Value) -> Value {
        Value::Variant(name.into(), Some(Box::new(payload)))
    }

    /// A composite value from `(name, value)` pairs.
    pub fn composite<N: Into<String>>(fields: impl IntoIterator<Item = (N, Value)>) -> Value {
        Value::Composite(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// A one-word description of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U128(_) => "unsigned integer",
            Value::I128(_) => "signed integer",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Composite(_) => "composite",
            Value::Tuple(_) => "tuple",
            Value::Variant(..) => "variant",
            Value::Seq(_) => "sequence",
            Value::Option(_) => "option",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.into())
    }
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(n: $ty) -> Value {
                Value::U128(n as u128)
            }
        }
    )*}
}
macro_rules! impl_from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(n: $ty) -> Value {
                Value::I128(n as i128)
            }
        }
    )*}
}
impl_from_uint!(u8, u16, u32, u64, u128);
impl_from_int!(i8, i16, i32, i64, i128);
