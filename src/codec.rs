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

//! This module provides [`encode()`] and [`decode()`]: pure functions which walk a shape
//! from a [`ResolvedRegistry`] and a [`Value`] (or a byte buffer) in lock-step.
//!
//! Encoding always produces the canonical form: integers in the minimal compact class,
//! map and set entries sorted by their encoded bytes. Decoding accepts only that form,
//! so `decode(encode(v))` round-trips and two distinct byte strings never decode to
//! equal values; downstream hashing and signing rely on this.

use crate::compact;
use crate::resolver::ResolvedRegistry;
use crate::type_shape::{Field, Primitive, TypeId, TypeShape, VariantFields};
use crate::value::Value;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;

/// An error encoding a [`Value`] against a shape.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EncodeError {
    #[display(fmt = "Type {_0} not found in the registry")]
    TypeNotFound(TypeId),
    #[display(fmt = "Expected a {expected} value but got a {found} value")]
    WrongShape { expected: &'static str, found: &'static str },
    #[display(fmt = "Value is out of range for the target integer type")]
    NumberOutOfRange { ty: Primitive },
    #[display(fmt = "Expected {expected} values but got {found}")]
    WrongLength { expected: usize, found: usize },
    #[display(fmt = "No value given for the field '{_0}'")]
    FieldMissing(String),
    #[display(fmt = "The enum being encoded into has no variant named '{_0}'")]
    VariantNotFound(String),
    #[display(fmt = "Two map keys have the same encoding")]
    DuplicateMapKey,
    #[display(fmt = "Two set elements have the same encoding")]
    DuplicateSetElement,
    #[display(fmt = "{_0} elements is too many for a compact u32 length prefix")]
    TooManyElements(usize),
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// An error decoding bytes against a shape.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum DecodeError {
    #[display(fmt = "Type {_0} not found in the registry")]
    TypeNotFound(TypeId),
    #[display(fmt = "The input ended before the value was fully decoded")]
    TruncatedInput,
    #[display(fmt = "{remaining} bytes remain after decoding the value")]
    TrailingBytes { remaining: usize },
    #[display(fmt = "Expected a boolean byte of 0 or 1 but got {_0}")]
    InvalidBoolean(u8),
    #[display(fmt = "Expected an option tag byte of 0 or 1 but got {_0}")]
    InvalidOptionTag(u8),
    #[display(fmt = "The discriminant {discriminant} selects no active variant of type {id}")]
    InvalidDiscriminant { id: TypeId, discriminant: u8 },
    #[display(fmt = "A compact integer is encoded in a wider class than necessary")]
    NonCanonicalCompactInt,
    #[display(fmt = "A compact integer is out of range for its target type")]
    CompactOutOfRange,
    #[display(fmt = "Two map keys have the same encoding")]
    DuplicateMapKey,
    #[display(fmt = "Two set elements have the same encoding")]
    DuplicateSetElement,
    #[display(fmt = "Map or set entries are not sorted by their encoded bytes")]
    NonCanonicalOrder,
    #[display(fmt = "A string value is not valid UTF-8")]
    InvalidUtf8,
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// A cursor over the input bytes being decoded.
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub(crate) fn consumed(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or(DecodeError::TruncatedInput)?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::TruncatedInput);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    // The raw bytes consumed between two previously observed positions; used to
    // compare map keys and set elements by their encodings.
    fn taken(&self, from: usize, to: usize) -> &'a [u8] {
        &self.data[from..to]
    }
}

/// Encode a [`Value`] against the shape stored under `id`, handing back the bytes.
pub fn encode(types: &ResolvedRegistry, id: TypeId, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_to(types, id, value, &mut out)?;
    Ok(out)
}

/// Encode a [`Value`] against the shape stored under `id`, appending bytes to `out`.
pub fn encode_to(
    types: &ResolvedRegistry,
    id: TypeId,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let shape = types.get(id).ok_or(EncodeError::TypeNotFound(id))?;
    match shape {
        TypeShape::Primitive(p) => encode_primitive(*p, value, out),
        TypeShape::Compact(inner) => {
            let Value::U128(n) = value else {
                return Err(wrong_shape("unsigned integer", value));
            };
            let (ty, max) = compact_target(types, *inner)
                .ok_or(EncodeError::TypeNotFound(*inner))?;
            if *n > max {
                return Err(EncodeError::NumberOutOfRange { ty });
            }
            compact::encode(*n, out);
            Ok(())
        }
        TypeShape::StructOf(fields) => encode_fields(types, fields, value, out),
        TypeShape::EnumOf { variants, .. } => {
            let Value::Variant(name, payload) = value else {
                return Err(wrong_shape("variant", value));
            };
            let variant = variants
                .iter()
                .find(|v| &v.name == name)
                .ok_or_else(|| EncodeError::VariantNotFound(name.clone()))?;
            out.push(variant.index);
            match (&variant.fields, payload) {
                (VariantFields::Unit, None) => Ok(()),
                (VariantFields::Single(ty), Some(payload)) => encode_to(types, *ty, payload, out),
                (VariantFields::Named(fields), Some(payload)) => {
                    encode_fields(types, fields, payload, out)
                }
                (VariantFields::Unit, Some(_)) => {
                    Err(EncodeError::WrongShape { expected: "unit variant", found: "payload" })
                }
                (_, None) => {
                    Err(EncodeError::WrongShape { expected: "variant payload", found: "nothing" })
                }
            }
        }
        TypeShape::ArrayOf(ty, len) => {
            let Value::Seq(items) = value else {
                return Err(wrong_shape("sequence", value));
            };
            if items.len() != *len {
                return Err(EncodeError::WrongLength { expected: *len, found: items.len() });
            }
            for item in items {
                encode_to(types, *ty, item, out)?;
            }
            Ok(())
        }
        TypeShape::SequenceOf(ty) => {
            let Value::Seq(items) = value else {
                return Err(wrong_shape("sequence", value));
            };
            write_len(items.len(), out)?;
            for item in items {
                encode_to(types, *ty, item, out)?;
            }
            Ok(())
        }
        TypeShape::OptionOf(ty) => {
            let Value::Option(opt) = value else {
                return Err(wrong_shape("option", value));
            };
            match opt {
                None => {
                    out.push(0);
                    Ok(())
                }
                Some(inner) => {
                    out.push(1);
                    encode_to(types, *ty, inner, out)
                }
            }
        }
        TypeShape::TupleOf(tys) => {
            let Value::Tuple(items) = value else {
                return Err(wrong_shape("tuple", value));
            };
            if items.len() != tys.len() {
                return Err(EncodeError::WrongLength { expected: tys.len(), found: items.len() });
            }
            for (ty, item) in tys.iter().zip(items) {
                encode_to(types, *ty, item, out)?;
            }
            Ok(())
        }
        TypeShape::MapOf(key_ty, val_ty) => {
            let Value::Map(entries) = value else {
                return Err(wrong_shape("map", value));
            };
            // Entries are sorted into canonical order by encoded key, whatever
            // order the caller provided them in.
            let mut encoded = Vec::with_capacity(entries.len());
            for (key, val) in entries {
                let mut key_bytes = Vec::new();
                encode_to(types, *key_ty, key, &mut key_bytes)?;
                let mut val_bytes = Vec::new();
                encode_to(types, *val_ty, val, &mut val_bytes)?;
                encoded.push((key_bytes, val_bytes));
            }
            encoded.sort_by(|a, b| a.0.cmp(&b.0));
            if encoded.windows(2).any(|w| w[0].0 == w[1].0) {
                return Err(EncodeError::DuplicateMapKey);
            }
            write_len(encoded.len(), out)?;
            for (key_bytes, val_bytes) in encoded {
                out.extend_from_slice(&key_bytes);
                out.extend_from_slice(&val_bytes);
            }
            Ok(())
        }
        TypeShape::SetOf(ty) => {
            let Value::Set(items) = value else {
                return Err(wrong_shape("set", value));
            };
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                let mut bytes = Vec::new();
                encode_to(types, *ty, item, &mut bytes)?;
                encoded.push(bytes);
            }
            encoded.sort();
            if encoded.windows(2).any(|w| w[0] == w[1]) {
                return Err(EncodeError::DuplicateSetElement);
            }
            write_len(encoded.len(), out)?;
            for bytes in encoded {
                out.extend_from_slice(&bytes);
            }
            Ok(())
        }
        TypeShape::AliasOf(ty) => encode_to(types, *ty, value, out),
    }
}

/// Decode a value of the shape stored under `id` from the front of `bytes`, handing
/// back the value and the number of bytes consumed.
pub fn decode(
    types: &ResolvedRegistry,
    id: TypeId,
    bytes: &[u8],
) -> Result<(Value, usize), DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let value = decode_value(types, id, &mut cursor)?;
    Ok((value, cursor.consumed()))
}

/// Like [`decode()`], but expects the value to occupy the whole buffer, failing with
/// [`DecodeError::TrailingBytes`] if anything is left over.
pub fn decode_exact(
    types: &ResolvedRegistry,
    id: TypeId,
    bytes: &[u8],
) -> Result<Value, DecodeError> {
    let (value, consumed) = decode(types, id, bytes)?;
    if consumed != bytes.len() {
        return Err(DecodeError::TrailingBytes { remaining: bytes.len() - consumed });
    }
    Ok(value)
}

fn decode_value(
    types: &ResolvedRegistry,
    id: TypeId,
    cursor: &mut Cursor<'_>,
) -> Result<Value, DecodeError> {
    let shape = types.get(id).ok_or(DecodeError::TypeNotFound(id))?;
    match shape {
        TypeShape::Primitive(p) => decode_primitive(*p, cursor),
        TypeShape::Compact(inner) => {
            let (_, max) =
                compact_target(types, *inner).ok_or(DecodeError::TypeNotFound(*inner))?;
            let value = compact::decode_from(cursor)?;
            if value > max {
                return Err(DecodeError::CompactOutOfRange);
            }
            Ok(Value::U128(value))
        }
        TypeShape::StructOf(fields) => decode_fields(types, fields, cursor).map(Value::Composite),
        TypeShape::EnumOf { variants, reserved } => {
            let discriminant = cursor.read_byte()?;
            if reserved.contains(&discriminant) {
                return Err(DecodeError::InvalidDiscriminant { id, discriminant });
            }
            let variant = variants
                .iter()
                .find(|v| v.index == discriminant)
                .ok_or(DecodeError::InvalidDiscriminant { id, discriminant })?;
            let payload = match &variant.fields {
                VariantFields::Unit => None,
                VariantFields::Single(ty) => Some(Box::new(decode_value(types, *ty, cursor)?)),
                VariantFields::Named(fields) => {
                    Some(Box::new(Value::Composite(decode_fields(types, fields, cursor)?)))
                }
            };
            Ok(Value::Variant(variant.name.clone(), payload))
        }
        TypeShape::ArrayOf(ty, len) => {
            let mut items = Vec::with_capacity((*len).min(cursor.remaining() + 1));
            for _ in 0..*len {
                items.push(decode_value(types, *ty, cursor)?);
            }
            Ok(Value::Seq(items))
        }
        TypeShape::SequenceOf(ty) => {
            let count = read_len(cursor)?;
            let mut items = Vec::with_capacity(count.min(cursor.remaining() + 1));
            for _ in 0..count {
                items.push(decode_value(types, *ty, cursor)?);
            }
            Ok(Value::Seq(items))
        }
        TypeShape::OptionOf(ty) => match cursor.read_byte()? {
            0 => Ok(Value::Option(None)),
            1 => Ok(Value::Option(Some(Box::new(decode_value(types, *ty, cursor)?)))),
            tag => Err(DecodeError::InvalidOptionTag(tag)),
        },
        TypeShape::TupleOf(tys) => {
            let mut items = Vec::with_capacity(tys.len());
            for ty in tys {
                items.push(decode_value(types, *ty, cursor)?);
            }
            Ok(Value::Tuple(items))
        }
        TypeShape::MapOf(key_ty, val_ty) => {
            let count = read_len(cursor)?;
            let mut entries = Vec::with_capacity(count.min(cursor.remaining() + 1));
            let mut prev_key: Option<(usize, usize)> = None;
            for _ in 0..count {
                let start = cursor.consumed();
                let key = decode_value(types, *key_ty, cursor)?;
                let end = cursor.consumed();
                if let Some((prev_start, prev_end)) = prev_key {
                    match cursor.taken(prev_start, prev_end).cmp(cursor.taken(start, end)) {
                        Ordering::Less => {}
                        Ordering::Equal => return Err(DecodeError::DuplicateMapKey),
                        Ordering::Greater => return Err(DecodeError::NonCanonicalOrder),
                    }
                }
                prev_key = Some((start, end));
                let val = decode_value(types, *val_ty, cursor)?;
                entries.push((key, val));
            }
            Ok(Value::Map(entries))
        }
        TypeShape::SetOf(ty) => {
            let count = read_len(cursor)?;
            let mut items = Vec::with_capacity(count.min(cursor.remaining() + 1));
            let mut prev: Option<(usize, usize)> = None;
            for _ in 0..count {
                let start = cursor.consumed();
                let item = decode_value(types, *ty, cursor)?;
                let end = cursor.consumed();
                if let Some((prev_start, prev_end)) = prev {
                    match cursor.taken(prev_start, prev_end).cmp(cursor.taken(start, end)) {
                        Ordering::Less => {}
                        Ordering::Equal => return Err(DecodeError::DuplicateSetElement),
                        Ordering::Greater => return Err(DecodeError::NonCanonicalOrder),
                    }
                }
                prev = Some((start, end));
                items.push(item);
            }
            Ok(Value::Set(items))
        }
        TypeShape::AliasOf(ty) => decode_value(types, *ty, cursor),
    }
}

fn encode_primitive(p: Primitive, value: &Value, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    match (p, value) {
        (Primitive::Bool, Value::Bool(b)) => {
            out.push(u8::from(*b));
            Ok(())
        }
        (Primitive::Str, Value::Str(s)) => {
            write_len(s.len(), out)?;
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        (Primitive::Bytes, Value::Bytes(bytes)) => {
            write_len(bytes.len(), out)?;
            out.extend_from_slice(bytes);
            Ok(())
        }
        (Primitive::U8, Value::U128(n)) => push_uint(*n, 1, p, out),
        (Primitive::U16, Value::U128(n)) => push_uint(*n, 2, p, out),
        (Primitive::U32, Value::U128(n)) => push_uint(*n, 4, p, out),
        (Primitive::U64, Value::U128(n)) => push_uint(*n, 8, p, out),
        (Primitive::U128, Value::U128(n)) => push_uint(*n, 16, p, out),
        (Primitive::I8, Value::I128(n)) => push_int(*n, 1, p, out),
        (Primitive::I16, Value::I128(n)) => push_int(*n, 2, p, out),
        (Primitive::I32, Value::I128(n)) => push_int(*n, 4, p, out),
        (Primitive::I64, Value::I128(n)) => push_int(*n, 8, p, out),
        (Primitive::I128, Value::I128(n)) => push_int(*n, 16, p, out),
        _ => Err(wrong_shape(primitive_kind(p), value)),
    }
}

fn decode_primitive(p: Primitive, cursor: &mut Cursor<'_>) -> Result<Value, DecodeError> {
    match p {
        Primitive::Bool => match cursor.read_byte()? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            byte => Err(DecodeError::InvalidBoolean(byte)),
        },
        Primitive::U8 => read_uint(cursor, 1),
        Primitive::U16 => read_uint(cursor, 2),
        Primitive::U32 => read_uint(cursor, 4),
        Primitive::U64 => read_uint(cursor, 8),
        Primitive::U128 => read_uint(cursor, 16),
        Primitive::I8 => read_int(cursor, 1),
        Primitive::I16 => read_int(cursor, 2),
        Primitive::I32 => read_int(cursor, 4),
        Primitive::I64 => read_int(cursor, 8),
        Primitive::I128 => read_int(cursor, 16),
        Primitive::Str => {
            let len = read_len(cursor)?;
            let bytes = cursor.read_bytes(len)?;
            let s = String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)?;
            Ok(Value::Str(s))
        }
        Primitive::Bytes => {
            let len = read_len(cursor)?;
            Ok(Value::Bytes(cursor.read_bytes(len)?.to_vec()))
        }
    }
}

// Encode the values for a list of fields, in declared field order. Values can be
// given as a composite (matched by surfaced name or wire name) or positionally
// as a tuple.
fn encode_fields(
    types: &ResolvedRegistry,
    fields: &[Field],
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        Value::Composite(entries) => {
            if entries.len() != fields.len() {
                return Err(EncodeError::WrongLength {
                    expected: fields.len(),
                    found: entries.len(),
                });
            }
            for field in fields {
                let entry = entries
                    .iter()
                    .find(|(name, _)| {
                        name.as_str() == field.surfaced_name() || name.as_str() == field.name
                    })
                    .ok_or_else(|| EncodeError::FieldMissing(field.surfaced_name().to_string()))?;
                encode_to(types, field.ty, &entry.1, out)?;
            }
            Ok(())
        }
        Value::Tuple(items) => {
            if items.len() != fields.len() {
                return Err(EncodeError::WrongLength {
                    expected: fields.len(),
                    found: items.len(),
                });
            }
            for (field, item) in fields.iter().zip(items) {
                encode_to(types, field.ty, item, out)?;
            }
            Ok(())
        }
        _ => Err(wrong_shape("composite", value)),
    }
}

fn decode_fields(
    types: &ResolvedRegistry,
    fields: &[Field],
    cursor: &mut Cursor<'_>,
) -> Result<Vec<(String, Value)>, DecodeError> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let value = decode_value(types, field.ty, cursor)?;
        out.push((field.surfaced_name().to_string(), value));
    }
    Ok(out)
}

// The unsigned primitive a compact shape targets (behind any aliases), and the
// largest value that fits it. Resolution guarantees this exists for any compact
// shape in a resolved registry.
fn compact_target(types: &ResolvedRegistry, inner: TypeId) -> Option<(Primitive, u128)> {
    match types.get_unaliased(inner)? {
        (_, TypeShape::Primitive(p)) => {
            let max = match p {
                Primitive::U8 => u8::MAX as u128,
                Primitive::U16 => u16::MAX as u128,
                Primitive::U32 => u32::MAX as u128,
                Primitive::U64 => u64::MAX as u128,
                Primitive::U128 => u128::MAX,
                _ => return None,
            };
            Some((*p, max))
        }
        _ => None,
    }
}

fn wrong_shape(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::WrongShape { expected, found: found.kind() }
}

fn primitive_kind(p: Primitive) -> &'static str {
    match p {
        Primitive::Bool => "bool",
        Primitive::Str => "string",
        Primitive::Bytes => "bytes",
        p if p.is_unsigned_int() => "unsigned integer",
        _ => "signed integer",
    }
}

fn push_uint(n: u128, width: usize, ty: Primitive, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if width < 16 && n >> (8 * width) != 0 {
        return Err(EncodeError::NumberOutOfRange { ty });
    }
    out.extend_from_slice(&n.to_le_bytes()[..width]);
    Ok(())
}

fn push_int(n: i128, width: usize, ty: Primitive, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if width < 16 {
        let bits = 8 * width as u32;
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if n < min || n > max {
            return Err(EncodeError::NumberOutOfRange { ty });
        }
    }
    out.extend_from_slice(&n.to_le_bytes()[..width]);
    Ok(())
}

fn read_uint(cursor: &mut Cursor<'_>, width: usize) -> Result<Value, DecodeError> {
    let bytes = cursor.read_bytes(width)?;
    let mut buf = [0u8; 16];
    buf[..width].copy_from_slice(bytes);
    Ok(Value::U128(u128::from_le_bytes(buf)))
}

fn read_int(cursor: &mut Cursor<'_>, width: usize) -> Result<Value, DecodeError> {
    let bytes = cursor.read_bytes(width)?;
    // Sign extend from the top bit of the most significant byte.
    let fill = if bytes[width - 1] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[..width].copy_from_slice(bytes);
    Ok(Value::I128(i128::from_le_bytes(buf)))
}

// Length and count prefixes are `Compact<u32>` on the wire.
fn write_len(len: usize, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if len > u32::MAX as usize {
        return Err(EncodeError::TooManyElements(len));
    }
    compact::encode(len as u128, out);
    Ok(())
}

fn read_len(cursor: &mut Cursor<'_>) -> Result<usize, DecodeError> {
    let len = compact::decode_from(cursor)?;
    if len > u32::MAX as u128 {
        return Err(DecodeError::CompactOutOfRange);
    }
    Ok(len as usize)
}
