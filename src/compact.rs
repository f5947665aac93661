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

//! This module provides the SCALE compact integer encoding used for standalone compact
//! values and for every length/count prefix in the codec.
//!
//! The two low bits of the first byte pick a width class:
//!
//! - `0b00`: the value lives in the remaining six bits (`0..=63`).
//! - `0b01`: the value lives in the remaining fourteen bits of two bytes (`64..=2^14-1`).
//! - `0b10`: the value lives in the remaining thirty bits of four bytes (`2^14..=2^30-1`).
//! - `0b11`: the remaining six bits hold `n - 4`, and `n` little-endian bytes of value
//!   follow (`2^30..=2^128-1`).
//!
//! Encoding always picks the smallest class that fits; decoding rejects anything wider
//! than necessary with [`DecodeError::NonCanonicalCompactInt`], so that every value has
//! exactly one byte representation.

use crate::codec::{Cursor, DecodeError};
use alloc::vec::Vec;

const TWO_BYTE_MIN: u128 = 64;
const FOUR_BYTE_MIN: u128 = 1 << 14;
const BIG_MIN: u128 = 1 << 30;

/// Encode a compact integer, appending its bytes to `out`.
pub fn encode(value: u128, out: &mut Vec<u8>) {
    if value < TWO_BYTE_MIN {
        out.push((value as u8) << 2);
    } else if value < FOUR_BYTE_MIN {
        let n = ((value as u16) << 2) | 0b01;
        out.extend_from_slice(&n.to_le_bytes());
    } else if value < BIG_MIN {
        let n = ((value as u32) << 2) | 0b10;
        out.extend_from_slice(&n.to_le_bytes());
    } else {
        let bytes = value.to_le_bytes();
        // Values this big need at least 4 significant bytes, so len is in 4..=16.
        let len = 16 - (value.leading_zeros() / 8) as usize;
        out.push((((len - 4) as u8) << 2) | 0b11);
        out.extend_from_slice(&bytes[..len]);
    }
}

/// Decode a compact integer from the front of `bytes`, handing back the value and the
/// number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(u128, usize), DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let value = decode_from(&mut cursor)?;
    Ok((value, cursor.consumed()))
}

pub(crate) fn decode_from(cursor: &mut Cursor<'_>) -> Result<u128, DecodeError> {
    let first = cursor.read_byte()?;
    match first & 0b11 {
        0b00 => Ok((first >> 2) as u128),
        0b01 => {
            let second = cursor.read_byte()?;
            let value = (u16::from_le_bytes([first, second]) >> 2) as u128;
            if value < TWO_BYTE_MIN {
                return Err(DecodeError::NonCanonicalCompactInt);
            }
            Ok(value)
        }
        0b10 => {
            let rest = cursor.read_bytes(3)?;
            let value =
                (u32::from_le_bytes([first, rest[0], rest[1], rest[2]]) >> 2) as u128;
            if value < FOUR_BYTE_MIN {
                return Err(DecodeError::NonCanonicalCompactInt);
            }
            Ok(value)
        }
        _ => {
            let len = (first >> 2) as usize + 4;
            if len > 16 {
                // More than 16 bytes of value can't fit in a u128.
                return Err(DecodeError::CompactOutOfRange);
            }
            let bytes = cursor.read_bytes(len)?;
            let mut buf = [0u8; 16];
            buf[..len].copy_from_slice(bytes);
            let value = u128::from_le_bytes(buf);
            // Minimal length means a non-zero top byte, and the big form at all is
            // only canonical for values too big for the four byte class.
            if bytes[len - 1] == 0 || value < BIG_MIN {
                return Err(DecodeError::NonCanonicalCompactInt);
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec::Vec;

    fn enc(value: u128) -> Vec<u8> {
        let mut out = Vec::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn known_encodings() {
        assert_eq!(enc(0), [0x00]);
        assert_eq!(enc(1), [0x04]);
        assert_eq!(enc(42), [0xa8]);
        assert_eq!(enc(63), [0xfc]);
        assert_eq!(enc(64), [0x01, 0x01]);
        assert_eq!(enc(69), [0x15, 0x01]);
        assert_eq!(enc(16383), [0xfd, 0xff]);
        assert_eq!(enc(16384), [0x02, 0x00, 0x01, 0x00]);
        assert_eq!(enc((1 << 30) - 1), [0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(enc(1 << 30), [0x03, 0x00, 0x00, 0x00, 0x40]);
        assert_eq!(enc(u32::MAX as u128), [0x03, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(enc(1 << 32), [0x07, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn roundtrips_at_class_boundaries() {
        let interesting = [
            0,
            1,
            63,
            64,
            16383,
            16384,
            (1 << 30) - 1,
            1 << 30,
            u32::MAX as u128,
            u64::MAX as u128,
            u128::MAX,
        ];
        for value in interesting {
            let bytes = enc(value);
            assert_eq!(decode(&bytes).unwrap(), (value, bytes.len()), "value {value}");
        }
    }

    #[test]
    fn wider_than_necessary_class_rejected() {
        // 42 belongs in the single byte class; here it is in the two and four byte
        // classes, and in the big integer class.
        let two_byte = [(42u8 << 2) | 0b01, 0x00];
        let four_byte = [(42u8 << 2) | 0b10, 0x00, 0x00, 0x00];
        let big = [0b11, 42, 0x00, 0x00, 0x00];
        for bytes in [&two_byte[..], &four_byte[..], &big[..]] {
            assert_eq!(decode(bytes), Err(DecodeError::NonCanonicalCompactInt));
        }
    }

    #[test]
    fn big_class_with_zero_top_byte_rejected() {
        // 2^30 encoded with 5 bytes instead of the minimal 4.
        let padded = [0b01 << 2 | 0b11, 0x00, 0x00, 0x00, 0x40, 0x00];
        assert_eq!(decode(&padded), Err(DecodeError::NonCanonicalCompactInt));
    }

    #[test]
    fn truncated_input_rejected() {
        for value in [0u128, 64, 16384, 1 << 30, u128::MAX] {
            let bytes = enc(value);
            for cut in 0..bytes.len() {
                assert_eq!(
                    decode(&bytes[..cut]),
                    Err(DecodeError::TruncatedInput),
                    "value {value} cut to {cut} bytes"
                );
            }
        }
    }

    #[test]
    fn more_than_sixteen_value_bytes_rejected() {
        let mut bytes = alloc::vec![((13u8) << 2) | 0b11]; // 17 bytes follow
        bytes.extend_from_slice(&[0xff; 17]);
        assert_eq!(decode(&bytes), Err(DecodeError::CompactOutOfRange));
    }
}
