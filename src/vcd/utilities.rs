// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use num::BigUint;

#[derive(Debug, PartialEq, Eq)]
pub enum BinaryParserErrTypes {
    XValue,
    ZValue,
    UValue,
    OtherValue(char),
    TooLong,
    Empty,
}

impl BinaryParserErrTypes {
    /// `x`, `z` and `u` are legal values that just aren't numbers.
    pub fn is_non_numeric(&self) -> bool {
        matches!(
            self,
            BinaryParserErrTypes::XValue | BinaryParserErrTypes::ZValue | BinaryParserErrTypes::UValue
        )
    }
}

// We build a quick and not so dirty bit string parser.
fn base2_str_to_byte(word: &[u8]) -> Result<u8, BinaryParserErrTypes> {
    let mut val = 0u8;

    // shouldn't have more than 8 chars in str
    let len = word.len();
    if len > 8 {
        return Err(BinaryParserErrTypes::TooLong);
    }

    let bit_lut = [
        0b0000_0001u8,
        0b0000_0010u8,
        0b0000_0100u8,
        0b0000_1000u8,
        0b0001_0000u8,
        0b0010_0000u8,
        0b0100_0000u8,
        0b1000_0000u8,
    ];

    for (idx, chr) in word.iter().rev().enumerate() {
        match chr {
            b'1' => val |= bit_lut[idx],
            b'0' => {}
            b'x' | b'X' => return Err(BinaryParserErrTypes::XValue),
            b'z' | b'Z' => return Err(BinaryParserErrTypes::ZValue),
            b'u' | b'U' => return Err(BinaryParserErrTypes::UValue),
            _ => return Err(BinaryParserErrTypes::OtherValue(*chr as char)),
        }
    }

    Ok(val)
}

/// Decodes a most-significant-bit-first bit string into little endian bytes.
pub fn binary_str_to_vec_u8(binary_str: &str) -> Result<Vec<u8>, BinaryParserErrTypes> {
    let mut vec_u8: Vec<u8> = Vec::new();
    let binary_str_as_bytes = binary_str.as_bytes();
    if binary_str_as_bytes.is_empty() {
        return Err(BinaryParserErrTypes::Empty);
    }

    let mut tail_idx = binary_str_as_bytes.len();
    // clamp head if provided binary str is less than 8 long
    let mut head_idx = tail_idx.saturating_sub(8);
    while tail_idx > 0 {
        let curr_b_val = &binary_str_as_bytes[head_idx..tail_idx];
        let val_u8 = base2_str_to_byte(curr_b_val)?;
        vec_u8.push(val_u8);

        tail_idx = head_idx;
        head_idx = head_idx.saturating_sub(8);
    }
    Ok(vec_u8)
}

pub fn binary_str_to_biguint(binary_str: &str) -> Result<BigUint, BinaryParserErrTypes> {
    let bytes = binary_str_to_vec_u8(binary_str)?;
    Ok(BigUint::from_bytes_le(&bytes))
}

/// The low 64 bits of a value. Address and selector signals never exceed
/// this, wider values are truncated.
pub fn low_u64(value: &BigUint) -> u64 {
    value.iter_u64_digits().next().unwrap_or(0)
}
