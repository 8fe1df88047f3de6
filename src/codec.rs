// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Variable-length integer codec for compressed column payloads.
//!
//! Unsigned integers are packed most-significant-group-first, 7 bits per
//! byte. A value below `0x80` is a single byte with the high bit clear;
//! larger values are a run of continuation bytes (`0x80 | group`) closed by
//! a final byte with the high bit clear. A width-W decode consumes at most
//! `ceil(W / 7)` bytes (3, 5 and 10 for 16, 32 and 64 bits).

use bytes::BufMut;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Input ran out before a terminating byte.
    #[error("truncated encoding")]
    Truncated,
    /// A leading zero group; the value has a shorter encoding.
    #[error("over-long encoding")]
    Overlong,
    /// The decoded value does not fit the target width.
    #[error("value exceeds target width")]
    Overflow,
}

fn decode(buf: &[u8], width: u32) -> Result<(u64, usize), CodecError> {
    let limit = width.div_ceil(7) as usize;
    let Some((&first, rest)) = buf.split_first() else {
        return Err(CodecError::Truncated);
    };
    if first & 0x80 == 0 {
        return Ok((u64::from(first), 1));
    }
    if first == 0x80 {
        return Err(CodecError::Overlong);
    }
    let mut acc = u64::from(first & 0x7f);
    for (i, &byte) in rest.iter().enumerate() {
        let consumed = i + 2;
        if consumed > limit || acc >> (width - 7) != 0 {
            return Err(CodecError::Overflow);
        }
        acc = (acc << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok((acc, consumed));
        }
    }
    Err(CodecError::Truncated)
}

fn encode(value: u64, buf: &mut impl BufMut) {
    let groups = (64 - value.leading_zeros()).div_ceil(7).max(1);
    for g in (1..groups).rev() {
        buf.put_u8(0x80 | ((value >> (g * 7)) as u8 & 0x7f));
    }
    buf.put_u8(value as u8 & 0x7f);
}

/// Decode one 16-bit value, returning it and the byte count consumed.
pub fn decode_u16(buf: &[u8]) -> Result<(u16, usize), CodecError> {
    decode(buf, 16).map(|(v, n)| (v as u16, n))
}

/// Decode one 32-bit value, returning it and the byte count consumed.
pub fn decode_u32(buf: &[u8]) -> Result<(u32, usize), CodecError> {
    decode(buf, 32).map(|(v, n)| (v as u32, n))
}

/// Decode one 64-bit value, returning it and the byte count consumed.
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    decode(buf, 64)
}

/// Companion encoder of [`decode_u16`].
pub fn encode_u16(value: u16, buf: &mut impl BufMut) {
    encode(u64::from(value), buf);
}

/// Companion encoder of [`decode_u32`].
pub fn encode_u32(value: u32, buf: &mut impl BufMut) {
    encode(u64::from(value), buf);
}

/// Companion encoder of [`decode_u64`].
pub fn encode_u64(value: u64, buf: &mut impl BufMut) {
    encode(value, buf);
}
