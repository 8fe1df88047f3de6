// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! The two protocol parsers.
//!
//! Both dialects share the opcode vocabulary and body records of
//! [`crate::wire`]; framing (alignment, length-field widths, integer
//! compression) is what differs, so each dialect gets its own event loop.

pub use self::packed::PackedParser;
pub use self::unpacked::UnpackedParser;

mod packed;
mod unpacked;

use crate::error::{ParseError, ParseResult};

/// Interpret staged string bytes as UTF-8.
fn utf8(bytes: &[u8], at: u64) -> ParseResult<&str> {
    std::str::from_utf8(bytes).map_err(|source| ParseError::InvalidString { at, source })
}
