// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Error types surfaced by the stream decoder.

use thiserror::Error;

use crate::codec::CodecError;
use crate::loader::{ColumnId, LoadError};

/// The error type of stream decoding.
///
/// The decoder surfaces the first error and stops; nothing is recovered
/// locally. Variants that originate in the wire stream carry the reader
/// offset at which they were detected.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error at offset {at}: {source}")]
    Io {
        at: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected end of stream at offset {at}")]
    ShortRead { at: u64 },
    #[error("bad packed integer (width {width}) at offset {at}: {source}")]
    Codec {
        width: u32,
        at: u64,
        #[source]
        source: CodecError,
    },
    #[error("unknown opcode {opcode} at offset {at}")]
    UnknownOpcode { opcode: u32, at: u64 },
    #[error("cell event for unknown column {column}")]
    UnknownColumn { column: ColumnId },
    #[error("column {column}: element width {elem_bits} not decodable as packed integers")]
    BadElementWidth { column: ColumnId, elem_bits: u32 },
    #[error("invalid string at offset {at}: {source}")]
    InvalidString {
        at: u64,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("bad magic in stream signature")]
    BadMagic,
    #[error("stream endianness does not match this machine")]
    EndianMismatch,
    #[error("unsupported stream version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },
    #[error("unknown dialect {0}")]
    UnknownDialect(u8),
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
