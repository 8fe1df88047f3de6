// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Decoder facade: reads the stream signature, selects the dialect and
//! runs the matching parser to completion.

use std::io::Read;

use tracing::info;

use crate::error::ParseResult;
use crate::loader::DatabaseLoader;
use crate::parser::{PackedParser, UnpackedParser};
use crate::reader::Reader;
use crate::wire::{Dialect, Signature, SIGNATURE_SIZE};

/// One decoder per stream. Lives until end-stream, a hard error, or EOF.
pub struct Decoder<'a, R, L> {
    reader: Reader<R>,
    loader: &'a mut L,
}

impl<'a, R: Read, L: DatabaseLoader> Decoder<'a, R, L> {
    pub fn new(input: R, loader: &'a mut L) -> Self {
        Self {
            reader: Reader::new(input),
            loader,
        }
    }

    /// Decode the stream, driving the loader one event at a time.
    pub fn run(mut self) -> ParseResult<()> {
        self.reader.read_staged(SIGNATURE_SIZE)?;
        let signature = Signature::decode(self.reader.view())?;
        info!(
            "stream signature: version {}.{}, {} dialect",
            signature.major,
            signature.minor,
            match signature.dialect {
                Dialect::Unpacked => "unpacked",
                Dialect::Packed => "packed",
            }
        );
        match signature.dialect {
            Dialect::Unpacked => UnpackedParser::parse(&mut self.reader, self.loader),
            Dialect::Packed => PackedParser::parse(&mut self.reader, self.loader),
        }
    }
}
