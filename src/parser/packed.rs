// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Parser for the packed dialect: unaligned 2-byte event headers, 8-bit
//! length fields with 16-bit `*2` variants, and integer compression for
//! wide columns flagged as compressed.

use std::io::Read;

use tracing::info;

use super::utf8;
use crate::codec::{self, CodecError};
use crate::error::{ParseError, ParseResult};
use crate::loader::{ColumnId, DatabaseLoader};
use crate::reader::Reader;
use crate::wire::{
    ColumnBody, DataBody, EventHeader, MoveAheadBody, OneStringBody, Opcode, TwoStringBody,
};

pub struct PackedParser {
    /// Decompressed cell payload: fixed-width little-endian values.
    /// Cleared at the start of each compressed decode, reused across events.
    unpack: Vec<u8>,
}

impl PackedParser {
    /// Run the event loop until end-stream, an error, or EOF.
    pub fn parse<R: Read, L: DatabaseLoader>(
        reader: &mut Reader<R>,
        loader: &mut L,
    ) -> ParseResult<()> {
        PackedParser { unpack: Vec::new() }.run(reader, loader)
    }

    fn run<R: Read, L: DatabaseLoader>(
        mut self,
        reader: &mut Reader<R>,
        loader: &mut L,
    ) -> ParseResult<()> {
        loop {
            let mut head = [0u8; 2];
            reader.read_into(&mut head)?;
            let header = EventHeader::decode_packed(head, reader.offset())?;

            match header.opcode {
                Opcode::UseSchema | Opcode::UseSchema2 => {
                    info!("event: use-schema");
                    let body = if header.opcode == Opcode::UseSchema {
                        reader.read_staged(TwoStringBody::PACKED_SIZE)?;
                        TwoStringBody::decode_packed(reader.view())
                    } else {
                        reader.read_staged(TwoStringBody::PACKED2_SIZE)?;
                        TwoStringBody::decode_packed2(reader.view())
                    };
                    let split = body.size1 as usize;
                    reader.read_staged(split + body.size2 as usize)?;
                    let at = reader.offset();
                    let data = reader.view();
                    loader.use_schema(utf8(&data[..split], at)?, utf8(&data[split..], at)?)?;
                }
                Opcode::RemotePath | Opcode::RemotePath2 => {
                    info!("event: remote-path");
                    let size = Self::read_string_size(reader, header.opcode == Opcode::RemotePath2)?;
                    reader.read_staged(size)?;
                    loader.remote_path(utf8(reader.view(), reader.offset())?)?;
                }
                Opcode::NewTable | Opcode::NewTable2 => {
                    info!("event: new-table, id={}", header.id);
                    let size = Self::read_string_size(reader, header.opcode == Opcode::NewTable2)?;
                    reader.read_staged(size)?;
                    loader.new_table(header.id, utf8(reader.view(), reader.offset())?)?;
                }
                Opcode::NewColumn => {
                    info!("event: new-column, id={}", header.id);
                    reader.read_staged(ColumnBody::PACKED_SIZE)?;
                    let body = ColumnBody::decode_packed(reader.view());
                    reader.read_staged(body.name_size as usize)?;
                    loader.new_column(
                        header.id,
                        body.table_id,
                        body.elem_bits,
                        body.flag_bits,
                        utf8(reader.view(), reader.offset())?,
                    )?;
                }
                Opcode::CellData | Opcode::CellData2 => {
                    info!("event: cell-data, id={}", header.id);
                    let size = Self::read_data_size(reader, header.opcode == Opcode::CellData2)?;
                    self.deliver_cell(reader, loader, header.id, size, false)?;
                }
                Opcode::CellDefault | Opcode::CellDefault2 => {
                    info!("event: cell-default, id={}", header.id);
                    let size = Self::read_data_size(reader, header.opcode == Opcode::CellDefault2)?;
                    self.deliver_cell(reader, loader, header.id, size, true)?;
                }
                Opcode::EmptyDefault => {
                    info!("event: empty-default, id={}", header.id);
                    loader.cell_default(header.id, &[], 0)?;
                }
                Opcode::OpenStream => {
                    info!("event: open-stream");
                    loader.open_stream()?;
                }
                Opcode::EndStream => {
                    info!("event: end-stream");
                    loader.close_stream()?;
                    return Ok(());
                }
                Opcode::NextRow => {
                    info!("event: next-row, id={}", header.id);
                    loader.next_row(header.id)?;
                }
                Opcode::MoveAhead => {
                    info!("event: move-ahead, id={}", header.id);
                    reader.read_staged(MoveAheadBody::SIZE)?;
                    let body = MoveAheadBody::decode(reader.view());
                    loader.move_ahead(header.id, body.nrows)?;
                }
                Opcode::ErrMsg | Opcode::ErrMsg2 => {
                    info!("event: error-message");
                    let size = Self::read_string_size(reader, header.opcode == Opcode::ErrMsg2)?;
                    reader.read_staged(size)?;
                    loader.error_message(utf8(reader.view(), reader.offset())?)?;
                }
            }
        }
    }

    /// Read a one-string body, 8-bit or 16-bit length field.
    fn read_string_size<R: Read>(reader: &mut Reader<R>, wide: bool) -> ParseResult<usize> {
        Ok(if wide {
            reader.read_staged(OneStringBody::PACKED2_SIZE)?;
            OneStringBody::decode_packed2(reader.view()).size as usize
        } else {
            reader.read_staged(OneStringBody::PACKED_SIZE)?;
            OneStringBody::decode_packed(reader.view()).size as usize
        })
    }

    /// Read a data body, 8-bit or 16-bit payload byte count.
    fn read_data_size<R: Read>(reader: &mut Reader<R>, wide: bool) -> ParseResult<u32> {
        Ok(if wide {
            reader.read_staged(DataBody::PACKED2_SIZE)?;
            DataBody::decode_packed2(reader.view()).size
        } else {
            reader.read_staged(DataBody::PACKED_SIZE)?;
            DataBody::decode_packed(reader.view()).size
        })
    }

    /// Read `size` payload bytes for `column` and hand them to the loader,
    /// decompressing through the integer codec when the column is flagged.
    fn deliver_cell<R: Read, L: DatabaseLoader>(
        &mut self,
        reader: &mut Reader<R>,
        loader: &mut L,
        column: ColumnId,
        size: u32,
        default: bool,
    ) -> ParseResult<()> {
        let info = loader
            .column(column)
            .ok_or(ParseError::UnknownColumn { column })?;
        reader.read_staged(size as usize)?;
        let at = reader.offset();
        let data = reader.view();

        let (bytes, elem_count) = if info.compressed {
            self.uncompress(data, info.elem_bits, column, at)?;
            let count = self.unpack.len() as u64 * 8 / u64::from(info.elem_bits);
            (&self.unpack[..], count)
        } else {
            if info.elem_bits == 0 {
                return Err(ParseError::BadElementWidth {
                    column,
                    elem_bits: 0,
                });
            }
            (data, data.len() as u64 * 8 / u64::from(info.elem_bits))
        };

        if default {
            loader.cell_default(column, bytes, elem_count)?;
        } else {
            loader.cell_data(column, bytes, elem_count)?;
        }
        Ok(())
    }

    /// Decode a compressed payload into the unpacking buffer as fixed-width
    /// little-endian values.
    fn uncompress(
        &mut self,
        input: &[u8],
        elem_bits: u32,
        column: ColumnId,
        at: u64,
    ) -> ParseResult<()> {
        self.unpack.clear();
        // best packed case is one decoded value per input byte
        self.unpack.reserve(input.len() * (elem_bits as usize / 8));
        match elem_bits {
            16 => Self::uncompress_into(&mut self.unpack, input, at, 16, |buf| {
                codec::decode_u16(buf).map(|(v, n)| (u64::from(v), n))
            }),
            32 => Self::uncompress_into(&mut self.unpack, input, at, 32, |buf| {
                codec::decode_u32(buf).map(|(v, n)| (u64::from(v), n))
            }),
            64 => Self::uncompress_into(&mut self.unpack, input, at, 64, codec::decode_u64),
            _ => Err(ParseError::BadElementWidth { column, elem_bits }),
        }
    }

    fn uncompress_into(
        out: &mut Vec<u8>,
        mut input: &[u8],
        at: u64,
        width: u32,
        decode: impl Fn(&[u8]) -> Result<(u64, usize), CodecError>,
    ) -> ParseResult<()> {
        while !input.is_empty() {
            let (value, consumed) =
                decode(input).map_err(|source| ParseError::Codec { width, at, source })?;
            out.extend_from_slice(&value.to_le_bytes()[..width as usize / 8]);
            input = &input[consumed..];
        }
        Ok(())
    }
}
