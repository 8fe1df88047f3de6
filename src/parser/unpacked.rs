// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Parser for the unpacked dialect: 4-byte aligned event headers, 32-bit
//! length fields, byte-wide cell payloads, no integer compression.

use std::io::Read;

use tracing::info;

use super::utf8;
use crate::error::{ParseError, ParseResult};
use crate::loader::DatabaseLoader;
use crate::reader::Reader;
use crate::wire::{
    ColumnBody, DataBody, EventHeader, MoveAheadBody, OneStringBody, Opcode, TwoStringBody,
};

pub struct UnpackedParser;

impl UnpackedParser {
    /// Run the event loop until end-stream, an error, or EOF.
    pub fn parse<R: Read, L: DatabaseLoader>(
        reader: &mut Reader<R>,
        loader: &mut L,
    ) -> ParseResult<()> {
        loop {
            reader.align(4)?;
            let mut word = [0u8; 4];
            reader.read_into(&mut word)?;
            let header = EventHeader::decode_unpacked(u32::from_le_bytes(word), reader.offset())?;

            match header.opcode {
                Opcode::UseSchema => {
                    info!("event: use-schema");
                    reader.read_staged(TwoStringBody::UNPACKED_SIZE)?;
                    let body = TwoStringBody::decode_unpacked(reader.view());
                    let split = body.size1 as usize;
                    reader.read_staged(split + body.size2 as usize)?;
                    let at = reader.offset();
                    let data = reader.view();
                    loader.use_schema(utf8(&data[..split], at)?, utf8(&data[split..], at)?)?;
                }
                Opcode::RemotePath => {
                    info!("event: remote-path");
                    let size = Self::read_string_size(reader)?;
                    reader.read_staged(size)?;
                    loader.remote_path(utf8(reader.view(), reader.offset())?)?;
                }
                Opcode::NewTable => {
                    info!("event: new-table, id={}", header.id);
                    let size = Self::read_string_size(reader)?;
                    reader.read_staged(size)?;
                    loader.new_table(header.id, utf8(reader.view(), reader.offset())?)?;
                }
                Opcode::NewColumn => {
                    info!("event: new-column, id={}", header.id);
                    reader.read_staged(ColumnBody::UNPACKED_SIZE)?;
                    let body = ColumnBody::decode_unpacked(reader.view());
                    reader.read_staged(body.name_size as usize)?;
                    loader.new_column(
                        header.id,
                        body.table_id,
                        body.elem_bits,
                        body.flag_bits,
                        utf8(reader.view(), reader.offset())?,
                    )?;
                }
                Opcode::CellData | Opcode::CellDefault => {
                    let default = header.opcode == Opcode::CellDefault;
                    let column = header.id;
                    if default {
                        info!("event: cell-default, id={}", column);
                    } else {
                        info!("event: cell-data, id={}", column);
                    }
                    reader.read_staged(DataBody::UNPACKED_SIZE)?;
                    let body = DataBody::decode_unpacked(reader.view());
                    // the body carries an element count; the column's
                    // registry record sizes the payload in bytes
                    let info = loader
                        .column(column)
                        .ok_or(ParseError::UnknownColumn { column })?;
                    let elem_count = u64::from(body.size);
                    let nbytes = (u64::from(info.elem_bits) * elem_count).div_ceil(8);
                    reader.read_staged(nbytes as usize)?;
                    if default {
                        loader.cell_default(column, reader.view(), elem_count)?;
                    } else {
                        loader.cell_data(column, reader.view(), elem_count)?;
                    }
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
                Opcode::ErrMsg => {
                    info!("event: error-message");
                    let size = Self::read_string_size(reader)?;
                    reader.read_staged(size)?;
                    loader.error_message(utf8(reader.view(), reader.offset())?)?;
                }
                // 16-bit-length variants exist only in the packed dialect
                Opcode::UseSchema2
                | Opcode::RemotePath2
                | Opcode::NewTable2
                | Opcode::CellDefault2
                | Opcode::CellData2
                | Opcode::ErrMsg2 => {
                    return Err(ParseError::UnknownOpcode {
                        opcode: header.opcode as u32,
                        at: reader.offset(),
                    });
                }
            }
        }
    }

    fn read_string_size<R: Read>(reader: &mut Reader<R>) -> ParseResult<usize> {
        reader.read_staged(OneStringBody::UNPACKED_SIZE)?;
        Ok(OneStringBody::decode_unpacked(reader.view()).size as usize)
    }
}
