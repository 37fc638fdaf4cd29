//! data blocks: whitespace separated text, or binary words behind a check value

use crate::prelude::*;

use crate::array::FieldBuilder;
use crate::data::{is_check_value, BinaryWord, ByteOrder};
use crate::header::RecordShape;

use super::error::{BadCheckValue, BinaryInTrailer, DataBlockTooLong, FieldInDataBlock};
use super::error::{NonFinite, NonNumeric, PrematureEof, ShortRead, UnexpectedLine};
use super::{Content, LineReader, LineSummary};

/// nodes decoded per binary read
const STRIDE: usize = 1024;

pub(crate) fn read_block<R: BufRead>(
    lines: &mut LineReader<R>,
    style: DataStyle,
    version: FileVersion,
    shape: &RecordShape,
) -> Result<FieldArray, Error> {
    let mut field = FieldBuilder::new(shape.count, shape.value_dim, shape.with_locations);
    let order = version.byte_order();

    match style {
        DataStyle::Text => read_text(lines, shape, &mut field)?,
        DataStyle::Binary4 => read_binary::<f32, _>(lines, order, shape, &mut field)?,
        DataStyle::Binary8 => read_binary::<f64, _>(lines, order, shape, &mut field)?,
    }

    field.finish()
}

fn read_text<R: BufRead>(lines: &mut LineReader<R>, shape: &RecordShape, field: &mut FieldBuilder) -> Result<(), Error> {
    let width = shape.width();
    let mut record = Vec::new();
    let mut node = 0;

    while node < shape.count {
        let line = match lines.next_line()? {
            Some(line) => line,
            None => return Err(lines.encoding(ShortRead::new(node, shape.count))),
        };
        let data = data_part(&line).ok_or_else(|| lines.structural(FieldInDataBlock::new(LineSummary::new(&line))))?;

        for token in data.split_whitespace() {
            if node == shape.count {
                return Err(lines.structural(DataBlockTooLong::new(LineSummary::new(&line))));
            }

            let value = utils::parse_float(token).ok_or_else(|| lines.encoding(NonNumeric::new(token)))?;
            if !value.is_finite() {
                return Err(lines.encoding(NonFinite::new(token)));
            }

            record.push(value);
            if record.len() == width {
                field.push(&record);
                record.clear();
                node += 1;
            }
        }
    }

    Ok(())
}

/// the numbers of a text data line; `None` when a `#` starts anything other
/// than a `##` comment or trailing whitespace
fn data_part(line: &str) -> Option<&str> {
    match line.find('#') {
        None => Some(line),
        Some(pos) => {
            let rest = &line[pos + 1..];
            if rest.starts_with('#') || rest.trim().is_empty() {
                Some(&line[..pos])
            } else {
                None
            }
        }
    }
}

fn read_binary<F: BinaryWord, R: BufRead>(
    lines: &mut LineReader<R>,
    order: ByteOrder,
    shape: &RecordShape,
    field: &mut FieldBuilder,
) -> Result<(), Error> {
    let style = if F::SIZE == 4 { DataStyle::Binary4 } else { DataStyle::Binary8 };

    // nothing of the payload is looked at before the check value matches
    let mut check = vec![0u8; F::SIZE];
    let read = lines.raw().read_exact(&mut check);
    read.map_err(|err| short_read(lines, err, 0, shape.count))?;
    if !is_check_value::<F>(&check, order) {
        return Err(lines.encoding(BadCheckValue::new(style.label())));
    }

    let record_bytes = shape.width().saturating_mul(F::SIZE);
    let mut bytes = Vec::new();
    let mut record = Vec::new();
    let mut node = 0;

    while node < shape.count {
        let batch = STRIDE.min(shape.count - node);
        let wanted = batch.saturating_mul(record_bytes) as u64;

        // the buffer only grows as far as the stream really goes
        bytes.clear();
        let read = (&mut *lines.raw()).take(wanted).read_to_end(&mut bytes);
        read.map_err(|err| short_read(lines, err, node, shape.count))?;
        if (bytes.len() as u64) < wanted {
            let complete = node + bytes.len() / record_bytes;
            return Err(lines.encoding(ShortRead::new(complete, shape.count)));
        }

        for raw_record in bytes.chunks_exact(record_bytes) {
            record.clear();
            record.extend(raw_record.chunks_exact(F::SIZE).map(|word| F::decode(word, order).widen()));
            field.push(&record);
            node += 1;
        }
    }

    debug!(nodes = node, style = style.label(), ?order, "decoded binary block");
    Ok(())
}

fn short_read<R: BufRead>(lines: &LineReader<R>, err: std::io::Error, read: usize, expected: usize) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        lines.encoding(ShortRead::new(read, expected))
    } else {
        err.into()
    }
}

/// `End: Data ...` matching the block, then everything up to `End: Segment`
pub(crate) fn read_trailer<R: BufRead>(lines: &mut LineReader<R>, style: DataStyle) -> Result<(), Error> {
    if style != DataStyle::Text {
        if let Some(byte) = lines.peek_past_whitespace()? {
            if !(0x20..=0x7e).contains(&byte) {
                return Err(lines.encoding(BinaryInTrailer::new(byte)));
            }
        }
    }

    match lines.next_content()? {
        Some((Content::Record(record), line)) if record.field == "end" => {
            if record.value != style.marker() {
                let expected = format!("`End: Data {}`", style.label());
                return Err(lines.structural(UnexpectedLine::new(expected, LineSummary::new(&line))));
            }
        }
        Some((_, line)) => return Err(lines.structural(DataBlockTooLong::new(LineSummary::new(&line)))),
        None => return Err(lines.structural(PrematureEof::new("the data block trailer"))),
    }

    loop {
        match lines.next_record()? {
            Some((record, _)) if record.is("end", "segment") => return Ok(()),
            Some(_) => continue,
            None => return Err(lines.structural(PrematureEof::new("the segment trailer"))),
        }
    }
}
