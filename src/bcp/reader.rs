//! Splitting bcp character-mode output into typed rows.

use crate::bcp::codec::decode_field;
use crate::bcp::format::{FormatDescriptor, unescape_terminator};
use crate::bcp::types::{Field, FileEncoding, Row};
use crate::error::Result;

/// Decode a whole data file into rows.
///
/// Each field ends at its own terminator, looked up in field order. When a
/// terminator is missing the scan stops: a truncated trailing row is dropped,
/// not reported. A row that consumes no input also ends the scan.
pub fn read_rows(bytes: &[u8], format: &FormatDescriptor) -> Result<Vec<Row>> {
    let text = format.encoding.decode(bytes);
    let terminators: Vec<String> =
        format.fields.iter().map(|field| terminator_text(field, format.encoding)).collect();
    read_text_rows(&text, &format.fields, &terminators)
}

fn read_text_rows(text: &str, fields: &[Field], terminators: &[String]) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    if fields.is_empty() {
        return Ok(rows);
    }

    let mut offset = 0;
    'rows: while offset < text.len() {
        let row_start = offset;
        let mut row = Row::with_capacity(fields.len());
        for (field, terminator) in fields.iter().zip(terminators) {
            let Some(found) = text[offset..].find(terminator.as_str()) else {
                break 'rows;
            };
            let end = offset + found;
            row.insert(field.name.clone(), decode_field(&text[offset..end], field)?);
            offset = end + terminator.len();
        }
        // Empty terminators consume nothing
        if offset == row_start {
            break;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// The terminator as text in the data file's encoding.
pub fn terminator_text(field: &Field, encoding: FileEncoding) -> String {
    let bytes = unescape_terminator(&field.terminator);
    match encoding {
        // Unicode format files spell out the high bytes (`\t\0`)
        FileEncoding::Unicode if bytes.len() % 2 == 0 => FileEncoding::Unicode.decode(&bytes),
        _ => FileEncoding::Char.decode(&bytes),
    }
}
