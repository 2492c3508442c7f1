//! bcp XML format files: generating, loading and writing them back.
//!
//! Only the parts the transfer pipeline needs are understood: field order,
//! terminators, column names and column types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::bcp::args::{Arg, build_arg_list};
use crate::bcp::runner::{Mode, ToolCommand, ToolRunner};
use crate::bcp::types::{Field, FileEncoding, TypeTag};
use crate::config::BcpOptions;
use crate::error::{Error, Result};

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<FIELD\s([^>]*?)/?>").expect("valid FIELD pattern"));
static COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<COLUMN\s([^>]*?)/?>").expect("valid COLUMN pattern"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:]+)\s*=\s*"([^"]*)""#).expect("valid attribute pattern")
});

/// Ordered field layout of a bcp data file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Where the format file lives on disk.
    pub path: PathBuf,
    pub encoding: FileEncoding,
    pub fields: Vec<Field>,
}

impl FormatDescriptor {
    /// Ask bcp to describe a live table, then load the file it wrote.
    pub async fn generate<R: ToolRunner>(
        runner: &R,
        options: &BcpOptions,
        program: &Path,
        table: &str,
        dest: &Path,
    ) -> Result<Self> {
        let mut args = vec![Arg::from("-x")];
        if !options.unicode {
            args.push("-c".into());
        }
        args.extend(build_arg_list(options, false));

        let command = ToolCommand::new(program, options, table, Mode::Format, dest, args);
        runner.run(&command, options.timeout_ms).await?;

        Self::load_from_file(dest, FileEncoding::from_unicode_flag(options.unicode)).await
    }

    /// Load an existing format file.
    pub async fn load_from_file(path: &Path, encoding: FileEncoding) -> Result<Self> {
        let xml = tokio::fs::read_to_string(path).await?;
        let fields = parse_fields(&xml)?;
        Ok(Self { path: path.to_path_buf(), encoding, fields })
    }

    /// Write the descriptor to its path. When any field is flagged for import
    /// only those fields are written.
    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.to_xml())?;
        Ok(())
    }

    /// Fields that make up a data file written against this descriptor.
    pub fn import_fields(&self) -> Vec<&Field> {
        if self.fields.iter().any(|field| field.in_import) {
            self.fields.iter().filter(|field| field.in_import).collect()
        } else {
            self.fields.iter().collect()
        }
    }

    /// Case-insensitive field lookup.
    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.name.eq_ignore_ascii_case(name))
    }

    pub fn to_xml(&self) -> String {
        let field_type = match self.encoding {
            FileEncoding::Char => "CharTerm",
            FileEncoding::Unicode => "NCharTerm",
        };
        let fields = self.import_fields();

        let mut xml = String::from("<?xml version=\"1.0\"?>\n");
        xml.push_str(
            "<BCPFORMAT xmlns=\"http://schemas.microsoft.com/sqlserver/2004/bulkload/format\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n",
        );
        xml.push_str(" <RECORD>\n");
        for (index, field) in fields.iter().enumerate() {
            xml.push_str(&format!(
                "  <FIELD ID=\"{}\" xsi:type=\"{field_type}\" TERMINATOR=\"{}\"/>\n",
                index + 1,
                escape_xml(&field.terminator)
            ));
        }
        xml.push_str(" </RECORD>\n <ROW>\n");
        for (index, field) in fields.iter().enumerate() {
            xml.push_str(&format!(
                "  <COLUMN SOURCE=\"{}\" NAME=\"{}\" xsi:type=\"{}\"/>\n",
                index + 1,
                escape_xml(&field.name),
                escape_xml(field.type_tag.as_str())
            ));
        }
        xml.push_str(" </ROW>\n</BCPFORMAT>\n");
        xml
    }
}

/// Read FIELD and COLUMN elements into fields, ordered as in RECORD.
pub fn parse_fields(xml: &str) -> Result<Vec<Field>> {
    let mut columns: HashMap<String, (String, String)> = HashMap::new();
    for capture in COLUMN_RE.captures_iter(xml) {
        let attrs = attributes(&capture[1]);
        let source = required(&attrs, "SOURCE", "COLUMN")?;
        let name = required(&attrs, "NAME", "COLUMN")?;
        let type_tag = required(&attrs, "xsi:type", "COLUMN")?;
        columns.insert(source, (name, type_tag));
    }

    let mut fields = Vec::new();
    for capture in FIELD_RE.captures_iter(xml) {
        let attrs = attributes(&capture[1]);
        let id = required(&attrs, "ID", "FIELD")?;
        let terminator = attrs
            .get("TERMINATOR")
            .filter(|terminator| !terminator.is_empty())
            .cloned()
            .ok_or_else(|| Error::Parse(format!("FIELD {id} has no TERMINATOR")))?;
        let (name, type_tag) = columns
            .remove(&id)
            .ok_or_else(|| Error::Parse(format!("format file has no COLUMN for FIELD {id}")))?;
        fields.push(Field::new(name, TypeTag::parse(&type_tag), terminator));
    }

    if fields.is_empty() {
        return Err(Error::Parse("format file has no FIELD elements".into()));
    }
    Ok(fields)
}

/// Turn a format-file terminator into raw bytes. Understands `\t`, `\n`,
/// `\r`, `\0`, `\\` and `0xHH` hex bytes.
pub fn unescape_terminator(terminator: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(terminator.len());
    let raw = terminator.as_bytes();
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'\\' if i + 1 < raw.len() => {
                let escaped = match raw[i + 1] {
                    b't' => Some(b'\t'),
                    b'n' => Some(b'\n'),
                    b'r' => Some(b'\r'),
                    b'0' => Some(0),
                    b'\\' => Some(b'\\'),
                    _ => None,
                };
                match escaped {
                    Some(byte) => {
                        bytes.push(byte);
                        i += 2;
                    }
                    None => {
                        bytes.push(b'\\');
                        i += 1;
                    }
                }
            }
            b'0' if matches!(raw.get(i + 1), Some(b'x' | b'X')) => {
                match raw.get(i + 2..i + 4).and_then(hex_byte) {
                    Some(byte) => {
                        bytes.push(byte);
                        i += 4;
                    }
                    None => {
                        bytes.push(b'0');
                        i += 1;
                    }
                }
            }
            byte => {
                bytes.push(byte);
                i += 1;
            }
        }
    }

    bytes
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    u8::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

fn attributes(body: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(body)
        .map(|capture| (capture[1].to_string(), unescape_xml(&capture[2])))
        .collect()
}

fn required(attrs: &HashMap<String, String>, name: &str, element: &str) -> Result<String> {
    attrs
        .get(name)
        .cloned()
        .ok_or_else(|| Error::Parse(format!("{element} element is missing {name}")))
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
