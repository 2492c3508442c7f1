use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Column type as written in a bcp XML format file (`xsi:type` of a COLUMN).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Flt4,
    Flt8,
    DateTime,
    DateTim4,
    DateTime2,
    DateTimeOffset,
    /// Any other tag; values pass through as text.
    Other(String),
}

impl TypeTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "SQLBIT" => TypeTag::Bit,
            "SQLTINYINT" => TypeTag::TinyInt,
            "SQLSMALLINT" => TypeTag::SmallInt,
            "SQLINT" => TypeTag::Int,
            "SQLBIGINT" => TypeTag::BigInt,
            "SQLFLT4" => TypeTag::Flt4,
            "SQLFLT8" => TypeTag::Flt8,
            "SQLDATETIME" => TypeTag::DateTime,
            "SQLDATETIM4" => TypeTag::DateTim4,
            "SQLDATETIME2" => TypeTag::DateTime2,
            "SQLDATETIMEOFFSET" => TypeTag::DateTimeOffset,
            other => TypeTag::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::Bit => "SQLBIT",
            TypeTag::TinyInt => "SQLTINYINT",
            TypeTag::SmallInt => "SQLSMALLINT",
            TypeTag::Int => "SQLINT",
            TypeTag::BigInt => "SQLBIGINT",
            TypeTag::Flt4 => "SQLFLT4",
            TypeTag::Flt8 => "SQLFLT8",
            TypeTag::DateTime => "SQLDATETIME",
            TypeTag::DateTim4 => "SQLDATETIM4",
            TypeTag::DateTime2 => "SQLDATETIME2",
            TypeTag::DateTimeOffset => "SQLDATETIMEOFFSET",
            TypeTag::Other(tag) => tag,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a format descriptor, in on-disk order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub type_tag: TypeTag,
    /// Terminator as written in the format file, escapes included (`\t`, `\r\n`, `0x1F`).
    pub terminator: String,
    pub in_import: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, type_tag: TypeTag, terminator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag,
            terminator: terminator.into(),
            in_import: false,
        }
    }
}

/// Data file encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEncoding {
    /// Single-byte character data (`-c`)
    #[default]
    Char,
    /// UTF-16LE character data (`-w`)
    Unicode,
}

impl FileEncoding {
    pub fn label(self) -> &'static str {
        match self {
            FileEncoding::Char => "Char",
            FileEncoding::Unicode => "Unicode",
        }
    }

    pub fn from_unicode_flag(unicode: bool) -> Self {
        if unicode { FileEncoding::Unicode } else { FileEncoding::Char }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        let encoding = match self {
            FileEncoding::Char => encoding_rs::UTF_8,
            FileEncoding::Unicode => encoding_rs::UTF_16LE,
        };
        let (decoded, _, _) = encoding.decode(bytes);
        decoded.into_owned()
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            FileEncoding::Char => text.as_bytes().to_vec(),
            // encoding_rs has no UTF-16 encoder
            FileEncoding::Unicode => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
        }
    }
}

/// One row keyed by field name, in field order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Set a value, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Options for a bulk export
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Decode the exported file into rows.
    pub read: bool,
    /// Leave the format and data files on disk. Implied when `read` is off.
    pub keep_files: bool,
    /// Where to write the format file; a temp path when unset.
    pub format_file: Option<PathBuf>,
    /// Where to write the data file; a temp path when unset.
    pub export_file: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { read: true, keep_files: false, format_file: None, export_file: None }
    }
}

impl ExportOptions {
    pub fn keeps_files(&self) -> bool {
        self.keep_files || !self.read
    }
}

/// Options for a bulk insert
#[derive(Clone, Debug, Default)]
pub struct InsertOptions {
    pub keep_files: bool,
}

/// Options for preparing an import file
#[derive(Clone, Debug, Default)]
pub struct PrepareOptions {
    pub format_file: Option<PathBuf>,
    pub import_file: Option<PathBuf>,
}

/// What a bulk export produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportDetails {
    pub format_file: PathBuf,
    pub export_file: PathBuf,
    /// From bcp's `N rows copied.` line
    pub row_count: Option<u64>,
    pub raw_output: String,
}
