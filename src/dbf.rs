//! Minimal dBASE III table reader.
//!
//! MiraMon keeps palettes and attribute tables in `.dbf` files. Only the
//! parts needed to read those are handled: the header, field descriptors and
//! fixed-width records. Memo files and indexes are ignored.

use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::NaiveDate;
use log::debug;

use crate::encoding::CodePage;
use crate::errors::{MiraMonError, Result};

const HEADER_SIZE: usize = 32;
const DESCRIPTOR_SIZE: usize = 32;
const DESCRIPTOR_TERMINATOR: u8 = 0x0D;
const DELETED_RECORD: u8 = b'*';

/// A column of a [`DbfTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    name: String,
    field_type: u8,
    length: usize,
    decimals: u8,
    /// Position in the record, after the deletion flag.
    offset: usize,
}

impl DbfField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type letter: `C`haracter, `N`umeric, `F`loat, `D`ate, `L`ogical...
    pub fn field_type(&self) -> char {
        self.field_type as char
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// `N` field with a non-zero width.
    pub fn is_numeric(&self) -> bool {
        self.field_type == b'N' && self.length > 0
    }
}

/// An in-memory dBASE table.
#[derive(Debug, Clone)]
pub struct DbfTable {
    path: PathBuf,
    last_update: Option<NaiveDate>,
    code_page: CodePage,
    fields: Vec<DbfField>,
    record_size: usize,
    data: Vec<u8>,
    record_count: usize,
}

impl DbfTable {
    /// Read the table at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::from_bytes(path, bytes)
    }

    /// Parse a table already loaded in memory.
    pub fn from_bytes<P: AsRef<Path>>(path: P, bytes: Vec<u8>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let invalid = |msg: &str| MiraMonError::InvalidDbf {
            path: path.clone(),
            msg: msg.to_string(),
        };

        if bytes.len() < HEADER_SIZE {
            return Err(invalid("file is shorter than a dBASE header"));
        }

        let mut cursor = Cursor::new(&bytes);
        let _version = cursor.read_u8()?;
        let mut ymd = [0u8; 3];
        cursor.read_exact(&mut ymd)?;
        let last_update =
            NaiveDate::from_ymd_opt(1900 + ymd[0] as i32, ymd[1] as u32, ymd[2] as u32);
        let record_count = cursor.read_u32::<LittleEndian>()? as usize;
        let header_size = cursor.read_u16::<LittleEndian>()? as usize;
        let record_size = cursor.read_u16::<LittleEndian>()? as usize;
        let code_page = code_page_from_language_driver(bytes[29]);

        if header_size < HEADER_SIZE + 1 || header_size > bytes.len() {
            return Err(invalid("inconsistent header size"));
        }

        let mut fields = Vec::new();
        let mut offset = 0;
        cursor.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        loop {
            let start = cursor.position() as usize;
            if start >= header_size || bytes[start] == DESCRIPTOR_TERMINATOR {
                break;
            }
            if start + DESCRIPTOR_SIZE > header_size {
                return Err(invalid("truncated field descriptor"));
            }
            let mut name = [0u8; 11];
            cursor.read_exact(&mut name)?;
            let field_type = cursor.read_u8()?;
            cursor.seek(SeekFrom::Current(4))?;
            let length = cursor.read_u8()? as usize;
            let decimals = cursor.read_u8()?;
            cursor.seek(SeekFrom::Start((start + DESCRIPTOR_SIZE) as u64))?;

            let name_len = name.iter().position(|b| *b == 0).unwrap_or(name.len());
            fields.push(DbfField {
                name: code_page.decode(&name[..name_len]).trim().to_string(),
                field_type,
                length,
                decimals,
                offset,
            });
            offset += length;
        }

        if offset + 1 > record_size {
            return Err(invalid("fields don't fit in the record size"));
        }

        let available = (bytes.len() - header_size) / record_size;
        if available < record_count {
            debug!(
                "{:?} declares {record_count} records but only holds {available}",
                path
            );
        }
        let record_count = record_count.min(available);
        let data = bytes[header_size..header_size + record_count * record_size].to_vec();

        Ok(DbfTable {
            path,
            last_update,
            code_page,
            fields,
            record_size,
            data,
            record_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Date of the last update, as stored in the header.
    pub fn last_update(&self) -> Option<NaiveDate> {
        self.last_update
    }

    pub fn code_page(&self) -> CodePage {
        self.code_page
    }

    pub fn fields(&self) -> &[DbfField] {
        &self.fields
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Index of the field called `name`, ignoring case.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field(&self, name: &str) -> Option<&DbfField> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    fn record(&self, record: usize) -> Option<&[u8]> {
        if record >= self.record_count {
            return None;
        }
        let start = record * self.record_size;
        self.data.get(start..start + self.record_size)
    }

    pub fn is_deleted(&self, record: usize) -> bool {
        self.record(record)
            .is_some_and(|r| r.first() == Some(&DELETED_RECORD))
    }

    /// Raw bytes of a cell, padding included.
    pub fn raw_value(&self, record: usize, field: usize) -> Option<&[u8]> {
        let field = self.fields.get(field)?;
        let start = 1 + field.offset;
        self.record(record)?.get(start..start + field.length)
    }

    /// Cell decoded with the table code page and trimmed.
    pub fn string_value(&self, record: usize, field: usize) -> Option<String> {
        self.raw_value(record, field)
            .map(|raw| self.code_page.decode(raw).trim().to_string())
    }

    /// Cell parsed as a number. Blank or unparsable cells give `None`.
    pub fn numeric_value(&self, record: usize, field: usize) -> Option<f64> {
        let raw = self.raw_value(record, field)?;
        let text = std::str::from_utf8(raw).ok()?.trim();
        if text.is_empty() {
            return None;
        }
        text.parse().ok()
    }
}

/// Map the header language driver byte to a code page.
fn code_page_from_language_driver(ldid: u8) -> CodePage {
    match ldid {
        0xFF => CodePage::Utf8,
        0x01 | 0x02 | 0x14 => CodePage::Oem850,
        _ => CodePage::Latin1,
    }
}
