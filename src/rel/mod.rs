//! Access to the `I.rel` metadata sidecar.
//!
//! A REL file is an INI document:
//!
//! ```text
//! [VERSIO]
//! Vers=4
//! SubVers=3
//!
//! [ATTRIBUTE_DATA]
//! IndexsNomsCamps=1
//! NomCamp_1=band1
//!
//! [ATTRIBUTE_DATA:band1]
//! NomFitxer=band1.img
//! TipusCompressio=byte
//! ```
//!
//! Section names may be qualified with `:` (`[ATTRIBUTE_DATA:band1]`,
//! `[ATTRIBUTE_DATA:band1:EXTENT]`). Lookups into a qualified section fall
//! back to a bare section when the key is not found there: the main section
//! for two-level names, the innermost one (`[EXTENT]`) for three-level names.

mod names;
mod sections;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::encoding::CodePage;
use crate::errors::{MiraMonError, Result};

pub(crate) use names::is_img_name;
pub use names::{img_name_from_rel, is_rel_name, rel_name_from_img, same_file, REL_SUFFIX};
pub use sections::{
    AttributeData, BandSection, ColorText, Extent, JoinTable, ATTRIBUTE_DATA, COLOR_TEXT, EXTENT,
    OVERVIEW, OVERVIEW_ASPECTES_TECNICS, SPATIAL_REFERENCE_SYSTEM_HORIZONTAL, TAULA_PRINCIPAL,
    VERSIO,
};

/// Oldest REL layout this crate understands.
const MIN_REL_VERSION: f64 = 4.0;
const MIN_REL_SUBVERSION: f64 = 3.0;

/// A parsed REL file.
///
/// Section and key names are case-insensitive. The first occurrence of a key
/// in a section wins.
#[derive(Debug, Clone)]
pub struct RelFile {
    path: PathBuf,
    sections: HashMap<String, HashMap<String, String>>,
}

impl RelFile {
    /// Read and parse the REL file at `path`.
    ///
    /// Fails when the file can't be read or is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(MiraMonError::OpenFailed {
                path: path.to_path_buf(),
                msg: "metadata file should have some information in".to_string(),
            });
        }
        let text = CodePage::Windows1252.decode(&bytes);
        Ok(Self::parse(path, &text))
    }

    /// Parse REL `text` as if it was read from `path`.
    pub fn parse<P: AsRef<Path>>(path: P, text: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[') {
                let name = name.strip_suffix(']').unwrap_or(name).trim();
                let key = name.to_ascii_uppercase();
                sections.entry(key.clone()).or_default();
                current = Some(key);
                continue;
            }
            let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('='))
            else {
                continue;
            };
            if let Some(entries) = sections.get_mut(section) {
                entries
                    .entry(key.trim().to_ascii_uppercase())
                    .or_insert_with(|| value.trim().to_string());
            }
        }

        RelFile {
            path: path.as_ref().to_path_buf(),
            sections,
        }
    }

    /// Path of the REL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the REL file. Relative file names in the REL are
    /// resolved against it.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Resolve a file name documented in the REL against its directory.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.dir().join(file_name)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(&section.to_ascii_uppercase())
    }

    /// Value of `key` in `[section]`.
    ///
    /// A key documented with an empty value is reported as absent.
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.raw_value(section, key).filter(|v| !v.is_empty())
    }

    /// Like [`value`](Self::value), but keeps documented empty values.
    pub fn raw_value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_uppercase())
            .and_then(|entries| entries.get(&key.to_ascii_uppercase()))
            .map(String::as_str)
    }

    /// Value of `key` in `[main:sub]`, falling back to `[main]`.
    pub fn value_in(&self, main: &str, sub: &str, key: &str) -> Option<&str> {
        self.value(&format!("{main}:{sub}"), key).or_else(|| {
            debug!("{key} not in [{main}:{sub}], trying [{main}]");
            self.value(main, key)
        })
    }

    /// Value of `key` in `[main:sub:subsub]`, falling back to `[subsub]`.
    pub fn value_in3(&self, main: &str, sub: &str, subsub: &str, key: &str) -> Option<&str> {
        self.value(&format!("{main}:{sub}:{subsub}"), key)
            .or_else(|| self.value(subsub, key))
    }

    /// Parse the value of `key` in `[section]`.
    ///
    /// Absent keys give `Ok(None)`, unparsable ones an error.
    pub fn parse_value<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>> {
        match self.value(section, key) {
            None => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| MiraMonError::InvalidValue {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: v.to_string(),
                }),
        }
    }

    /// Check that this REL file has a supported `[VERSIO]`.
    pub fn check_version(&self) -> Result<()> {
        let version = self
            .parse_value::<f64>(VERSIO, "Vers")
            .ok()
            .flatten()
            .filter(|v| *v >= MIN_REL_VERSION);
        let subversion = self
            .parse_value::<f64>(VERSIO, "SubVers")
            .ok()
            .flatten()
            .filter(|v| *v >= MIN_REL_SUBVERSION);

        match (version, subversion) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(MiraMonError::UnsupportedRelVersion(self.path.clone())),
        }
    }
}
