//! Band palettes referenced by `Color_Paleta`.
//!
//! A palette is either a DBF table (`CLAUSIMBOL`, `R_COLOR`, `G_COLOR`,
//! `B_COLOR`) or a flat text file (`.pal`, `.p25`, `.p65`) with one
//! `index R G B` line per color.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::dbf::DbfTable;
use crate::encoding::CodePage;
use crate::errors::{MiraMonError, Result};
use crate::raster::RgbaEntry;

/// Color of palette slots nothing was assigned to.
pub const DEFAULT_COLOR: RgbaEntry = RgbaEntry {
    r: 0,
    g: 0,
    b: 0,
    a: 127,
};

/// Color of the nodata slot, and of DBF colors documented as `(-1,-1,-1)`.
pub const NODATA_COLOR: RgbaEntry = RgbaEntry {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

const MAX_PALETTE_SIZE: usize = 65536;

/// Flat palette flavours, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatPalette {
    Pal,
    P25,
    P65,
}

impl FlatPalette {
    /// Number of slots of the palette.
    pub fn size(&self) -> usize {
        match self {
            FlatPalette::Pal => 64,
            FlatPalette::P25 => 256,
            FlatPalette::P65 => 65536,
        }
    }
}

/// Where the colors of a band come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteSource {
    /// No palette: `<Automatic>`, undocumented or unknown extension.
    Automatic,
    Dbf(PathBuf),
    Flat(PathBuf, FlatPalette),
}

impl PaletteSource {
    /// Resolve a `Color_Paleta` value against the REL directory.
    pub fn resolve(dir: &Path, color_paleta: Option<&str>) -> Self {
        let Some(name) = color_paleta.filter(|n| !n.is_empty() && *n != "<Automatic>") else {
            return PaletteSource::Automatic;
        };
        let path = dir.join(name);
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "dbf" => PaletteSource::Dbf(path),
            "pal" => PaletteSource::Flat(path, FlatPalette::Pal),
            "p25" => PaletteSource::Flat(path, FlatPalette::P25),
            "p65" => PaletteSource::Flat(path, FlatPalette::P65),
            _ => {
                debug!("unknown palette type {name:?}, using automatic colors");
                PaletteSource::Automatic
            }
        }
    }

    /// Load the palette. `Ok(None)` for automatic colors.
    pub fn load(&self, categorical: bool) -> Result<Option<Palette>> {
        match self {
            PaletteSource::Automatic => Ok(None),
            PaletteSource::Dbf(path) => {
                let table = DbfTable::open(path)?;
                Palette::from_dbf(&table, categorical).map(Some)
            }
            PaletteSource::Flat(path, kind) => {
                let text = CodePage::Windows1252.decode(&fs::read(path)?);
                Palette::from_flat(path, &text, *kind, categorical).map(Some)
            }
        }
    }
}

/// RGBA colors indexed by palette slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<RgbaEntry>,
    categorical: bool,
    nodata_index: Option<usize>,
}

impl Palette {
    #[cfg(test)]
    pub(crate) fn new(colors: Vec<RgbaEntry>, categorical: bool, nodata_index: Option<usize>) -> Self {
        Palette {
            colors,
            categorical,
            nodata_index,
        }
    }

    pub fn colors(&self) -> &[RgbaEntry] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> Option<RgbaEntry> {
        self.colors.get(index).copied()
    }

    pub fn is_categorical(&self) -> bool {
        self.categorical
    }

    /// Slot holding the nodata color, if the palette documents one.
    pub fn nodata_index(&self) -> Option<usize> {
        self.nodata_index
    }

    pub fn nodata_color(&self) -> Option<RgbaEntry> {
        self.nodata_index.and_then(|i| self.color(i))
    }

    /// Colors excluding the nodata slot, in slot order.
    pub fn valid_colors(&self) -> Vec<RgbaEntry> {
        self.colors
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.nodata_index)
            .map(|(_, c)| *c)
            .collect()
    }

    /// Build a palette from a MiraMon color DBF.
    ///
    /// In categorical mode `CLAUSIMBOL` is the slot of each record and the
    /// palette spans up to the largest one. A record with a blank
    /// `CLAUSIMBOL` is the nodata color, stored in an extra last slot in
    /// categorical mode and at its own row otherwise.
    pub fn from_dbf(table: &DbfTable, categorical: bool) -> Result<Self> {
        let invalid = |msg: String| MiraMonError::InvalidColorTable {
            path: table.path().to_path_buf(),
            msg,
        };

        let field = |name: &str| -> Result<usize> {
            let index = table
                .field_index(name)
                .ok_or_else(|| invalid(format!("missing field {name}")))?;
            if !table.fields()[index].is_numeric() {
                return Err(invalid(format!("field {name} is not numeric")));
            }
            Ok(index)
        };
        let symbol = field("CLAUSIMBOL")?;
        let (r, g, b) = (field("R_COLOR")?, field("G_COLOR")?, field("B_COLOR")?);

        let record_color = |record: usize| {
            let channel = |f| table.numeric_value(record, f).unwrap_or(0.0);
            let (cr, cg, cb) = (channel(r), channel(g), channel(b));
            if cr == -1.0 && cg == -1.0 && cb == -1.0 {
                NODATA_COLOR
            } else {
                RgbaEntry {
                    r: cr.round() as i16,
                    g: cg.round() as i16,
                    b: cb.round() as i16,
                    a: 255,
                }
            }
        };
        let records = 0..table.record_count();

        if categorical {
            let symbols: Vec<Option<f64>> = records
                .clone()
                .map(|record| table.numeric_value(record, symbol))
                .collect();
            if let Some(v) = symbols
                .iter()
                .flatten()
                .find(|v| !v.is_finite() || **v >= MAX_PALETTE_SIZE as f64)
            {
                return Err(invalid(format!("CLAUSIMBOL {v} out of range")));
            }
            let has_nodata = symbols.iter().any(Option::is_none);
            let max_symbol = symbols
                .iter()
                .flatten()
                .fold(0.0f64, |max, s| max.max(*s));
            let mut size = max_symbol as usize + 1;
            let nodata_index = has_nodata.then_some(size);
            if has_nodata {
                size += 1;
            }
            if size > MAX_PALETTE_SIZE {
                return Err(invalid(format!("too many colors: {size}")));
            }

            let mut colors = vec![DEFAULT_COLOR; size];
            for (record, value) in records.zip(symbols) {
                let slot = match value {
                    None => nodata_index,
                    Some(v) if v >= 0.0 => Some(v as usize),
                    Some(v) => {
                        debug!("ignoring negative CLAUSIMBOL {v}");
                        None
                    }
                };
                if let Some(slot) = slot {
                    colors[slot] = record_color(record);
                }
            }
            Ok(Palette {
                colors,
                categorical,
                nodata_index,
            })
        } else {
            let size = table.record_count();
            if size > MAX_PALETTE_SIZE {
                return Err(invalid(format!("too many colors: {size}")));
            }
            let mut nodata_index = None;
            let colors = records
                .map(|record| {
                    if table.numeric_value(record, symbol).is_none() {
                        nodata_index = Some(record);
                    }
                    record_color(record)
                })
                .collect();
            Ok(Palette {
                colors,
                categorical,
                nodata_index,
            })
        }
    }

    /// Build a palette from the text of a `.pal`, `.p25` or `.p65` file.
    ///
    /// Flat palettes have no nodata slot. Slots past the last line get the
    /// default color.
    pub fn from_flat(path: &Path, text: &str, kind: FlatPalette, categorical: bool) -> Result<Self> {
        let invalid = |msg: String| MiraMonError::InvalidColorTable {
            path: path.to_path_buf(),
            msg,
        };

        let mut colors = Vec::with_capacity(kind.size());
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let tokens: Vec<&str> = line.split([' ', '\t']).filter(|t| !t.is_empty()).collect();
            if tokens.len() != 4 {
                return Err(invalid(format!("expected 4 values in line {line:?}")));
            }
            if colors.len() == kind.size() {
                return Err(invalid(format!("more than {} colors", kind.size())));
            }
            let channel = |t: &str| t.parse::<f64>().map(|v| v.round() as i16).unwrap_or(0);
            colors.push(RgbaEntry {
                r: channel(tokens[1]),
                g: channel(tokens[2]),
                b: channel(tokens[3]),
                a: 255,
            });
        }
        colors.resize(kind.size(), DEFAULT_COLOR);

        Ok(Palette {
            colors,
            categorical,
            nodata_index: None,
        })
    }
}
