use log::{debug, warn};

use crate::errors::{MiraMonError, Result};
use crate::raster::palette::{Palette, NODATA_COLOR};
use crate::raster::BandDescriptor;

/// Types of color interpretation for raster bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorInterpretation {
    Undefined,
    PaletteIndex,
}

impl ColorInterpretation {
    pub fn name(&self) -> &'static str {
        match self {
            ColorInterpretation::Undefined => "Undefined",
            ColorInterpretation::PaletteIndex => "Palette",
        }
    }
}

/// Color interpretation of the entries of a [`ColorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteInterpretation {
    /// Red, Green, Blue and Alpha in into c1, c2, c3 and c4.
    Rgba,
}

/// Representation of a color entry in the [`ColorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbaEntry {
    /// Red.
    pub r: i16,
    /// Green.
    pub g: i16,
    /// Blue.
    pub b: i16,
    /// Alpha (0=transparent, 255=opaque).
    pub a: i16,
}

impl RgbaEntry {
    pub fn new(r: i16, g: i16, b: i16, a: i16) -> Self {
        RgbaEntry { r, g, b, a }
    }

    /// Whether every channel is within `0..=255`.
    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b, self.a]
            .iter()
            .all(|c| (0..=255).contains(c))
    }
}

/// A color entry of a [`ColorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEntry {
    Rgba(RgbaEntry),
}

impl ColorEntry {
    pub fn rgba(r: i16, g: i16, b: i16, a: i16) -> Self {
        ColorEntry::Rgba(RgbaEntry::new(r, g, b, a))
    }
}

/// Color lookup table indexed by pixel value.
///
/// Built for one and two byte bands, where the value domain can be
/// enumerated: 256 or 65536 entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorTable {
    entries: Vec<RgbaEntry>,
}

impl ColorTable {
    pub fn palette_interpretation(&self) -> PaletteInterpretation {
        PaletteInterpretation::Rgba
    }

    /// Get the number of color entries in this color table.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get a color entry.
    pub fn entry(&self, index: usize) -> Option<ColorEntry> {
        self.entries.get(index).copied().map(ColorEntry::Rgba)
    }

    /// Get a color entry in RGB format.
    pub fn entry_as_rgb(&self, index: usize) -> Option<RgbaEntry> {
        self.entries.get(index).copied()
    }

    /// Set entry in the RGB color table.
    ///
    /// The table is grown with transparent black as needed.
    pub fn set_color_entry(&mut self, index: usize, entry: &ColorEntry) {
        if index >= self.entries.len() {
            self.entries.resize(index + 1, RgbaEntry::new(0, 0, 0, 0));
        }
        let ColorEntry::Rgba(rgba) = entry;
        self.entries[index] = *rgba;
    }

    /// Build a table from computed colors, stopping at the first entry with
    /// a channel outside `0..=255`.
    pub(crate) fn from_entries(entries: Vec<RgbaEntry>) -> Self {
        match entries.iter().position(|e| !e.is_valid()) {
            Some(corrupt) => {
                warn!("Color table entry {corrupt} appears to be corrupt, skipping the rest");
                let mut entries = entries;
                entries.truncate(corrupt);
                ColorTable { entries }
            }
            None => ColorTable { entries },
        }
    }

    /// Color table of a band, from its `COLOR_TEXT` settings and palette.
    ///
    /// `Ok(None)` when the band has no color table: no palette, or a band
    /// type with too many values.
    pub(crate) fn for_band(band: &BandDescriptor, palette: Option<&Palette>) -> Result<Option<Self>> {
        let Some(size) = table_size(band) else {
            debug!("no color table for {} bands", band.data_type().data_type());
            return Ok(None);
        };

        let color_text = band.color_text();
        let entries = if color_text.constant {
            let (r, g, b) = color_text.symbol_color()?.unwrap_or((0, 0, 0));
            constant_entries(size, RgbaEntry::new(r, g, b, 255), band.nodata())
        } else {
            let Some(palette) = palette else {
                return Ok(None);
            };
            if palette.is_categorical() {
                categorical_entries(size, palette)
            } else {
                let (Some(visu_min), Some(visu_max)) = (band.visu_min(), band.visu_max()) else {
                    return Err(MiraMonError::InvalidColorTable {
                        path: band.path().to_path_buf(),
                        msg: "continuous palettes need the band minimum and maximum".to_string(),
                    });
                };
                continuous_entries(size, palette, visu_min, visu_max, band.nodata())?
            }
        };
        Ok(Some(ColorTable::from_entries(entries)))
    }
}

/// 2^(8 * bytes per pixel) for one and two byte bands.
fn table_size(band: &BandDescriptor) -> Option<usize> {
    match band.data_type().bytes_per_pixel() {
        bpp @ (1 | 2) => Some(1 << (8 * bpp)),
        _ => None,
    }
}

/// Slot of `nodata` in a table of `size` entries.
fn nodata_slot(nodata: Option<f64>, size: usize) -> Option<usize> {
    nodata
        .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v < size as f64)
        .map(|v| v as usize)
}

pub(crate) fn constant_entries(size: usize, color: RgbaEntry, nodata: Option<f64>) -> Vec<RgbaEntry> {
    let mut entries = vec![color; size];
    if let Some(slot) = nodata_slot(nodata, size) {
        entries[slot] = NODATA_COLOR;
    }
    entries
}

pub(crate) fn categorical_entries(size: usize, palette: &Palette) -> Vec<RgbaEntry> {
    let mut entries: Vec<RgbaEntry> = palette.colors().iter().take(size).copied().collect();
    entries.resize(size, crate::raster::palette::DEFAULT_COLOR);
    entries
}

/// Spread the palette over `[visu_min, visu_max]`.
///
/// Values below the range take the first color, values above it the last
/// one. One byte bands take consecutive colors, two byte bands are scaled
/// linearly. The nodata value takes the palette nodata color, or opaque
/// white when the palette has none.
pub(crate) fn continuous_entries(
    size: usize,
    palette: &Palette,
    visu_min: f64,
    visu_max: f64,
    nodata: Option<f64>,
) -> Result<Vec<RgbaEntry>> {
    let colors = palette.valid_colors();
    let n = colors.len();
    if n == 0 {
        return Err(MiraMonError::BadArgument(
            "palette has no colors besides nodata".to_string(),
        ));
    }
    let last = n - 1;
    let slope = n as f64 / (visu_max + 1.0 - visu_min);

    let mut next_sequential = 0;
    let mut entries: Vec<RgbaEntry> = (0..size)
        .map(|value| {
            let v = value as f64;
            if v < visu_min.trunc() {
                colors[0]
            } else if v <= visu_max.trunc() {
                let index = if size <= 256 {
                    let index = next_sequential;
                    next_sequential += 1;
                    index
                } else {
                    (slope * (v - visu_min)).max(0.0) as usize
                };
                colors[index.min(last)]
            } else {
                colors[last]
            }
        })
        .collect();

    if let Some(slot) = nodata_slot(nodata, size) {
        entries[slot] = palette
            .nodata_color()
            .unwrap_or(RgbaEntry::new(255, 255, 255, 255));
    }
    Ok(entries)
}
