//! Raster attribute tables.
//!
//! A band gets one either from a joined DBF table (`IndexsJoinTaula`) or,
//! when it has a palette, from the palette colors: one row per value for
//! categorical palettes, one row per interval for continuous ones.

use std::path::Path;

use log::debug;

use crate::dbf::DbfTable;
use crate::errors::{MiraMonError, Result};
use crate::raster::palette::Palette;
use crate::raster::{BandDescriptor, RgbaEntry};
use crate::rel::{JoinTable, RelFile, TAULA_PRINCIPAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatFieldType {
    Integer,
    Real,
    String,
}

/// Meaning of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatFieldUsage {
    Generic,
    PixelCount,
    Name,
    Min,
    Max,
    /// Class value.
    MinMax,
    Red,
    Green,
    Blue,
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatTableType {
    /// Rows describe single pixel values.
    Thematic,
    /// Rows describe value ranges.
    Athematic,
}

/// A cell of a [`RasterAttributeTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum RatValue {
    Integer(i64),
    Real(f64),
    String(String),
}

impl RatValue {
    /// Numeric value. Strings that don't parse give `0.0`.
    pub fn as_f64(&self) -> f64 {
        match self {
            RatValue::Integer(v) => *v as f64,
            RatValue::Real(v) => *v,
            RatValue::String(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Integer value, truncating reals. Strings that don't parse give `0`.
    pub fn as_i64(&self) -> i64 {
        match self {
            RatValue::Integer(v) => *v,
            RatValue::Real(v) => *v as i64,
            RatValue::String(s) => {
                let s = s.trim();
                s.parse()
                    .or_else(|_| s.parse::<f64>().map(|v| v as i64))
                    .unwrap_or(0)
            }
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            RatValue::Integer(v) => v.to_string(),
            RatValue::Real(v) => v.to_string(),
            RatValue::String(s) => s.clone(),
        }
    }

    /// Convert to the representation of a `field_type` column.
    pub fn convert(self, field_type: RatFieldType) -> RatValue {
        match (field_type, self) {
            (RatFieldType::Integer, v @ RatValue::Integer(_)) => v,
            (RatFieldType::Real, v @ RatValue::Real(_)) => v,
            (RatFieldType::String, v @ RatValue::String(_)) => v,
            (RatFieldType::Integer, v) => RatValue::Integer(v.as_i64()),
            (RatFieldType::Real, v) => RatValue::Real(v.as_f64()),
            (RatFieldType::String, v) => RatValue::String(v.as_string()),
        }
    }

    fn default_for(field_type: RatFieldType) -> RatValue {
        match field_type {
            RatFieldType::Integer => RatValue::Integer(0),
            RatFieldType::Real => RatValue::Real(0.0),
            RatFieldType::String => RatValue::String(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatColumn {
    name: String,
    field_type: RatFieldType,
    usage: RatFieldUsage,
    values: Vec<RatValue>,
}

impl RatColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> RatFieldType {
        self.field_type
    }

    pub fn usage(&self) -> RatFieldUsage {
        self.usage
    }

    pub fn values(&self) -> &[RatValue] {
        &self.values
    }
}

/// Rows of typed values sharing one set of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterAttributeTable {
    table_type: RatTableType,
    columns: Vec<RatColumn>,
    row_count: usize,
}

impl RasterAttributeTable {
    pub fn new(table_type: RatTableType) -> Self {
        RasterAttributeTable {
            table_type,
            columns: Vec::new(),
            row_count: 0,
        }
    }

    pub fn table_type(&self) -> RatTableType {
        self.table_type
    }

    pub fn set_table_type(&mut self, table_type: RatTableType) {
        self.table_type = table_type;
    }

    pub fn num_rows(&self) -> usize {
        self.row_count
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[RatColumn] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Option<&RatColumn> {
        self.columns.get(col)
    }

    pub fn column_name(&self, col: usize) -> Option<&str> {
        self.column(col).map(RatColumn::name)
    }

    pub fn column_type(&self, col: usize) -> Option<RatFieldType> {
        self.column(col).map(RatColumn::field_type)
    }

    pub fn column_usage(&self, col: usize) -> Option<RatFieldUsage> {
        self.column(col).map(RatColumn::usage)
    }

    /// Index of the first column with `usage`.
    pub fn column_by_usage(&self, usage: RatFieldUsage) -> Option<usize> {
        self.columns.iter().position(|c| c.usage == usage)
    }

    /// Add a column, filled with zeros or empty strings.
    pub fn create_column(&mut self, name: &str, field_type: RatFieldType, usage: RatFieldUsage) {
        self.columns.push(RatColumn {
            name: name.to_string(),
            field_type,
            usage,
            values: vec![RatValue::default_for(field_type); self.row_count],
        });
    }

    pub fn set_row_count(&mut self, rows: usize) {
        for column in &mut self.columns {
            column
                .values
                .resize(rows, RatValue::default_for(column.field_type));
        }
        self.row_count = rows;
    }

    /// Set a cell, converting `value` to the column type. Rows past the end
    /// grow the table.
    pub fn set_value(&mut self, row: usize, col: usize, value: RatValue) -> Result<()> {
        if col >= self.columns.len() {
            return Err(MiraMonError::BadArgument(format!(
                "column {col} out of range"
            )));
        }
        if row >= self.row_count {
            self.set_row_count(row + 1);
        }
        let column = &mut self.columns[col];
        column.values[row] = value.convert(column.field_type);
        Ok(())
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&RatValue> {
        self.column(col)?.values.get(row)
    }

    pub fn value_as_int(&self, row: usize, col: usize) -> Option<i64> {
        self.value(row, col).map(RatValue::as_i64)
    }

    pub fn value_as_double(&self, row: usize, col: usize) -> Option<f64> {
        self.value(row, col).map(RatValue::as_f64)
    }

    pub fn value_as_string(&self, row: usize, col: usize) -> Option<String> {
        self.value(row, col).map(RatValue::as_string)
    }

    /// Row describing the pixel value `value`.
    ///
    /// Matches the `MinMax` column exactly when there is one, otherwise the
    /// first `[Min, Max)` interval holding the value, or a row whose bounds
    /// are both equal to it.
    pub fn row_of_value(&self, value: f64) -> Option<usize> {
        if let Some(col) = self.column_by_usage(RatFieldUsage::MinMax) {
            return (0..self.row_count).find(|row| self.value_as_double(*row, col) == Some(value));
        }
        let min = self.column_by_usage(RatFieldUsage::Min)?;
        let max = self.column_by_usage(RatFieldUsage::Max)?;
        let bounds = |row| {
            Some((
                self.value_as_double(row, min)?,
                self.value_as_double(row, max)?,
            ))
        };
        (0..self.row_count)
            .find(|row| bounds(*row).is_some_and(|(lo, hi)| lo <= value && value < hi))
            .or_else(|| {
                (0..self.row_count)
                    .find(|row| bounds(*row).is_some_and(|(lo, hi)| lo == value && hi == value))
            })
    }

    /// One row per palette interval between the band display limits.
    ///
    /// Rows: the nodata row when both band and palette define nodata, the
    /// intervals with the last one closed at `visu_max`, and a final
    /// `[visu_max, visu_max]` row.
    pub(crate) fn continuous(
        palette: &Palette,
        visu_min: f64,
        visu_max: f64,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let colors = palette.valid_colors();
        let n = colors.len();
        if n == 0 {
            return Err(MiraMonError::BadArgument(
                "palette has no colors besides nodata".to_string(),
            ));
        }

        let mut rat = RasterAttributeTable::new(RatTableType::Athematic);
        rat.create_column("MIN", RatFieldType::Real, RatFieldUsage::Min);
        rat.create_column("MAX", RatFieldType::Real, RatFieldUsage::Max);
        rat.create_column("Red", RatFieldType::Integer, RatFieldUsage::Red);
        rat.create_column("Green", RatFieldType::Integer, RatFieldUsage::Green);
        rat.create_column("Blue", RatFieldType::Integer, RatFieldUsage::Blue);

        let mut row = 0;
        if let (Some(nodata), Some(color)) = (nodata, palette.nodata_color()) {
            rat.set_interval_row(row, nodata, nodata, color)?;
            row += 1;
        }

        let interval = (visu_max - visu_min) / n as f64;
        for (i, color) in colors.iter().enumerate() {
            let lower = visu_min + interval * i as f64;
            let upper = if i == n - 1 {
                visu_max
            } else {
                visu_min + interval * (i + 1) as f64
            };
            rat.set_interval_row(row, lower, upper, *color)?;
            row += 1;
        }
        rat.set_interval_row(row, visu_max, visu_max, colors[n - 1])?;

        Ok(rat)
    }

    fn set_interval_row(&mut self, row: usize, min: f64, max: f64, color: RgbaEntry) -> Result<()> {
        self.set_value(row, 0, RatValue::Real(min))?;
        self.set_value(row, 1, RatValue::Real(max))?;
        self.set_value(row, 2, RatValue::Integer(color.r as i64))?;
        self.set_value(row, 3, RatValue::Integer(color.g as i64))?;
        self.set_value(row, 4, RatValue::Integer(color.b as i64))
    }

    /// One row per palette slot. The palette nodata slot describes the band
    /// nodata value, and is left out when the band has none.
    pub(crate) fn categorical(palette: &Palette, nodata: Option<f64>) -> Result<Self> {
        let mut rat = RasterAttributeTable::new(RatTableType::Thematic);
        rat.create_column("Value", RatFieldType::Integer, RatFieldUsage::MinMax);
        rat.create_column("Red", RatFieldType::Integer, RatFieldUsage::Red);
        rat.create_column("Green", RatFieldType::Integer, RatFieldUsage::Green);
        rat.create_column("Blue", RatFieldType::Integer, RatFieldUsage::Blue);
        rat.create_column("Alpha", RatFieldType::Integer, RatFieldUsage::Alpha);

        let mut row = 0;
        for (slot, color) in palette.colors().iter().enumerate() {
            let value = if Some(slot) == palette.nodata_index() {
                match nodata {
                    Some(nodata) => nodata as i64,
                    None => continue,
                }
            } else {
                slot as i64
            };
            rat.set_value(row, 0, RatValue::Integer(value))?;
            rat.set_value(row, 1, RatValue::Integer(color.r as i64))?;
            rat.set_value(row, 2, RatValue::Integer(color.g as i64))?;
            rat.set_value(row, 3, RatValue::Integer(color.b as i64))?;
            rat.set_value(row, 4, RatValue::Integer(color.a as i64))?;
            row += 1;
        }
        Ok(rat)
    }

    /// A single opaque color for every value between the band limits.
    pub(crate) fn constant(color: RgbaEntry, min: Option<f64>, max: Option<f64>) -> Result<Self> {
        let mut rat = RasterAttributeTable::new(RatTableType::Athematic);
        rat.create_column("MIN", RatFieldType::Real, RatFieldUsage::Min);
        rat.create_column("MAX", RatFieldType::Real, RatFieldUsage::Max);
        rat.create_column("Red", RatFieldType::Integer, RatFieldUsage::Red);
        rat.create_column("Green", RatFieldType::Integer, RatFieldUsage::Green);
        rat.create_column("Blue", RatFieldType::Integer, RatFieldUsage::Blue);
        rat.set_interval_row(0, min.unwrap_or(f64::MIN), max.unwrap_or(f64::MAX), color)?;
        Ok(rat)
    }

    /// Copy a DBF table, with `key_field` (the pixel value) as first column.
    ///
    /// The column next to the key, or the one before it when the key is
    /// the last field, holds the class names.
    pub fn from_dbf(table: &DbfTable, key_field: &str, table_type: RatTableType) -> Result<Self> {
        let invalid = |msg: String| MiraMonError::InvalidAttributeTable {
            path: table.path().to_path_buf(),
            msg,
        };
        let key = table
            .field_index(key_field)
            .ok_or_else(|| invalid(format!("no field {key_field}")))?;
        let key_def = &table.fields()[key];
        if key_def.field_type() != 'N' {
            return Err(invalid(format!("field {key_field} is not numeric")));
        }
        let field_count = table.fields().len();
        let name_field = if key + 1 < field_count {
            Some(key + 1)
        } else {
            key.checked_sub(1)
        };

        let numeric_type = |decimals: u8| {
            if decimals > 0 {
                RatFieldType::Real
            } else {
                RatFieldType::Integer
            }
        };

        let mut rat = RasterAttributeTable::new(table_type);
        let mut order = vec![key];
        rat.create_column(
            key_def.name(),
            numeric_type(key_def.decimals()),
            RatFieldUsage::MinMax,
        );
        for (index, field) in table.fields().iter().enumerate() {
            if index == key {
                continue;
            }
            let (field_type, usage) = if field.field_type() == 'N' {
                (numeric_type(field.decimals()), RatFieldUsage::MinMax)
            } else {
                (RatFieldType::String, RatFieldUsage::Generic)
            };
            let usage = if Some(index) == name_field {
                RatFieldUsage::Name
            } else {
                usage
            };
            rat.create_column(field.name(), field_type, usage);
            order.push(index);
        }

        rat.set_row_count(table.record_count());
        for record in 0..table.record_count() {
            for (col, field) in order.iter().enumerate() {
                let text = table.string_value(record, *field).unwrap_or_default();
                rat.set_value(record, col, RatValue::String(text))?;
            }
        }
        Ok(rat)
    }

    /// Attribute table joined to `band` through `IndexsJoinTaula`.
    ///
    /// `Ok(None)` when the band documents no join.
    pub(crate) fn from_join(rel: &RelFile, band: &BandDescriptor) -> Result<Option<Self>> {
        let Some(table_name) = band.join_tables().first() else {
            return Ok(None);
        };
        let join = JoinTable::from_rel(rel, table_name).ok_or_else(|| MiraMonError::MissingKey {
            rel: rel.path().to_path_buf(),
            section: format!("TAULA_{table_name}"),
            key: "NomFitxer".to_string(),
        })?;

        let extension = Path::new(&join.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let (dbf_path, field, table_type) = match extension.as_str() {
            "dbf" => {
                let field = join.associated_field.ok_or_else(|| MiraMonError::MissingKey {
                    rel: rel.path().to_path_buf(),
                    section: format!("TAULA_{table_name}"),
                    key: "AssociatRel".to_string(),
                })?;
                (rel.resolve(&join.file_name), field, RatTableType::Thematic)
            }
            "rel" => {
                let table_rel = RelFile::open(rel.resolve(&join.file_name))?;
                let missing = |key: &str| MiraMonError::MissingKey {
                    rel: table_rel.path().to_path_buf(),
                    section: TAULA_PRINCIPAL.to_string(),
                    key: key.to_string(),
                };
                let dbf_name = table_rel
                    .value(TAULA_PRINCIPAL, "NomFitxer")
                    .ok_or_else(|| missing("NomFitxer"))?;
                let field = table_rel
                    .value(TAULA_PRINCIPAL, "AssociatRel")
                    .ok_or_else(|| missing("AssociatRel"))?;
                let thematic = table_rel
                    .value(&format!("{TAULA_PRINCIPAL}:{field}"), "TractamentVariable")
                    .is_some_and(|v| v.eq_ignore_ascii_case("Categoric"));
                let table_type = if thematic {
                    RatTableType::Thematic
                } else {
                    RatTableType::Athematic
                };
                (table_rel.resolve(dbf_name), field.to_string(), table_type)
            }
            _ => {
                return Err(MiraMonError::NotSupported(format!(
                    "attribute table {:?}",
                    join.file_name
                )))
            }
        };

        debug!("joining {:?} on {field}", dbf_path);
        let table = DbfTable::open(&dbf_path)?;
        RasterAttributeTable::from_dbf(&table, &field, table_type).map(Some)
    }
}
