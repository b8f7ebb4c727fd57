//! Typed views over the REL sections used by the raster reader.
//!
//! Every struct here is filled once, field by field, from a [`RelFile`].
//! Optional keys are `Option`s; defaults are applied by the consumers.

use log::debug;

use super::RelFile;
use crate::errors::{MiraMonError, Result};

pub const VERSIO: &str = "VERSIO";
pub const ATTRIBUTE_DATA: &str = "ATTRIBUTE_DATA";
pub const OVERVIEW: &str = "OVERVIEW";
pub const OVERVIEW_ASPECTES_TECNICS: &str = "OVERVIEW:ASPECTES_TECNICS";
pub const EXTENT: &str = "EXTENT";
pub const COLOR_TEXT: &str = "COLOR_TEXT";
pub const SPATIAL_REFERENCE_SYSTEM_HORIZONTAL: &str = "SPATIAL_REFERENCE_SYSTEM:HORIZONTAL";
pub const TAULA_PRINCIPAL: &str = "TAULA_PRINCIPAL";

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

/// `[ATTRIBUTE_DATA]`: the list of bands documented in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    /// Section names of the bands (`NomCamp_<i>` values), in file order.
    pub band_sections: Vec<String>,
    /// `NomFitxer` as documented, `Some("")` when present but empty.
    pub file_name: Option<String>,
    /// Access method (`via`), when not local.
    pub via: Option<String>,
}

impl AttributeData {
    /// Fails when `IndexsNomsCamps` is missing.
    pub fn from_rel(rel: &RelFile) -> Result<Self> {
        let indexes = rel
            .value(ATTRIBUTE_DATA, "IndexsNomsCamps")
            .ok_or_else(|| MiraMonError::MissingKey {
                rel: rel.path().to_path_buf(),
                section: ATTRIBUTE_DATA.to_string(),
                key: "IndexsNomsCamps".to_string(),
            })?;

        let band_sections = indexes
            .split(',')
            .map(str::trim)
            .filter(|idx| !idx.is_empty())
            .filter_map(|idx| {
                let section = rel.value(ATTRIBUTE_DATA, &format!("NomCamp_{idx}"));
                if section.is_none() {
                    debug!("NomCamp_{idx} not documented in {:?}", rel.path());
                }
                section.map(|s| s.trim_end().to_string())
            })
            .collect();

        Ok(AttributeData {
            band_sections,
            file_name: rel.raw_value(ATTRIBUTE_DATA, "NomFitxer").map(str::to_string),
            via: rel.value(ATTRIBUTE_DATA, "via").map(str::to_string),
        })
    }
}

/// `MinX`/`MaxX`/`MinY`/`MaxY` of a band, as documented.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extent {
    pub min_x: Option<f64>,
    pub max_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_y: Option<f64>,
}

impl Extent {
    /// `[ATTRIBUTE_DATA:<band>:EXTENT]`, falling back to `[EXTENT]`.
    pub fn for_band(rel: &RelFile, band: &str) -> Self {
        let get = |key| parse_f64(rel.value_in3(ATTRIBUTE_DATA, band, EXTENT, key));
        Extent {
            min_x: get("MinX"),
            max_x: get("MaxX"),
            min_y: get("MinY"),
            max_y: get("MaxY"),
        }
    }

    /// `[EXTENT]` only.
    pub fn global(rel: &RelFile) -> Self {
        let get = |key| parse_f64(rel.value(EXTENT, key));
        Extent {
            min_x: get("MinX"),
            max_x: get("MaxX"),
            min_y: get("MinY"),
            max_y: get("MaxY"),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.min_x.is_some() && self.max_x.is_some() && self.min_y.is_some() && self.max_y.is_some()
    }
}

/// `[ATTRIBUTE_DATA:<band>]` with the fallbacks MiraMon applies.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSection {
    pub name: String,
    pub file_name: Option<String>,
    pub columns: Option<i64>,
    pub rows: Option<i64>,
    pub compression: Option<String>,
    pub nodata: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub descriptor: Option<String>,
    pub extent: Extent,
    /// `JoinTaula_<i>` values for the indexes listed in `IndexsJoinTaula`.
    pub join_tables: Vec<String>,
}

impl BandSection {
    pub fn from_rel(rel: &RelFile, band: &str) -> Result<Self> {
        let dimension = |key: &str| -> Result<Option<i64>> {
            let value = rel
                .value_in(ATTRIBUTE_DATA, band, key)
                .or_else(|| rel.value(OVERVIEW_ASPECTES_TECNICS, key));
            match value {
                None => Ok(None),
                Some(v) => v
                    .trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| MiraMonError::InvalidValue {
                        section: format!("{ATTRIBUTE_DATA}:{band}"),
                        key: key.to_string(),
                        value: v.to_string(),
                    }),
            }
        };

        let own_section = format!("{ATTRIBUTE_DATA}:{band}");
        let nodata = rel.value_in(ATTRIBUTE_DATA, band, "NODATA");
        let parsed_nodata = parse_f64(nodata);
        if nodata.is_some() && parsed_nodata.is_none() {
            debug!("ignoring unparsable NODATA in [{own_section}]");
        }

        let join_tables = rel
            .value_in(ATTRIBUTE_DATA, band, "IndexsJoinTaula")
            .map(|indexes| {
                indexes
                    .split(',')
                    .map(str::trim)
                    .filter(|idx| !idx.is_empty())
                    .filter_map(|idx| {
                        rel.value_in(ATTRIBUTE_DATA, band, &format!("JoinTaula_{idx}"))
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(BandSection {
            name: band.to_string(),
            file_name: rel
                .value_in(ATTRIBUTE_DATA, band, "NomFitxer")
                .map(|f| f.trim_end().to_string()),
            columns: dimension("columns")?,
            rows: dimension("rows")?,
            compression: rel
                .value_in(ATTRIBUTE_DATA, band, "TipusCompressio")
                .map(str::to_string),
            nodata: parsed_nodata,
            min: parse_f64(rel.value(&own_section, "min")),
            max: parse_f64(rel.value(&own_section, "max")),
            descriptor: rel
                .value_in(ATTRIBUTE_DATA, band, "descriptor")
                .map(str::to_string),
            extent: Extent::for_band(rel, band),
            join_tables,
        })
    }
}

/// `[COLOR_TEXT:<band>]`, falling back to `[COLOR_TEXT]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorText {
    /// `Color_Paleta`; `None` for `<Automatic>` or undocumented palettes.
    pub palette: Option<String>,
    /// `Color_Const=1`
    pub constant: bool,
    /// `Color_Smb`, e.g. `(255,0,255)`.
    pub symbol: Option<String>,
    /// `Color_TractamentVariable=Categoric`
    pub categorical: bool,
    /// `Color_ValorColor_0`
    pub visu_min: Option<f64>,
    /// `Color_ValorColor_n_1`
    pub visu_max: Option<f64>,
}

impl ColorText {
    pub fn for_band(rel: &RelFile, band: &str) -> Self {
        let get = |key| rel.value_in(COLOR_TEXT, band, key);
        ColorText {
            palette: get("Color_Paleta")
                .filter(|p| *p != "<Automatic>")
                .map(str::to_string),
            constant: get("Color_Const") == Some("1"),
            symbol: get("Color_Smb").map(str::to_string),
            categorical: get("Color_TractamentVariable")
                .is_some_and(|v| v.eq_ignore_ascii_case("Categoric")),
            visu_min: parse_f64(get("Color_ValorColor_0")),
            visu_max: parse_f64(get("Color_ValorColor_n_1")),
        }
    }

    /// Parse `Color_Smb=(r,g,b)`.
    ///
    /// `Ok(None)` when undocumented or not parenthesised, an error when the
    /// parenthesised list doesn't hold three components.
    pub fn symbol_color(&self) -> Result<Option<(i16, i16, i16)>> {
        let Some(symbol) = &self.symbol else {
            return Ok(None);
        };
        let compact: String = symbol.chars().filter(|c| *c != ' ').collect();
        let Some(inner) = compact
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
        else {
            return Ok(None);
        };
        let components: Vec<i16> = inner
            .split(',')
            .filter(|c| !c.is_empty())
            .map(|c| c.parse::<i16>().unwrap_or(0))
            .collect();
        match components[..] {
            [r, g, b] => Ok(Some((r, g, b))),
            _ => Err(MiraMonError::InvalidValue {
                section: COLOR_TEXT.to_string(),
                key: "Color_Smb".to_string(),
                value: symbol.clone(),
            }),
        }
    }
}

/// A `[TAULA_<name>]` section referenced by a band's `JoinTaula_<i>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinTable {
    pub name: String,
    /// `NomFitxer`: a `.dbf` table or the `.rel` describing one.
    pub file_name: String,
    /// `AssociatRel`: the table field holding the pixel value.
    pub associated_field: Option<String>,
}

impl JoinTable {
    pub fn from_rel(rel: &RelFile, name: &str) -> Option<Self> {
        let section = format!("TAULA_{name}");
        let file_name = rel.value(&section, "NomFitxer")?;
        Some(JoinTable {
            name: name.to_string(),
            file_name: file_name.to_string(),
            associated_field: rel.value(&section, "AssociatRel").map(str::to_string),
        })
    }
}
