use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::errors::{MiraMonError, Result};

/// Geodetic datums with well-known MiraMon identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Etrs89,
    Wgs84,
    Ed50,
}

impl Datum {
    /// EPSG code of the geographic system on this datum.
    pub fn geographic_epsg(&self) -> u32 {
        match self {
            Datum::Etrs89 => 4258,
            Datum::Wgs84 => 4326,
            Datum::Ed50 => 4230,
        }
    }

    /// EPSG code of UTM zone `zone` on this datum, when EPSG defines it.
    pub fn utm_epsg(&self, zone: u8, north: bool) -> Option<u32> {
        let zone = zone as u32;
        match (self, north) {
            (Datum::Wgs84, true) if (1..=60).contains(&zone) => Some(32600 + zone),
            (Datum::Wgs84, false) if (1..=60).contains(&zone) => Some(32700 + zone),
            (Datum::Etrs89, true) if (28..=38).contains(&zone) => Some(25800 + zone),
            (Datum::Ed50, true) if (28..=38).contains(&zone) => Some(23000 + zone),
            _ => None,
        }
    }
}

impl FromStr for Datum {
    type Err = MiraMonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ETRS89" => Ok(Datum::Etrs89),
            "WGS84" => Ok(Datum::Wgs84),
            "ED50" => Ok(Datum::Ed50),
            _ => Err(MiraMonError::BadArgument(format!("unknown datum '{s}'"))),
        }
    }
}

/// The `HorizontalSystemIdentifier` of a dataset.
///
/// Identifiers such as `UTM-31N-ETRS89` or `Geo-WGS84` are mapped to their
/// EPSG code. Others are kept as documented, without a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialRef {
    identifier: String,
    datum: Option<Datum>,
    utm_zone: Option<(u8, bool)>,
    epsg: Option<u32>,
}

impl SpatialRef {
    /// Interpret a MiraMon reference system identifier.
    pub fn from_miramon_id(identifier: &str) -> Result<SpatialRef> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(MiraMonError::BadArgument(
                "empty reference system identifier".to_string(),
            ));
        }

        let tokens: Vec<&str> = identifier.split(['-', '_', ' ']).collect();
        let datum = tokens.iter().find_map(|t| t.parse::<Datum>().ok());
        let utm_zone = tokens
            .iter()
            .position(|t| t.eq_ignore_ascii_case("UTM"))
            .and_then(|i| tokens.get(i + 1))
            .and_then(|zone| parse_utm_zone(zone));

        let epsg = match (datum, utm_zone) {
            (Some(datum), Some((zone, north))) => datum.utm_epsg(zone, north),
            (Some(datum), None) => Some(datum.geographic_epsg()),
            _ => None,
        };
        match epsg {
            Some(code) => debug!("reference system '{identifier}' is EPSG:{code}"),
            None => warn!("no EPSG code known for reference system '{identifier}'"),
        }

        Ok(SpatialRef {
            identifier: identifier.to_string(),
            datum,
            utm_zone,
            epsg,
        })
    }

    /// Identifier as documented in the REL file.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn datum(&self) -> Option<Datum> {
        self.datum
    }

    /// UTM zone number and hemisphere (`true` for north).
    pub fn utm_zone(&self) -> Option<(u8, bool)> {
        self.utm_zone
    }

    pub fn is_projected(&self) -> bool {
        self.utm_zone.is_some()
    }

    pub fn is_geographic(&self) -> bool {
        self.datum.is_some() && self.utm_zone.is_none()
    }

    pub fn auth_name(&self) -> Option<&'static str> {
        self.epsg.map(|_| "EPSG")
    }

    pub fn auth_code(&self) -> Option<u32> {
        self.epsg
    }

    /// `EPSG:<code>` when the code is known.
    pub fn authority(&self) -> Option<String> {
        self.epsg.map(|code| format!("EPSG:{code}"))
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority() {
            Some(authority) => write!(f, "{} ({authority})", self.identifier),
            None => f.write_str(&self.identifier),
        }
    }
}

/// `31N` -> `(31, true)`.
fn parse_utm_zone(token: &str) -> Option<(u8, bool)> {
    let (digits, hemisphere) = token.split_at(token.len().checked_sub(1)?);
    let north = match hemisphere.to_ascii_uppercase().as_str() {
        "N" => true,
        "S" => false,
        _ => return None,
    };
    let zone: u8 = digits.parse().ok()?;
    (1..=60).contains(&zone).then_some((zone, north))
}
