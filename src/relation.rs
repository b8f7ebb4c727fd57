//! The bands documented by one REL file, and how dataset names map to it.
//!
//! A dataset can be opened from:
//!
//! * the REL itself (`nameI.rel`),
//! * one of its images (`name.img`), in which case the REL is searched for,
//! * a subdataset name: `MiraMonRaster:"nameI.rel","band1.img","band2.img"`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{MiraMonError, Result};
use crate::raster::BandDescriptor;
use crate::rel::{
    img_name_from_rel, is_img_name, is_rel_name, rel_name_from_img, same_file, AttributeData,
    RelFile, ATTRIBUTE_DATA,
};

/// Prefix of subdataset names.
pub const SUBDATASET_PREFIX: &str = "MiraMonRaster:";

/// Whether a name can be opened as a MiraMon raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identify {
    True,
    False,
    /// Can't be decided from the name alone (`.img` files).
    Unknown,
}

/// A parsed subdataset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdatasetName {
    pub rel: PathBuf,
    /// Band file names as documented in `NomFitxer`.
    pub bands: Vec<String>,
}

impl SubdatasetName {
    /// Parse `MiraMonRaster:"<rel>","<band>",...`. Quotes are optional.
    ///
    /// `None` when `name` doesn't carry the prefix or lists nothing.
    pub fn parse(name: &str) -> Option<Self> {
        let list = name.strip_prefix(SUBDATASET_PREFIX)?;
        let mut tokens = list
            .split(',')
            .map(|t| t.replace('"', "").trim().to_string())
            .filter(|t| !t.is_empty());
        let rel = PathBuf::from(tokens.next()?);
        Some(SubdatasetName {
            rel,
            bands: tokens.collect(),
        })
    }
}

impl fmt::Display for SubdatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SUBDATASET_PREFIX}\"{}\"", self.rel.display())?;
        for band in &self.bands {
            write!(f, ",\"{band}\"")?;
        }
        Ok(())
    }
}

/// How a `NomFitxer` entry relates to an image being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NomFitxerState {
    /// Names the image.
    Expected,
    /// Names another file, or a wildcard.
    Unexpected,
    Empty,
}

fn nom_fitxer_state(rel: &RelFile, section: &str, img: &Path) -> NomFitxerState {
    let Some(documented) = rel.value(section, "NomFitxer").map(str::trim_end) else {
        return NomFitxerState::Empty;
    };
    if documented.starts_with('*') || documented.starts_with('?') {
        return NomFitxerState::Unexpected;
    }
    if same_file(rel.resolve(documented), img) {
        NomFitxerState::Expected
    } else {
        NomFitxerState::Unexpected
    }
}

/// Whether the REL documents the image `img`.
fn references_img(rel: &RelFile, img: &Path) -> bool {
    let derived_matches = || img_name_from_rel(rel.path()).is_some_and(|d| same_file(d, img));

    match nom_fitxer_state(rel, ATTRIBUTE_DATA, img) {
        NomFitxerState::Expected => return true,
        NomFitxerState::Unexpected => {
            debug!("[{ATTRIBUTE_DATA}] NomFitxer of {:?} names another file", rel.path());
            return false;
        }
        NomFitxerState::Empty if derived_matches() => return true,
        NomFitxerState::Empty => {}
    }

    let attribute_data = match AttributeData::from_rel(rel) {
        Ok(attribute_data) => attribute_data,
        Err(e) => {
            debug!("{e}");
            return false;
        }
    };
    if attribute_data
        .via
        .as_deref()
        .is_some_and(|via| !via.eq_ignore_ascii_case("SDE"))
    {
        debug!("{:?} is accessed through an unsupported via", rel.path());
        return false;
    }

    let single_band = attribute_data.band_sections.len() == 1;
    attribute_data.band_sections.iter().any(|band| {
        match nom_fitxer_state(rel, &format!("{ATTRIBUTE_DATA}:{band}"), img) {
            NomFitxerState::Expected => true,
            NomFitxerState::Unexpected => false,
            NomFitxerState::Empty => single_band,
        }
    })
}

/// Find the REL file documenting the image at `img`.
///
/// `nameI.rel` is tried first, then every other `*I.rel` of the directory
/// in name order.
pub fn find_rel_for_img(img: &Path) -> Result<PathBuf> {
    let candidates = || -> Option<PathBuf> {
        if let Some(rel_path) = rel_name_from_img(img).filter(|p| p.exists()) {
            let rel = RelFile::open(&rel_path).ok()?;
            return references_img(&rel, img).then_some(rel_path);
        }

        let dir = match img.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut rels: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.') && is_rel_name(n))
            })
            .collect();
        rels.sort();

        rels.into_iter().find(|rel_path| {
            debug!("looking for {:?} in {:?}", img, rel_path);
            RelFile::open(rel_path).is_ok_and(|rel| references_img(&rel, img))
        })
    };

    candidates().ok_or_else(|| MiraMonError::OpenFailed {
        path: img.to_path_buf(),
        msg: "REL search failed".to_string(),
    })
}

/// Whether the band file `band` is documented in `rel`.
fn band_in_rel(rel: &RelFile, band: &str) -> bool {
    let Ok(attribute_data) = AttributeData::from_rel(rel) else {
        return false;
    };
    attribute_data.band_sections.iter().any(|section| {
        match rel.value_in(ATTRIBUTE_DATA, section, "NomFitxer") {
            Some(file_name) => same_file(file_name, band),
            None => img_name_from_rel(rel.path())
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .is_some_and(|derived| same_file(derived, band)),
        }
    })
}

/// Decide whether `name` looks like a MiraMon raster.
///
/// Only REL files and subdataset names are opened; `.img` files are shared
/// with other formats and reported as [`Identify::Unknown`].
pub fn identify(name: &str) -> Identify {
    if name.starts_with(SUBDATASET_PREFIX) {
        let Some(subdataset) = SubdatasetName::parse(name) else {
            return Identify::False;
        };
        if subdataset.bands.is_empty() || !is_rel_name(&subdataset.rel.to_string_lossy()) {
            return Identify::False;
        }
        let Ok(rel) = RelFile::open(&subdataset.rel) else {
            return Identify::False;
        };
        if rel.check_version().is_err() {
            return Identify::False;
        }
        let all_listed = subdataset
            .bands
            .iter()
            .all(|band| is_img_name(Path::new(band)) && band_in_rel(&rel, band));
        return if all_listed {
            Identify::True
        } else {
            Identify::False
        };
    }

    if is_img_name(Path::new(name)) {
        return Identify::Unknown;
    }
    if !is_rel_name(name) {
        return Identify::False;
    }
    match RelFile::open(name) {
        Ok(rel) if rel.check_version().is_ok() => Identify::True,
        _ => Identify::False,
    }
}

/// Number bands into groups of consecutive items sharing their structure.
///
/// Ids start at 1 and grow by one each time `same` fails between two
/// neighbours. A single group is collapsed to id 0 for every item: no
/// subdatasets at all. Returns the ids and the number of groups.
pub fn assign_subdatasets<T, F>(items: &[T], same: F) -> (Vec<usize>, usize)
where
    F: Fn(&T, &T) -> bool,
{
    if items.is_empty() {
        return (Vec::new(), 0);
    }
    let mut ids = Vec::with_capacity(items.len());
    let mut current = 1;
    ids.push(current);
    for pair in items.windows(2) {
        if !same(&pair[0], &pair[1]) {
            current += 1;
        }
        ids.push(current);
    }

    if current == 1 {
        (vec![0; items.len()], 0)
    } else {
        (ids, current)
    }
}

/// A REL file with its band descriptors, grouped into subdatasets.
#[derive(Debug)]
pub struct Relation {
    rel: RelFile,
    bands: Vec<BandDescriptor>,
    subdataset_ids: Vec<usize>,
    subdataset_count: usize,
}

impl Relation {
    /// Open the REL behind `name`: a REL file, an image or a subdataset name.
    pub fn open(name: &str) -> Result<Self> {
        if let Some(subdataset) = SubdatasetName::parse(name) {
            let rel = Self::open_rel(&subdataset.rel)?;
            return Self::from_rel(rel, &subdataset.bands);
        }
        if name.starts_with(SUBDATASET_PREFIX) {
            return Err(MiraMonError::OpenFailed {
                path: PathBuf::from(name),
                msg: "malformed subdataset name".to_string(),
            });
        }

        let path = Path::new(name);
        let rel_path = if is_rel_name(name) {
            path.to_path_buf()
        } else if is_img_name(path) {
            find_rel_for_img(path)?
        } else {
            return Err(MiraMonError::OpenFailed {
                path: path.to_path_buf(),
                msg: "probably it's not a MiraMon file".to_string(),
            });
        };
        let rel = Self::open_rel(&rel_path)?;
        Self::from_rel(rel, &[])
    }

    fn open_rel(path: &Path) -> Result<RelFile> {
        let rel = RelFile::open(path)?;
        rel.check_version()?;
        Ok(rel)
    }

    /// Build the band descriptors of `rel`.
    ///
    /// A non-empty `filter` keeps only the bands whose `NomFitxer` is listed.
    pub fn from_rel(rel: RelFile, filter: &[String]) -> Result<Self> {
        let attribute_data = AttributeData::from_rel(&rel)?;

        let mut bands = Vec::new();
        for section in &attribute_data.band_sections {
            if !filter.is_empty() {
                let raw = rel.value_in(ATTRIBUTE_DATA, section, "NomFitxer");
                if !raw.is_some_and(|raw| filter.iter().any(|f| same_file(f, raw))) {
                    continue;
                }
            }
            bands.push(BandDescriptor::from_rel(&rel, section)?);
        }

        if bands.is_empty() {
            return Err(MiraMonError::OpenFailed {
                path: rel.path().to_path_buf(),
                msg: "it has zero usable bands".to_string(),
            });
        }

        let (subdataset_ids, subdataset_count) =
            assign_subdatasets(&bands, |a, b| a.same_structure(b));
        debug!(
            "{:?}: {} bands, {subdataset_count} subdatasets",
            rel.path(),
            bands.len()
        );

        Ok(Relation {
            rel,
            bands,
            subdataset_ids,
            subdataset_count,
        })
    }

    pub fn rel(&self) -> &RelFile {
        &self.rel
    }

    pub fn bands(&self) -> &[BandDescriptor] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&BandDescriptor> {
        self.bands.get(index)
    }

    /// Subdataset of band `index`, 0 when bands are not grouped.
    pub fn subdataset_of(&self, index: usize) -> usize {
        self.subdataset_ids.get(index).copied().unwrap_or(0)
    }

    pub fn subdataset_count(&self) -> usize {
        self.subdataset_count
    }

    /// Bands of subdataset `id`, in file order.
    pub fn subdataset_bands(&self, id: usize) -> impl Iterator<Item = &BandDescriptor> {
        self.bands
            .iter()
            .zip(&self.subdataset_ids)
            .filter(move |(_, sid)| **sid == id)
            .map(|(band, _)| band)
    }

    /// Name and description of every subdataset.
    pub fn subdatasets(&self) -> Vec<(SubdatasetName, String)> {
        (1..=self.subdataset_count)
            .map(|id| {
                let bands: Vec<&BandDescriptor> = self.subdataset_bands(id).collect();
                let name = SubdatasetName {
                    rel: self.rel.path().to_path_buf(),
                    bands: bands.iter().map(|b| b.raw_file_name().to_string()).collect(),
                };
                let names: Vec<String> = bands.iter().map(|b| format!("\"{}\"", b.name())).collect();
                let desc = format!("Subdataset {id}: {}", names.join(","));
                (name, desc)
            })
            .collect()
    }
}
