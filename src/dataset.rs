use std::path::Path;

use log::debug;

use crate::errors::{MiraMonError, Result};
use crate::geo_transform::GeoTransform;
use crate::metadata::{Metadata, MetadataStore};
use crate::options::{DatasetOptions, OpenFlags};
use crate::raster::RasterBand;
use crate::rel::{Extent, RelFile, OVERVIEW_ASPECTES_TECNICS, SPATIAL_REFERENCE_SYSTEM_HORIZONTAL};
use crate::relation::{self, Identify, Relation, SubdatasetName};
use crate::spatial_ref::SpatialRef;

/// Metadata domain listing the subdatasets of a REL file.
pub const SUBDATASETS_DOMAIN: &str = "SUBDATASETS";

/// Wrapper around a MiraMon raster: a REL file and the bands it documents.
///
/// When the bands of the REL file don't share the same grid they are
/// grouped into subdatasets. The root dataset then has no raster bands;
/// each subdataset is opened through the name found in the
/// [`SUBDATASETS_DOMAIN`] metadata domain.
#[derive(Debug)]
pub struct Dataset {
    description: String,
    relation: Relation,
    metadata: MetadataStore,
    raster_size: (usize, usize),
    geo_transform: Option<GeoTransform>,
    spatial_ref: Option<SpatialRef>,
}

impl Dataset {
    /// Open a dataset at the given `path` with default options.
    ///
    /// `path` may name an `I.rel` file, one of its `.img` files or a
    /// `MiraMonRaster:"<rel>","<img>",...` subdataset.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        Self::open_ex(path, DatasetOptions::default())
    }

    /// Open a dataset with extended options. See [`DatasetOptions`].
    pub fn open_ex<P: AsRef<Path>>(path: P, options: DatasetOptions) -> Result<Dataset> {
        let name = path.as_ref().to_string_lossy().into_owned();
        if options.open_flags.contains(OpenFlags::UPDATE) {
            return Err(MiraMonError::NotSupported(
                "The MiraMonRaster driver does not support update access to existing datasets"
                    .to_string(),
            ));
        }

        let relation = Relation::open(&name)?;
        let rel = relation.rel();
        let spatial_ref = rel
            .value(SPATIAL_REFERENCE_SYSTEM_HORIZONTAL, "HorizontalSystemIdentifier")
            .and_then(|id| SpatialRef::from_miramon_id(id).ok());

        let mut metadata = MetadataStore::new();
        let (raster_size, geo_transform) = if relation.subdataset_count() > 0 {
            for (i, (sub_name, desc)) in relation.subdatasets().into_iter().enumerate() {
                let n = i + 1;
                metadata.set_item(
                    &format!("SUBDATASET_{n}_NAME"),
                    &sub_name.to_string(),
                    SUBDATASETS_DOMAIN,
                )?;
                metadata.set_item(&format!("SUBDATASET_{n}_DESC"), &desc, SUBDATASETS_DOMAIN)?;
            }
            let size = overview_size(rel).unwrap_or((0, 0));
            (size, overview_geo_transform(rel))
        } else {
            // Bands presented directly: the last band rules.
            let last = relation
                .bands()
                .last()
                .ok_or_else(|| MiraMonError::OpenFailed {
                    path: rel.path().to_path_buf(),
                    msg: "it has zero usable bands".to_string(),
                })?;
            let geo_transform =
                overview_geo_transform(rel).unwrap_or_else(|| last.geo_transform());
            ((last.width(), last.height()), Some(geo_transform))
        };

        debug!(
            "opened {name}: {}x{} pixels, {} bands, {} subdatasets",
            raster_size.0,
            raster_size.1,
            relation.bands().len(),
            relation.subdataset_count()
        );

        Ok(Dataset {
            description: name,
            relation,
            metadata,
            raster_size,
            geo_transform,
            spatial_ref,
        })
    }

    /// Tell whether `name` looks like something [`Dataset::open`] accepts.
    pub fn identify<P: AsRef<Path>>(name: P) -> Identify {
        relation::identify(&name.as_ref().to_string_lossy())
    }

    /// The REL file and its bands.
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Fetch a band object for a dataset.
    ///
    /// Applies to raster datasets, and fetches the
    /// rasterband at the given _1-based_ index.
    pub fn rasterband(&self, band_index: usize) -> Result<RasterBand<'_>> {
        if self.relation.subdataset_count() > 0 || band_index == 0 {
            return Err(MiraMonError::BandIndexOutOfRange(band_index));
        }
        let band = self
            .relation
            .band(band_index - 1)
            .ok_or(MiraMonError::BandIndexOutOfRange(band_index))?;
        Ok(RasterBand::new(self, band))
    }

    /// Iterate over the raster bands of the dataset.
    pub fn rasterbands(&self) -> impl Iterator<Item = RasterBand<'_>> {
        (1..=self.raster_count()).filter_map(move |i| self.rasterband(i).ok())
    }

    /// Fetch the number of raster bands on this dataset, 0 when the bands
    /// are split into subdatasets.
    pub fn raster_count(&self) -> usize {
        if self.relation.subdataset_count() > 0 {
            0
        } else {
            self.relation.bands().len()
        }
    }

    /// Returns the raster dimensions: (width, height).
    pub fn raster_size(&self) -> (usize, usize) {
        self.raster_size
    }

    /// Get the affine transformation coefficients.
    ///
    /// See [`GeoTransform`](crate::GeoTransform) for details on the meaning of the coefficients.
    pub fn geo_transform(&self) -> Result<GeoTransform> {
        self.geo_transform.ok_or(MiraMonError::NoGeoTransform)
    }

    /// Get the spatial reference system of this dataset, when documented.
    pub fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    /// Names and descriptions of the subdatasets, empty when bands are
    /// presented directly.
    pub fn subdatasets(&self) -> Vec<(SubdatasetName, String)> {
        self.relation.subdatasets()
    }
}

impl Metadata for Dataset {
    fn metadata_store(&self) -> &MetadataStore {
        &self.metadata
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

fn overview_dimension(rel: &RelFile, key: &str) -> Option<usize> {
    rel.value(OVERVIEW_ASPECTES_TECNICS, key)?
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
}

fn overview_size(rel: &RelFile) -> Option<(usize, usize)> {
    Some((
        overview_dimension(rel, "columns")?,
        overview_dimension(rel, "rows")?,
    ))
}

/// `[EXTENT]` spread over the `[OVERVIEW:ASPECTES_TECNICS]` grid.
fn overview_geo_transform(rel: &RelFile) -> Option<GeoTransform> {
    let extent = Extent::global(rel);
    let (columns, rows) = overview_size(rel)?;
    let (min_x, max_x) = (extent.min_x?, extent.max_x?);
    let (min_y, max_y) = (extent.min_y?, extent.max_y?);
    Some([
        min_x,
        (max_x - min_x) / columns as f64,
        0.0,
        max_y,
        0.0,
        (min_y - max_y) / rows as f64,
    ])
}
