//! Reader for [MiraMon](https://www.miramon.cat/) raster datasets.
//!
//! A MiraMon raster is a set of `.img` files holding the pixels of each band
//! plus an `I.rel` file, an INI document describing the bands: their size,
//! pixel type, extent, nodata value, palette and attribute tables.
//!
//! ## Usage
//!
//! ```rust, no_run
//! use miramon_raster::{Dataset, Metadata};
//!
//! # fn main() -> miramon_raster::errors::Result<()> {
//! let dataset = Dataset::open("fixtures/byte_2x3_6_categsI.rel")?;
//! println!("{:?} pixels", dataset.raster_size());
//!
//! let band = dataset.rasterband(1)?;
//! let buffer = band.read_band_as::<u8>()?;
//! println!("first row: {:?}", buffer.row(0));
//!
//! if let Some(table) = band.color_table() {
//!     println!("{} colors", table.entry_count());
//! }
//! if let Some(rat) = band.default_rat() {
//!     println!("{} attribute rows", rat.num_rows());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! RELs whose bands don't share the same grid are split into subdatasets:
//!
//! ```rust, no_run
//! use miramon_raster::{Dataset, Metadata};
//!
//! # fn main() -> miramon_raster::errors::Result<()> {
//! let dataset = Dataset::open("fixtures/landsat_subdatasetsI.rel")?;
//! assert_eq!(dataset.raster_count(), 0);
//! let name = dataset
//!     .metadata_item("SUBDATASET_1_NAME", "SUBDATASETS")
//!     .unwrap_or_default();
//! let subdataset = Dataset::open(name)?;
//! println!("{} bands", subdataset.raster_count());
//! # Ok(())
//! # }
//! ```
//!
//! Opening is read-only: asking for [`OpenFlags::UPDATE`] fails.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cpl;
mod dataset;
pub mod dbf;
pub mod encoding;
pub mod errors;
mod geo_transform;
mod metadata;
mod options;
pub mod raster;
pub mod rel;
pub mod relation;
pub mod spatial_ref;

pub use dataset::{Dataset, SUBDATASETS_DOMAIN};
pub use geo_transform::{GeoTransform, GeoTransformEx};
pub use metadata::{Metadata, MetadataEntry, MetadataIter, MetadataStore};
pub use options::{DatasetOptions, OpenFlags};
pub use relation::{Identify, SubdatasetName};

#[cfg(test)]
pub mod test_utils;
