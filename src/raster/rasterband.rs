use geo_types::Rect;
use log::{debug, warn};

use crate::dataset::Dataset;
use crate::errors::{MiraMonError, Result};
use crate::geo_transform::GeoTransform;
use crate::metadata::{Metadata, MetadataStore};
use crate::raster::palette::{Palette, PaletteSource};
use crate::raster::rat::RasterAttributeTable;
use crate::raster::{
    BandDescriptor, Buffer, ColorInterpretation, ColorTable, DataType, PixelType, RgbaEntry,
};

#[cfg(feature = "ndarray")]
use ndarray::Array2;

/// Represents a single band of a dataset.
///
/// This object carries the lifetime of the dataset that
/// contains it. This is necessary to prevent the dataset
/// from being dropped before the band.
#[derive(Debug, Clone, Copy)]
pub struct RasterBand<'a> {
    dataset: &'a Dataset,
    band: &'a BandDescriptor,
}

impl<'a> RasterBand<'a> {
    pub(crate) fn new(dataset: &'a Dataset, band: &'a BandDescriptor) -> Self {
        RasterBand { dataset, band }
    }

    /// The dataset owning this band.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// The REL description of this band.
    pub fn descriptor(&self) -> &'a BandDescriptor {
        self.band
    }

    /// Get block size: one full row.
    pub fn block_size(&self) -> (usize, usize) {
        (self.band.width(), 1)
    }

    /// Get x-size of the band
    pub fn x_size(&self) -> usize {
        self.band.width()
    }

    /// Get y-size of the band
    pub fn y_size(&self) -> usize {
        self.band.height()
    }

    /// Get dimensions of the band.
    /// Note that this may not be the same as `size` on the
    /// `owning_dataset`.
    pub fn size(&self) -> (usize, usize) {
        (self.x_size(), self.y_size())
    }

    /// Read data from this band into a slice, where `T` implements [`PixelType`]
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (values are picked by nearest
    ///   neighbour if `window_size != size`)
    /// * `size` - the desired size to read
    /// * `buffer` - a slice to hold the data (length must equal product of size parameter)
    pub fn read_into_slice<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
        buffer: &mut [T],
    ) -> Result<()> {
        let pixels = size.0 * size.1;
        if buffer.len() != pixels {
            return Err(MiraMonError::BadArgument(format!(
                "buffer of {} values can't hold {}x{} pixels",
                buffer.len(),
                size.0,
                size.1
            )));
        }
        let (x_off, y_off) = self.check_window(window, window_size)?;
        if pixels == 0 {
            return Ok(());
        }
        if window_size.0 == 0 || window_size.1 == 0 {
            return Err(MiraMonError::BadArgument(format!(
                "empty window {window_size:?} can't fill {}x{} pixels",
                size.0, size.1
            )));
        }

        let columns: Vec<usize> = (0..size.0)
            .map(|x| x_off + nearest(x, window_size.0, size.0))
            .collect();
        let data_type = self.band_type();
        let mut raw = vec![0u8; self.band.row_bytes()];
        let mut values: Vec<f64> = Vec::new();
        let mut loaded_row = None;

        for (y, out) in buffer.chunks_exact_mut(size.0).enumerate() {
            let row = y_off + nearest(y, window_size.1, size.1);
            if loaded_row != Some(row) {
                self.band.read_row(row, &mut raw)?;
                values = decode_row(data_type, &raw);
                loaded_row = Some(row);
            }
            for (pixel, column) in out.iter_mut().zip(&columns) {
                *pixel = T::from_f64(values[*column]);
            }
        }
        Ok(())
    }

    fn check_window(&self, window: (isize, isize), window_size: (usize, usize)) -> Result<(usize, usize)> {
        let (width, height) = self.size();
        let out_of_range = || {
            MiraMonError::BadArgument(format!(
                "window {window:?} of size {window_size:?} exceeds the band size ({width}, {height})"
            ))
        };
        let x = usize::try_from(window.0).map_err(|_| out_of_range())?;
        let y = usize::try_from(window.1).map_err(|_| out_of_range())?;
        let x_end = x.checked_add(window_size.0).ok_or_else(out_of_range)?;
        let y_end = y.checked_add(window_size.1).ok_or_else(out_of_range)?;
        if x_end > width || y_end > height {
            return Err(out_of_range());
        }
        Ok((x, y))
    }

    /// Read a [`Buffer<T>`] from this band, where `T` implements [`PixelType`].
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (values are picked by nearest
    ///   neighbour if `window_size != size`)
    /// * `size` - the desired size of the 'Buffer'
    ///
    /// # Example
    ///
    /// ```rust, no_run
    /// # fn main() -> miramon_raster::errors::Result<()> {
    /// use miramon_raster::Dataset;
    /// let dataset = Dataset::open("fixtures/byte_2x3_6_categsI.rel")?;
    /// let band1 = dataset.rasterband(1)?;
    /// assert_eq!(band1.band_type(), miramon_raster::raster::DataType::UInt8);
    /// let buf = band1.read_as::<u8>((0, 0), (2, 3), (2, 3))?;
    /// assert_eq!(buf.data, vec![0, 1, 2, 3, 4, 5]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_as<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
    ) -> Result<Buffer<T>> {
        let mut data = vec![T::default(); size.0 * size.1];
        self.read_into_slice(window, window_size, size, &mut data)?;
        Ok(Buffer::new(size, data))
    }

    #[cfg(feature = "ndarray")]
    #[cfg_attr(docsrs, doc(cfg(feature = "array")))]
    /// Read a [`Array2<T>`] from this band, where `T` implements [`PixelType`].
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (values are picked by nearest
    ///   neighbour if `window_size != array_size`)
    /// * `array_size` - the desired size of the 'Array'
    ///
    /// # Note
    /// The Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis).
    pub fn read_as_array<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        array_size: (usize, usize),
    ) -> Result<Array2<T>> {
        self.read_as::<T>(window, window_size, array_size)?
            .to_array()
    }

    /// Read the full band as a [`Buffer<T>`], where `T` implements [`PixelType`].
    pub fn read_band_as<T: PixelType>(&self) -> Result<Buffer<T>> {
        let size = self.size();
        self.read_as::<T>((0, 0), size, size)
    }

    /// Read a block of this band. Blocks are rows: `block_index` is
    /// `(0, row)`.
    pub fn read_block<T: PixelType>(&self, block_index: (usize, usize)) -> Result<Buffer<T>> {
        let (x, y) = block_index;
        if x != 0 || y >= self.y_size() {
            return Err(MiraMonError::BlockIndexOutOfRange(x, y));
        }
        let width = self.x_size();
        self.read_as::<T>((0, y as isize), (width, 1), (width, 1))
    }

    #[cfg(feature = "ndarray")]
    #[cfg_attr(docsrs, doc(cfg(feature = "array")))]
    /// Read a [`Array2<T>`] from a [`Dataset`] block, where `T` implements [`PixelType`].
    ///
    /// # Arguments
    /// * `block_index` - the block index
    ///
    /// # Note
    /// The Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis).
    pub fn read_block_as_array<T: PixelType>(
        &self,
        block_index: (usize, usize),
    ) -> Result<Array2<T>> {
        self.read_block::<T>(block_index)?.to_array()
    }

    /// Pixel type of the band. Bit bands read as bytes.
    pub fn band_type(&self) -> DataType {
        self.band.data_type().data_type()
    }

    pub fn no_data_value(&self) -> Option<f64> {
        self.band.nodata()
    }

    /// Documented minimum value (`min`).
    pub fn minimum(&self) -> Option<f64> {
        self.band.min()
    }

    /// Documented maximum value (`max`).
    pub fn maximum(&self) -> Option<f64> {
        self.band.max()
    }

    /// Lowest value of the color ramp, the minimum unless documented.
    pub fn visu_minimum(&self) -> Option<f64> {
        self.band.visu_min()
    }

    /// Highest value of the color ramp, the maximum unless documented.
    pub fn visu_maximum(&self) -> Option<f64> {
        self.band.visu_max()
    }

    pub fn bounding_box(&self) -> Rect<f64> {
        self.band.bounding_box()
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.band.geo_transform()
    }

    fn load_palette(&self) -> Result<Option<Palette>> {
        let color_text = self.band.color_text();
        let source = PaletteSource::resolve(
            self.dataset.relation().rel().dir(),
            color_text.palette.as_deref(),
        );
        debug!("band {}: palette {:?}", self.band.name(), source);
        source.load(color_text.categorical)
    }

    /// Get the color table of this band.
    ///
    /// Built on first use from the band palette. `None` when the band has
    /// no palette, its values can't be enumerated (more than two bytes
    /// per pixel) or the palette couldn't be read.
    pub fn color_table(&self) -> Option<&'a ColorTable> {
        let band = self.band;
        band.color_table
            .get_or_init(|| {
                let table = self
                    .load_palette()
                    .and_then(|palette| ColorTable::for_band(band, palette.as_ref()));
                table.unwrap_or_else(|e| {
                    warn!("band {} has no color table: {e}", band.name());
                    None
                })
            })
            .as_ref()
    }

    /// Color interpretation: [`ColorInterpretation::PaletteIndex`] for
    /// bands with a color table.
    pub fn color_interpretation(&self) -> ColorInterpretation {
        if self.color_table().is_some() {
            ColorInterpretation::PaletteIndex
        } else {
            ColorInterpretation::Undefined
        }
    }

    /// The attribute table of this band.
    ///
    /// Either the DBF table joined through `IndexsJoinTaula`, or one row
    /// per palette color. Built on first use.
    pub fn default_rat(&self) -> Option<&'a RasterAttributeTable> {
        let band = self.band;
        band.rat
            .get_or_init(|| {
                self.build_rat().unwrap_or_else(|e| {
                    warn!("band {} has no attribute table: {e}", band.name());
                    None
                })
            })
            .as_ref()
    }

    fn build_rat(&self) -> Result<Option<RasterAttributeTable>> {
        let band = self.band;
        if !band.join_tables().is_empty() {
            return RasterAttributeTable::from_join(self.dataset.relation().rel(), band);
        }

        let color_text = band.color_text();
        if color_text.constant {
            let (r, g, b) = color_text.symbol_color()?.unwrap_or((0, 0, 0));
            return RasterAttributeTable::constant(
                RgbaEntry::new(r, g, b, 255),
                band.visu_min(),
                band.visu_max(),
            )
            .map(Some);
        }

        let Some(palette) = self.load_palette()? else {
            return Ok(None);
        };
        if palette.is_categorical() {
            return RasterAttributeTable::categorical(&palette, band.nodata()).map(Some);
        }
        match (band.visu_min(), band.visu_max()) {
            (Some(min), Some(max)) => {
                RasterAttributeTable::continuous(&palette, min, max, band.nodata()).map(Some)
            }
            _ => Err(MiraMonError::InvalidColorTable {
                path: band.path().to_path_buf(),
                msg: "continuous palettes need the band minimum and maximum".to_string(),
            }),
        }
    }
}

impl Metadata for RasterBand<'_> {
    fn metadata_store(&self) -> &MetadataStore {
        self.band.metadata()
    }

    fn description(&self) -> String {
        self.band.name().to_string()
    }
}

/// Source index of output position `i` when `source` values are resampled
/// to `target`.
fn nearest(i: usize, source: usize, target: usize) -> usize {
    if source == target {
        return i;
    }
    let index = ((i as f64 + 0.5) * source as f64 / target as f64) as usize;
    index.min(source.saturating_sub(1))
}

fn decode_as<P: PixelType>(raw: &[u8]) -> Vec<f64> {
    raw.chunks_exact(P::datatype().bytes() as usize)
        .map(|bytes| P::from_le_bytes(bytes).to_f64())
        .collect()
}

/// Little-endian pixel bytes to values.
fn decode_row(data_type: DataType, raw: &[u8]) -> Vec<f64> {
    match data_type {
        DataType::UInt8 => decode_as::<u8>(raw),
        DataType::UInt16 => decode_as::<u16>(raw),
        DataType::Int16 => decode_as::<i16>(raw),
        DataType::Int32 => decode_as::<i32>(raw),
        DataType::Float32 => decode_as::<f32>(raw),
        DataType::Float64 => decode_as::<f64>(raw),
    }
}
