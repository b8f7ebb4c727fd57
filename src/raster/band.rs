use std::cell::{OnceCell, RefCell};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use geo_types::{coord, Rect};
use log::debug;

use crate::errors::{MiraMonError, Result};
use crate::geo_transform::GeoTransform;
use crate::metadata::MetadataStore;
use crate::raster::color_table::ColorTable;
use crate::raster::rat::RasterAttributeTable;
use crate::raster::rle;
use crate::raster::MiraMonDataType;
use crate::rel::{img_name_from_rel, BandSection, ColorText, RelFile};

/// Band extent in terrain coordinates, as documented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

/// Everything known about one band of a REL file, plus its open `.img`.
///
/// Built once when the dataset is opened and never modified afterwards,
/// except for the lazily filled caches.
#[derive(Debug)]
pub struct BandDescriptor {
    section: String,
    name: String,
    raw_file_name: String,
    path: PathBuf,
    width: usize,
    height: usize,
    data_type: MiraMonDataType,
    nodata: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    visu_min: Option<f64>,
    visu_max: Option<f64>,
    description: Option<String>,
    bbox: BoundingBox,
    color_text: ColorText,
    join_tables: Vec<String>,
    metadata: MetadataStore,
    file: RefCell<BufReader<File>>,
    row_offsets: OnceCell<Vec<u64>>,
    pub(crate) color_table: OnceCell<Option<ColorTable>>,
    pub(crate) rat: OnceCell<Option<RasterAttributeTable>>,
}

impl BandDescriptor {
    /// Read `[ATTRIBUTE_DATA:<section>]` and open the band file.
    pub fn from_rel(rel: &RelFile, section: &str) -> Result<Self> {
        let band = BandSection::from_rel(rel, section)?;
        let invalid = |key: &str, value: Option<i64>| MiraMonError::InvalidValue {
            section: format!("ATTRIBUTE_DATA:{section}"),
            key: key.to_string(),
            value: value.map(|v| v.to_string()).unwrap_or_default(),
        };

        let (raw_file_name, path) = match &band.file_name {
            Some(file_name) => (file_name.clone(), rel.resolve(file_name)),
            None => {
                let path = img_name_from_rel(rel.path()).ok_or_else(|| {
                    MiraMonError::OpenFailed {
                        path: rel.path().to_path_buf(),
                        msg: format!("band [{section}] has no file name"),
                    }
                })?;
                let stem = file_stem(&path);
                (stem, path)
            }
        };
        let name = file_stem(Path::new(&raw_file_name.replace('\\', "/")));

        let width = band
            .columns
            .filter(|c| *c > 0)
            .ok_or_else(|| invalid("columns", band.columns))? as usize;
        let height = band
            .rows
            .filter(|r| *r > 0)
            .ok_or_else(|| invalid("rows", band.rows))? as usize;

        let compression = band.compression.as_deref().ok_or_else(|| {
            MiraMonError::MissingKey {
                rel: rel.path().to_path_buf(),
                section: format!("ATTRIBUTE_DATA:{section}"),
                key: "TipusCompressio".to_string(),
            }
        })?;
        let data_type: MiraMonDataType = compression.parse()?;

        let (min, max) = match (band.min, band.max) {
            (Some(min), Some(max)) if min > max => {
                debug!("[{section}] documents min > max, ignoring both");
                (None, None)
            }
            other => other,
        };

        let color_text = ColorText::for_band(rel, section);
        let visu_min = color_text.visu_min.or(min);
        let visu_max = color_text.visu_max.or(max);

        let extent = band.extent;
        let bbox = BoundingBox {
            min_x: extent.min_x.unwrap_or(0.0),
            max_x: extent.max_x.unwrap_or(width as f64),
            min_y: extent.min_y.unwrap_or(0.0),
            max_y: extent.max_y.unwrap_or(height as f64),
        };

        let mut metadata = MetadataStore::new();
        if let Some(description) = &band.descriptor {
            metadata.set_item("DESCRIPTION", description, "")?;
        }

        let file = File::open(&path).map_err(|e| MiraMonError::OpenFailed {
            path: path.clone(),
            msg: format!("failed to open band file: {e}"),
        })?;

        Ok(BandDescriptor {
            section: section.to_string(),
            name,
            raw_file_name,
            path,
            width,
            height,
            data_type,
            nodata: band.nodata,
            min,
            max,
            visu_min,
            visu_max,
            description: band.descriptor,
            bbox,
            color_text,
            join_tables: band.join_tables,
            metadata,
            file: RefCell::new(BufReader::new(file)),
            row_offsets: OnceCell::new(),
            color_table: OnceCell::new(),
            rat: OnceCell::new(),
        })
    }

    /// Name of the band section in the REL file.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// File stem of the band file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Band file name as documented in `NomFitxer`.
    pub fn raw_file_name(&self) -> &str {
        &self.raw_file_name
    }

    /// Resolved path of the `.img` file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data_type(&self) -> MiraMonDataType {
        self.data_type
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn visu_min(&self) -> Option<f64> {
        self.visu_min
    }

    pub fn visu_max(&self) -> Option<f64> {
        self.visu_max
    }

    /// Friendly description (`descriptor`).
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn color_text(&self) -> &ColorText {
        &self.color_text
    }

    /// `JoinTaula_<i>` table names, in `IndexsJoinTaula` order.
    pub fn join_tables(&self) -> &[String] {
        &self.join_tables
    }

    pub(crate) fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn bounding_box(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.bbox.min_x, y: self.bbox.min_y },
            coord! { x: self.bbox.max_x, y: self.bbox.max_y },
        )
    }

    /// Pixel size `(x, y)`, both positive for a north-up band.
    pub fn resolution(&self) -> (f64, f64) {
        (
            (self.bbox.max_x - self.bbox.min_x) / self.width as f64,
            (self.bbox.max_y - self.bbox.min_y) / self.height as f64,
        )
    }

    pub fn geo_transform(&self) -> GeoTransform {
        let (res_x, res_y) = self.resolution();
        [self.bbox.min_x, res_x, 0.0, self.bbox.max_y, 0.0, -res_y]
    }

    /// Whether `other` can share a subdataset with this band.
    ///
    /// Floats are compared exactly.
    pub fn same_structure(&self, other: &BandDescriptor) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.resolution() == other.resolution()
            && self.bbox == other.bbox
            && self.nodata.is_some() == other.nodata.is_some()
            && self.nodata.unwrap_or(0.0) == other.nodata.unwrap_or(0.0)
    }

    /// Bytes of one decoded row: `width` times the bytes per pixel of the
    /// exposed type. Bit bands decode to one byte per pixel.
    pub(crate) fn row_bytes(&self) -> usize {
        self.width * self.data_type.bytes_per_pixel()
    }

    /// Decode row `row` into `out` as little-endian pixel bytes.
    pub(crate) fn read_row(&self, row: usize, out: &mut [u8]) -> Result<()> {
        if row >= self.height {
            return Err(MiraMonError::BlockIndexOutOfRange(0, row));
        }
        debug_assert_eq!(out.len(), self.row_bytes());

        let mut file = self.file.borrow_mut();
        let result = if self.data_type.is_rle() {
            self.read_rle_row(&mut file, row, out)
        } else if self.data_type.is_bit() {
            self.read_bit_row(&mut file, row, out)
        } else {
            let offset = (row * self.data_type.row_size(self.width)) as u64;
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read_exact(out))
        };
        result.map_err(|e| self.block_error(row, e))
    }

    fn read_bit_row(&self, file: &mut BufReader<File>, row: usize, out: &mut [u8]) -> io::Result<()> {
        let row_size = self.data_type.row_size(self.width);
        let mut packed = vec![0u8; row_size];
        file.seek(SeekFrom::Start((row * row_size) as u64))?;
        file.read_exact(&mut packed)?;
        unpack_bits(&packed, out);
        Ok(())
    }

    fn read_rle_row(&self, file: &mut BufReader<File>, row: usize, out: &mut [u8]) -> io::Result<()> {
        let bpp = self.data_type.bytes_per_pixel();
        if self.row_offsets.get().is_none() {
            let offsets = match rle::read_row_offsets(file, self.height)? {
                Some(offsets) => offsets,
                None => {
                    debug!("{:?} has no row index, scanning rows", self.path);
                    rle::scan_row_offsets(file, self.width, self.height, bpp)?
                }
            };
            let _ = self.row_offsets.set(offsets);
        }
        let offset = self
            .row_offsets
            .get()
            .and_then(|offsets| offsets.get(row))
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing row offset"))?;
        file.seek(SeekFrom::Start(offset))?;
        rle::decode_row(file, self.width, bpp, out)
    }

    fn block_error(&self, row: usize, err: io::Error) -> MiraMonError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                MiraMonError::CorruptBlock {
                    path: self.path.clone(),
                    row,
                    msg: err.to_string(),
                }
            }
            _ => MiraMonError::Io(err),
        }
    }
}

/// Expand packed bits to one byte per pixel, most significant bit first.
///
/// `out.len()` pixels are produced.
pub(crate) fn unpack_bits(packed: &[u8], out: &mut [u8]) {
    for (i, pixel) in out.iter_mut().enumerate() {
        *pixel = (packed[i / 8] >> (7 - i % 8)) & 1;
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
