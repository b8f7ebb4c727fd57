//! MiraMon raster bands
//!
//! A band is an `.img` file holding its pixels row after row, described by
//! an `[ATTRIBUTE_DATA:<band>]` section of the REL file. Rows are either
//! raw little-endian values, packed bits, or run-length encoded.

mod band;
mod buffer;
mod color_table;
mod palette;
mod rasterband;
mod rat;
mod rle;
mod types;

pub use band::BandDescriptor;
pub use buffer::{Buffer, ByteBuffer};
pub use color_table::{
    ColorEntry, ColorInterpretation, ColorTable, PaletteInterpretation, RgbaEntry,
};
pub use palette::{FlatPalette, Palette, PaletteSource, DEFAULT_COLOR, NODATA_COLOR};
pub use rasterband::RasterBand;
pub use rat::{
    RasterAttributeTable, RatColumn, RatFieldType, RatFieldUsage, RatTableType, RatValue,
};
pub use types::{DataType, MiraMonDataType, PixelType};

#[cfg(test)]
mod tests;
