use crate::assert_near;
use crate::dataset::Dataset;
use crate::errors::MiraMonError;
use crate::metadata::Metadata;
use crate::raster::{
    ByteBuffer, ColorEntry, ColorInterpretation, DataType, RatFieldType, RatFieldUsage,
    RatTableType, RgbaEntry, DEFAULT_COLOR, NODATA_COLOR,
};
use crate::test_utils::{fixture, TempFixture};
use crate::{GeoTransformEx, Identify};

#[cfg(feature = "ndarray")]
use ndarray::arr2;

#[test]
fn test_open() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel"));
    assert!(dataset.is_ok());

    let missing_dataset = Dataset::open(fixture("no_such_fileI.rel"));
    assert!(missing_dataset.is_err());

    let not_miramon = Dataset::open(fixture("landuse.dbf"));
    assert!(matches!(not_miramon, Err(MiraMonError::OpenFailed { .. })));
}

#[test]
fn test_open_old_version() {
    assert!(matches!(
        Dataset::open(fixture("old_versionI.rel")),
        Err(MiraMonError::UnsupportedRelVersion(_))
    ));
    assert_eq!(Dataset::identify(fixture("old_versionI.rel")), Identify::False);
}

#[test]
fn test_open_from_img() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categs.img")).unwrap();
    assert_eq!(dataset.raster_count(), 1);
    assert!(dataset.relation().rel().path().ends_with("byte_2x3_6_categsI.rel"));
    assert_eq!(
        Dataset::identify(fixture("byte_2x3_6_categs.img")),
        Identify::Unknown
    );
    assert_eq!(
        Dataset::identify(fixture("byte_2x3_6_categsI.rel")),
        Identify::True
    );
}

#[test]
fn test_get_raster_size() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let (size_x, size_y) = dataset.raster_size();
    assert_eq!(size_x, 2);
    assert_eq!(size_y, 3);
}

#[test]
fn test_get_raster_count() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    assert_eq!(dataset.raster_count(), 1);
}

#[test]
fn test_geo_transform() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let transform = dataset.geo_transform().unwrap();
    assert_eq!(
        transform,
        [430000.0, 30.0, 0.0, 4600090.0, 0.0, -30.0]
    );
    let (x, y) = transform.apply(1.0, 2.0);
    assert_near!(x, 430030.0);
    assert_near!(y, 4600030.0);

    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.geo_transform(), transform);
    let bbox = band.bounding_box();
    assert_eq!(bbox.min().x, 430000.0);
    assert_eq!(bbox.max().y, 4600090.0);
}

#[test]
fn test_spatial_ref() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let srs = dataset.spatial_ref().unwrap();
    assert_eq!(srs.identifier(), "UTM-31N-ETRS89");
    assert_eq!(srs.auth_code(), Some(25831));
}

#[test]
fn test_read_raster() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let rv = rb.read_as::<u8>((0, 0), (2, 3), (2, 3)).unwrap();
    assert_eq!(rv.size.0, 2);
    assert_eq!(rv.size.1, 3);
    assert_eq!(rv.data, vec!(0, 1, 2, 3, 4, 5));

    let mut buf = rv;
    rb.read_into_slice((0, 1), (2, 2), (2, 2), &mut buf.data[..4])
        .unwrap();
    assert_eq!(buf.data, vec!(2, 3, 4, 5, 4, 5));
}

#[test]
fn test_read_raster_with_resample() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();

    let rv = rb.read_as::<u8>((0, 0), (2, 3), (1, 1)).unwrap();
    assert_eq!(rv.data, vec!(3));

    let rv = rb.read_as::<u8>((0, 0), (2, 3), (4, 6)).unwrap();
    assert_eq!(rv.size, (4, 6));
    assert_eq!(rv.row(0).unwrap(), [0, 0, 1, 1]);
    assert_eq!(rv.row(1).unwrap(), [0, 0, 1, 1]);
    assert_eq!(rv.row(2).unwrap(), [2, 2, 3, 3]);
    assert_eq!(rv.row(5).unwrap(), [4, 4, 5, 5]);
}

#[test]
fn test_read_raster_out_of_range() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(matches!(
        rb.read_as::<u8>((1, 0), (2, 3), (2, 3)),
        Err(MiraMonError::BadArgument(_))
    ));
    assert!(matches!(
        rb.read_as::<u8>((-1, 0), (1, 1), (1, 1)),
        Err(MiraMonError::BadArgument(_))
    ));

    let mut too_small = [0u8; 5];
    assert!(matches!(
        rb.read_into_slice((0, 0), (2, 3), (2, 3), &mut too_small),
        Err(MiraMonError::BadArgument(_))
    ));
}

#[test]
fn test_read_raster_empty_window() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(matches!(
        rb.read_as::<u8>((2, 0), (0, 3), (1, 3)),
        Err(MiraMonError::BadArgument(_))
    ));
    assert!(matches!(
        rb.read_as::<u8>((0, 3), (2, 0), (2, 1)),
        Err(MiraMonError::BadArgument(_))
    ));
    // Nothing asked, nothing read.
    assert!(rb.read_as::<u8>((0, 0), (0, 0), (0, 0)).unwrap().data.is_empty());

    let huge = isize::MAX;
    assert!(matches!(
        rb.read_as::<u8>((huge, 0), (usize::MAX, 1), (1, 1)),
        Err(MiraMonError::BadArgument(_))
    ));
}

#[test]
fn test_read_full_raster() {
    for (name, data_type) in [
        ("byte_2x3_6_categsI.rel", DataType::UInt8),
        ("integer_2x3_6_categsI.rel", DataType::Int16),
        ("uinteger_2x3_6_categsI.rel", DataType::UInt16),
        ("long_2x3_6_categsI.rel", DataType::Int32),
        ("real_2x3_6_categsI.rel", DataType::Float32),
        ("double_2x3_6_categsI.rel", DataType::Float64),
    ] {
        let dataset = Dataset::open(fixture(name)).unwrap();
        let rb = dataset.rasterband(1).unwrap();
        assert_eq!(rb.band_type(), data_type, "{name}");
        let rv = rb.read_band_as::<f64>().unwrap();
        assert_eq!(rv.data, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], "{name}");
    }
}

#[test]
fn test_read_typed() {
    let dataset = Dataset::open(fixture("integer_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.read_band_as::<i16>().unwrap().data, vec![0, 1, 2, 3, 4, 5]);

    let dataset = Dataset::open(fixture("real_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(
        rb.read_band_as::<f32>().unwrap().data,
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    );
}

#[test]
fn test_read_block() {
    let dataset = Dataset::open(fixture("long_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.block_size(), (2, 1));

    let block = rb.read_block::<i32>((0, 2)).unwrap();
    assert_eq!(block.size, (2, 1));
    assert_eq!(block.data, vec![4, 5]);

    assert!(matches!(
        rb.read_block::<i32>((0, 3)),
        Err(MiraMonError::BlockIndexOutOfRange(0, 3))
    ));
    assert!(matches!(
        rb.read_block::<i32>((1, 0)),
        Err(MiraMonError::BlockIndexOutOfRange(1, 0))
    ));
}

#[test]
fn test_read_rle() {
    for name in [
        "byte_2x3_6_categs_RLEI.rel",
        "byte_2x3_6_categs_RLE_no_indI.rel",
        "integer_2x3_6_categs_RLEI.rel",
    ] {
        let dataset = Dataset::open(fixture(name)).unwrap();
        let rb = dataset.rasterband(1).unwrap();
        // Last row first, so rows are not read in file order.
        assert_eq!(rb.read_block::<i32>((0, 2)).unwrap().data, vec![4, 5], "{name}");
        assert_eq!(
            rb.read_band_as::<i32>().unwrap().data,
            vec![0, 1, 2, 3, 4, 5],
            "{name}"
        );
    }
}

#[test]
fn test_read_rle_double() {
    let dataset = Dataset::open(fixture("double_2x3_RLEI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.band_type(), DataType::Float64);
    assert_eq!(rb.no_data_value(), Some(0.0));
    assert_eq!(
        rb.read_band_as::<f64>().unwrap().data,
        vec![7.5, 7.5, 7.5, -1.25, 0.0, 0.0]
    );
    // Integer reads round to the nearest value.
    assert_eq!(
        rb.read_band_as::<i16>().unwrap().data,
        vec![8, 8, 8, -1, 0, 0]
    );
    // and saturate.
    assert_eq!(rb.read_band_as::<u8>().unwrap().data, vec![8, 8, 8, 0, 0, 0]);
}

#[test]
fn test_corrupt_rle() {
    let dir = TempFixture::empty("corruptI.rel");
    let rel = std::fs::read_to_string(fixture("byte_2x3_6_categs_RLE_no_indI.rel"))
        .unwrap()
        .replace("byte_2x3_6_categs_RLE_no_ind.img", "corrupt.img");
    std::fs::write(dir.path(), rel).unwrap();
    // Second row claims three pixels.
    std::fs::write(dir.dir().join("corrupt.img"), [0u8, 2, 0, 1, 3, 2]).unwrap();

    let dataset = Dataset::open(dir.path()).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(matches!(
        rb.read_block::<u8>((0, 1)),
        Err(MiraMonError::CorruptBlock { row: 1, .. })
    ));
}

#[test]
fn test_read_bits() {
    let dataset = Dataset::open(fixture("chess_bitI.rel")).unwrap();
    assert_eq!(dataset.raster_size(), (8, 8));
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.band_type(), DataType::UInt8);

    let buffer: ByteBuffer = rb.read_band_as().unwrap();
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(buffer.get(x, y), Some(((x + y) % 2 == 0) as u8), "({x}, {y})");
        }
    }
}

#[test]
fn test_band_limits() {
    let dataset = Dataset::open(fixture("byte_2x3_constantI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.no_data_value(), Some(5.0));
    assert_eq!(rb.minimum(), Some(0.0));
    assert_eq!(rb.maximum(), Some(4.0));
    assert_eq!(rb.visu_minimum(), Some(0.0));
    assert_eq!(rb.visu_maximum(), Some(4.0));

    let dataset = Dataset::open(fixture("double_2x3_RLEI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.minimum(), None);
    assert_eq!(rb.visu_maximum(), None);
}

#[test]
fn test_band_metadata() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.description(), "byte_2x3_6_categs");
    assert_eq!(
        rb.metadata_item("DESCRIPTION", "").as_deref(),
        Some("Land cover classes")
    );

    let dataset = Dataset::open(fixture("integer_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(rb.metadata_domains().is_empty());
}

#[test]
fn test_categorical_color_table() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.color_interpretation(), ColorInterpretation::PaletteIndex);
    assert_eq!(rb.color_interpretation().name(), "Palette");

    let ct = rb.color_table().unwrap();
    assert_eq!(ct.entry_count(), 256);
    assert_eq!(ct.entry(0), Some(ColorEntry::rgba(0, 0, 255, 255)));
    assert_eq!(ct.entry_as_rgb(3), Some(RgbaEntry::new(255, 0, 0, 255)));
    assert_eq!(ct.entry_as_rgb(5), Some(RgbaEntry::new(255, 255, 255, 255)));
    assert_eq!(ct.entry_as_rgb(6), Some(DEFAULT_COLOR));
    assert_eq!(ct.entry(256), None);

    // Cached.
    assert!(std::ptr::eq(ct, rb.color_table().unwrap()));
}

#[test]
fn test_constant_color_table() {
    let dataset = Dataset::open(fixture("byte_2x3_constantI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let ct = rb.color_table().unwrap();
    assert_eq!(ct.entry_count(), 256);
    assert_eq!(ct.entry_as_rgb(0), Some(RgbaEntry::new(255, 0, 255, 255)));
    assert_eq!(ct.entry_as_rgb(200), Some(RgbaEntry::new(255, 0, 255, 255)));
    assert_eq!(ct.entry_as_rgb(5), Some(NODATA_COLOR));
}

#[test]
fn test_continuous_color_table() {
    let dataset = Dataset::open(fixture("uinteger_2x3_continuousI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let ct = rb.color_table().unwrap();
    assert_eq!(ct.entry_count(), 65536);
    assert_eq!(ct.entry_as_rgb(0), Some(RgbaEntry::new(0, 0, 0, 255)));
    assert_eq!(ct.entry_as_rgb(100), Some(RgbaEntry::new(51, 51, 51, 255)));
    assert_eq!(ct.entry_as_rgb(500), Some(RgbaEntry::new(255, 255, 255, 255)));
    assert_eq!(ct.entry_as_rgb(60000), Some(RgbaEntry::new(255, 255, 255, 255)));
}

#[test]
fn test_no_color_table() {
    // Four byte pixels can't be enumerated.
    let dataset = Dataset::open(fixture("long_2x3_continuousI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(rb.color_table().is_none());
    assert_eq!(rb.color_interpretation(), ColorInterpretation::Undefined);
    assert_eq!(rb.color_interpretation().name(), "Undefined");

    // No palette documented.
    let dataset = Dataset::open(fixture("integer_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(rb.color_table().is_none());
    assert!(rb.default_rat().is_none());
}

#[test]
fn test_categorical_rat() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let rat = rb.default_rat().unwrap();
    assert_eq!(rat.table_type(), RatTableType::Thematic);
    assert_eq!(rat.num_rows(), 6);
    assert_eq!(rat.num_columns(), 5);
    assert_eq!(rat.column_name(0), Some("Value"));
    assert_eq!(rat.column_usage(0), Some(RatFieldUsage::MinMax));
    assert_eq!(rat.column_by_usage(RatFieldUsage::Green), Some(2));
    assert_eq!(rat.value_as_int(4, 0), Some(4));
    assert_eq!(rat.value_as_int(4, 1), Some(128));
    assert_eq!(rat.value_as_int(4, 2), Some(64));
    assert_eq!(rat.value_as_int(4, 4), Some(255));
    assert_eq!(rat.row_of_value(2.0), Some(2));
    assert_eq!(rat.row_of_value(9.0), None);
}

#[test]
fn test_constant_rat() {
    let dataset = Dataset::open(fixture("byte_2x3_constantI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let rat = rb.default_rat().unwrap();
    assert_eq!(rat.num_rows(), 1);
    assert_eq!(rat.value_as_double(0, 0), Some(0.0));
    assert_eq!(rat.value_as_double(0, 1), Some(4.0));
    assert_eq!(rat.value_as_int(0, 2), Some(255));
    assert_eq!(rat.value_as_int(0, 3), Some(0));
    assert_eq!(rat.value_as_int(0, 4), Some(255));
}

#[test]
fn test_continuous_rat() {
    let dataset = Dataset::open(fixture("long_2x3_continuousI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let rat = rb.default_rat().unwrap();
    assert_eq!(rat.table_type(), RatTableType::Athematic);
    // 64 palette intervals of 10 between 0 and 640, then the maximum.
    assert_eq!(rat.num_rows(), 65);
    assert_eq!(rat.column_type(0), Some(RatFieldType::Real));
    assert_near!(rat.value_as_double(2, 0).unwrap(), 20.0);
    assert_near!(rat.value_as_double(2, 1).unwrap(), 30.0);
    // rainbow.pal line "2 8 247 0"
    assert_eq!(rat.value_as_int(2, 2), Some(8));
    assert_eq!(rat.value_as_int(2, 3), Some(247));
    assert_eq!(rat.value_as_int(2, 4), Some(0));
    assert_eq!(rat.row_of_value(25.0), Some(2));
    assert_eq!(rat.row_of_value(640.0), Some(64));
    assert_eq!(rat.row_of_value(-1.0), None);
}

#[test]
fn test_continuous_rat_with_nodata() {
    let dataset = Dataset::open(fixture("real_2x3_continuous_nodataI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.no_data_value(), Some(-9999.0));
    assert!(rb.color_table().is_none());

    let rat = rb.default_rat().unwrap();
    // Nodata row, four intervals of 10 between 0 and 40, then the maximum.
    assert_eq!(rat.num_rows(), 6);
    assert_eq!(rat.value_as_double(0, 0), Some(-9999.0));
    assert_eq!(rat.value_as_double(0, 1), Some(-9999.0));
    assert_eq!(rat.value_as_int(0, 2), Some(0));
    assert_eq!(rat.value_as_int(0, 4), Some(0));

    assert_near!(rat.value_as_double(1, 0).unwrap(), 0.0);
    assert_near!(rat.value_as_double(1, 1).unwrap(), 10.0);
    assert_eq!(rat.value_as_int(1, 4), Some(255));
    assert_near!(rat.value_as_double(4, 0).unwrap(), 30.0);
    assert_near!(rat.value_as_double(4, 1).unwrap(), 40.0);

    assert_eq!(rat.value_as_double(5, 0), Some(40.0));
    assert_eq!(rat.value_as_double(5, 1), Some(40.0));
    assert_eq!(rat.value_as_int(5, 2), Some(255));
    assert_eq!(rat.value_as_int(5, 3), Some(0));

    let pixels = rb.read_band_as::<f32>().unwrap();
    let rows: Vec<Option<usize>> = pixels
        .data
        .iter()
        .map(|v| rat.row_of_value(*v as f64))
        .collect();
    assert_eq!(
        rows,
        vec![Some(1), Some(2), Some(0), Some(3), Some(5), Some(4)]
    );
}

#[test]
fn test_join_dbf_rat() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categs_joinI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(rb.color_table().is_none());

    let rat = rb.default_rat().unwrap();
    assert_eq!(rat.table_type(), RatTableType::Thematic);
    assert_eq!(rat.num_rows(), 6);
    assert_eq!(rat.num_columns(), 3);
    assert_eq!(rat.column_name(0), Some("CODI"));
    assert_eq!(rat.column_usage(0), Some(RatFieldUsage::MinMax));
    assert_eq!(rat.column_usage(1), Some(RatFieldUsage::Name));
    assert_eq!(rat.column_type(2), Some(RatFieldType::Real));
    assert_eq!(rat.value_as_string(3, 1).as_deref(), Some("Urbà"));
    assert_near!(rat.value_as_double(3, 2).unwrap(), 5.0);

    let row = rat.row_of_value(4.0).unwrap();
    assert_eq!(rat.value_as_string(row, 1).as_deref(), Some("Sòl nu"));
}

#[test]
fn test_join_rel_rat() {
    let dataset = Dataset::open(fixture("byte_2x3_6_categs_join_relI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let rat = rb.default_rat().unwrap();
    assert_eq!(rat.table_type(), RatTableType::Thematic);
    assert_eq!(rat.column_name(0), Some("CODI"));
    assert_eq!(rat.value_as_string(1, 1).as_deref(), Some("Bosc"));
}

#[test]
fn test_broken_join_has_no_rat() {
    let dir = TempFixture::empty("brokenI.rel");
    let rel = std::fs::read_to_string(fixture("byte_2x3_6_categs_joinI.rel"))
        .unwrap()
        .replace("byte_2x3_6_categs.img", "broken.img")
        .replace("landuse.dbf", "missing.dbf");
    std::fs::write(dir.path(), rel).unwrap();
    std::fs::write(dir.dir().join("broken.img"), [0u8; 6]).unwrap();

    let dataset = Dataset::open(dir.path()).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert!(rb.default_rat().is_none());
}

#[test]
fn test_subdatasets() {
    let dataset = Dataset::open(fixture("landsat_subdatasetsI.rel")).unwrap();
    assert_eq!(dataset.raster_count(), 0);
    assert_eq!(dataset.raster_size(), (2, 3));
    assert!(matches!(
        dataset.rasterband(1),
        Err(MiraMonError::BandIndexOutOfRange(1))
    ));
    assert!(dataset.geo_transform().is_ok());

    let rel = fixture("landsat_subdatasetsI.rel");
    let subdatasets = dataset.metadata_domain("SUBDATASETS").unwrap();
    assert_eq!(
        subdatasets,
        vec![
            (
                "SUBDATASET_1_NAME".to_string(),
                format!(
                    "MiraMonRaster:\"{}\",\"landsat_B1.img\",\"landsat_B2.img\"",
                    rel.display()
                )
            ),
            (
                "SUBDATASET_1_DESC".to_string(),
                "Subdataset 1: \"landsat_B1\",\"landsat_B2\"".to_string()
            ),
            (
                "SUBDATASET_2_NAME".to_string(),
                format!("MiraMonRaster:\"{}\",\"landsat_B3.img\"", rel.display())
            ),
            (
                "SUBDATASET_2_DESC".to_string(),
                "Subdataset 2: \"landsat_B3\"".to_string()
            ),
        ]
    );
    assert_eq!(dataset.subdatasets().len(), 2);
}

#[test]
fn test_open_subdataset() {
    let dataset = Dataset::open(fixture("landsat_subdatasetsI.rel")).unwrap();
    let name = dataset
        .metadata_item("SUBDATASET_1_NAME", "SUBDATASETS")
        .unwrap();
    assert_eq!(Dataset::identify(&name), Identify::True);

    let visible = Dataset::open(&name).unwrap();
    assert_eq!(visible.description(), name);
    assert_eq!(visible.raster_count(), 2);
    assert_eq!(visible.raster_size(), (2, 3));
    let b2 = visible.rasterband(2).unwrap();
    assert_eq!(b2.description(), "landsat_B2");
    assert_eq!(b2.metadata_item("DESCRIPTION", "").as_deref(), Some("Green"));
    assert_eq!(b2.read_band_as::<u8>().unwrap().data, vec![10, 11, 12, 13, 14, 15]);

    let name = dataset
        .metadata_item("SUBDATASET_2_NAME", "SUBDATASETS")
        .unwrap();
    let panchromatic = Dataset::open(&name).unwrap();
    assert_eq!(panchromatic.raster_count(), 1);
    assert_eq!(panchromatic.raster_size(), (4, 6));
    // The dataset grid is the overview one, the band keeps its own.
    assert_eq!(
        panchromatic.geo_transform().unwrap(),
        [430000.0, 30.0, 0.0, 4600090.0, 0.0, -30.0]
    );
    let b3 = panchromatic.rasterband(1).unwrap();
    assert_eq!(
        b3.geo_transform(),
        [430000.0, 15.0, 0.0, 4600090.0, 0.0, -15.0]
    );
    assert_eq!(b3.read_block::<u8>((0, 5)).unwrap().data, vec![20, 21, 22, 23]);
}

#[test]
fn test_identify_subdataset_names() {
    let rel = fixture("landsat_subdatasetsI.rel");
    let unknown_band = format!("MiraMonRaster:\"{}\",\"landsat_B9.img\"", rel.display());
    assert_eq!(Dataset::identify(&unknown_band), Identify::False);
    assert!(Dataset::open(&unknown_band).is_err());
    assert_eq!(Dataset::identify("not a raster"), Identify::False);
}

#[test]
#[cfg(feature = "ndarray")]
fn test_read_raster_as_array() {
    let dataset = Dataset::open(fixture("uinteger_2x3_6_categsI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let values = rb.read_as_array::<u16>((0, 1), (2, 2), (2, 2)).unwrap();
    assert_eq!(values, arr2(&[[2, 3], [4, 5]]));
}

#[test]
#[cfg(feature = "ndarray")]
fn test_read_block_as_array() {
    let dataset = Dataset::open(fixture("chess_bitI.rel")).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    let block = rb.read_block_as_array::<u8>((0, 1)).unwrap();
    assert_eq!(block, arr2(&[[0, 1, 0, 1, 0, 1, 0, 1]]));
}
