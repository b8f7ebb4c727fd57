use std::path::{Path, PathBuf};

/// A struct that contains a temporary directory and a path to a file in that directory.
pub struct TempFixture {
    _temp_dir: tempfile::TempDir,
    temp_path: PathBuf,
}

impl TempFixture {
    /// Creates a copy of the test file in a temporary directory.
    /// Returns the struct `TempFixture` that contains the temp dir (for clean-up on `drop`) as well as the path to the file.
    pub fn fixture(name: &str) -> Self {
        let staging = Self::empty(name);
        std::fs::copy(fixture(name), &staging.temp_path).unwrap();
        staging
    }

    /// Creates a temporary directory and path to a non-existent file with given `name`.
    /// Useful for writing REL and image files to during testing
    ///
    /// Returns the struct `TempFixture` that contains the temp dir (for clean-up on `drop`)
    /// as well as the empty file path.
    pub fn empty(name: &str) -> Self {
        let _temp_dir = tempfile::tempdir().unwrap();
        let temp_path = _temp_dir.path().join(name);
        Self {
            _temp_dir,
            temp_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// The temporary directory holding the file.
    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }
}

impl AsRef<Path> for TempFixture {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Returns the fully qualified path to `filename` in `${CARGO_MANIFEST_DIR}/fixtures`.
pub fn fixture(filename: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(filename)
}

/// Builds dBASE III files for tests. Text is written as Latin-1.
#[derive(Default)]
pub struct DbfWriter {
    fields: Vec<(String, char, u8, u8)>,
    records: Vec<Vec<String>>,
}

impl DbfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, field_type: char, length: u8, decimals: u8) -> Self {
        self.fields
            .push((name.to_string(), field_type, length, decimals));
        self
    }

    pub fn record(mut self, values: &[&str]) -> Self {
        self.records
            .push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header_size = 32 + 32 * self.fields.len() + 1;
        let record_size = 1 + self
            .fields
            .iter()
            .map(|(_, _, len, _)| *len as usize)
            .sum::<usize>();

        let mut bytes = vec![0x03, 124, 3, 15];
        bytes.extend((self.records.len() as u32).to_le_bytes());
        bytes.extend((header_size as u16).to_le_bytes());
        bytes.extend((record_size as u16).to_le_bytes());
        bytes.resize(32, 0);

        for (name, field_type, length, decimals) in &self.fields {
            let mut descriptor = [0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *field_type as u8;
            descriptor[16] = *length;
            descriptor[17] = *decimals;
            bytes.extend(descriptor);
        }
        bytes.push(0x0D);

        for record in &self.records {
            bytes.push(b' ');
            for ((_, field_type, length, _), value) in self.fields.iter().zip(record) {
                let length = *length as usize;
                let mut encoded: Vec<u8> = value.chars().map(|c| c as u32 as u8).collect();
                encoded.truncate(length);
                let padding = vec![b' '; length - encoded.len()];
                if *field_type == 'N' {
                    bytes.extend(padding);
                    bytes.extend(encoded);
                } else {
                    bytes.extend(encoded);
                    bytes.extend(padding);
                }
            }
        }
        bytes.push(0x1A);
        bytes
    }
}

/// Run-length encode one row of pixels of `bpp` bytes each.
///
/// Runs of two or more equal pixels are repeated, the rest is written as
/// literal groups.
pub fn encode_rle_row(row: &[u8], bpp: usize) -> Vec<u8> {
    let pixels: Vec<&[u8]> = row.chunks_exact(bpp).collect();
    let mut out = Vec::new();
    let mut literals: Vec<&[u8]> = Vec::new();
    let mut i = 0;
    while i < pixels.len() {
        let mut run = 1;
        while i + run < pixels.len() && run < 255 && pixels[i + run] == pixels[i] {
            run += 1;
        }
        if run >= 2 {
            flush_literals(&mut literals, &mut out);
            out.push(run as u8);
            out.extend_from_slice(pixels[i]);
        } else {
            literals.push(pixels[i]);
        }
        i += run;
    }
    flush_literals(&mut literals, &mut out);
    out
}

fn flush_literals(literals: &mut Vec<&[u8]>, out: &mut Vec<u8>) {
    for group in literals.chunks(255) {
        out.push(0);
        out.push(group.len() as u8);
        for pixel in group {
            out.extend_from_slice(pixel);
        }
    }
    literals.clear();
}

/// Row offset index to append to an RLE image whose data ends at `start`.
///
/// With `with_extra_section`, a section of another type comes first in the
/// chain.
pub fn rle_offset_index(
    start: u64,
    offsets: &[u64],
    offset_size: u32,
    with_extra_section: bool,
) -> Vec<u8> {
    const SIGNATURE: &[u8; 8] = b"IMG 1.1\0";
    let mut out = Vec::new();
    let mut offsets_header = start;

    if with_extra_section {
        offsets_header = start + 32;
        out.extend(SIGNATURE);
        out.extend(1u32.to_le_bytes());
        out.extend([0u8; 12]);
        out.extend(offsets_header.to_le_bytes());
    }

    out.extend(SIGNATURE);
    out.extend(2u32.to_le_bytes());
    out.extend(offset_size.to_le_bytes());
    out.extend([0u8; 16]);
    for offset in offsets {
        match offset_size {
            1 => out.push(*offset as u8),
            2 => out.extend((*offset as u16).to_le_bytes()),
            4 => out.extend((*offset as u32).to_le_bytes()),
            _ => out.extend(offset.to_le_bytes()),
        }
    }

    out.extend([0u8; 16]);
    out.extend(SIGNATURE);
    let first_header = if with_extra_section { start } else { offsets_header };
    out.extend(first_header.to_le_bytes());
    out
}

/// Assert numerical difference between two expressions is less than
/// 64-bit machine epsilon or a specified epsilon.
///
/// # Examples:
/// ```rust, no_run
/// use miramon_raster::assert_near;
/// use std::f64::consts::{PI, E};
/// assert_near!(PI / E, 1.1557273497909217);
/// // with specified epsilon
/// assert_near!(PI / E, 1.15572734, epsilon = 1e-8);
/// ```
#[macro_export]
macro_rules! assert_near {
    ($left:expr, $right:expr) => {
        assert_near!($left, $right, epsilon = f64::EPSILON)
    };
    ($left:expr, $right:expr, epsilon = $ep:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "|{} - {}| = {} is greater than epsilon {:.4e}",
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
    ($left:expr, $right:expr, epsilon = $ep:expr, field = $field:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "field {}: |{} - {}| = {} is greater than epsilon {:.4e}",
            $field,
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
}
