use std::path::{Path, PathBuf};

/// Suffix every raster REL file name ends with.
pub const REL_SUFFIX: &str = "I.rel";

const IMG_EXTENSION: &str = "img";

/// Whether `name` ends with `I.rel` (case-insensitive).
pub fn is_rel_name(name: &str) -> bool {
    name.len() >= REL_SUFFIX.len()
        && name
            .get(name.len() - REL_SUFFIX.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(REL_SUFFIX))
}

/// Whether `path` has the `.img` extension (case-insensitive).
pub(crate) fn is_img_name(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(IMG_EXTENSION))
}

/// `nameI.rel` -> `name.img`.
pub fn img_name_from_rel(rel: &Path) -> Option<PathBuf> {
    let stem = rel.file_stem()?.to_str()?;
    // Drop the trailing "I".
    let mut chars = stem.chars();
    chars.next_back()?;
    let base = chars.as_str();
    if base.is_empty() {
        return None;
    }
    Some(rel.with_file_name(format!("{base}.{IMG_EXTENSION}")))
}

/// `name.img` -> `nameI.rel`.
pub fn rel_name_from_img(img: &Path) -> Option<PathBuf> {
    let stem = img.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(img.with_file_name(format!("{stem}{REL_SUFFIX}")))
}

/// Compare two file names the way MiraMon does: case-insensitive and
/// ignoring the path separator flavour.
pub fn same_file<A: AsRef<Path>, B: AsRef<Path>>(a: A, b: B) -> bool {
    let normalize = |p: &Path| p.to_string_lossy().replace('\\', "/");
    normalize(a.as_ref()).eq_ignore_ascii_case(&normalize(b.as_ref()))
}
