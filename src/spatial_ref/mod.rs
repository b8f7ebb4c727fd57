//! Horizontal reference systems documented in REL files.

mod srs;

pub use srs::{Datum, SpatialRef};
