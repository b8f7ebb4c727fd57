use bitflags::bitflags;

/// Open options for [`crate::Dataset`]
#[derive(Debug, Default)]
pub struct DatasetOptions {
    pub open_flags: OpenFlags,
}

bitflags! {
    /// Open flags used by [`Dataset::open_ex`](crate::Dataset::open_ex).
    ///
    /// MiraMon rasters are read-only: [`OpenFlags::UPDATE`] makes the open
    /// fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open in read-only mode (default).
        const READONLY = 0x00;
        /// Open in update mode.
        const UPDATE = 0x01;
        /// Open as a raster dataset.
        const RASTER = 0x02;
        /// Emit error message in case of failed open.
        const VERBOSE_ERROR = 0x40;
    }
}

impl Default for OpenFlags {
    fn default() -> OpenFlags {
        OpenFlags::READONLY
    }
}
