extern crate alloc;

use core::result::Result;

use embedded_io::{ErrorType, Read, Seek, Write};

pub enum Mode {
    Read,
    Write,
    ReadWrite,
}

/// Access to the SD-card driver the host mounted for us. Implementations
/// resolve paths relative to their own mount point; callers pass
/// component-level paths such as `/images/logo.raw`.
pub trait SdCard: ErrorType {
    type File<'a>: File
    where
        Self: 'a;

    /// Whether the card is mounted and usable. Components check this during
    /// setup and fail without it.
    fn is_ready(&self) -> bool;

    /// Mount point, for diagnostics only.
    fn mount_path(&self) -> &str;

    fn open(&self, path: &str, mode: Mode) -> Result<Self::File<'_>, Self::Error>;
    fn exists(&self, path: &str) -> Result<bool, Self::Error>;
    fn size(&self, path: &str) -> Result<usize, Self::Error>;

    /// Card insertion/eject notifications from the host. Most drivers have
    /// nothing to do here.
    fn on_insert(&mut self) {}
    fn on_eject(&mut self) {}
}

pub trait File: Read + Write + Seek {
    fn size(&self) -> usize;
}
