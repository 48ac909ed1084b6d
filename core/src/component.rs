//! Lifecycle seam towards the host firmware.
//!
//! The host owns a single cooperative loop and drives every registered
//! component through these callbacks; there is no threading and no async
//! suspension on this side.

use crate::sd::SdCard;
use crate::sd_image::SdImage;
use crate::storage::Storage;

pub trait Component {
    /// One-time initialization. Unrecoverable problems latch the failed
    /// flag instead of panicking.
    fn setup(&mut self) {}

    /// Called from the host loop with a millisecond timestamp.
    fn tick(&mut self, _now_ms: u32) {}

    /// Log the effective configuration once at startup.
    fn dump_config(&self) {}

    fn is_failed(&self) -> bool {
        false
    }
}

impl<C: SdCard> Component for Storage<'_, C> {
    fn setup(&mut self) {
        Storage::setup(self);
    }

    fn tick(&mut self, now_ms: u32) {
        Storage::tick(self, now_ms);
    }

    fn dump_config(&self) {
        Storage::dump_config(self);
    }

    fn is_failed(&self) -> bool {
        Storage::is_failed(self)
    }
}

impl<C: SdCard> Component for SdImage<'_, C> {
    fn setup(&mut self) {
        SdImage::setup(self);
    }

    fn dump_config(&self) {
        SdImage::dump_config(self);
    }

    fn is_failed(&self) -> bool {
        SdImage::failed(self)
    }
}
