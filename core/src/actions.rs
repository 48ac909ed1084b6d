//! Automation hooks the host wires to triggers.
//!
//! Each action carries its configured parameters and replays them against
//! the target component when the host fires it.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use log::debug;

use crate::decode::ImageError;
use crate::sd::SdCard;
use crate::sd_image::SdImage;
use crate::storage::{Storage, StorageError};

/// Read a whole file, optionally truncated to `max_size` bytes
/// (0 = unlimited).
pub struct ReadFileAction {
    pub file_path: String,
    pub max_size: usize,
}

impl ReadFileAction {
    pub fn play<C: SdCard>(
        &self,
        storage: &mut Storage<'_, C>,
    ) -> Result<Vec<u8>, StorageError> {
        debug!("storage.read_file: {}", self.file_path);
        let mut data = storage.read_file(&self.file_path)?;
        if self.max_size > 0 && data.len() > self.max_size {
            data.truncate(self.max_size);
        }
        Ok(data)
    }
}

/// Stream a file through a callback; `chunk_size` 0 falls back to the
/// size configured for the file.
pub struct StreamFileAction {
    pub file_path: String,
    pub chunk_size: usize,
}

impl StreamFileAction {
    pub fn play<C: SdCard>(
        &self,
        storage: &mut Storage<'_, C>,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        debug!("storage.stream_file: {}", self.file_path);
        if self.chunk_size == 0 {
            storage.stream_file(&self.file_path, sink)
        } else {
            storage.stream_file_chunked(&self.file_path, self.chunk_size, sink)
        }
    }
}

/// Audio streaming uses a larger default chunk than plain files.
pub struct StreamAudioAction {
    pub file_path: String,
    pub chunk_size: usize,
}

impl StreamAudioAction {
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    pub fn play<C: SdCard>(
        &self,
        storage: &mut Storage<'_, C>,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let chunk_size = if self.chunk_size == 0 {
            Self::DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        };
        storage.stream_file_chunked(&self.file_path, chunk_size, sink)
    }
}

pub struct StreamImageAction {
    pub file_path: String,
    pub chunk_size: usize,
}

impl StreamImageAction {
    pub const DEFAULT_CHUNK_SIZE: usize = 2048;

    pub fn play<C: SdCard>(
        &self,
        storage: &mut Storage<'_, C>,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let chunk_size = if self.chunk_size == 0 {
            Self::DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        };
        storage.stream_file_chunked(&self.file_path, chunk_size, sink)
    }
}

pub struct FileExistsAction {
    pub file_path: String,
}

impl FileExistsAction {
    pub fn play<C: SdCard>(&self, storage: &Storage<'_, C>) -> bool {
        storage.file_exists_direct(&self.file_path)
    }
}

pub struct LoadImageAction;

impl LoadImageAction {
    pub fn play<C: SdCard>(&self, image: &mut SdImage<'_, C>) -> Result<(), ImageError> {
        image.load()
    }
}

pub struct UnloadImageAction;

impl UnloadImageAction {
    pub fn play<C: SdCard>(&self, image: &mut SdImage<'_, C>) {
        image.unload();
    }
}

pub struct ReloadImageAction;

impl ReloadImageAction {
    pub fn play<C: SdCard>(&self, image: &mut SdImage<'_, C>) -> Result<(), ImageError> {
        image.reload()
    }
}
