//! SD-backed file storage component.
//!
//! Forwards reads and writes to the SD driver, optionally keeping file
//! contents in a small RAM cache with last-access eviction. All calls are
//! synchronous; the host drives `tick` from its cooperative loop.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use embedded_io::{Read, Write};
use log::{debug, info, warn};

use crate::sd::{File, Mode, SdCard};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CACHE_SIZE: usize = 32768;

const CACHE_CLEANUP_INTERVAL_MS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// SD component missing or card not mounted.
    SdUnavailable,
    NotFound,
    InvalidPath,
    Io,
}

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub id: String,
    pub path: String,
    pub chunk_size: usize,
}

struct CacheEntry {
    data: Vec<u8>,
    last_access: u32,
}

pub struct Storage<'c, C: SdCard> {
    card: &'c C,
    platform_name: String,
    cache_size: usize,
    configured_files: Vec<FileConfig>,
    cache: BTreeMap<String, CacheEntry>,
    cache_used: usize,
    now_ms: u32,
    last_cleanup_ms: u32,
    cache_hits: u32,
    cache_misses: u32,
    direct_reads: u32,
    failed: bool,
}

/// A path is acceptable if it is non-empty, has no NUL bytes and never
/// climbs out of the mount with `..`.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && !path.contains('\0') && !path.split('/').any(|part| part == "..")
}

/// Normalize to a single leading `/`, collapsing duplicate separators and
/// `.` components and stripping any trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::from("/");
    for part in path.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if out.len() > 1 {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

impl<'c, C: SdCard> Storage<'c, C> {
    pub fn new(card: &'c C) -> Self {
        Self {
            card,
            platform_name: String::from("sd_direct"),
            cache_size: DEFAULT_CACHE_SIZE,
            configured_files: Vec::new(),
            cache: BTreeMap::new(),
            cache_used: 0,
            now_ms: 0,
            last_cleanup_ms: 0,
            cache_hits: 0,
            cache_misses: 0,
            direct_reads: 0,
            failed: false,
        }
    }

    pub fn set_platform(&mut self, platform: &str) {
        self.platform_name = platform.to_string();
    }

    /// Cache capacity in bytes; 0 disables caching entirely.
    pub fn set_cache_size(&mut self, size: usize) {
        self.cache_size = size;
        self.cleanup_cache();
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn configured_files(&self) -> &[FileConfig] {
        &self.configured_files
    }

    pub fn add_file(&mut self, path: &str, chunk_size: usize) {
        let id = path.rsplit('/').next().unwrap_or(path).to_string();
        self.add_file_with_id(&id, path, chunk_size);
    }

    pub fn add_file_with_id(&mut self, id: &str, path: &str, chunk_size: usize) {
        if !is_valid_path(path) {
            warn!("ignoring file '{}' with invalid path '{}'", id, path);
            return;
        }
        let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };
        self.configured_files.push(FileConfig {
            id: id.to_string(),
            path: normalize_path(path),
            chunk_size,
        });
    }

    // Component lifecycle

    pub fn setup(&mut self) {
        if !self.card.is_ready() {
            warn!("SD card not ready, storage component failed");
            self.failed = true;
            return;
        }
        for file in &self.configured_files {
            match self.card.exists(&file.path) {
                Ok(true) => debug!("configured file present: {}", file.path),
                Ok(false) => warn!("configured file missing: {}", file.path),
                Err(_) => warn!("cannot stat configured file: {}", file.path),
            }
        }
        info!(
            "storage ready on {} ({} files, cache {} bytes)",
            self.card.mount_path(),
            self.configured_files.len(),
            self.cache_size
        );
    }

    /// Advance the component clock and run periodic cache maintenance.
    pub fn tick(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
        if now_ms.wrapping_sub(self.last_cleanup_ms) >= CACHE_CLEANUP_INTERVAL_MS {
            self.last_cleanup_ms = now_ms;
            self.cleanup_cache();
        }
    }

    pub fn dump_config(&self) {
        info!("Storage:");
        info!("  Platform: {}", self.platform_name);
        info!("  Mount: {}", self.card.mount_path());
        info!("  Cache size: {} bytes", self.cache_size);
        for file in &self.configured_files {
            info!(
                "  File '{}': {} (chunk {} bytes)",
                file.id, file.path, file.chunk_size
            );
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    // Cached access

    /// Read a whole file, going through the cache when one is configured.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(path)?;
        if self.cache_size == 0 {
            return self.read_from_sd(&path);
        }
        if let Some(entry) = self.cache.get_mut(&path) {
            entry.last_access = self.now_ms;
            self.cache_hits += 1;
            return Ok(entry.data.clone());
        }
        self.cache_misses += 1;
        let data = self.read_from_sd(&path)?;
        self.add_to_cache(&path, data.clone());
        Ok(data)
    }

    // Direct access

    pub fn read_file_direct(&mut self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(path)?;
        self.read_from_sd(&path)
    }

    pub fn file_exists_direct(&self, path: &str) -> bool {
        if !is_valid_path(path) || !self.card.is_ready() {
            return false;
        }
        self.card.exists(&normalize_path(path)).unwrap_or(false)
    }

    pub fn file_size_direct(&self, path: &str) -> Result<usize, StorageError> {
        let path = self.resolve(path)?;
        self.card.size(&path).map_err(|err| {
            debug!("stat failed for {}: {:?}", path, err);
            StorageError::NotFound
        })
    }

    pub fn write_file_direct(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(path)?;
        let mut file = self.card.open(&path, Mode::Write).map_err(|err| {
            warn!("open for write failed for {}: {:?}", path, err);
            StorageError::Io
        })?;
        file.write_all(data).map_err(|err| {
            warn!("write failed for {}: {:?}", path, err);
            StorageError::Io
        })?;
        file.flush().map_err(|err| {
            warn!("flush failed for {}: {:?}", path, err);
            StorageError::Io
        })?;
        // Whatever the cache held for this path is now stale.
        self.cache_remove(&path);
        Ok(())
    }

    // Streaming

    /// Stream a file through `sink` using the chunk size configured for the
    /// path, or the default when the file was never registered.
    pub fn stream_file(
        &mut self,
        path: &str,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let chunk_size = self
            .configured_files
            .iter()
            .find(|file| file.path == normalize_path(path))
            .map(|file| file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        self.stream_file_chunked(path, chunk_size, sink)
    }

    /// Stream a file through `sink` in chunks of at most `chunk_size` bytes.
    /// Returns the total number of bytes delivered.
    pub fn stream_file_chunked(
        &mut self,
        path: &str,
        chunk_size: usize,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let path = self.resolve(path)?;
        if !self.card.is_ready() {
            warn!("SD card not ready, cannot stream {}", path);
            return Err(StorageError::SdUnavailable);
        }
        let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };
        let mut file = self.open_for_read(&path)?;
        let mut buf = vec![0u8; chunk_size];
        let mut total = 0;
        loop {
            let n = file.read(&mut buf).map_err(|err| {
                warn!("read failed for {}: {:?}", path, err);
                StorageError::Io
            })?;
            if n == 0 {
                break;
            }
            sink(&buf[..n]);
            total += n;
        }
        self.direct_reads += 1;
        Ok(total)
    }

    // Cache management

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.cache_used = 0;
    }

    pub fn remove_from_cache(&mut self, path: &str) {
        let path = normalize_path(path);
        self.cache_remove(&path);
    }

    /// Bytes currently held by cached entries.
    pub fn cache_usage(&self) -> usize {
        self.cache_used
    }

    pub fn cache_hits(&self) -> u32 {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> u32 {
        self.cache_misses
    }

    pub fn direct_reads(&self) -> u32 {
        self.direct_reads
    }

    fn cache_remove(&mut self, path: &str) {
        if let Some(entry) = self.cache.remove(path) {
            self.cache_used -= entry.data.len();
        }
    }

    fn add_to_cache(&mut self, path: &str, data: Vec<u8>) {
        if self.cache_size == 0 {
            return;
        }
        if data.len() > self.cache_size {
            debug!(
                "{} ({} bytes) exceeds cache capacity ({} bytes), not caching",
                path,
                data.len(),
                self.cache_size
            );
            return;
        }
        while self.cache_used + data.len() > self.cache_size {
            if !self.evict_oldest() {
                break;
            }
        }
        self.cache_used += data.len();
        self.cache.insert(
            path.to_string(),
            CacheEntry {
                data,
                last_access: self.now_ms,
            },
        );
    }

    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(path, _)| path.clone());
        match oldest {
            Some(path) => {
                debug!("evicting {} from cache", path);
                self.cache_remove(&path);
                true
            }
            None => false,
        }
    }

    fn cleanup_cache(&mut self) {
        while self.cache_used > self.cache_size {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    // SD access

    fn resolve(&self, path: &str) -> Result<String, StorageError> {
        if !is_valid_path(path) {
            warn!("invalid path: '{}'", path);
            return Err(StorageError::InvalidPath);
        }
        Ok(normalize_path(path))
    }

    fn open_for_read(&self, path: &str) -> Result<C::File<'c>, StorageError> {
        match self.card.exists(path) {
            Ok(true) => {}
            Ok(false) => {
                warn!("file not found: {}", path);
                return Err(StorageError::NotFound);
            }
            Err(err) => {
                warn!("stat failed for {}: {:?}", path, err);
                return Err(StorageError::Io);
            }
        }
        self.card.open(path, Mode::Read).map_err(|err| {
            warn!("open failed for {}: {:?}", path, err);
            StorageError::Io
        })
    }

    fn read_from_sd(&mut self, path: &str) -> Result<Vec<u8>, StorageError> {
        if !self.card.is_ready() {
            warn!("SD card not ready, cannot read {}", path);
            return Err(StorageError::SdUnavailable);
        }
        let mut file = self.open_for_read(path)?;
        let mut data = vec![0u8; file.size()];
        file.read_exact(&mut data).map_err(|err| {
            warn!("read failed for {}: {:?}", path, err);
            StorageError::Io
        })?;
        self.direct_reads += 1;
        Ok(data)
    }
}
