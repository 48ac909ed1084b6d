//! SD card stand-in backed by a directory on the host filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sdgfx_core::sd::{File, Mode, SdCard};

pub struct DirSdCard {
    root: PathBuf,
    mount: String,
}

impl DirSdCard {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let mount = root.to_string_lossy().into_owned();
        Self { root, mount }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

pub struct DirFile {
    inner: fs::File,
    len: usize,
}

impl embedded_io::ErrorType for DirSdCard {
    type Error = io::Error;
}

impl embedded_io::ErrorType for DirFile {
    type Error = io::Error;
}

impl embedded_io::Read for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.inner, buf)
    }
}

impl embedded_io::Write for DirFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut self.inner, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.inner)
    }
}

impl embedded_io::Seek for DirFile {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> io::Result<u64> {
        let pos = match pos {
            embedded_io::SeekFrom::Start(offset) => io::SeekFrom::Start(offset),
            embedded_io::SeekFrom::End(offset) => io::SeekFrom::End(offset),
            embedded_io::SeekFrom::Current(offset) => io::SeekFrom::Current(offset),
        };
        io::Seek::seek(&mut self.inner, pos)
    }
}

impl File for DirFile {
    fn size(&self) -> usize {
        self.len
    }
}

impl SdCard for DirSdCard {
    type File<'a>
        = DirFile
    where
        Self: 'a;

    fn is_ready(&self) -> bool {
        self.root.is_dir()
    }

    fn mount_path(&self) -> &str {
        &self.mount
    }

    fn open(&self, path: &str, mode: Mode) -> io::Result<DirFile> {
        let full = self.resolve(path);
        let (inner, len) = match mode {
            Mode::Read => {
                let file = fs::File::open(&full)?;
                let len = file.metadata()?.len() as usize;
                (file, len)
            }
            Mode::Write => (fs::File::create(&full)?, 0),
            Mode::ReadWrite => {
                let file = fs::OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&full)?;
                let len = file.metadata()?.len() as usize;
                (file, len)
            }
        };
        Ok(DirFile { inner, len })
    }

    fn exists(&self, path: &str) -> io::Result<bool> {
        Ok(self.resolve(path).is_file())
    }

    fn size(&self, path: &str) -> io::Result<usize> {
        Ok(fs::metadata(self.resolve(path))?.len() as usize)
    }
}
