//! Mapping firmware images from disk.
//!
//! The image is mapped read-only and stays immutable while the scanners
//! borrow it. Dropping the [`FirmwareImage`] unmaps it.

use error_chain::error_chain;
use log::info;
use memmap2::{Mmap, MmapOptions};
use std::fs::{self, File};
use std::ops::Deref;
use std::path::{Path, PathBuf};

error_chain! {
    errors {
        /// The path could not be inspected
        StatFailed(path: PathBuf, error: std::io::Error) {
            description("Failed to stat image")
            display("failed to stat {:?} ({})", path, error)
        }
        /// The path exists, but is not a file (symlinks are followed)
        NotARegularFile(path: PathBuf) {
            description("Image is not a regular file")
            display("{:?} is not a regular file or a symlink", path)
        }
        /// Opening the file failed
        OpenFailed(path: PathBuf, error: std::io::Error) {
            description("Failed to open image")
            display("failed to open {:?} ({})", path, error)
        }
        /// A zero length file cannot be mapped
        EmptyImage(path: PathBuf) {
            description("Image is empty")
            display("failed to mmap {:?} (file is empty)", path)
        }
        /// Mapping the contents failed
        MapFailed(path: PathBuf, error: std::io::Error) {
            description("Failed to mmap image")
            display("failed to mmap {:?} ({})", path, error)
        }
    }

    skip_msg_variant
}

/// A firmware image mapped into memory.
#[derive(Debug)]
pub struct FirmwareImage {
    path: PathBuf,
    map: Mmap,
}

impl FirmwareImage {
    /// Maps the image at `path` read-only.
    ///
    /// Symlinks are followed. Anything that does not resolve to a non-empty
    /// regular file is refused.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let metadata =
            fs::metadata(path).map_err(|e| ErrorKind::StatFailed(path.to_path_buf(), e))?;
        if !metadata.is_file() {
            return Err(ErrorKind::NotARegularFile(path.to_path_buf()).into());
        }

        let file = File::open(path).map_err(|e| ErrorKind::OpenFailed(path.to_path_buf(), e))?;
        if metadata.len() == 0 {
            return Err(ErrorKind::EmptyImage(path.to_path_buf()).into());
        }

        // SAFETY: the map is private and read-only; the image is not expected
        // to change on disk while it is scanned
        let map = unsafe { MmapOptions::new().len(metadata.len() as usize).map(&file) }
            .map_err(|e| ErrorKind::MapFailed(path.to_path_buf(), e))?;

        info!("Mapped {:?} ({:#x} bytes)", path, map.len());

        Ok(FirmwareImage {
            path: path.to_path_buf(),
            map,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }
}

impl Deref for FirmwareImage {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}
