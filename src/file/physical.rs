//! Physical file backend for memory-mapped I/O.
//!
//! This module provides the [`crate::file::physical::Physical`] backend that implements the
//! [`crate::file::Backend`] trait for files on disk. The file is mapped read-only, so section
//! and segment views can borrow windows directly from the mapping without reading the whole
//! container up front; pages are faulted in as the table walkers touch them.
//!
//! The mapping is exclusively owned by the container that created it. Callers that want to
//! inspect the same file from several threads should open one container per thread.

use super::Backend;
use crate::{
    Error::{Error, FileError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for efficient access to files on disk.
///
/// # Examples
///
/// ```rust,ignore
/// use binscope::file::{Physical, Backend};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("module.wasm"))?;
/// assert_eq!(physical.data_slice(0, 4)?, b"\0asm");
/// # Ok::<(), binscope::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the container on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        Self::from_std_file(&file)
    }

    /// Creates a new physical file backend from an opened [`std::fs::File`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] if memory mapping fails.
    pub fn from_std_file(file: &fs::File) -> Result<Physical> {
        // SAFETY: the mapping is read-only; concurrent truncation of the underlying file by
        // another process is outside of what this crate can guard against.
        let mmap = unsafe { Mmap::map(file) }.map_err(|error| Error(error.to_string()))?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("binscope_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn physical() {
        let path = temp_file("physical.bin", b"\0asm\x01\0\0\0tail");
        let physical = Physical::new(&path).unwrap();

        assert_eq!(physical.len(), 12);
        assert_eq!(physical.data_slice(0, 4).unwrap(), b"\0asm");
        assert_eq!(physical.data_slice(8, 4).unwrap(), b"tail");
        assert!(physical.data_slice(9, 4).is_err());
        assert!(physical.data_slice(usize::MAX, 1).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn physical_invalid_file_path() {
        let result = Physical::new("/nonexistent/path/to/module.wasm");
        match result {
            Err(FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn physical_empty_file() {
        let path = temp_file("empty.bin", b"");

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 0);
        assert!(physical.data_slice(0, 1).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(physical.data_slice(0, 0).unwrap(), empty_slice);

        fs::remove_file(&path).unwrap();
    }
}
