//! Byte sources and low-level decoding primitives.
//!
//! This module abstracts over where container bytes come from and provides the primitives
//! every family-specific loader builds on.
//!
//! # Key Components
//!
//! ## Data Sources
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//! - [`crate::file::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::Memory`] - In-memory buffer backend
//!
//! ## Decoding
//! - [`crate::file::parser::Parser`] - Cursor with LEB128 varint and string decoding
//! - [`crate::file::io`] - Endian-aware fixed-width reads and writes
//! - [`crate::file::identify`] - Prologue-based layout family detection
//!
//! ## Configuration
//! - [`crate::file::options::LoadOptions`] - Allocation bounds and duplicate-name policy
//!
//! # Examples
//!
//! ```rust
//! use binscope::file::{Backend, Memory};
//!
//! let memory = Memory::new(b"\0asm\x01\0\0\0".to_vec());
//! assert_eq!(memory.data_slice(0, 4)?, b"\0asm");
//! # Ok::<(), binscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Backends are `Send + Sync` and only ever read. A container owns its backend exclusively;
//! derived views borrow from it immutably.

pub mod identify;
pub mod io;
pub mod options;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

pub use memory::Memory;
pub use physical::Physical;

use crate::{file::options::LoadOptions, Error::Empty, Result};

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of container data, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the backend holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory-map `path` and validate it against `options`.
pub(crate) fn open_file(path: &Path, options: &LoadOptions) -> Result<Box<dyn Backend>> {
    check_backend(Box::new(Physical::new(path)?), options)
}

/// Wrap an owned buffer and validate it against `options`.
pub(crate) fn open_mem(data: Vec<u8>, options: &LoadOptions) -> Result<Box<dyn Backend>> {
    check_backend(Box::new(Memory::new(data)), options)
}

fn check_backend(backend: Box<dyn Backend>, options: &LoadOptions) -> Result<Box<dyn Backend>> {
    if backend.is_empty() {
        return Err(Empty);
    }
    options.check_file_size(backend.len())?;

    Ok(backend)
}

/// Convert a 64-bit file quantity into an in-memory index.
pub(crate) fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| out_of_bounds_error!())
}
