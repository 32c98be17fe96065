//! Load configuration.
//!
//! Containers are frequently attacker-controlled. Declared sizes in a header or chunk prefix
//! are never trusted for allocation on their own; these options bound what a single load may
//! allocate and decide how ambiguous module layouts are handled.

use crate::{Error::LimitExceeded, Result};

/// How the module family treats two custom sections carrying the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The later section replaces the earlier one in the name index
    #[default]
    Overwrite,
    /// Loading fails with [`crate::Error::Malformed`]
    Reject,
}

/// Configuration for loading a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Largest input accepted, in bytes (default: 4 GiB)
    pub max_file_size: u64,

    /// Largest single debug section copy or decompressed output, in bytes (default: 1 GiB)
    pub max_section_size: u64,

    /// Handling of duplicate custom-section names in the module family
    pub duplicate_custom_sections: DuplicatePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_file_size: 4 << 30,
            max_section_size: 1 << 30,
            duplicate_custom_sections: DuplicatePolicy::Overwrite,
        }
    }
}

impl LoadOptions {
    /// Tight limits for untrusted input: 256 MiB files, 64 MiB sections, duplicate names rejected.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_file_size: 256 << 20,
            max_section_size: 64 << 20,
            duplicate_custom_sections: DuplicatePolicy::Reject,
        }
    }

    /// No size limits; duplicate names overwrite.
    ///
    /// **Warning**: Only use with inputs you trust.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_file_size: u64::MAX,
            max_section_size: u64::MAX,
            duplicate_custom_sections: DuplicatePolicy::Overwrite,
        }
    }

    /// Ensure an input of `size` bytes may be loaded.
    ///
    /// # Errors
    /// Returns [`crate::Error::LimitExceeded`] if `size` exceeds `max_file_size`.
    pub fn check_file_size(&self, size: usize) -> Result<()> {
        check("file", size as u64, self.max_file_size)
    }

    /// Ensure a section buffer of `size` bytes may be allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::LimitExceeded`] if `size` exceeds `max_section_size`.
    pub fn check_section_size(&self, size: u64) -> Result<()> {
        check("section", size, self.max_section_size)
    }
}

fn check(what: &'static str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(LimitExceeded { what, size, limit });
    }
    Ok(())
}
