//! Debug-information assembly.
//!
//! This module collects the named DWARF sections of a container into a self-contained
//! [`DwarfInfo`] bundle for a downstream DWARF consumer. It does not interpret DWARF; it
//! only locates, copies, relocates and decompresses byte ranges.
//!
//! # Assembly
//!
//! 1. If the container has a `.zdebug_info` section, every role except `.eh_frame` is
//!    looked up under its compressed name (`.zdebug_*`). `.eh_frame` is loaded into the
//!    process image and is never compressed.
//! 2. Each present section is copied into an owned buffer, so later relocation or
//!    decompression never touches the container's bytes.
//! 3. If requested, relocations targeting the section are applied to the copy.
//! 4. Sections found under a compressed name are inflated (see [`decompress`]).
//!
//! Missing sections leave their slot empty.
//!
//! # Examples
//!
//! ```rust,no_run
//! use binscope::{dwarf::DebugSection, BinaryFile, Object};
//! use std::path::Path;
//!
//! let object = Object::from_file(Path::new("module.wasm"))?;
//! if object.has_dwarf_info()? {
//!     let dwarf = object.dwarf_info(false)?;
//!     if let Some(info) = dwarf.section(DebugSection::Info) {
//!         println!("{} bytes of .debug_info", info.size);
//!     }
//! }
//! # Ok::<(), binscope::Error>(())
//! ```

pub mod decompress;

use strum::{EnumCount, EnumIter, IntoEnumIterator};
use tracing::debug;

pub use decompress::decompress;

use crate::{object::BinaryFile, Result};

/// Logical role of a debug section within the bundle, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum DebugSection {
    /// `.debug_info`
    Info,
    /// `.debug_aranges`
    Aranges,
    /// `.debug_abbrev`
    Abbrev,
    /// `.debug_str`
    Str,
    /// `.debug_line`
    Line,
    /// `.debug_frame`
    Frame,
    /// `.debug_loc`
    Loc,
    /// `.debug_ranges`
    Ranges,
    /// `.debug_pubtypes`
    Pubtypes,
    /// `.debug_pubnames`
    Pubnames,
    /// `.eh_frame`
    EhFrame,
}

impl DebugSection {
    /// Section name under the canonical convention.
    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        match self {
            DebugSection::Info => ".debug_info",
            DebugSection::Aranges => ".debug_aranges",
            DebugSection::Abbrev => ".debug_abbrev",
            DebugSection::Str => ".debug_str",
            DebugSection::Line => ".debug_line",
            DebugSection::Frame => ".debug_frame",
            DebugSection::Loc => ".debug_loc",
            DebugSection::Ranges => ".debug_ranges",
            DebugSection::Pubtypes => ".debug_pubtypes",
            DebugSection::Pubnames => ".debug_pubnames",
            DebugSection::EhFrame => ".eh_frame",
        }
    }

    /// Section name under the `.zdebug` convention; `None` for `.eh_frame`.
    #[must_use]
    pub fn compressed_name(self) -> Option<&'static str> {
        match self {
            DebugSection::Info => Some(".zdebug_info"),
            DebugSection::Aranges => Some(".zdebug_aranges"),
            DebugSection::Abbrev => Some(".zdebug_abbrev"),
            DebugSection::Str => Some(".zdebug_str"),
            DebugSection::Line => Some(".zdebug_line"),
            DebugSection::Frame => Some(".zdebug_frame"),
            DebugSection::Loc => Some(".zdebug_loc"),
            DebugSection::Ranges => Some(".zdebug_ranges"),
            DebugSection::Pubtypes => Some(".zdebug_pubtypes"),
            DebugSection::Pubnames => Some(".zdebug_pubnames"),
            DebugSection::EhFrame => None,
        }
    }

    /// The name to look up, given whether the container uses compressed names.
    #[must_use]
    pub fn lookup_name(self, compressed: bool) -> &'static str {
        match self.compressed_name() {
            Some(name) if compressed => name,
            _ => self.canonical_name(),
        }
    }
}

/// One assembled debug section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSectionDescriptor {
    /// Name the section was found under
    pub name: String,
    /// Owned copy of the (relocated, decompressed) contents
    pub data: Vec<u8>,
    /// File offset of the section in the container
    pub global_offset: u64,
    /// Size of `data`
    pub size: u64,
    /// Virtual address of the section; `0` for module-family containers
    pub address: u64,
}

/// Addressing model handed to the DWARF consumer alongside the sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwarfConfig {
    /// Byte order of the debug data
    pub little_endian: bool,
    /// Address size in bytes when a compilation unit does not state one
    pub default_address_size: u8,
    /// Target architecture name
    pub machine_arch: &'static str,
}

/// The assembled debug-information bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwarfInfo {
    config: DwarfConfig,
    compressed: bool,
    sections: Vec<Option<DebugSectionDescriptor>>,
}

impl DwarfInfo {
    /// The addressing model.
    #[must_use]
    pub fn config(&self) -> &DwarfConfig {
        &self.config
    }

    /// Returns `true` if the sections were found under `.zdebug` names.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The section filling `role`, if the container has one.
    #[must_use]
    pub fn section(&self, role: DebugSection) -> Option<&DebugSectionDescriptor> {
        self.sections.get(role as usize).and_then(Option::as_ref)
    }

    /// All present sections in canonical order.
    pub fn sections(&self) -> impl Iterator<Item = (DebugSection, &DebugSectionDescriptor)> {
        DebugSection::iter()
            .zip(self.sections.iter())
            .filter_map(|(role, section)| section.as_ref().map(|section| (role, section)))
    }
}

/// Returns `true` if `file` has `.debug_info`, `.zdebug_info` or `.eh_frame`.
pub(crate) fn has_dwarf_info<F: BinaryFile + ?Sized>(file: &F) -> Result<bool> {
    for name in [".debug_info", ".zdebug_info", ".eh_frame"] {
        if file.section_by_name(name)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn uses_compressed_names<F: BinaryFile + ?Sized>(file: &F) -> Result<bool> {
    Ok(file.section_by_name(".zdebug_info")?.is_some())
}

/// Assemble the slot for one role.
pub(crate) fn dwarf_section<F: BinaryFile + ?Sized>(
    file: &F,
    role: DebugSection,
    relocate: bool,
) -> Result<Option<DebugSectionDescriptor>> {
    read_debug_section(file, role, relocate, uses_compressed_names(file)?)
}

/// Assemble the full bundle.
pub(crate) fn dwarf_info<F: BinaryFile + ?Sized>(file: &F, relocate: bool) -> Result<DwarfInfo> {
    let compressed = uses_compressed_names(file)?;

    let sections = DebugSection::iter()
        .map(|role| read_debug_section(file, role, relocate, compressed))
        .collect::<Result<Vec<_>>>()?;
    debug_assert_eq!(sections.len(), DebugSection::COUNT);

    debug!(
        compressed,
        relocate,
        present = sections.iter().flatten().count(),
        "assembled debug information"
    );

    Ok(DwarfInfo {
        config: file.dwarf_config(),
        compressed,
        sections,
    })
}

fn read_debug_section<F: BinaryFile + ?Sized>(
    file: &F,
    role: DebugSection,
    relocate: bool,
    compressed: bool,
) -> Result<Option<DebugSectionDescriptor>> {
    let name = role.lookup_name(compressed);
    let Some(section) = file.section_by_name(name)? else {
        return Ok(None);
    };

    file.options().check_section_size(section.size())?;
    let mut descriptor = DebugSectionDescriptor {
        name: section.name.clone(),
        data: section.data().to_vec(),
        global_offset: section.offset,
        size: section.size(),
        address: section.address,
    };

    if relocate {
        if let Some(relocations) = file.find_relocations_for(&section)? {
            file.apply(&mut descriptor.data, &relocations)?;
        }
    }

    if compressed && role.compressed_name().is_some() {
        descriptor = decompress(&descriptor, file.options())?;
    }

    Ok(Some(descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(DebugSection::COUNT, 11);
        assert_eq!(DebugSection::Info.lookup_name(true), ".zdebug_info");
        assert_eq!(DebugSection::Pubnames.lookup_name(false), ".debug_pubnames");
        assert_eq!(DebugSection::EhFrame.lookup_name(true), ".eh_frame");

        for role in DebugSection::iter() {
            if let Some(compressed) = role.compressed_name() {
                assert_eq!(
                    compressed,
                    format!(".z{}", &role.canonical_name()[1..])
                );
            }
        }
    }

    #[test]
    fn bundle_lookup() {
        let mut sections = vec![None; DebugSection::COUNT];
        sections[DebugSection::Line as usize] = Some(DebugSectionDescriptor {
            name: ".debug_line".to_string(),
            data: vec![1, 2],
            global_offset: 8,
            size: 2,
            address: 0,
        });
        let info = DwarfInfo {
            config: DwarfConfig {
                little_endian: true,
                default_address_size: 4,
                machine_arch: "wasm32",
            },
            compressed: false,
            sections,
        };

        assert!(info.section(DebugSection::Info).is_none());
        assert_eq!(info.section(DebugSection::Line).unwrap().size, 2);
        let present: Vec<_> = info.sections().map(|(role, _)| role).collect();
        assert_eq!(present, vec![DebugSection::Line]);
    }
}
