//! The family-independent view of a container.
//!
//! [`BinaryFile`] is the read-only interface both families implement: section access by
//! index and name, the machine description, and debug-information assembly. [`Object`]
//! picks the family from the magic prologue and forwards to the concrete container.
//!
//! # Examples
//!
//! ```rust,no_run
//! use binscope::{BinaryFile, Object};
//! use std::path::Path;
//!
//! let object = Object::from_file(Path::new("a.out"))?;
//! println!("{} with {} sections", object.machine_arch(), object.num_sections());
//! if let Some(section) = object.section_by_name(".debug_line")? {
//!     println!(".debug_line: {} bytes at {:#x}", section.size(), section.offset);
//! }
//! # Ok::<(), binscope::Error>(())
//! ```

pub mod section;

use std::path::Path;

use crate::{
    dwarf::{self, DebugSection, DebugSectionDescriptor, DwarfConfig, DwarfInfo},
    elf::{relocation::RelocationResolver, ElfFile},
    file::{
        identify::{identify, Family},
        open_file, open_mem,
        options::LoadOptions,
        Backend,
    },
    object::section::Section,
    wasm::WasmFile,
    Result,
};

/// Read-only access shared by both container families.
pub trait BinaryFile: RelocationResolver {
    /// Number of sections reachable by index.
    fn num_sections(&self) -> usize;

    /// Materialise section `index`.
    ///
    /// # Errors
    /// Returns an error if the section cannot be decoded.
    fn section(&self, index: usize) -> Result<Section<'_>>;

    /// Find a section by name.
    ///
    /// # Errors
    /// Returns an error if the tables needed for the lookup cannot be decoded.
    fn section_by_name(&self, name: &str) -> Result<Option<Section<'_>>>;

    /// Number of program segments; always `0` for the module family.
    fn num_segments(&self) -> usize;

    /// Display name of the target architecture.
    fn machine_arch(&self) -> &'static str;

    /// Addressing model for the DWARF consumer.
    fn dwarf_config(&self) -> DwarfConfig;

    /// The options the container was loaded with.
    fn options(&self) -> &LoadOptions;

    /// Returns `true` if the container has `.debug_info`, `.zdebug_info` or `.eh_frame`.
    ///
    /// This only probes for the names; nothing is validated.
    ///
    /// # Errors
    /// Returns an error if a name lookup fails.
    fn has_dwarf_info(&self) -> Result<bool> {
        dwarf::has_dwarf_info(self)
    }

    /// Assemble the debug-information bundle, applying relocations if `relocate` is set.
    ///
    /// # Errors
    /// Fails as a whole if any present section fails to copy, relocate or decompress; use
    /// [`BinaryFile::dwarf_section`] to retrieve the intact slots individually.
    fn dwarf_info(&self, relocate: bool) -> Result<DwarfInfo> {
        dwarf::dwarf_info(self, relocate)
    }

    /// Assemble the section filling a single `role`.
    ///
    /// # Errors
    /// Returns an error if this section fails to copy, relocate or decompress.
    fn dwarf_section(
        &self,
        role: DebugSection,
        relocate: bool,
    ) -> Result<Option<DebugSectionDescriptor>> {
        dwarf::dwarf_section(self, role, relocate)
    }
}

/// A container of either family.
pub enum Object {
    /// Segmented family
    Elf(ElfFile),
    /// Module family
    Wasm(WasmFile),
}

impl Object {
    /// Memory-map `path` and load it with default [`LoadOptions`].
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the magic matches neither family, and the
    /// family's load errors otherwise.
    pub fn from_file(path: &Path) -> Result<Object> {
        Self::from_file_with_options(path, LoadOptions::default())
    }

    /// Memory-map `path` and load it.
    ///
    /// # Errors
    /// See [`Object::from_file`].
    pub fn from_file_with_options(path: &Path, options: LoadOptions) -> Result<Object> {
        Self::load(open_file(path, &options)?, options)
    }

    /// Load from an owned buffer with default [`LoadOptions`].
    ///
    /// # Errors
    /// See [`Object::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<Object> {
        Self::from_mem_with_options(data, LoadOptions::default())
    }

    /// Load from an owned buffer.
    ///
    /// # Errors
    /// See [`Object::from_file`].
    pub fn from_mem_with_options(data: Vec<u8>, options: LoadOptions) -> Result<Object> {
        Self::load(open_mem(data, &options)?, options)
    }

    fn load(backend: Box<dyn Backend>, options: LoadOptions) -> Result<Object> {
        match identify(backend.data())?.family {
            Family::Segmented => Ok(Object::Elf(ElfFile::load(backend, options)?)),
            Family::Module => Ok(Object::Wasm(WasmFile::load(backend, options)?)),
        }
    }

    /// The container family.
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Object::Elf(_) => Family::Segmented,
            Object::Wasm(_) => Family::Module,
        }
    }

    /// The ELF container, if this is one.
    #[must_use]
    pub fn as_elf(&self) -> Option<&ElfFile> {
        match self {
            Object::Elf(elf) => Some(elf),
            Object::Wasm(_) => None,
        }
    }

    /// The wasm module, if this is one.
    #[must_use]
    pub fn as_wasm(&self) -> Option<&WasmFile> {
        match self {
            Object::Wasm(wasm) => Some(wasm),
            Object::Elf(_) => None,
        }
    }

    fn inner(&self) -> &dyn BinaryFile {
        match self {
            Object::Elf(elf) => elf,
            Object::Wasm(wasm) => wasm,
        }
    }

    /// Iterate all sections reachable by index.
    pub fn sections(&self) -> impl Iterator<Item = Result<Section<'_>>> + '_ {
        (0..self.num_sections()).map(move |index| self.section(index))
    }

    /// File offsets at which load segments map `[start, start + size)`.
    ///
    /// Always empty for the module family, which has no segments.
    pub fn address_offsets(
        &self,
        start: u64,
        size: u64,
    ) -> Box<dyn Iterator<Item = Result<u64>> + '_> {
        match self {
            Object::Elf(elf) => Box::new(elf.address_offsets(start, size)),
            Object::Wasm(_) => Box::new(std::iter::empty()),
        }
    }
}

impl RelocationResolver for Object {
    fn find_relocations_for(&self, section: &Section<'_>) -> Result<Option<Section<'_>>> {
        self.inner().find_relocations_for(section)
    }

    fn apply(&self, stream: &mut [u8], reloc_section: &Section<'_>) -> Result<()> {
        self.inner().apply(stream, reloc_section)
    }
}

impl BinaryFile for Object {
    fn num_sections(&self) -> usize {
        self.inner().num_sections()
    }

    fn section(&self, index: usize) -> Result<Section<'_>> {
        self.inner().section(index)
    }

    fn section_by_name(&self, name: &str) -> Result<Option<Section<'_>>> {
        self.inner().section_by_name(name)
    }

    fn num_segments(&self) -> usize {
        self.inner().num_segments()
    }

    fn machine_arch(&self) -> &'static str {
        self.inner().machine_arch()
    }

    fn dwarf_config(&self) -> DwarfConfig {
        self.inner().dwarf_config()
    }

    fn options(&self) -> &LoadOptions {
        self.inner().options()
    }
}

impl BinaryFile for ElfFile {
    fn num_sections(&self) -> usize {
        ElfFile::num_sections(self)
    }

    fn section(&self, index: usize) -> Result<Section<'_>> {
        ElfFile::section(self, index)
    }

    fn section_by_name(&self, name: &str) -> Result<Option<Section<'_>>> {
        ElfFile::section_by_name(self, name)
    }

    fn num_segments(&self) -> usize {
        ElfFile::num_segments(self)
    }

    fn machine_arch(&self) -> &'static str {
        ElfFile::machine_arch(self)
    }

    fn dwarf_config(&self) -> DwarfConfig {
        ElfFile::dwarf_config(self)
    }

    fn options(&self) -> &LoadOptions {
        ElfFile::options(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::{ElfBuilder, SectionSpec, WasmBuilder},
        Error,
    };

    #[test]
    fn dispatch_by_magic() {
        let wasm = Object::from_mem(WasmBuilder::new().custom("name", b"x").build()).unwrap();
        assert_eq!(wasm.family(), Family::Module);
        assert_eq!(wasm.machine_arch(), "wasm32");
        assert!(wasm.as_wasm().is_some());
        assert_eq!(wasm.address_offsets(0, 1).count(), 0);

        let elf = Object::from_mem(
            ElfBuilder::new64()
                .section(SectionSpec::progbits(".debug_info", vec![7; 3]))
                .build(),
        )
        .unwrap();
        assert_eq!(elf.family(), Family::Segmented);
        assert_eq!(elf.machine_arch(), "x64");
        assert!(elf.as_elf().is_some());
        assert_eq!(elf.sections().count(), 3);
        assert!(elf.has_dwarf_info().unwrap());
    }

    #[test]
    fn unknown_magic() {
        assert!(matches!(
            Object::from_mem(b"MZ\x90\0\x03\0\0\0".to_vec()),
            Err(Error::NotSupported)
        ));
        assert!(matches!(Object::from_mem(Vec::new()), Err(Error::Empty)));
    }

    #[test]
    fn file_size_limit() {
        let options = LoadOptions {
            max_file_size: 8,
            ..LoadOptions::default()
        };
        let data = WasmBuilder::new().custom(".debug_info", &[0; 16]).build();
        assert!(matches!(
            Object::from_mem_with_options(data, options),
            Err(Error::LimitExceeded { what: "file", .. })
        ));
    }
}
