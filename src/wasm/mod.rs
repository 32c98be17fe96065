//! Module container family (WebAssembly).
//!
//! A module is the magic `\0asm`, a 4-byte version, then a flat sequence of chunks:
//!
//! | Field   | Encoding         |
//! |---------|------------------|
//! | kind    | ULEB128          |
//! | size    | ULEB128          |
//! | payload | `size` bytes     |
//!
//! [`WasmFile`] walks the chunks exactly once at load time and buckets them by
//! [`WasmSectionKind`]. Custom chunks (kind `0`) further split into a length-prefixed name
//! and raw data, and are indexed by that name; this index is the only section lookup the
//! debug-information path uses, since DWARF always travels in custom sections.
//!
//! # Examples
//!
//! ```rust
//! use binscope::{BinaryFile, WasmFile};
//!
//! // magic, version 1, custom section ".debug_str" holding "main\0"
//! let mut module = b"\0asm\x01\0\0\0".to_vec();
//! module.extend_from_slice(&[0x00, 0x10, 0x0A]);
//! module.extend_from_slice(b".debug_strmain\0");
//!
//! let wasm = WasmFile::from_mem(module)?;
//! let section = wasm.section_by_name(".debug_str").unwrap();
//! assert_eq!(section.data(), b"main\0");
//! assert_eq!(section.address, 0);
//! # Ok::<(), binscope::Error>(())
//! ```

use std::{collections::HashMap, path::Path};

use strum::{EnumCount, EnumIter, FromRepr};
use tracing::{debug, trace, warn};

use crate::{
    dwarf::DwarfConfig,
    elf::relocation::RelocationResolver,
    file::{
        identify::{identify, Family, WASM_MAGIC, WASM_VERSION_SIZE},
        io::read_le,
        open_file, open_mem,
        options::{DuplicatePolicy, LoadOptions},
        parser::Parser,
        to_usize, Backend,
    },
    object::{section::Section, BinaryFile},
    Error::NotSupported,
    Result,
};

/// Chunk kinds of the module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum WasmSectionKind {
    /// Named custom (user) section
    Custom = 0,
    /// Function signatures
    Type = 1,
    /// Imports
    Import = 2,
    /// Function declarations
    Function = 3,
    /// Tables
    Table = 4,
    /// Linear memories
    Memory = 5,
    /// Globals
    Global = 6,
    /// Exports
    Export = 7,
    /// Start function
    Start = 8,
    /// Element segments
    Element = 9,
    /// Function bodies
    Code = 10,
    /// Data segments
    Data = 11,
    /// Data segment count
    DataCount = 12,
    /// Exception tags (formerly events)
    Event = 13,
}

/// Location of one chunk's payload within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasmChunk {
    /// Chunk kind
    pub kind: WasmSectionKind,
    /// File offset of the first payload byte
    pub offset: usize,
    /// Payload size in bytes
    pub size: usize,
}

#[derive(Debug, Clone)]
struct CustomSection {
    name: String,
    offset: usize,
    size: usize,
}

/// A loaded WebAssembly module.
pub struct WasmFile {
    backend: Box<dyn Backend>,
    version: u32,
    chunks: Vec<Vec<WasmChunk>>,
    custom: Vec<CustomSection>,
    names: HashMap<String, usize>,
    options: LoadOptions,
}

impl WasmFile {
    /// Memory-map and load the module at `path` with default [`LoadOptions`].
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the file is not a wasm module, and
    /// [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] if the chunk walk fails.
    pub fn from_file(path: &Path) -> Result<WasmFile> {
        Self::from_file_with_options(path, LoadOptions::default())
    }

    /// Memory-map and load the module at `path`.
    ///
    /// # Errors
    /// See [`WasmFile::from_file`].
    pub fn from_file_with_options(path: &Path, options: LoadOptions) -> Result<WasmFile> {
        Self::load(open_file(path, &options)?, options)
    }

    /// Load a module from an owned buffer with default [`LoadOptions`].
    ///
    /// # Errors
    /// See [`WasmFile::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<WasmFile> {
        Self::from_mem_with_options(data, LoadOptions::default())
    }

    /// Load a module from an owned buffer.
    ///
    /// # Errors
    /// See [`WasmFile::from_file`].
    pub fn from_mem_with_options(data: Vec<u8>, options: LoadOptions) -> Result<WasmFile> {
        Self::load(open_mem(data, &options)?, options)
    }

    pub(crate) fn load(backend: Box<dyn Backend>, options: LoadOptions) -> Result<WasmFile> {
        let identity = identify(backend.data())?;
        if identity.family != Family::Module {
            return Err(NotSupported);
        }

        let mut file = WasmFile {
            version: read_le::<u32>(&identity.prologue)?,
            chunks: vec![Vec::new(); WasmSectionKind::COUNT],
            custom: Vec::new(),
            names: HashMap::new(),
            backend,
            options,
        };
        file.walk_chunks()?;
        file.index_custom_sections()?;

        debug!(
            version = file.version,
            chunks = file.chunks.iter().map(Vec::len).sum::<usize>(),
            custom = file.custom.len(),
            "loaded wasm module"
        );

        Ok(file)
    }

    fn walk_chunks(&mut self) -> Result<()> {
        let mut parser = Parser::new(self.backend.data());
        parser.seek(WASM_MAGIC.len() + WASM_VERSION_SIZE)?;

        while parser.has_more_data() {
            let code = parser.read_uleb128()?;
            let size = to_usize(parser.read_uleb128()?)?;
            let offset = parser.pos();
            parser.advance_by(size)?;

            let kind = u8::try_from(code)
                .ok()
                .and_then(WasmSectionKind::from_repr)
                .ok_or_else(|| malformed_error!("Unknown module section kind {}", code))?;

            trace!(?kind, offset, size, "module chunk");
            self.chunks[kind as usize].push(WasmChunk { kind, offset, size });
        }

        Ok(())
    }

    fn index_custom_sections(&mut self) -> Result<()> {
        let data = self.backend.data();

        for chunk in &self.chunks[WasmSectionKind::Custom as usize] {
            let mut parser = Parser::new(&data[chunk.offset..chunk.offset + chunk.size]);
            let name = parser.read_prefixed_string_utf8()?;
            let section = CustomSection {
                offset: chunk.offset + parser.pos(),
                size: parser.remaining(),
                name,
            };

            match self.names.get(&section.name) {
                Some(&index) => match self.options.duplicate_custom_sections {
                    DuplicatePolicy::Overwrite => {
                        warn!(
                            name = %section.name,
                            offset = section.offset,
                            "duplicate custom section replaces an earlier one"
                        );
                        self.custom[index] = section;
                    }
                    DuplicatePolicy::Reject => {
                        return Err(malformed_error!(
                            "Duplicate custom section {}",
                            section.name
                        ));
                    }
                },
                None => {
                    self.names.insert(section.name.clone(), self.custom.len());
                    self.custom.push(section);
                }
            }
        }

        Ok(())
    }

    /// The module format version following the magic.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The options this module was loaded with.
    #[must_use]
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The complete file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// All chunks of `kind`, in file order. Custom chunks appear here even when their
    /// name was later overwritten in the name index.
    #[must_use]
    pub fn chunks(&self, kind: WasmSectionKind) -> &[WasmChunk] {
        &self.chunks[kind as usize]
    }

    /// Payload bytes of `chunk`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `chunk` does not belong to this module.
    pub fn chunk_data(&self, chunk: &WasmChunk) -> Result<&[u8]> {
        self.backend.data_slice(chunk.offset, chunk.size)
    }

    /// Number of uniquely named custom sections.
    #[must_use]
    pub fn num_sections(&self) -> usize {
        self.custom.len()
    }

    fn make_section(&self, index: usize) -> Result<Section<'_>> {
        let entry = self.custom.get(index).ok_or_else(|| out_of_bounds_error!())?;
        Ok(Section::custom(
            index,
            entry.name.clone(),
            entry.offset as u64,
            self.backend.data_slice(entry.offset, entry.size)?,
        ))
    }

    /// Custom section `index`, in order of first appearance of its name.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the last custom section.
    pub fn section(&self, index: usize) -> Result<Section<'_>> {
        self.make_section(index)
    }

    /// The custom section called `name`. With duplicate names, the last one in the file.
    #[must_use]
    pub fn section_by_name(&self, name: &str) -> Option<Section<'_>> {
        let index = *self.names.get(name)?;
        self.make_section(index).ok()
    }

    /// Iterate custom sections in order of first appearance of their names.
    pub fn sections(&self) -> impl Iterator<Item = Section<'_>> + '_ {
        (0..self.custom.len()).filter_map(move |index| self.make_section(index).ok())
    }

    /// Always `wasm32`.
    #[must_use]
    pub fn machine_arch(&self) -> &'static str {
        "wasm32"
    }

    /// The module family has no header field for this; the model is fixed.
    #[must_use]
    pub fn dwarf_config(&self) -> DwarfConfig {
        DwarfConfig {
            little_endian: true,
            default_address_size: 4,
            machine_arch: self.machine_arch(),
        }
    }
}

impl RelocationResolver for WasmFile {
    fn find_relocations_for(&self, _section: &Section<'_>) -> Result<Option<Section<'_>>> {
        Ok(None)
    }

    fn apply(&self, _stream: &mut [u8], _reloc_section: &Section<'_>) -> Result<()> {
        Ok(())
    }
}

impl BinaryFile for WasmFile {
    fn num_sections(&self) -> usize {
        WasmFile::num_sections(self)
    }

    fn section(&self, index: usize) -> Result<Section<'_>> {
        WasmFile::section(self, index)
    }

    fn section_by_name(&self, name: &str) -> Result<Option<Section<'_>>> {
        Ok(WasmFile::section_by_name(self, name))
    }

    fn num_segments(&self) -> usize {
        0
    }

    fn machine_arch(&self) -> &'static str {
        WasmFile::machine_arch(self)
    }

    fn dwarf_config(&self) -> DwarfConfig {
        WasmFile::dwarf_config(self)
    }

    fn options(&self) -> &LoadOptions {
        WasmFile::options(self)
    }
}
