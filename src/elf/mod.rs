//! Segmented container family (ELF).
//!
//! [`ElfFile`] keeps only the parsed file header after loading. Section and program header
//! entries are parsed one at a time, on every access, at `table_offset + index * entry_size`;
//! nothing about entry `i - 1` is needed to read entry `i`. Each access returns a fresh
//! [`Section`] or [`Segment`] borrowing the container's bytes.
//!
//! # Key Components
//!
//! - [`ElfFile`] - The container, with section/segment lookup and address translation
//! - [`segment`] - Segment views and the [`segment::AddressOffsets`] translator
//! - [`strtab`], [`symbols`], [`dynamic`], [`notes`] - Kind-specific views
//! - [`relocation`] - Relocation tables and the [`relocation::RelocationResolver`] seam
//!
//! # Examples
//!
//! ```rust,no_run
//! use binscope::ElfFile;
//! use std::path::Path;
//!
//! let elf = ElfFile::from_file(Path::new("/bin/ls"))?;
//! for section in elf.sections() {
//!     let section = section?;
//!     println!("{:>3} {:<24} {:#x}", section.index, section.name, section.size());
//! }
//!
//! let entry = elf.header().e_entry;
//! let offsets: Vec<u64> = elf.address_offsets(entry, 1).collect::<Result<_, _>>()?;
//! println!("entry point {:#x} lives at file offsets {:x?}", entry, offsets);
//! # Ok::<(), binscope::Error>(())
//! ```

/// `SHT_DYNAMIC` / `PT_DYNAMIC` entries
pub mod dynamic;
pub mod notes;
pub mod relocation;
pub mod segment;
/// String pools
pub mod strtab;
pub mod symbols;

use std::path::Path;

use goblin::{
    container::{Container, Ctx},
    elf::{
        dynamic::{DT_NEEDED, DT_SONAME},
        header::{
            Header, EM_386, EM_AARCH64, EM_ARM, EM_MIPS, EM_PPC, EM_PPC64, EM_RISCV, EM_SPARC,
            EM_SPARCV9, EM_X86_64,
        },
        program_header::{ProgramHeader, PT_DYNAMIC},
        section_header::{
            SectionHeader, SHT_DYNAMIC, SHT_DYNSYM, SHT_GNU_VERDEF, SHT_GNU_VERNEED,
            SHT_GNU_VERSYM, SHT_NOBITS, SHT_NOTE, SHT_NULL, SHT_PROGBITS, SHT_REL, SHT_RELA,
            SHT_STRTAB, SHT_SYMTAB,
        },
        Elf,
    },
};
use tracing::debug;

use crate::{
    dwarf::DwarfConfig,
    elf::{
        dynamic::{DynamicEntry, DynamicIter},
        relocation::RelocationTable,
        segment::{AddressOffsets, Segment},
        strtab::StringTable,
        symbols::SymbolTable,
    },
    file::{
        identify::{identify, Family, WordSize},
        io::Endian,
        open_file, open_mem,
        options::LoadOptions,
        to_usize, Backend,
    },
    object::section::{Section, SectionFlags, SectionKind},
    Error::{NotSupported, UnresolvedLink},
    Result,
};

/// `SHT_SUNW_LDYNSYM`
pub const SHT_SUNW_LDYNSYM: u32 = 0x6fff_fff3;
/// `SHT_SUNW_syminfo`
pub const SHT_SUNW_SYMINFO: u32 = 0x6fff_fffc;
/// `SHT_ARM_ATTRIBUTES`, only meaningful when `e_machine` is `EM_ARM`
pub const SHT_ARM_ATTRIBUTES: u32 = 0x7000_0003;

/// `e_shstrndx` escape: the real index lives in `sh_link` of section 0.
const SHN_XINDEX: u16 = 0xffff;

const SIZEOF_SHDR32: usize = 40;
const SIZEOF_SHDR64: usize = 64;
const SIZEOF_PHDR32: usize = 32;
const SIZEOF_PHDR64: usize = 56;

/// What a linked section index must point at.
#[derive(Debug, Clone, Copy)]
enum LinkTarget {
    Strings,
    Symbols,
}

/// A loaded ELF container.
///
/// Holds the byte source and the strongly typed file header. Section and segment tables
/// are never materialised; see the [module documentation](self).
pub struct ElfFile {
    backend: Box<dyn Backend>,
    header: Header,
    ctx: Ctx,
    endian: Endian,
    word_size: WordSize,
    section_count: usize,
    shstrndx: usize,
    options: LoadOptions,
}

impl ElfFile {
    /// Memory-map and load the ELF file at `path` with default [`LoadOptions`].
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the file is not an ELF container, or a
    /// structural error if the file header cannot be decoded.
    pub fn from_file(path: &Path) -> Result<ElfFile> {
        Self::from_file_with_options(path, LoadOptions::default())
    }

    /// Memory-map and load the ELF file at `path`.
    ///
    /// # Errors
    /// See [`ElfFile::from_file`]; additionally [`crate::Error::LimitExceeded`] if the file is
    /// larger than `options.max_file_size`.
    pub fn from_file_with_options(path: &Path, options: LoadOptions) -> Result<ElfFile> {
        Self::load(open_file(path, &options)?, options)
    }

    /// Load an ELF container from an owned buffer with default [`LoadOptions`].
    ///
    /// # Errors
    /// See [`ElfFile::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<ElfFile> {
        Self::from_mem_with_options(data, LoadOptions::default())
    }

    /// Load an ELF container from an owned buffer.
    ///
    /// # Errors
    /// See [`ElfFile::from_file_with_options`].
    pub fn from_mem_with_options(data: Vec<u8>, options: LoadOptions) -> Result<ElfFile> {
        Self::load(open_mem(data, &options)?, options)
    }

    pub(crate) fn load(backend: Box<dyn Backend>, options: LoadOptions) -> Result<ElfFile> {
        let identity = identify(backend.data())?;
        if identity.family != Family::Segmented {
            return Err(NotSupported);
        }

        let header = Elf::parse_header(backend.data())?;
        let ctx = Ctx {
            container: header.container()?,
            le: header.endianness()?,
        };
        let word_size = match ctx.container {
            Container::Big => WordSize::Bits64,
            Container::Little => WordSize::Bits32,
        };

        let mut file = ElfFile {
            backend,
            header,
            ctx,
            endian: identity.endian,
            word_size,
            section_count: usize::from(header.e_shnum),
            shstrndx: usize::from(header.e_shstrndx),
            options,
        };

        // Extended numbering keeps the real values in the reserved section 0.
        if header.e_shoff != 0 && (header.e_shnum == 0 || header.e_shstrndx == SHN_XINDEX) {
            let first = file.read_section_header(0)?;
            if header.e_shnum == 0 {
                file.section_count = to_usize(first.sh_size)?;
            }
            if header.e_shstrndx == SHN_XINDEX {
                file.shstrndx = first.sh_link as usize;
            }
        }

        debug!(
            class = ?file.word_size,
            endian = ?file.endian,
            machine = file.machine_arch(),
            sections = file.section_count,
            segments = file.header.e_phnum,
            "loaded ELF container"
        );

        Ok(file)
    }

    /// The parsed file header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Byte order of all multi-byte fields.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Word size from `EI_CLASS`.
    #[must_use]
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// The options this container was loaded with.
    #[must_use]
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The complete file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Number of entries in the section header table.
    #[must_use]
    pub fn num_sections(&self) -> usize {
        self.section_count
    }

    /// Number of entries in the program header table.
    #[must_use]
    pub fn num_segments(&self) -> usize {
        usize::from(self.header.e_phnum)
    }

    fn table_entry(
        &self,
        table_offset: u64,
        entry_size: u16,
        min_size: usize,
        index: usize,
    ) -> Result<usize> {
        let entry_size = usize::from(entry_size);
        if entry_size < min_size {
            return Err(malformed_error!(
                "Table entry size {} is smaller than {}",
                entry_size,
                min_size
            ));
        }

        let offset = index
            .checked_mul(entry_size)
            .and_then(|relative| relative.checked_add(to_usize(table_offset).ok()?))
            .ok_or_else(|| out_of_bounds_error!())?;
        match offset.checked_add(min_size) {
            Some(end) if end <= self.backend.len() => Ok(offset),
            _ => Err(out_of_bounds_error!()),
        }
    }

    fn read_section_header(&self, index: usize) -> Result<SectionHeader> {
        let min_size = if self.word_size.is_64() {
            SIZEOF_SHDR64
        } else {
            SIZEOF_SHDR32
        };
        let offset = self.table_entry(
            self.header.e_shoff,
            self.header.e_shentsize,
            min_size,
            index,
        )?;

        SectionHeader::parse_from(self.backend.data(), offset, 1, self.ctx)?
            .pop()
            .ok_or_else(|| malformed_error!("Section header {} could not be parsed", index))
    }

    /// Parse the section header at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the table or the entry lies
    /// outside the file.
    pub fn section_header(&self, index: usize) -> Result<SectionHeader> {
        if index >= self.section_count {
            return Err(out_of_bounds_error!());
        }
        self.read_section_header(index)
    }

    /// Parse the program header at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the table or the entry lies
    /// outside the file.
    pub fn segment_header(&self, index: usize) -> Result<ProgramHeader> {
        if index >= self.num_segments() {
            return Err(out_of_bounds_error!());
        }

        let min_size = if self.word_size.is_64() {
            SIZEOF_PHDR64
        } else {
            SIZEOF_PHDR32
        };
        let offset = self.table_entry(
            self.header.e_phoff,
            self.header.e_phentsize,
            min_size,
            index,
        )?;

        ProgramHeader::parse(self.backend.data(), offset, 1, self.ctx)?
            .pop()
            .ok_or_else(|| malformed_error!("Program header {} could not be parsed", index))
    }

    fn window(&self, offset: u64, size: u64) -> Result<&[u8]> {
        self.backend.data_slice(to_usize(offset)?, to_usize(size)?)
    }

    fn section_names(&self) -> Result<StringTable<'_>> {
        if self.shstrndx == 0 {
            return Ok(StringTable::new(&[]));
        }
        if self.shstrndx >= self.section_count {
            return Err(malformed_error!(
                "Section name table index {} is out of range",
                self.shstrndx
            ));
        }

        let header = self.read_section_header(self.shstrndx)?;
        Ok(StringTable::new(
            self.window(header.sh_offset, header.sh_size)?,
        ))
    }

    /// Check that section `index` may link to `link`, peeking only at the linked header's type.
    fn resolve_link(&self, index: usize, link: usize, target: LinkTarget) -> Result<usize> {
        let unresolved = UnresolvedLink {
            section: index,
            link,
        };
        if link == index || link == 0 || link >= self.section_count {
            return Err(unresolved);
        }

        let linked = self.read_section_header(link)?.sh_type;
        let valid = match target {
            LinkTarget::Strings => linked == SHT_STRTAB,
            LinkTarget::Symbols => matches!(linked, SHT_SYMTAB | SHT_DYNSYM | SHT_SUNW_LDYNSYM),
        };

        if valid {
            Ok(link)
        } else {
            Err(unresolved)
        }
    }

    fn classify(&self, index: usize, header: &SectionHeader, name: &str) -> Result<SectionKind> {
        let link = header.sh_link as usize;

        Ok(match header.sh_type {
            SHT_NULL => SectionKind::Null,
            SHT_STRTAB => SectionKind::StringTable,
            SHT_SYMTAB | SHT_DYNSYM | SHT_SUNW_LDYNSYM => SectionKind::SymbolTable {
                strtab: self.resolve_link(index, link, LinkTarget::Strings)?,
            },
            SHT_SUNW_SYMINFO => SectionKind::SymbolInfo {
                symtab: self.resolve_link(index, link, LinkTarget::Symbols)?,
            },
            SHT_GNU_VERNEED => SectionKind::VersionNeed {
                strtab: self.resolve_link(index, link, LinkTarget::Strings)?,
            },
            SHT_GNU_VERDEF => SectionKind::VersionDef {
                strtab: self.resolve_link(index, link, LinkTarget::Strings)?,
            },
            SHT_GNU_VERSYM => SectionKind::VersionSym {
                symtab: self.resolve_link(index, link, LinkTarget::Symbols)?,
            },
            SHT_REL | SHT_RELA => SectionKind::Relocation {
                addend: header.sh_type == SHT_RELA,
                symtab: if link == 0 {
                    0
                } else {
                    self.resolve_link(index, link, LinkTarget::Symbols)?
                },
                target: header.sh_info as usize,
            },
            SHT_DYNAMIC => SectionKind::Dynamic {
                strtab: self.resolve_link(index, link, LinkTarget::Strings)?,
            },
            SHT_NOTE => SectionKind::Note,
            SHT_NOBITS => SectionKind::NoBits,
            SHT_ARM_ATTRIBUTES if self.header.e_machine == EM_ARM => SectionKind::ArmAttributes,
            SHT_PROGBITS if name == ".stab" => SectionKind::Stab,
            _ => SectionKind::Raw,
        })
    }

    fn make_section<'a>(
        &'a self,
        index: usize,
        header: &SectionHeader,
        names: &StringTable<'a>,
    ) -> Result<Section<'a>> {
        let name = names.get(header.sh_name)?.to_string();
        let kind = self.classify(index, header, &name)?;

        let data: &[u8] = match kind {
            SectionKind::Null | SectionKind::NoBits => &[],
            _ => self.window(header.sh_offset, header.sh_size)?,
        };

        Ok(Section {
            index,
            name,
            kind,
            sh_type: header.sh_type,
            flags: SectionFlags::from_bits_retain(header.sh_flags),
            address: header.sh_addr,
            offset: header.sh_offset,
            link: header.sh_link,
            info: header.sh_info,
            alignment: header.sh_addralign,
            entry_size: header.sh_entsize,
            declared_size: header.sh_size,
            endian: self.endian,
            data,
        })
    }

    /// Materialise section `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or the contents lie outside the
    /// file and [`crate::Error::UnresolvedLink`] if a required linked section has the wrong
    /// type.
    pub fn section(&self, index: usize) -> Result<Section<'_>> {
        let header = self.section_header(index)?;
        let names = self.section_names()?;
        self.make_section(index, &header, &names)
    }

    /// Find the first section called `name`.
    ///
    /// The walk stops at the lowest matching index, so later sections with the same name are
    /// never reached. Only the matching section is materialised; others are inspected by
    /// header and name.
    ///
    /// # Errors
    /// Returns an error if a header or the name table cannot be read, or if the matching
    /// section fails to materialise.
    pub fn section_by_name(&self, name: &str) -> Result<Option<Section<'_>>> {
        let names = self.section_names()?;

        for index in 0..self.section_count {
            let header = self.read_section_header(index)?;
            if names.get(header.sh_name)? == name {
                return self.make_section(index, &header, &names).map(Some);
            }
        }

        Ok(None)
    }

    /// Iterate all sections in table order.
    pub fn sections(&self) -> impl Iterator<Item = Result<Section<'_>>> + '_ {
        (0..self.section_count).map(move |index| self.section(index))
    }

    /// Materialise segment `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or the file-backed contents lie
    /// outside the file.
    pub fn segment(&self, index: usize) -> Result<Segment<'_>> {
        let header = self.segment_header(index)?;
        let data = self.window(header.p_offset, header.p_filesz)?;

        Ok(Segment::new(index, &header, self.ctx, data))
    }

    /// Iterate all segments in table order.
    pub fn segments(&self) -> impl Iterator<Item = Result<Segment<'_>>> + '_ {
        (0..self.num_segments()).map(move |index| self.segment(index))
    }

    /// File offsets at which load segments map `[start, start + size)`.
    ///
    /// Yields one offset per `PT_LOAD` segment whose file-backed range contains the whole
    /// address range, in table order. Other segment types are never consulted.
    #[must_use]
    pub fn address_offsets(&self, start: u64, size: u64) -> AddressOffsets<'_> {
        AddressOffsets::new(self, start, size)
    }

    /// The string table linked from `section`, or `section` itself if it is a string table.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for section kinds that do not reference strings.
    pub fn string_table<'a>(&'a self, section: &Section<'a>) -> Result<StringTable<'a>> {
        match section.kind {
            SectionKind::StringTable => Ok(StringTable::new(section.data)),
            SectionKind::SymbolTable { strtab }
            | SectionKind::VersionNeed { strtab }
            | SectionKind::VersionDef { strtab }
            | SectionKind::Dynamic { strtab } => {
                let header = self.section_header(strtab)?;
                Ok(StringTable::new(
                    self.window(header.sh_offset, header.sh_size)?,
                ))
            }
            _ => Err(NotSupported),
        }
    }

    /// Symbol reader for a symbol table section.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `section` is not a symbol table.
    pub fn symbols<'a>(&'a self, section: &Section<'a>) -> Result<SymbolTable<'a>> {
        match section.kind {
            SectionKind::SymbolTable { .. } => Ok(SymbolTable::new(
                section.data,
                self.string_table(section)?,
                self.ctx,
            )),
            _ => Err(NotSupported),
        }
    }

    /// Entry reader for a `SHT_REL` / `SHT_RELA` section.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `section` is not a relocation table.
    pub fn relocations<'a>(&'a self, section: &Section<'a>) -> Result<RelocationTable<'a>> {
        match section.kind {
            SectionKind::Relocation { addend, .. } => Ok(RelocationTable::new(
                section.data,
                addend,
                self.ctx,
            )),
            _ => Err(NotSupported),
        }
    }

    /// Entries of a `SHT_DYNAMIC` section; strings resolve via [`ElfFile::string_table`].
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `section` is not a dynamic table.
    pub fn dynamic<'a>(&'a self, section: &Section<'a>) -> Result<DynamicIter<'a>> {
        match section.kind {
            SectionKind::Dynamic { .. } => Ok(DynamicIter::new(section.data, self.ctx)),
            _ => Err(NotSupported),
        }
    }

    /// `DT_NEEDED` library names, read through the `PT_DYNAMIC` segment.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the dynamic segment names strings but has no
    /// `DT_STRTAB`, or if that address is not mapped by any load segment.
    pub fn dynamic_needed(&self) -> Result<Vec<&str>> {
        self.dynamic_strings(DT_NEEDED)
    }

    /// `DT_SONAME`, read through the `PT_DYNAMIC` segment.
    ///
    /// # Errors
    /// See [`ElfFile::dynamic_needed`].
    pub fn dynamic_soname(&self) -> Result<Option<&str>> {
        Ok(self.dynamic_strings(DT_SONAME)?.into_iter().next())
    }

    fn dynamic_strings(&self, tag: u64) -> Result<Vec<&str>> {
        let mut dynamic = None;
        for index in 0..self.num_segments() {
            if self.segment_header(index)?.p_type == PT_DYNAMIC {
                dynamic = Some(self.segment(index)?);
                break;
            }
        }
        let Some(entries) = dynamic.as_ref().and_then(Segment::dynamic_entries) else {
            return Ok(Vec::new());
        };

        let entries: Vec<DynamicEntry> = entries.collect::<Result<_>>()?;
        if !entries.iter().any(|entry| entry.tag == tag) {
            return Ok(Vec::new());
        }

        let strtab = entries
            .iter()
            .find(|entry| entry.is_strtab())
            .ok_or_else(|| malformed_error!("Dynamic segment has no DT_STRTAB"))?
            .value;
        let start = self
            .address_offsets(strtab, 1)
            .next()
            .transpose()?
            .ok_or_else(|| malformed_error!("DT_STRTAB {:#x} is not mapped", strtab))?;

        let data = self.data();
        let start = to_usize(start)?;
        let table = match entries.iter().find(|entry| entry.is_strsz()) {
            Some(strsz) => self.backend.data_slice(start, to_usize(strsz.value)?)?,
            None => data.get(start..).ok_or_else(|| out_of_bounds_error!())?,
        };
        let strings = StringTable::new(table);

        entries
            .iter()
            .filter(|entry| entry.tag == tag)
            .map(|entry| strings.get(to_usize(entry.value)?))
            .collect()
    }

    /// Display name of the target architecture from `e_machine`.
    #[must_use]
    pub fn machine_arch(&self) -> &'static str {
        match self.header.e_machine {
            EM_386 => "x86",
            EM_X86_64 => "x64",
            EM_ARM => "ARM",
            EM_AARCH64 => "AArch64",
            EM_MIPS => "MIPS",
            EM_PPC => "PowerPC",
            EM_PPC64 => "PowerPC64",
            EM_SPARC | EM_SPARCV9 => "SPARC",
            EM_RISCV => "RISC-V",
            _ => "<unknown>",
        }
    }

    /// Addressing model for the debug-information consumer, taken from the file header.
    #[must_use]
    pub fn dwarf_config(&self) -> DwarfConfig {
        DwarfConfig {
            little_endian: self.endian.is_little(),
            default_address_size: self.word_size.bytes(),
            machine_arch: self.machine_arch(),
        }
    }
}
