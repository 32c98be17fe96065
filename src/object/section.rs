//! Typed section views.
//!
//! A [`Section`] is produced fresh by the owning container on every access. It carries the
//! decoded header fields, the resolved name, a [`SectionKind`] telling which specialised view
//! applies, and a borrowed window into the container's bytes. Kinds that depend on another
//! section (a symbol table and its string table, a relocation table and its symbol table)
//! record the linked index; the container resolves it on request.

use bitflags::bitflags;
use goblin::container::Ctx;

use crate::{
    elf::{notes::NoteIter, strtab::StringTable},
    file::io::Endian,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// `SHF_*` attribute flags of a section
    pub struct SectionFlags: u64 {
        /// Writable at runtime
        const WRITE = 0x1;
        /// Occupies memory during execution
        const ALLOC = 0x2;
        /// Contains executable instructions
        const EXECINSTR = 0x4;
        /// Elements may be merged
        const MERGE = 0x10;
        /// Contains null-terminated strings
        const STRINGS = 0x20;
        /// `sh_info` holds a section index
        const INFO_LINK = 0x40;
        /// Ordering requirement relative to the linked section
        const LINK_ORDER = 0x80;
        /// Requires OS-specific processing
        const OS_NONCONFORMING = 0x100;
        /// Member of a section group
        const GROUP = 0x200;
        /// Holds thread-local data
        const TLS = 0x400;
        /// Contents are compressed (gABI `Chdr` envelope)
        const COMPRESSED = 0x800;
    }
}

/// The closed set of section views.
///
/// Variants carrying an index refer to another section of the same container; see
/// [`crate::elf::ElfFile::symbols`] and [`crate::elf::ElfFile::relocations`] for the
/// operations that resolve them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// The reserved index-0 section
    Null,
    /// Null-terminated string pool
    StringTable,
    /// `SHT_SYMTAB`, `SHT_DYNSYM` or `SHT_SUNW_LDYNSYM`
    SymbolTable {
        /// Index of the linked string table
        strtab: usize,
    },
    /// `SHT_SUNW_syminfo`
    SymbolInfo {
        /// Index of the linked symbol table
        symtab: usize,
    },
    /// `SHT_GNU_verneed`
    VersionNeed {
        /// Index of the linked string table
        strtab: usize,
    },
    /// `SHT_GNU_verdef`
    VersionDef {
        /// Index of the linked string table
        strtab: usize,
    },
    /// `SHT_GNU_versym`
    VersionSym {
        /// Index of the linked symbol table
        symtab: usize,
    },
    /// `SHT_REL` or `SHT_RELA`
    Relocation {
        /// `true` for `SHT_RELA` entries carrying an explicit addend
        addend: bool,
        /// Index of the linked symbol table, `0` if none
        symtab: usize,
        /// Index of the section the relocations apply to
        target: usize,
    },
    /// `SHT_DYNAMIC`
    Dynamic {
        /// Index of the linked dynamic string table
        strtab: usize,
    },
    /// `SHT_NOTE`
    Note,
    /// A `.stab` debugging section carried as `SHT_PROGBITS`
    Stab,
    /// `SHT_ARM_ATTRIBUTES`
    ArmAttributes,
    /// `SHT_NOBITS`; occupies no bytes in the file
    NoBits,
    /// A named custom section of a WebAssembly module
    Custom,
    /// Anything else
    Raw,
}

/// A named, typed view over a byte range of a container.
///
/// `size()` always equals `data().len()`: sections without file contents (`SHT_NOBITS`)
/// report a size of zero here, while the declared in-memory size remains available via
/// [`Section::declared_size`].
#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// Position in the container's section list
    pub index: usize,
    /// Resolved name; empty if the section has none
    pub name: String,
    /// Which specialised view applies
    pub kind: SectionKind,
    /// Raw `sh_type`; `0` for module-family sections
    pub sh_type: u32,
    /// Attribute flags
    pub flags: SectionFlags,
    /// Virtual address; always `0` for module-family sections
    pub address: u64,
    /// File offset of the first content byte
    pub offset: u64,
    /// Raw `sh_link`
    pub link: u32,
    /// Raw `sh_info`
    pub info: u32,
    /// Required alignment
    pub alignment: u64,
    /// Size of one table entry, if the section holds a table
    pub entry_size: u64,
    pub(crate) declared_size: u64,
    pub(crate) endian: Endian,
    pub(crate) data: &'a [u8],
}

impl<'a> Section<'a> {
    /// Wrap a module-family custom section.
    pub(crate) fn custom(index: usize, name: String, offset: u64, data: &'a [u8]) -> Self {
        Section {
            index,
            name,
            kind: SectionKind::Custom,
            sh_type: 0,
            flags: SectionFlags::empty(),
            address: 0,
            offset,
            link: 0,
            info: 0,
            alignment: 1,
            entry_size: 0,
            declared_size: data.len() as u64,
            endian: Endian::Little,
            data,
        }
    }

    /// The section contents.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of content bytes, equal to `data().len()`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Size as declared by the header (`sh_size`).
    #[must_use]
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Returns `true` if the name uses the `.zdebug` compressed-section convention.
    #[must_use]
    pub fn has_compressed_name(&self) -> bool {
        self.name.starts_with(".zdebug")
    }

    /// String lookup, if this is a string table.
    #[must_use]
    pub fn strings(&self) -> Option<StringTable<'a>> {
        match self.kind {
            SectionKind::StringTable => Some(StringTable::new(self.data)),
            _ => None,
        }
    }

    /// Note records, if this is a note section.
    #[must_use]
    pub fn notes(&self) -> Option<NoteIter<'a>> {
        match self.kind {
            SectionKind::Note => Some(NoteIter::new(
                self.data,
                Ctx::from(scroll::Endian::from(self.endian)),
                self.alignment,
            )),
            _ => None,
        }
    }
}
