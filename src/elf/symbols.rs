//! Symbol table entries (`SHT_SYMTAB`, `SHT_DYNSYM`, `SHT_SUNW_LDYNSYM`).

use goblin::{container::Ctx, elf::sym::Sym};
use scroll::{ctx::SizeWith, Pread};

use crate::{elf::strtab::StringTable, Result};

/// One symbol with its name resolved through the linked string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol<'a> {
    /// Symbol name; empty for unnamed symbols
    pub name: &'a str,
    /// `st_value`
    pub value: u64,
    /// `st_size`
    pub size: u64,
    /// `st_info`, binding in the high nibble and type in the low nibble
    pub info: u8,
    /// `st_other`, visibility
    pub other: u8,
    /// `st_shndx`, index of the defining section
    pub shndx: usize,
}

impl Symbol<'_> {
    /// `STB_*` binding.
    #[must_use]
    pub fn bind(&self) -> u8 {
        self.info >> 4
    }

    /// `STT_*` type.
    #[must_use]
    pub fn sym_type(&self) -> u8 {
        self.info & 0xf
    }
}

/// Random-access reader over a symbol table.
#[derive(Debug, Clone, Copy)]
pub struct SymbolTable<'a> {
    data: &'a [u8],
    strings: StringTable<'a>,
    ctx: Ctx,
}

impl<'a> SymbolTable<'a> {
    /// Wrap the raw table `data` whose names live in `strings`.
    #[must_use]
    pub fn new(data: &'a [u8], strings: StringTable<'a>, ctx: Ctx) -> Self {
        SymbolTable { data, strings, ctx }
    }

    fn entry_size(&self) -> usize {
        Sym::size_with(&self.ctx)
    }

    /// Number of complete entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.entry_size()
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the symbol at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an index past the table or a name offset
    /// past the string table.
    pub fn get(&self, index: usize) -> Result<Symbol<'a>> {
        if index >= self.len() {
            return Err(out_of_bounds_error!());
        }

        let sym: Sym = self
            .data
            .pread_with(index * self.entry_size(), self.ctx)?;

        Ok(Symbol {
            name: self.strings.get(sym.st_name)?,
            value: sym.st_value,
            size: sym.st_size,
            info: sym.st_info,
            other: sym.st_other,
            shndx: sym.st_shndx,
        })
    }

    /// Iterate all symbols in table order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Symbol<'a>>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}
