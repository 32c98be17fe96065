//! Relocation tables and their application to debug-section copies.
//!
//! Debug sections of relocatable objects hold placeholder values that only become meaningful
//! once the entries of the matching `.rel<name>` / `.rela<name>` section are applied. The
//! [`RelocationResolver`] trait is the seam the debug-info assembler uses for this; each
//! container family provides its own implementation.

use goblin::{
    container::Ctx,
    elf::{
        header::{EM_386, EM_AARCH64, EM_X86_64},
        reloc::{
            Reloc, R_386_32, R_386_PC32, R_AARCH64_ABS32, R_AARCH64_ABS64, R_AARCH64_PREL32,
            R_X86_64_32, R_X86_64_32S, R_X86_64_64, R_X86_64_PC32,
        },
    },
};
use scroll::Pread;
use tracing::debug;

use crate::{
    elf::{symbols::SymbolTable, ElfFile},
    file::{
        io::{read_at, write_at},
        to_usize,
    },
    object::section::{Section, SectionKind},
    Error::{NotSupported, UnresolvedLink},
    Result,
};

/// `R_*_NONE` is `0` on every supported machine.
const R_NONE: u32 = 0;

/// Locates and applies the relocations that target a section.
pub trait RelocationResolver {
    /// Returns the relocation section targeting `section`, if there is one.
    ///
    /// # Errors
    /// Returns an error if a candidate section exists but cannot be materialised.
    fn find_relocations_for(&self, section: &Section<'_>) -> Result<Option<Section<'_>>>;

    /// Apply every entry of `reloc_section` to `stream`, a copy of the target section's bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for relocation types without a recipe and
    /// [`crate::Error::OutOfBounds`] for entries pointing outside `stream`.
    fn apply(&self, stream: &mut [u8], reloc_section: &Section<'_>) -> Result<()>;
}

/// One relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Offset within the target section
    pub offset: u64,
    /// Index into the linked symbol table
    pub sym: usize,
    /// Machine-specific `R_*` type
    pub r_type: u32,
    /// Explicit addend of `SHT_RELA` entries; `None` for `SHT_REL`
    pub addend: Option<i64>,
}

/// Random-access reader over a `SHT_REL` or `SHT_RELA` table.
#[derive(Debug, Clone, Copy)]
pub struct RelocationTable<'a> {
    data: &'a [u8],
    addend: bool,
    ctx: Ctx,
}

impl<'a> RelocationTable<'a> {
    /// Wrap the raw table `data`; `addend` selects `SHT_RELA` entries.
    #[must_use]
    pub fn new(data: &'a [u8], addend: bool, ctx: Ctx) -> Self {
        RelocationTable { data, addend, ctx }
    }

    fn entry_size(&self) -> usize {
        Reloc::size(self.addend, self.ctx)
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

    /// Returns the entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an index past the table.
    pub fn get(&self, index: usize) -> Result<Relocation> {
        if index >= self.len() {
            return Err(out_of_bounds_error!());
        }

        let reloc: Reloc = self
            .data
            .pread_with(index * self.entry_size(), (self.addend, self.ctx))?;

        Ok(Relocation {
            offset: reloc.r_offset,
            sym: reloc.r_sym,
            r_type: reloc.r_type,
            addend: reloc.r_addend,
        })
    }

    /// Iterate all entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Relocation>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}

/// How a relocation computes its value and how many bytes it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recipe {
    /// `S + A`, 32 bits wide
    Absolute32,
    /// `S + A`, 64 bits wide
    Absolute64,
    /// `S + A - P`, 32 bits wide
    Relative32,
}

/// Recipe for `r_type` on `machine`; `None` for a no-op entry.
fn recipe(machine: u16, r_type: u32) -> Result<Option<Recipe>> {
    if r_type == R_NONE {
        return Ok(None);
    }

    let recipe = match (machine, r_type) {
        (EM_X86_64, R_X86_64_64) | (EM_AARCH64, R_AARCH64_ABS64) => Recipe::Absolute64,
        (EM_X86_64, R_X86_64_32 | R_X86_64_32S)
        | (EM_386, R_386_32)
        | (EM_AARCH64, R_AARCH64_ABS32) => Recipe::Absolute32,
        (EM_X86_64, R_X86_64_PC32) | (EM_386, R_386_PC32) | (EM_AARCH64, R_AARCH64_PREL32) => {
            Recipe::Relative32
        }
        _ => return Err(NotSupported),
    };
    Ok(Some(recipe))
}

impl RelocationResolver for ElfFile {
    fn find_relocations_for(&self, section: &Section<'_>) -> Result<Option<Section<'_>>> {
        for prefix in [".rel", ".rela"] {
            let name = format!("{}{}", prefix, section.name);
            if let Some(candidate) = self.section_by_name(&name)? {
                if matches!(candidate.kind, SectionKind::Relocation { .. }) {
                    return Ok(Some(candidate));
                }
            }
        }

        Ok(None)
    }

    fn apply(&self, stream: &mut [u8], reloc_section: &Section<'_>) -> Result<()> {
        let SectionKind::Relocation { symtab, .. } = reloc_section.kind else {
            return Err(NotSupported);
        };

        let table = self.relocations(reloc_section)?;
        let symbols: Option<SymbolTable<'_>> = if symtab == 0 {
            None
        } else {
            Some(self.symbols(&self.section(symtab)?)?)
        };

        let endian = self.endian();
        let machine = self.header().e_machine;

        for entry in table.iter() {
            let entry = entry?;
            let Some(recipe) = recipe(machine, entry.r_type)? else {
                continue;
            };

            let symbol_value = match (entry.sym, &symbols) {
                (0, _) => 0,
                (sym, Some(symbols)) => symbols.get(sym)?.value,
                (_, None) => {
                    return Err(UnresolvedLink {
                        section: reloc_section.index,
                        link: symtab,
                    })
                }
            };

            let target = to_usize(entry.offset)?;
            let implicit = {
                let mut offset = target;
                match recipe {
                    Recipe::Absolute64 => read_at::<u64>(stream, &mut offset, endian)?,
                    _ => u64::from(read_at::<u32>(stream, &mut offset, endian)?),
                }
            };
            let addend = entry.addend.map_or(implicit, |addend| addend as u64);
            let value = match recipe {
                Recipe::Relative32 => symbol_value.wrapping_add(addend).wrapping_sub(entry.offset),
                Recipe::Absolute32 | Recipe::Absolute64 => symbol_value.wrapping_add(addend),
            };

            let mut offset = target;
            match recipe {
                Recipe::Absolute64 => write_at(stream, &mut offset, value, endian)?,
                _ => write_at(stream, &mut offset, value as u32, endian)?,
            }
        }

        debug!(
            section = %reloc_section.name,
            entries = table.len(),
            "applied relocations"
        );
        Ok(())
    }
}
