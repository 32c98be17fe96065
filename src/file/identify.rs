//! Container identification.
//!
//! Reads the fixed magic/version prologue at the start of a byte source and decides which
//! layout family it belongs to, together with the basic machine parameters. Identification
//! never falls through to a different format: a prologue that matches neither family is an
//! error. Deeper header fields (entry point, table offsets and counts) are left to the
//! family-specific loaders.

use goblin::elf::header::{
    EI_CLASS, EI_DATA, ELFCLASS32, ELFCLASS64, ELFDATA2LSB, ELFDATA2MSB, ELFMAG, SELFMAG,
    SIZEOF_IDENT,
};

use crate::{
    file::io::Endian,
    Error::{Empty, NotSupported},
    Result,
};

/// Magic number opening every WebAssembly module.
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// Size of the module family's version field following the magic.
pub const WASM_VERSION_SIZE: usize = 4;

/// The two supported binary layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Header-indexed section and segment tables (ELF)
    Segmented,
    /// Linear stream of `(kind, size, payload)` chunks (WebAssembly)
    Module,
}

/// Natural word size of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSize {
    /// 32-bit addresses
    Bits32,
    /// 64-bit addresses
    Bits64,
}

impl WordSize {
    /// Width of an address in bytes.
    #[must_use]
    pub fn bytes(self) -> u8 {
        match self {
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }

    /// Returns `true` for [`WordSize::Bits64`].
    #[must_use]
    pub fn is_64(self) -> bool {
        self == WordSize::Bits64
    }
}

/// Result of reading a container prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Detected layout family
    pub family: Family,
    /// Word size; always 32-bit for the module family
    pub word_size: WordSize,
    /// Byte order; always little-endian for the module family
    pub endian: Endian,
    /// The version/ident block following the magic, stored verbatim
    pub prologue: Vec<u8>,
}

/// Identify the layout family of `data` from its prologue.
///
/// # Errors
/// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::NotSupported`] when the
/// magic or the ELF class/data bytes are unknown, and [`crate::Error::OutOfBounds`] when the
/// prologue is cut short after a matching magic.
///
/// # Examples
///
/// ```rust
/// use binscope::file::identify::{identify, Family};
///
/// let identity = identify(b"\0asm\x01\0\0\0")?;
/// assert_eq!(identity.family, Family::Module);
/// assert_eq!(identity.prologue, [1, 0, 0, 0]);
/// # Ok::<(), binscope::Error>(())
/// ```
pub fn identify(data: &[u8]) -> Result<Identity> {
    if data.is_empty() {
        return Err(Empty);
    }

    if data.starts_with(&WASM_MAGIC) {
        let version = data
            .get(WASM_MAGIC.len()..WASM_MAGIC.len() + WASM_VERSION_SIZE)
            .ok_or_else(|| out_of_bounds_error!())?;

        return Ok(Identity {
            family: Family::Module,
            word_size: WordSize::Bits32,
            endian: Endian::Little,
            prologue: version.to_vec(),
        });
    }

    if data.len() >= SELFMAG && &data[..SELFMAG] == ELFMAG {
        let ident = data
            .get(..SIZEOF_IDENT)
            .ok_or_else(|| out_of_bounds_error!())?;

        let word_size = match ident[EI_CLASS] {
            ELFCLASS32 => WordSize::Bits32,
            ELFCLASS64 => WordSize::Bits64,
            _ => return Err(NotSupported),
        };
        let endian = match ident[EI_DATA] {
            ELFDATA2LSB => Endian::Little,
            ELFDATA2MSB => Endian::Big,
            _ => return Err(NotSupported),
        };

        return Ok(Identity {
            family: Family::Segmented,
            word_size,
            endian,
            prologue: ident.to_vec(),
        });
    }

    Err(NotSupported)
}
