//! Program segments and virtual-address translation.
//!
//! Segments are produced on demand from the program header table. The address translator
//! walks the same table lazily and only ever considers `PT_LOAD` entries, so an address
//! that is also covered by a note or dynamic segment is reported once per load mapping.

use bitflags::bitflags;
use goblin::{
    container::Ctx,
    elf::program_header::{ProgramHeader, PT_DYNAMIC, PT_INTERP, PT_LOAD, PT_NOTE},
};

use crate::{
    elf::{dynamic::DynamicIter, notes::NoteIter, ElfFile},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// `PF_*` permission flags of a segment
    pub struct SegmentFlags: u32 {
        /// Executable
        const X = 0x1;
        /// Writable
        const W = 0x2;
        /// Readable
        const R = 0x4;
    }
}

/// The closed set of segment views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// `PT_LOAD`
    Load,
    /// `PT_DYNAMIC`
    Dynamic,
    /// `PT_INTERP`
    Interp,
    /// `PT_NOTE`
    Note,
    /// Any other `p_type`
    Other(u32),
}

impl From<u32> for SegmentKind {
    fn from(p_type: u32) -> Self {
        match p_type {
            PT_LOAD => SegmentKind::Load,
            PT_DYNAMIC => SegmentKind::Dynamic,
            PT_INTERP => SegmentKind::Interp,
            PT_NOTE => SegmentKind::Note,
            other => SegmentKind::Other(other),
        }
    }
}

/// A typed view over one program header and the file bytes it covers.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    /// Position in the program header table
    pub index: usize,
    /// Which specialised view applies
    pub kind: SegmentKind,
    /// Permission flags
    pub flags: SegmentFlags,
    /// File offset of the first byte
    pub offset: u64,
    /// Virtual address of the first byte
    pub vaddr: u64,
    /// Physical address, where meaningful
    pub paddr: u64,
    /// Bytes occupied in the file
    pub file_size: u64,
    /// Bytes occupied in memory; may be smaller than `file_size` in hostile input
    pub memory_size: u64,
    /// Required alignment
    pub alignment: u64,
    pub(crate) ctx: Ctx,
    pub(crate) data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub(crate) fn new(
        index: usize,
        header: &ProgramHeader,
        ctx: Ctx,
        data: &'a [u8],
    ) -> Self {
        Segment {
            index,
            kind: SegmentKind::from(header.p_type),
            flags: SegmentFlags::from_bits_retain(header.p_flags),
            offset: header.p_offset,
            vaddr: header.p_vaddr,
            paddr: header.p_paddr,
            file_size: header.p_filesz,
            memory_size: header.p_memsz,
            alignment: header.p_align,
            ctx,
            data,
        }
    }

    /// The file contents of this segment.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The program interpreter path, if this is a `PT_INTERP` segment.
    ///
    /// The path ends at the first null byte, or at the end of the segment if there is none.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the path is not valid UTF-8.
    pub fn interpreter(&self) -> Option<Result<&'a str>> {
        if self.kind != SegmentKind::Interp {
            return None;
        }

        let path = self
            .data
            .iter()
            .position(|&b| b == 0)
            .map_or(self.data, |end| &self.data[..end]);
        Some(
            std::str::from_utf8(path)
                .map_err(|e| malformed_error!("Invalid interpreter path: {}", e)),
        )
    }

    /// Note records, if this is a `PT_NOTE` segment.
    #[must_use]
    pub fn notes(&self) -> Option<NoteIter<'a>> {
        match self.kind {
            SegmentKind::Note => Some(NoteIter::new(self.data, self.ctx, self.alignment)),
            _ => None,
        }
    }

    /// Raw dynamic entries, if this is a `PT_DYNAMIC` segment.
    ///
    /// String-valued entries are resolved through the container, see
    /// [`ElfFile::dynamic_needed`] and [`ElfFile::dynamic_soname`].
    #[must_use]
    pub fn dynamic_entries(&self) -> Option<DynamicIter<'a>> {
        match self.kind {
            SegmentKind::Dynamic => Some(DynamicIter::new(self.data, self.ctx)),
            _ => None,
        }
    }

    /// Returns `true` if `[start, start + size)` lies inside the file-backed part of the
    /// segment's virtual range.
    #[must_use]
    pub fn contains(&self, start: u64, size: u64) -> bool {
        translate(self.vaddr, self.file_size, self.offset, start, size).is_some()
    }
}

/// Map `[start, start + size)` into a segment described by `vaddr`, `file_size` and
/// `offset`. Any overflowing quantity means the range is not contained.
fn translate(vaddr: u64, file_size: u64, offset: u64, start: u64, size: u64) -> Option<u64> {
    let end = start.checked_add(size)?;
    let segment_end = vaddr.checked_add(file_size)?;

    if start >= vaddr && end <= segment_end {
        (start - vaddr).checked_add(offset)
    } else {
        None
    }
}

/// Lazy sequence of file offsets at which load segments map an address range.
///
/// Created by [`ElfFile::address_offsets`]. Each step parses at most the program headers up
/// to the next match; a header that fails to parse is yielded as an error and ends the
/// sequence. Call [`ElfFile::address_offsets`] again for a fresh walk.
#[derive(Clone)]
pub struct AddressOffsets<'f> {
    file: &'f ElfFile,
    start: u64,
    size: u64,
    index: usize,
    count: usize,
    failed: bool,
}

impl<'f> AddressOffsets<'f> {
    pub(crate) fn new(file: &'f ElfFile, start: u64, size: u64) -> Self {
        AddressOffsets {
            file,
            start,
            size,
            index: 0,
            count: file.num_segments(),
            failed: false,
        }
    }
}

impl Iterator for AddressOffsets<'_> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.index < self.count {
            let index = self.index;
            self.index += 1;

            let header = match self.file.segment_header(index) {
                Ok(header) => header,
                Err(error) => {
                    self.failed = true;
                    return Some(Err(error));
                }
            };

            if header.p_type != PT_LOAD {
                continue;
            }

            if let Some(offset) = translate(
                header.p_vaddr,
                header.p_filesz,
                header.p_offset,
                self.start,
                self.size,
            ) {
                return Some(Ok(offset));
            }
        }

        None
    }
}
