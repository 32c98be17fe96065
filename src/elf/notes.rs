//! Note records carried by `SHT_NOTE` sections and `PT_NOTE` segments.
//!
//! Each record is `namesz`, `descsz`, `type` (three 4-byte words in the container's byte
//! order), followed by the name and the descriptor, each padded to the record alignment.

use goblin::{container::Ctx, elf::note};
use scroll::Pread;

use crate::Result;

/// One note record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note<'a> {
    /// Owner name without its terminator, e.g. `GNU`
    pub name: &'a str,
    /// Owner-specific type code
    pub n_type: u32,
    /// Descriptor bytes
    pub desc: &'a [u8],
}

/// Iterator over the note records of a section or segment.
///
/// Iteration stops at the first malformed record, which is yielded as an error.
#[derive(Debug, Clone)]
pub struct NoteIter<'a> {
    data: &'a [u8],
    offset: usize,
    ctx: Ctx,
    align: usize,
    failed: bool,
}

impl<'a> NoteIter<'a> {
    /// Iterate `data` using the byte order of `ctx` and the given alignment (`8` selects
    /// 8-byte padding, anything else 4-byte padding).
    #[must_use]
    pub fn new(data: &'a [u8], ctx: Ctx, alignment: u64) -> Self {
        NoteIter {
            data,
            offset: 0,
            ctx,
            align: if alignment == 8 { 8 } else { 4 },
            failed: false,
        }
    }

    fn parse_next(&mut self) -> Result<Note<'a>> {
        let record: note::Note<'a> = self
            .data
            .gread_with(&mut self.offset, (self.align, self.ctx))?;

        Ok(Note {
            name: record.name.trim_end_matches('\0'),
            n_type: record.n_type,
            desc: record.desc,
        })
    }
}

impl<'a> Iterator for NoteIter<'a> {
    type Item = Result<Note<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let note = self.parse_next();
        self.failed = note.is_err();
        Some(note)
    }
}
