use goblin::{
    container::Ctx,
    elf::dynamic::{Dyn, DT_NEEDED, DT_NULL, DT_SONAME, DT_STRSZ, DT_STRTAB},
};
use scroll::Pread;

use crate::Result;

/// One `(d_tag, d_val)` pair of a dynamic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    /// `DT_*` tag
    pub tag: u64,
    /// Value or address, interpreted according to `tag`
    pub value: u64,
}

impl DynamicEntry {
    /// Returns `true` if `value` is an offset into the dynamic string table.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.tag, DT_NEEDED | DT_SONAME)
    }

    /// Returns `true` for `DT_STRTAB`.
    #[must_use]
    pub fn is_strtab(&self) -> bool {
        self.tag == DT_STRTAB
    }

    /// Returns `true` for `DT_STRSZ`.
    #[must_use]
    pub fn is_strsz(&self) -> bool {
        self.tag == DT_STRSZ
    }
}

/// Iterator over dynamic entries, ending at `DT_NULL` or at the end of the data.
#[derive(Debug, Clone)]
pub struct DynamicIter<'a> {
    data: &'a [u8],
    offset: usize,
    ctx: Ctx,
    done: bool,
}

impl<'a> DynamicIter<'a> {
    /// Iterate the entries stored in `data`.
    #[must_use]
    pub fn new(data: &'a [u8], ctx: Ctx) -> Self {
        DynamicIter {
            data,
            offset: 0,
            ctx,
            done: false,
        }
    }
}

impl Iterator for DynamicIter<'_> {
    type Item = Result<DynamicEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }

        let entry = self
            .data
            .gread_with::<Dyn>(&mut self.offset, self.ctx)
            .map(|entry| DynamicEntry {
                tag: entry.d_tag,
                value: entry.d_val,
            });

        match entry {
            Ok(entry) if entry.tag == DT_NULL => {
                self.done = true;
                None
            }
            Ok(entry) => Some(Ok(entry)),
            Err(error) => {
                self.done = true;
                Some(Err(error.into()))
            }
        }
    }
}
