use crate::{file::parser::Parser, Result};

/// A pool of null-terminated strings addressed by byte offset.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Wrap the raw contents of a string table.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        StringTable { data }
    }

    /// Returns the string starting at `offset`.
    ///
    /// Offset `0` of an empty table yields the empty string, matching the convention that
    /// index `0` names nothing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an offset past the table and
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn get(&self, offset: usize) -> Result<&'a str> {
        if offset == 0 && self.data.is_empty() {
            return Ok("");
        }
        if offset >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(self.data);
        parser.seek(offset)?;
        parser.read_str_utf8()
    }

    /// Raw bytes of the table.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
